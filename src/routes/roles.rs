use crate::{
    api::Authorised,
    auth::{AuthUtilities, JiEduSession},
    data::{
        pagination::Listing,
        permissions::{
            AppModels, AssignPermissions, Group, ModelActions, ModelPermission, ToggleState,
        },
    },
    error::{JiEduResult, UnknownAppSnafu},
    maud_conveniences::{
        form_element, form_submit_button, render_table, success_alert, title, urlencode,
    },
    routes::sse::SseEvent,
    state::JiEduState,
};
use axum::{
    Form,
    extract::{Path, Query, State},
};
use maud::{Markup, html};
use serde::{Deserialize, Serialize};
use snafu::OptionExt;
use std::collections::HashMap;

#[derive(Deserialize)]
pub struct AppQuery {
    pub app: String,
}

#[derive(Serialize)]
struct GroupPermissionsQuery<'a> {
    app: &'a str,
    group: i64,
}

async fn find_app(api: &Authorised<'_>, app_label: &str) -> JiEduResult<AppModels> {
    let apps: Listing<AppModels> = api.get("/api/apps/").await?;
    apps.into_vec()
        .into_iter()
        .find(|app| app.app_label == app_label)
        .context(UnknownAppSnafu { app: app_label })
}

pub async fn get_roles(
    State(state): State<JiEduState>,
    session: JiEduSession,
) -> JiEduResult<Markup> {
    let user = session.signed_in()?;
    let groups: Listing<Group> = state.api().authorised(user.token()).get("/api/groups/").await?;

    let rows = groups
        .into_vec()
        .into_iter()
        .map(|group| {
            vec![html! {
                a href={"/roles/" (group.id)} class="underline hover:text-blue-300" {(group.name)}
            }]
        })
        .collect();

    Ok(state.render(&session, html! {
        div class="bg-gray-800 p-8 rounded shadow-md max-w-3xl w-full" {
            (title("Roles"))
            (render_table(&["Group"], rows))
        }
    }))
}

pub async fn get_role(
    State(state): State<JiEduState>,
    session: JiEduSession,
    Path(group_id): Path<i64>,
) -> JiEduResult<Markup> {
    let user = session.signed_in()?;
    let api = state.api().authorised(user.token());
    let group: Group = api.get(&format!("/api/groups/{group_id}/")).await?;
    let apps: Listing<AppModels> = api.get("/api/apps/").await?;

    let matrix_endpoint = format!("/internal/roles/{group_id}/matrix");

    Ok(state.render(&session, html! {
        div hx-ext="sse" sse-connect="/sse_feed" class="bg-gray-800 p-8 rounded shadow-md max-w-4xl w-full" {
            (title(format!("Permissions for {}", group.name)))
            (form_element("app", "Application", html! {
                select id="app" name="app" hx-get=(matrix_endpoint) hx-trigger="change" hx-target="#matrix" hx-sync="#matrix:replace"
                    class="shadow appearance-none border rounded w-full py-2 px-3 leading-tight focus:outline-none bg-gray-700 border-gray-600" {
                    option value="" {"Choose an application"}
                    @for app in apps.into_vec() {
                        option value=(app.app_label) {(app.verbose_name)}
                    }
                }
            }))
            div id="matrix" {}
        }
    }))
}

pub async fn internal_get_matrix(
    State(state): State<JiEduState>,
    session: JiEduSession,
    Path(group_id): Path<i64>,
    Query(AppQuery { app }): Query<AppQuery>,
) -> JiEduResult<Markup> {
    let user = session.signed_in()?;
    let api = state.api().authorised(user.token());

    let app = find_app(&api, &app).await?;
    let existing: HashMap<String, ModelPermission> = api
        .get_with_query(
            "/api/group-permissions/",
            &GroupPermissionsQuery {
                app: &app.app_label,
                group: group_id,
            },
        )
        .await?;

    let toggles = ToggleState::initialise(&app, &existing);
    Ok(render_matrix(group_id, &app, &toggles))
}

pub async fn internal_post_matrix(
    State(state): State<JiEduState>,
    session: JiEduSession,
    Path(group_id): Path<i64>,
    Form(fields): Form<Vec<(String, String)>>,
) -> JiEduResult<Markup> {
    let user = session.signed_in()?;
    let api = state.api().authorised(user.token());

    let app_label = fields
        .iter()
        .find(|(name, _)| name == "app")
        .map(|(_, value)| value.as_str())
        .unwrap_or_default();
    let app = find_app(&api, app_label).await?;

    let checked = fields
        .iter()
        .filter(|(name, _)| name == "perm")
        .map(|(_, value)| value.as_str());
    let toggles = ToggleState::from_submission(&app, checked);

    let map = state.permission_map(api).await?;
    let resolution = toggles.resolve(&map);
    if !resolution.skipped.is_empty() {
        warn!(
            skipped = ?resolution.skipped,
            app = %app.app_label,
            "Codenames with no known permission id left out"
        );
    }

    let _: serde_json::Value = api
        .post(
            &format!("/api/groups/{group_id}/assign-permissions/"),
            &AssignPermissions {
                app: &app.app_label,
                permissions: &resolution.ids,
            },
        )
        .await?;
    info!(
        group_id,
        app = %app.app_label,
        count = resolution.ids.len(),
        "Permissions assigned"
    );
    state.send_sse_event(SseEvent::Permissions);

    Ok(html! {
        (render_matrix(group_id, &app, &toggles))
        div id="alerts" hx-swap-oob="true" {
            (success_alert("Saved!", format!("Permissions for {} updated", app.verbose_name)))
        }
    })
}

fn render_matrix(group_id: i64, app: &AppModels, toggles: &ToggleState) -> Markup {
    let mut columns = vec!["Model"];
    columns.extend(ModelActions::columns().map(|(_, prefix)| prefix));

    let rows = toggles
        .rows()
        .iter()
        .map(|row| {
            let mut cells = vec![html! { (row.label) }];
            cells.extend(ModelActions::columns().map(|(flag, prefix)| {
                html! {
                    input type="checkbox" name="perm" value={(row.model) "." (prefix)}
                        checked[row.actions.contains(flag)] class="leading-tight";
                }
            }));
            cells
        })
        .collect();

    let refresh = format!(
        "/internal/roles/{group_id}/matrix?app={}",
        urlencode(&app.app_label)
    );

    html! {
        // someone else saving permissions re-reads this grid
        div hx-get=(refresh) hx-trigger="sse:permissions" hx-target="#matrix" hx-sync="#matrix:replace" {}

        form hx-post={"/internal/roles/" (group_id) "/matrix"} hx-target="#matrix" hx-swap="innerHTML" {
            input type="hidden" name="app" value=(app.app_label);
            div class="capitalize" {
                (render_table(&columns, rows))
            }
            div class="mt-4" {
                (form_submit_button(Some("Save Permissions")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_backend;
    use axum::{Json, Router, extract::Query as AxumQuery, routing::get};
    use secrecy::SecretString;
    use serde_json::json;

    fn course_app() -> AppModels {
        AppModels {
            app_label: "course".into(),
            verbose_name: "Course".into(),
            models: vec!["Student".into(), "Class".into()],
        }
    }

    #[test]
    fn matrix_reflects_existing_permissions() {
        let existing = HashMap::from([(
            "student".to_string(),
            ModelPermission {
                view: true,
                ..Default::default()
            },
        )]);
        let toggles = ToggleState::initialise(&course_app(), &existing);

        let markup = render_matrix(3, &course_app(), &toggles).into_string();

        assert!(markup.contains(r#"value="student.view" checked"#));
        assert!(markup.contains(r#"value="student.add" class"#));
        assert!(markup.contains(r#"value="class.delete" class"#));
        assert!(markup.contains(r#"hx-post="/internal/roles/3/matrix""#));
        assert!(markup.contains(r#"name="app" value="course""#));
        assert!(markup.contains(r#"hx-get="/internal/roles/3/matrix?app=course""#));
        assert!(markup.contains(r#"hx-trigger="sse:permissions""#));
    }

    #[tokio::test]
    async fn unknown_apps_are_reported() {
        let backend = Router::new().route(
            "/api/apps/",
            get(|| async {
                Json(json!([
                    {"app_label": "course", "verbose_name": "Course", "models": ["Student"]}
                ]))
            }),
        );
        let client = test_backend::spawn(backend).await;
        let token = SecretString::from("t");
        let api = client.authorised(&token);

        assert_eq!(find_app(&api, "course").await.unwrap().models, vec!["Student"]);
        assert!(matches!(
            find_app(&api, "finance").await,
            Err(crate::error::JiEduError::UnknownApp { .. })
        ));
    }

    #[tokio::test]
    async fn group_permissions_are_fetched_per_app_and_group() {
        let backend = Router::new().route(
            "/api/group-permissions/",
            get(|AxumQuery(query): AxumQuery<HashMap<String, String>>| async move {
                assert_eq!(query["app"], "course");
                assert_eq!(query["group"], "3");
                Json(json!({"Class": {"view": true, "change": true}}))
            }),
        );
        let client = test_backend::spawn(backend).await;
        let token = SecretString::from("t");

        let existing: HashMap<String, ModelPermission> = client
            .authorised(&token)
            .get_with_query(
                "/api/group-permissions/",
                &GroupPermissionsQuery {
                    app: "course",
                    group: 3,
                },
            )
            .await
            .unwrap();
        let toggles = ToggleState::initialise(&course_app(), &existing);

        assert_eq!(toggles.selected_codenames(), vec!["view_class", "change_class"]);
    }
}
