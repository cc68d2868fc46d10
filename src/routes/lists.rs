use crate::{
    auth::{AuthUtilities, JiEduSession},
    data::{
        Resource,
        pagination::{ListQuery, PageControls},
    },
    error::JiEduResult,
    maud_conveniences::{page_controls, render_table, search_box, title, urlencode},
    state::JiEduState,
};
use axum::extract::{Query, State};
use maud::{Markup, html};

const LIST_TARGET: &str = "#list";

fn partial_endpoint<R: Resource>() -> String {
    format!("/internal/list/{}", R::SLUG)
}

pub async fn get_list_page<R: Resource>(
    State(state): State<JiEduState>,
    session: JiEduSession,
    Query(query): Query<ListQuery>,
) -> Markup {
    let debounce = state.config().ui_config().search_debounce;
    let partial = partial_endpoint::<R>();
    let initial = format!("{partial}?page={}&search={}", query.page(), urlencode(query.search()));

    state.render(&session, html! {
        div hx-ext="sse" sse-connect="/sse_feed" class="bg-gray-800 p-8 rounded shadow-md max-w-6xl w-full" {
            div class="flex flex-row items-center justify-between" {
                (title(R::TITLE))
                div class="flex flex-row space-x-2" {
                    @if R::SLUG == "students" {
                        a href="/students/new" class="bg-blue-600 hover:bg-blue-800 font-bold py-2 px-4 rounded" {"Register Student"}
                    }
                    a href={"/export/" (R::SLUG)} class="bg-slate-600 hover:bg-slate-800 font-bold py-2 px-4 rounded" {"Export CSV"}
                }
            }
            (search_box(&partial, LIST_TARGET, debounce, query.search()))
            div id="list" hx-get=(initial) hx-trigger="load" hx-sync="this:replace" {
                p class="italic text-gray-400" {"Loading..."}
            }
            div id="batch_result" {}
        }
    })
}

pub async fn internal_get_list<R: Resource>(
    State(state): State<JiEduState>,
    session: JiEduSession,
    Query(query): Query<ListQuery>,
) -> JiEduResult<Markup> {
    let user = session.signed_in()?;
    let page = state
        .api()
        .authorised(user.token())
        .list::<R>(R::ENDPOINT, &query)
        .await?;

    let controls = PageControls::new(query.page(), page.page_count());
    Ok(html! {
        @if let Some(count) = page.count {
            p class="text-sm text-gray-400 mb-2" {(count) " result(s)"}
        }
        (render_list(&page.results, &query, controls))
    })
}

pub fn render_list<R: Resource>(items: &[R], query: &ListQuery, controls: PageControls) -> Markup {
    let partial = partial_endpoint::<R>();
    let refresh = format!(
        "{partial}?page={}&search={}",
        controls.page,
        urlencode(query.search())
    );
    let selectable = !R::BATCH_ACTIONS.is_empty();

    let mut columns = Vec::with_capacity(R::COLUMNS.len() + 1);
    if selectable {
        columns.push("");
    }
    columns.extend_from_slice(R::COLUMNS);

    let rows = items
        .iter()
        .map(|item| {
            let mut cells = Vec::with_capacity(columns.len());
            if selectable {
                cells.push(html! {
                    input type="checkbox" name="ids" value=(item.id()) form="selection" class="leading-tight";
                });
            }
            cells.extend(item.cells());
            cells
        })
        .collect();

    html! {
        // re-fetch this exact page whenever something changes these records
        div hx-get=(refresh) hx-trigger={"sse:" (R::SLUG)} hx-target="#list" hx-sync="#list:replace" {}

        @if selectable {
            form id="selection" class="flex flex-row space-x-2 mb-4" {
                @for action in R::BATCH_ACTIONS {
                    button type="button" hx-post={"/internal/batch/" (action.endpoint_slug())} hx-include="#selection" hx-target="#batch_result"
                        class="bg-blue-600 hover:bg-blue-800 font-bold py-1 px-3 rounded capitalize" {
                        (action.endpoint_slug()) " selected"
                    }
                }
            }
        }

        (render_table(&columns, rows))
        (page_controls(&partial, LIST_TARGET, query.search(), controls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{academics::Course, people::Applicant};

    fn applicant(id: i64, first_name: &str) -> Applicant {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "first_name": first_name,
            "last_name": "Kariuki",
            "status": "pending",
        }))
        .unwrap()
    }

    #[test]
    fn selectable_lists_offer_their_batch_actions() {
        let markup = render_list(
            &[applicant(7, "Halima"), applicant(8, "Imani")],
            &ListQuery::first_page(""),
            PageControls::new(1, 1),
        )
        .into_string();

        assert!(markup.contains(r#"name="ids" value="7""#));
        assert!(markup.contains(r#"hx-post="/internal/batch/approve""#));
        assert!(markup.contains(r#"hx-post="/internal/batch/decline""#));
        assert!(markup.contains(r#"hx-trigger="sse:applicants""#));
    }

    #[test]
    fn plain_lists_have_no_selection() {
        let course: Course = serde_json::from_value(serde_json::json!({
            "id": 1, "code": "DICT", "name": "Diploma in ICT"
        }))
        .unwrap();

        let markup = render_list(
            &[course],
            &ListQuery { search: Some("ict".into()), page: Some(2) },
            PageControls::new(2, 2),
        )
        .into_string();

        assert!(!markup.contains("selection"));
        assert!(markup.contains("Diploma in ICT"));
        assert!(markup.contains("/internal/list/courses?page=1&amp;search=ict"));
    }
}
