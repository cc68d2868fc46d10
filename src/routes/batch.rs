use crate::{
    auth::{AuthUtilities, JiEduSession},
    batch::{BatchAction, ItemOutcome, ItemResponse, allocate_sequentially, toasts_for},
    data::{
        Resource,
        academics::SchoolClass,
        pagination::{ListQuery, PageControls, Paginated},
        people::{FullName, Student},
    },
    error::{JiEduError, JiEduResult, NothingSelectedSnafu},
    maud_conveniences::{
        error_alert, form_element, form_submit_button, page_controls, render_table, search_box,
        success_alert, title, toasts,
    },
    routes::sse::SseEvent,
    state::JiEduState,
};
use axum::{
    Form,
    extract::{Path, Query, State},
};
use maud::{Markup, html};
use serde::Serialize;
use snafu::ensure;

/// Pulls the repeated `ids` field out of a submitted form.
pub fn selected_ids(fields: &[(String, String)]) -> Vec<i64> {
    fields
        .iter()
        .filter(|(name, _)| name == "ids")
        .filter_map(|(_, value)| value.trim().parse().ok())
        .collect()
}

fn field<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(field, _)| field == name)
        .map(|(_, value)| value.as_str())
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    ids: &'a [i64],
}

pub async fn internal_post_batch(
    State(state): State<JiEduState>,
    session: JiEduSession,
    Path(action): Path<BatchAction>,
    Form(fields): Form<Vec<(String, String)>>,
) -> JiEduResult<Markup> {
    let user = session.signed_in()?;
    let ids = selected_ids(&fields);
    ensure!(!ids.is_empty(), NothingSelectedSnafu { what: action.subject() });

    let responses: Vec<ItemResponse> = state
        .api()
        .authorised(user.token())
        .post(action.endpoint(), &BatchRequest { ids: &ids })
        .await?;
    info!(?action, count = ids.len(), "Batch submitted");

    state.send_sse_event(match action {
        BatchAction::Approve | BatchAction::Decline => SseEvent::Applicants,
        BatchAction::Promote => SseEvent::Students,
    });

    let stagger = state.config().ui_config().toast_stagger;
    let outcomes = responses.into_iter().map(ItemOutcome::from);

    // per-item rejections only show up as toasts, the batch itself went through
    Ok(html! {
        div id="alerts" hx-swap-oob="true" {
            (success_alert("Done!", format!("{} {}(s) {}", ids.len(), action.subject(), action.past_tense())))
        }
        (toasts(&toasts_for(outcomes, stagger)))
    })
}

pub async fn get_allocation_page(
    State(state): State<JiEduState>,
    session: JiEduSession,
) -> JiEduResult<Markup> {
    let user = session.signed_in()?;
    let classes: Paginated<SchoolClass> = state
        .api()
        .authorised(user.token())
        .list(SchoolClass::ENDPOINT, &ListQuery::default())
        .await?;

    let debounce = state.config().ui_config().search_debounce;

    Ok(state.render(&session, html! {
        div class="bg-gray-800 p-8 rounded shadow-md max-w-5xl w-full" {
            (title("Allocate Students to a Class"))
            div id="allocation" {
                (allocation_form(&classes.results, debounce))
            }
        }
    }))
}

fn allocation_form(classes: &[SchoolClass], debounce: std::time::Duration) -> Markup {
    html! {
        form id="allocation_form" hx-post="/internal/allocation" hx-target="#allocation" hx-swap="innerHTML" {
            (form_element("class_id", "Class", html! {
                select id="class_id" name="class_id" required class="shadow appearance-none border rounded w-full py-2 px-3 leading-tight focus:outline-none bg-gray-700 border-gray-600" {
                    option value="" {"Choose a class"}
                    @for class in classes {
                        option value=(class.id) {
                            (class.name)
                            @if let Some(course) = &class.course { " (" (course) ")" }
                        }
                    }
                }
            }))
            (search_box("/internal/allocation/students", "#allocation_students", debounce, ""))
            div id="allocation_students" hx-get="/internal/allocation/students" hx-trigger="load" hx-sync="this:replace" {}
            (form_submit_button(Some("Allocate Selected")))
        }
    }
}

pub async fn internal_get_allocation_students(
    State(state): State<JiEduState>,
    session: JiEduSession,
    Query(query): Query<ListQuery>,
) -> JiEduResult<Markup> {
    let user = session.signed_in()?;
    let page: Paginated<Student> = state
        .api()
        .authorised(user.token())
        .list(Student::ENDPOINT, &query)
        .await?;
    let controls = PageControls::new(query.page(), page.page_count());

    let rows = page
        .results
        .iter()
        .map(|student| {
            vec![
                html! { input type="checkbox" name="ids" value=(student.id) form="allocation_form"; },
                html! { (FullName(&student.first_name, &student.last_name)) },
                html! { (student.class_name.as_deref().unwrap_or("Unallocated")) },
            ]
        })
        .collect();

    Ok(html! {
        (render_table(&["", "Student", "Current Class"], rows))
        (page_controls("/internal/allocation/students", "#allocation_students", query.search(), controls))
    })
}

#[derive(Serialize)]
struct AllocateRequest {
    class_id: i64,
}

pub async fn internal_post_allocation(
    State(state): State<JiEduState>,
    session: JiEduSession,
    Form(fields): Form<Vec<(String, String)>>,
) -> JiEduResult<Markup> {
    let user = session.signed_in()?;
    let ids = selected_ids(&fields);
    ensure!(!ids.is_empty(), NothingSelectedSnafu { what: "student" });
    let class_id = field(&fields, "class_id")
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .ok_or(JiEduError::NothingSelected { what: "class" })?;

    let api = state.api().authorised(user.token());
    let report = allocate_sequentially(&ids, |id| {
        let endpoint = format!("/api/students/{id}/allocate/");
        async move { api.post_item(&endpoint, &AllocateRequest { class_id }).await }
    })
    .await?;

    if !report.applied.is_empty() {
        state.send_sse_event(SseEvent::Students);
    }

    let classes: Paginated<SchoolClass> = api
        .list(SchoolClass::ENDPOINT, &ListQuery::default())
        .await?;
    let debounce = state.config().ui_config().search_debounce;
    let stagger = state.config().ui_config().toast_stagger;

    let dialog = if report.stopped.is_some() {
        error_alert(format!(
            "Allocated {} of {} student(s) before the backend refused one. Nothing after that was attempted.",
            report.applied.len(),
            report.requested
        ))
    } else {
        success_alert("Done!", format!("Allocated {} student(s)", report.applied.len()))
    };

    // selections and filters start over whatever happened
    Ok(html! {
        (allocation_form(&classes.results, debounce))
        div id="alerts" hx-swap-oob="true" { (dialog) }
        (toasts(&toasts_for(report.outcomes(), stagger)))
    })
}
