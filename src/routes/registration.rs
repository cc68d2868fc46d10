use crate::{
    auth::{AuthUtilities, JiEduSession},
    data::{
        Resource,
        academics::Course,
        people::Student,
        pagination::{ListQuery, Paginated},
    },
    error::JiEduResult,
    maud_conveniences::{
        form_element, form_submit_button, simple_form_element, success_alert, title,
    },
    routes::sse::SseEvent,
    state::JiEduState,
    validation::NewStudentForm,
};
use axum::{Form, extract::State};
use maud::{Markup, html};

fn registration_form(courses: &[Course]) -> Markup {
    html! {
        form id="registration" hx-post="/internal/students/new" hx-target="#registration" hx-swap="outerHTML" {
            (simple_form_element("first_name", "First Name", true, None, None))
            (simple_form_element("last_name", "Last Name", true, None, None))
            (simple_form_element("email", "Email", true, Some("email"), None))
            (simple_form_element("phone", "Phone", true, Some("tel"), None))
            (form_element("course", "Course", html! {
                select id="course" name="course" required class="shadow appearance-none border rounded w-full py-2 px-3 leading-tight focus:outline-none bg-gray-700 border-gray-600" {
                    @for course in courses {
                        option value=(course.id) {(course.code) " - " (course.name)}
                    }
                }
            }))
            (form_submit_button(Some("Register")))
        }
    }
}

async fn courses(state: &JiEduState, session: &JiEduSession) -> JiEduResult<Vec<Course>> {
    let user = session.signed_in()?;
    let page: Paginated<Course> = state
        .api()
        .authorised(user.token())
        .list(Course::ENDPOINT, &ListQuery::default())
        .await?;
    Ok(page.results)
}

pub async fn get_new_student(
    State(state): State<JiEduState>,
    session: JiEduSession,
) -> JiEduResult<Markup> {
    let courses = courses(&state, &session).await?;

    Ok(state.render(&session, html! {
        div class="bg-gray-800 p-8 rounded shadow-md max-w-lg w-full" {
            (title("Register Student"))
            (registration_form(&courses))
        }
    }))
}

pub async fn internal_post_new_student(
    State(state): State<JiEduState>,
    session: JiEduSession,
    Form(form): Form<NewStudentForm>,
) -> JiEduResult<Markup> {
    let user = session.signed_in()?;
    let student = form.validate()?;

    let _: serde_json::Value = state
        .api()
        .authorised(user.token())
        .post(Student::ENDPOINT, &student)
        .await?;
    info!(first_name = %student.first_name, last_name = %student.last_name, "Student registered");
    state.send_sse_event(SseEvent::Students);

    let courses = courses(&state, &session).await?;
    Ok(html! {
        (registration_form(&courses))
        div id="alerts" hx-swap-oob="true" {
            (success_alert("Registered!", format!("{} {} has been registered", student.first_name, student.last_name)))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_options_show_code_and_name() {
        let courses: Vec<Course> = serde_json::from_value(serde_json::json!([
            {"id": 4, "code": "DICT", "name": "Diploma in ICT"}
        ]))
        .unwrap();

        let markup = registration_form(&courses).into_string();

        assert!(markup.contains(r#"<option value="4">DICT - Diploma in ICT</option>"#));
        assert!(markup.contains(r#"hx-post="/internal/students/new""#));
    }
}
