use crate::{
    auth::{AuthUtilities, JiEduSession},
    data::{academics::Unit, or_dash},
    error::JiEduResult,
    maud_conveniences::{subtitle, title},
    state::JiEduState,
};
use axum::extract::{Path, State};
use maud::{Markup, html};

pub async fn get_unit(
    State(state): State<JiEduState>,
    session: JiEduSession,
    Path(id): Path<i64>,
) -> JiEduResult<Markup> {
    let user = session.signed_in()?;
    let unit: Unit = state
        .api()
        .authorised(user.token())
        .get(&format!("/api/units/{id}/"))
        .await?;

    Ok(state.render(&session, render_unit(&unit)))
}

fn render_unit(unit: &Unit) -> Markup {
    html! {
        div class="bg-gray-800 p-8 rounded shadow-md max-w-4xl w-full" {
            a href="/units" class="text-blue-400 hover:underline" {"← All units"}
            (title(format!("{} {}", unit.code, unit.name)))
            p class="text-gray-400 mb-4" {"Course: " (or_dash(unit.course.as_deref()))}
            (subtitle("Topics"))
            @if unit.topics.is_empty() {
                p class="italic text-gray-400" {"No topics yet"}
            } @else {
                ol class="list-decimal list-inside space-y-2" {
                    @for topic in &unit.topics {
                        li {
                            span class="font-semibold" {(topic.title)}
                            @if let Some(description) = topic.description.as_deref().filter(|d| !d.trim().is_empty()) {
                                p class="ml-6 text-gray-300" {(description)}
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_are_listed_in_order() {
        let unit: Unit = serde_json::from_value(serde_json::json!({
            "id": 12,
            "code": "ICT201",
            "name": "Computer Networks",
            "topics": [
                {"title": "OSI model", "description": "Seven layers"},
                {"title": "Subnetting", "description": ""}
            ]
        }))
        .unwrap();

        let markup = render_unit(&unit).into_string();

        let osi = markup.find("OSI model").unwrap();
        let subnetting = markup.find("Subnetting").unwrap();
        assert!(osi < subnetting);
        assert!(markup.contains("Seven layers"));
        assert!(markup.contains("Course: -"));
    }
}
