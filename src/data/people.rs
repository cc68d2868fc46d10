use crate::{
    batch::BatchAction,
    data::{Resource, or_dash},
};
use maud::{Markup, Render, html};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Student {
    pub id: i64,
    #[serde(default)]
    pub admission_number: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Applicant {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

const fn active_by_default() -> bool {
    true
}

/// Body for registering a student, already validated.
#[derive(Debug, Serialize)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub course: i64,
}

pub struct FullName<'a>(pub &'a str, pub &'a str);

impl Render for FullName<'_> {
    fn render_to(&self, buffer: &mut String) {
        let first = self.0.trim();
        let last = self.1.trim();

        // backend data is user-entered, never trust it to be HTML-safe
        html! { (first) @if !first.is_empty() && !last.is_empty() { " " } (last) }
            .render_to(buffer);
    }
}

impl Resource for Student {
    const SLUG: &'static str = "students";
    const ENDPOINT: &'static str = "/api/students/";
    const TITLE: &'static str = "Students";
    const COLUMNS: &'static [&'static str] =
        &["Adm. No.", "Name", "Email", "Phone", "Course", "Class"];
    const CSV_HEADER: &'static [&'static str] = &[
        "admission_number",
        "first_name",
        "last_name",
        "email",
        "phone",
        "course",
        "class",
    ];
    const BATCH_ACTIONS: &'static [BatchAction] = &[BatchAction::Promote];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<Markup> {
        vec![
            html! { (or_dash(self.admission_number.as_deref())) },
            html! { (FullName(&self.first_name, &self.last_name)) },
            html! { (or_dash(self.email.as_deref())) },
            html! { (or_dash(self.phone.as_deref())) },
            html! { (or_dash(self.course.as_deref())) },
            html! { (or_dash(self.class_name.as_deref())) },
        ]
    }

    fn csv_record(&self) -> Vec<String> {
        vec![
            self.admission_number.clone().unwrap_or_default(),
            self.first_name.clone(),
            self.last_name.clone(),
            self.email.clone().unwrap_or_default(),
            self.phone.clone().unwrap_or_default(),
            self.course.clone().unwrap_or_default(),
            self.class_name.clone().unwrap_or_default(),
        ]
    }
}

impl Resource for Applicant {
    const SLUG: &'static str = "applicants";
    const ENDPOINT: &'static str = "/api/applicants/";
    const TITLE: &'static str = "Applicants";
    const COLUMNS: &'static [&'static str] = &["Name", "Email", "Phone", "Course", "Status"];
    const CSV_HEADER: &'static [&'static str] = &[
        "first_name",
        "last_name",
        "email",
        "phone",
        "course",
        "status",
    ];
    const BATCH_ACTIONS: &'static [BatchAction] = &[BatchAction::Approve, BatchAction::Decline];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<Markup> {
        vec![
            html! { (FullName(&self.first_name, &self.last_name)) },
            html! { (or_dash(self.email.as_deref())) },
            html! { (or_dash(self.phone.as_deref())) },
            html! { (or_dash(self.course.as_deref())) },
            html! {
                span class="rounded px-2 py-1 bg-slate-700 text-sm" { (or_dash(self.status.as_deref())) }
            },
        ]
    }

    fn csv_record(&self) -> Vec<String> {
        vec![
            self.first_name.clone(),
            self.last_name.clone(),
            self.email.clone().unwrap_or_default(),
            self.phone.clone().unwrap_or_default(),
            self.course.clone().unwrap_or_default(),
            self.status.clone().unwrap_or_default(),
        ]
    }
}

impl Resource for User {
    const SLUG: &'static str = "users";
    const ENDPOINT: &'static str = "/api/users/";
    const TITLE: &'static str = "Users";
    const COLUMNS: &'static [&'static str] = &["Username", "Name", "Email", "Active"];
    const CSV_HEADER: &'static [&'static str] =
        &["username", "first_name", "last_name", "email", "is_active"];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<Markup> {
        vec![
            html! { (self.username) },
            html! {
                (FullName(
                    self.first_name.as_deref().unwrap_or_default(),
                    self.last_name.as_deref().unwrap_or_default(),
                ))
            },
            html! { (or_dash(self.email.as_deref())) },
            html! { @if self.is_active { "✅" } @else { "❌" } },
        ]
    }

    fn csv_record(&self) -> Vec<String> {
        vec![
            self.username.clone(),
            self.first_name.clone().unwrap_or_default(),
            self.last_name.clone().unwrap_or_default(),
            self.email.clone().unwrap_or_default(),
            self.is_active.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_escaped_and_joined() {
        assert_eq!(
            FullName("Wanjiru", "<b>Kamau</b>").render().into_string(),
            "Wanjiru &lt;b&gt;Kamau&lt;/b&gt;"
        );
        assert_eq!(FullName("", "Otieno").render().into_string(), "Otieno");
    }

    #[test]
    fn sparse_students_still_deserialize() {
        let student: Student =
            serde_json::from_str(r#"{"id": 3, "first_name": "Achieng", "last_name": "Odhiambo"}"#)
                .unwrap();

        assert_eq!(student.csv_record()[1], "Achieng");
        assert_eq!(student.cells().len(), Student::COLUMNS.len());
    }
}
