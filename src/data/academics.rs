use crate::data::{Resource, or_dash};
use jiff::civil::Time;
use maud::{Markup, html};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SchoolClass {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub intake: Option<String>,
    #[serde(default)]
    pub student_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Course {
    pub id: i64,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Branch {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Topic {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Unit {
    pub id: i64,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

/// A timetable slot happening right now.
#[derive(Debug, Clone, Deserialize)]
pub struct Lesson {
    pub unit: String,
    pub class_name: String,
    #[serde(default)]
    pub lecturer: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
    pub start: Time,
    pub end: Time,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceSummary {
    pub class_name: String,
    pub present: u32,
    pub absent: u32,
}

impl AttendanceSummary {
    pub fn rate(&self) -> Option<u32> {
        let total = self.present + self.absent;
        (total > 0).then(|| (self.present * 100 + total / 2) / total)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassCount {
    pub course: String,
    pub classes: u32,
    pub students: u32,
}

impl Resource for SchoolClass {
    const SLUG: &'static str = "classes";
    const ENDPOINT: &'static str = "/api/classes/";
    const TITLE: &'static str = "Classes";
    const COLUMNS: &'static [&'static str] = &["Name", "Course", "Intake", "Students"];
    const CSV_HEADER: &'static [&'static str] = &["name", "course", "intake", "students"];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<Markup> {
        vec![
            html! { (self.name) },
            html! { (or_dash(self.course.as_deref())) },
            html! { (or_dash(self.intake.as_deref())) },
            html! { (self.student_count.unwrap_or_default()) },
        ]
    }

    fn csv_record(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.course.clone().unwrap_or_default(),
            self.intake.clone().unwrap_or_default(),
            self.student_count.unwrap_or_default().to_string(),
        ]
    }
}

impl Resource for Course {
    const SLUG: &'static str = "courses";
    const ENDPOINT: &'static str = "/api/courses/";
    const TITLE: &'static str = "Courses";
    const COLUMNS: &'static [&'static str] = &["Code", "Name", "Department"];
    const CSV_HEADER: &'static [&'static str] = &["code", "name", "department"];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<Markup> {
        vec![
            html! { (self.code) },
            html! { (self.name) },
            html! { (or_dash(self.department.as_deref())) },
        ]
    }

    fn csv_record(&self) -> Vec<String> {
        vec![
            self.code.clone(),
            self.name.clone(),
            self.department.clone().unwrap_or_default(),
        ]
    }
}

impl Resource for Branch {
    const SLUG: &'static str = "branches";
    const ENDPOINT: &'static str = "/api/branches/";
    const TITLE: &'static str = "Branches";
    const COLUMNS: &'static [&'static str] = &["Name", "Location"];
    const CSV_HEADER: &'static [&'static str] = &["name", "location"];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<Markup> {
        vec![
            html! { (self.name) },
            html! { (or_dash(self.location.as_deref())) },
        ]
    }

    fn csv_record(&self) -> Vec<String> {
        vec![self.name.clone(), self.location.clone().unwrap_or_default()]
    }
}

impl Resource for Unit {
    const SLUG: &'static str = "units";
    const ENDPOINT: &'static str = "/api/units/";
    const TITLE: &'static str = "Units";
    const COLUMNS: &'static [&'static str] = &["Code", "Name", "Course", "Topics"];
    const CSV_HEADER: &'static [&'static str] = &["code", "name", "course", "topics"];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<Markup> {
        vec![
            html! { (self.code) },
            html! {
                a href={"/units/" (self.id)} class="hover:text-blue-400 underline" { (self.name) }
            },
            html! { (or_dash(self.course.as_deref())) },
            html! { (self.topics.len()) },
        ]
    }

    fn csv_record(&self) -> Vec<String> {
        vec![
            self.code.clone(),
            self.name.clone(),
            self.course.clone().unwrap_or_default(),
            self.topics.len().to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attendance_rate_rounds_and_handles_empty_classes() {
        let summary = |present, absent| AttendanceSummary {
            class_name: "CS-1".into(),
            present,
            absent,
        };

        assert_eq!(summary(2, 1).rate(), Some(67));
        assert_eq!(summary(30, 0).rate(), Some(100));
        assert_eq!(summary(0, 0).rate(), None);
    }

    #[test]
    fn lessons_read_clock_times() {
        let lesson: Lesson = serde_json::from_str(
            r#"{"unit": "Networking", "class_name": "ICT-2", "start": "08:00:00", "end": "10:00:00"}"#,
        )
        .unwrap();

        assert_eq!(lesson.start, jiff::civil::time(8, 0, 0, 0));
        assert_eq!(lesson.end.hour(), 10);
    }
}
