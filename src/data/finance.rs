use crate::data::{
    Resource, date_or_timestamp, format_date, optional_date_or_timestamp, or_dash,
};
use jiff::civil::Date;
use maud::{Markup, Render, html};
use serde::{Deserialize, Deserializer, de::Error as _};
use std::fmt::{Display, Formatter};

/// An amount of shillings, held as cents. The backend sends decimals as
/// strings (`"1250.50"`) but the odd endpoint sends plain numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Money {
    cents: i64,
}

impl Money {
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().replace(',', "");
        let (negative, digits) = raw
            .strip_prefix('-')
            .map_or((false, raw.as_str()), |rest| (true, rest));
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

        if whole.is_empty() && fraction.is_empty() {
            return None;
        }
        if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }

        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let mut fraction: String = fraction.chars().take(2).collect();
        while fraction.len() < 2 {
            fraction.push('0');
        }
        let cents = whole.checked_mul(100)?.checked_add(fraction.parse::<i64>().ok()?)?;

        Some(Self {
            cents: if negative { -cents } else { cents },
        })
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Whole(i64),
            Number(f64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self::parse(&text)
                .ok_or_else(|| D::Error::custom(format!("invalid amount {text:?}"))),
            Raw::Whole(whole) => Ok(Self::from_cents(whole.saturating_mul(100))),
            #[allow(clippy::cast_possible_truncation)]
            Raw::Number(number) => Ok(Self::from_cents((number * 100.0).round() as i64)),
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        let whole = (abs / 100).to_string();

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, c) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }

        write!(f, "{sign}KES {grouped}.{:02}", abs % 100)
    }
}

impl Render for Money {
    fn render_to(&self, buffer: &mut String) {
        buffer.push_str(&self.to_string());
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Votehead {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub student: String,
    pub votehead: String,
    pub amount: Money,
    #[serde(default, deserialize_with = "optional_date_or_timestamp")]
    pub due_date: Option<Date>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Receipt {
    pub id: i64,
    pub student: String,
    pub amount: Money,
    #[serde(deserialize_with = "date_or_timestamp")]
    pub paid_on: Date,
    #[serde(default)]
    pub reference: Option<String>,
}

impl Resource for Votehead {
    const SLUG: &'static str = "voteheads";
    const ENDPOINT: &'static str = "/api/voteheads/";
    const TITLE: &'static str = "Voteheads";
    const COLUMNS: &'static [&'static str] = &["Name", "Description"];
    const CSV_HEADER: &'static [&'static str] = &["name", "description"];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<Markup> {
        vec![
            html! { (self.name) },
            html! { (or_dash(self.description.as_deref())) },
        ]
    }

    fn csv_record(&self) -> Vec<String> {
        vec![self.name.clone(), self.description.clone().unwrap_or_default()]
    }
}

impl Resource for Invoice {
    const SLUG: &'static str = "invoices";
    const ENDPOINT: &'static str = "/api/invoices/";
    const TITLE: &'static str = "Invoices";
    const COLUMNS: &'static [&'static str] = &["Student", "Votehead", "Amount", "Due"];
    const CSV_HEADER: &'static [&'static str] = &["student", "votehead", "amount", "due_date"];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<Markup> {
        vec![
            html! { (self.student) },
            html! { (self.votehead) },
            html! { (self.amount) },
            html! { (self.due_date.map_or_else(|| "-".to_string(), format_date)) },
        ]
    }

    fn csv_record(&self) -> Vec<String> {
        vec![
            self.student.clone(),
            self.votehead.clone(),
            self.amount.to_string(),
            self.due_date.map(|d| d.to_string()).unwrap_or_default(),
        ]
    }
}

impl Resource for Receipt {
    const SLUG: &'static str = "receipts";
    const ENDPOINT: &'static str = "/api/receipts/";
    const TITLE: &'static str = "Receipts";
    const COLUMNS: &'static [&'static str] = &["Student", "Amount", "Paid On", "Reference"];
    const CSV_HEADER: &'static [&'static str] = &["student", "amount", "paid_on", "reference"];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<Markup> {
        vec![
            html! { (self.student) },
            html! { (self.amount) },
            html! { (format_date(self.paid_on)) },
            html! { (or_dash(self.reference.as_deref())) },
        ]
    }

    fn csv_record(&self) -> Vec<String> {
        vec![
            self.student.clone(),
            self.amount.to_string(),
            self.paid_on.to_string(),
            self.reference.clone().unwrap_or_default(),
        ]
    }
}
