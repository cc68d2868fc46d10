use crate::batch::BatchAction;
use jiff::{
    Timestamp,
    civil::{Date, DateTime},
    tz::TimeZone,
};
use maud::Markup;
use serde::{
    Deserialize, Deserializer,
    de::{DeserializeOwned, Error as _},
};

pub mod academics;
pub mod finance;
pub mod pagination;
pub mod people;
pub mod permissions;

/// Something with a searchable, paginated list endpoint on the backend.
pub trait Resource: DeserializeOwned + Send + Sync + 'static {
    /// Path segment used for our own routes, e.g. `/students`.
    const SLUG: &'static str;
    const ENDPOINT: &'static str;
    const TITLE: &'static str;
    const COLUMNS: &'static [&'static str];
    const CSV_HEADER: &'static [&'static str];
    /// Actions offered on a selection of rows, if any.
    const BATCH_ACTIONS: &'static [BatchAction] = &[];

    fn id(&self) -> i64;
    fn cells(&self) -> Vec<Markup>;
    fn csv_record(&self) -> Vec<String>;
}

pub fn format_date(date: Date) -> String {
    date.strftime("%a %d/%m/%y").to_string()
}

/// Reads a calendar date from either a plain date or a full timestamp. A
/// timestamp's own offset decides the day; `Z` means UTC.
pub fn parse_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    raw.parse::<Date>()
        .ok()
        .or_else(|| raw.parse::<DateTime>().ok().map(|dt| dt.date()))
        .or_else(|| {
            raw.parse::<Timestamp>()
                .ok()
                .map(|ts| ts.to_zoned(TimeZone::UTC).date())
        })
}

pub fn date_or_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| D::Error::custom(format!("invalid date {raw:?}")))
}

pub fn optional_date_or_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Date>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_date(&raw)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid date {raw:?}"))),
    }
}

pub fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_render_short() {
        assert_eq!(format_date(jiff::civil::date(2024, 2, 5)), "Mon 05/02/24");
    }

    #[test]
    fn dates_read_from_dates_or_timestamps() {
        let day = jiff::civil::date(2024, 2, 5);

        assert_eq!(parse_date("2024-02-05"), Some(day));
        assert_eq!(parse_date("2024-02-05T10:00:00Z"), Some(day));
        assert_eq!(parse_date("2024-02-05T23:30:00+03:00"), Some(day));
        assert_eq!(parse_date("2024-02-05T10:00:00.123456"), Some(day));
        assert_eq!(parse_date("last tuesday"), None);
    }

    #[test]
    fn blank_values_render_as_dash() {
        assert_eq!(or_dash(None), "-");
        assert_eq!(or_dash(Some("  ")), "-");
        assert_eq!(or_dash(Some("CS-2")), "CS-2");
    }
}
