//! FHIR JSON to timeline converters: search queries, bundle unwrapping,
//! event extraction and patient demographics.
//!
//! Everything here is pure. Missing or wrong-typed fields resolve to "no value"
//! instead of failing, so a partially populated resource still yields an event.

mod bundle;
mod event;
mod patient;
mod query;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

pub use bundle::{bundle_events, parse_bundle};
pub use event::{extract_event, extract_occurred_at, DATE_FIELDS};
pub use patient::summarize_patient;
pub use query::{build_query, patient_path};

/// String value of `field`, if present and string-typed.
fn string_field<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field).and_then(Value::as_str)
}

fn non_blank(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Label of a CodeableConcept: `text`, else the first `coding[].display`.
fn extract_codeable_text(value: &Value) -> Option<String> {
    if let Some(text) = string_field(value, "text").and_then(non_blank) {
        return Some(text.to_string());
    }

    value
        .get("coding")
        .and_then(Value::as_array)?
        .iter()
        .filter_map(|coding| string_field(coding, "display"))
        .find_map(non_blank)
        .map(str::to_string)
}

/// `display` of a Reference object.
fn reference_display(value: &Value) -> Option<String> {
    if !value.is_object() {
        return None;
    }
    string_field(value, "display")
        .and_then(non_blank)
        .map(str::to_string)
}

/// Trailing id segment of a Reference such as `Encounter/123`.
fn reference_id(value: &Value) -> Option<String> {
    let reference = string_field(value, "reference").and_then(non_blank)?;
    reference
        .rsplit('/')
        .next()
        .and_then(non_blank)
        .map(str::to_string)
}

/// Parses FHIR `instant`, `dateTime` and `date` values into UTC.
///
/// Values without an offset are read as UTC; partial dates (`YYYY`, `YYYY-MM`)
/// resolve to the first day of the period.
fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    let date = match value.len() {
        4 => parse_date(&format!("{value}-01-01")),
        7 => parse_date(&format!("{value}-01")),
        _ => parse_date(value),
    }?;

    date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
