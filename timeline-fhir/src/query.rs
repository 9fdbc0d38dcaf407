//! Search URLs for the patient record and each timeline resource type.

use timeline_core::{DateRange, ResourceType, PAGE_SIZE};
use url::form_urlencoded::byte_serialize;

/// Relative path of the patient record, e.g. `Patient/123`.
pub fn patient_path(patient_id: &str) -> String {
    format!("Patient/{}", escape_component(patient_id))
}

/// Relative search URL for one resource type scoped to the patient.
///
/// Range bounds are dropped for types without a date search parameter.
pub fn build_query(resource_type: ResourceType, patient_id: &str, range: &DateRange) -> String {
    let mut params = vec![
        format!("patient={}", escape_component(patient_id)),
        format!("_count={PAGE_SIZE}"),
    ];

    if let Some(field) = resource_type.date_search_param() {
        if let Some(from) = range.from {
            params.push(format!("{field}=ge{}", from.format("%Y-%m-%d")));
        }
        if let Some(to) = range.to {
            params.push(format!("{field}=le{}", to.format("%Y-%m-%d")));
        }
    }

    format!("{resource_type}?{}", params.join("&"))
}

/// Percent-encodes a value for use in a path segment or query parameter.
fn escape_component(value: &str) -> String {
    // form encoding emits `+` only for spaces; a literal plus becomes %2B
    byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
