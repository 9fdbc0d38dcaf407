use serde_json::Value;
use timeline_core::PatientSummary;

use crate::{non_blank, parse_date, string_field};

/// Demographic part of the summary. Encounter statistics are left empty.
pub fn summarize_patient(patient: &Value, patient_id: &str) -> PatientSummary {
    PatientSummary {
        patient_id: patient_id.to_string(),
        name: extract_patient_name(patient),
        gender: string_field(patient, "gender").map(str::to_string),
        birth_date: string_field(patient, "birthDate").and_then(parse_date),
        encounter_count: None,
        latest_encounter_date: None,
    }
}

/// Given names followed by the family name of the first `name` entry.
fn extract_patient_name(patient: &Value) -> Option<String> {
    let name = patient.get("name")?.as_array()?.first()?;

    let mut parts: Vec<&str> = name
        .get("given")
        .and_then(Value::as_array)
        .map(|given| given.iter().filter_map(Value::as_str).filter_map(non_blank).collect())
        .unwrap_or_default();

    if let Some(family) = string_field(name, "family").and_then(non_blank) {
        parts.push(family);
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}
