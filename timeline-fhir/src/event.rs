//! Normalizes one clinical resource into a `TimelineEvent`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use timeline_core::{ResourceType, TimelineEvent, TitleRule, UNKNOWN_OCCURRED_AT};
use uuid::Uuid;

use crate::{
    extract_codeable_text, non_blank, parse_datetime, reference_display, reference_id,
    string_field,
};

/// Candidate date fields in priority order. `period` is read through its `start`.
pub const DATE_FIELDS: [&str; 9] = [
    "effectiveDateTime",
    "issued",
    "recordedDate",
    "occurrenceDateTime",
    "performedDateTime",
    "authoredOn",
    "created",
    "date",
    "period",
];

/// Builds the timeline event for `resource`, a raw resource of `resource_type`.
///
/// Never fails: unresolvable fields are left empty, a missing id is replaced by
/// a random one and a missing date by [`UNKNOWN_OCCURRED_AT`].
pub fn extract_event(resource_type: ResourceType, resource: &Value) -> TimelineEvent {
    let encounter_id = resource.get("encounter").and_then(reference_id);

    TimelineEvent {
        resource_type,
        id: resource_id(resource),
        occurred_at: extract_occurred_at(resource).unwrap_or(UNKNOWN_OCCURRED_AT),
        title: extract_title(resource_type, resource),
        organization_display: resource.get("serviceProvider").and_then(reference_display),
        practitioner_display: extract_practitioner(resource),
        details: common_details(resource, encounter_id.as_deref()),
        encounter_id,
    }
}

/// First parseable date among [`DATE_FIELDS`].
pub fn extract_occurred_at(resource: &Value) -> Option<DateTime<Utc>> {
    DATE_FIELDS.iter().find_map(|field| {
        let value = resource.get(*field)?;
        let text = if *field == "period" {
            string_field(value, "start")?
        } else {
            value.as_str()?
        };
        parse_datetime(text)
    })
}

fn resource_id(resource: &Value) -> String {
    string_field(resource, "id")
        .and_then(non_blank)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
}

fn extract_title(resource_type: ResourceType, resource: &Value) -> String {
    let title = match resource_type.title_rule() {
        TitleRule::EncounterStatus => string_field(resource, "status")
            .and_then(non_blank)
            .map(|status| format!("Encounter ({status})")),
        TitleRule::Concept(field) => resource.get(field).and_then(extract_codeable_text),
    };

    title.unwrap_or_else(|| resource_type.to_string())
}

fn extract_practitioner(resource: &Value) -> Option<String> {
    let participant = first_entry(resource, "participant")
        .and_then(|participant| participant.get("individual"))
        .and_then(reference_display);
    if participant.is_some() {
        return participant;
    }

    let performer = first_entry(resource, "performer")?;
    performer
        .get("actor")
        .and_then(reference_display)
        .or_else(|| performer.get("reference").and_then(reference_display))
}

fn first_entry<'a>(resource: &'a Value, field: &str) -> Option<&'a Value> {
    resource
        .get(field)
        .and_then(Value::as_array)
        .and_then(|entries| entries.first())
        .filter(|entry| entry.is_object())
}

fn common_details(resource: &Value, encounter_id: Option<&str>) -> BTreeMap<String, String> {
    let mut details = BTreeMap::new();

    if let Some(status) = string_field(resource, "status").and_then(non_blank) {
        details.insert("status".to_string(), status.to_string());
    }
    if let Some(encounter_id) = encounter_id {
        details.insert("encounterId".to_string(), encounter_id.to_string());
    }

    details
}
