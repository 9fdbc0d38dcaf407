use serde_json::Value;
use timeline_core::{ResourceType, TimelineEvent};

use crate::extract_event;

/// Resources of a search Bundle, in entry order.
///
/// A missing or non-array `entry` yields nothing; entries without a
/// `resource` object are skipped.
pub fn parse_bundle(bundle: &Value) -> Vec<&Value> {
    let Some(entries) = bundle.get("entry").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| entry.get("resource"))
        .filter(|resource| resource.is_object())
        .collect()
}

/// Extracts one event per resource of a search Bundle for `resource_type`.
pub fn bundle_events(resource_type: ResourceType, bundle: &Value) -> Vec<TimelineEvent> {
    parse_bundle(bundle)
        .into_iter()
        .map(|resource| extract_event(resource_type, resource))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_or_malformed_entry_yields_nothing() {
        assert!(parse_bundle(&json!({ "resourceType": "Bundle", "total": 0 })).is_empty());
        assert!(parse_bundle(&json!({ "entry": { "resource": {} } })).is_empty());
        assert!(parse_bundle(&json!([])).is_empty());
    }

    #[test]
    fn entries_without_resource_are_skipped_in_order() {
        let bundle = json!({
            "entry": [
                { "resource": { "id": "a" } },
                { "fullUrl": "urn:uuid:1" },
                { "resource": "text" },
                { "resource": { "id": "b" } }
            ]
        });

        let ids: Vec<_> = parse_bundle(&bundle)
            .into_iter()
            .filter_map(|resource| resource.get("id").and_then(Value::as_str))
            .collect();

        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn bundle_events_tags_each_event_with_the_queried_type() {
        let bundle = json!({
            "entry": [
                { "resource": { "id": "d1", "type": { "text": "Pacemaker" } } },
                { "resource": { "id": "d2" } }
            ]
        });

        let events = bundle_events(ResourceType::Device, &bundle);

        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|event| event.resource_type == ResourceType::Device));
        assert_eq!(events[0].title, "Pacemaker");
        assert_eq!(events[1].title, "Device");
    }
}
