//! Core model for the patient timeline: summary, events, resource rules and errors.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of entries requested per resource page.
pub const PAGE_SIZE: u32 = 200;

/// Timestamp used when no date field of a resource could be resolved.
///
/// Sorting descending pushes these events to the tail of the timeline.
pub const UNKNOWN_OCCURRED_AT: DateTime<Utc> = DateTime::<Utc>::MIN_UTC;

/// Clinical resource types that contribute events to the timeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    Encounter,
    Condition,
    AllergyIntolerance,
    Immunization,
    Device,
    Observation,
    Procedure,
    DiagnosticReport,
    DocumentReference,
    MedicationRequest,
}

/// How the title of an event is derived from its resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleRule {
    /// `Encounter (<status>)`, or the bare type name without a status.
    EncounterStatus,
    /// Text of the coded concept stored under the named field.
    Concept(&'static str),
}

/// Per-type lookup entry: search parameter for date filtering and title rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRule {
    pub date_param: Option<&'static str>,
    pub title: TitleRule,
}

impl ResourceType {
    /// Fetch order. Ties in the sorted timeline keep this order.
    pub const ALL: [ResourceType; 10] = [
        ResourceType::Encounter,
        ResourceType::Condition,
        ResourceType::AllergyIntolerance,
        ResourceType::Immunization,
        ResourceType::Device,
        ResourceType::Observation,
        ResourceType::Procedure,
        ResourceType::DiagnosticReport,
        ResourceType::DocumentReference,
        ResourceType::MedicationRequest,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ResourceType::Encounter => "Encounter",
            ResourceType::Condition => "Condition",
            ResourceType::AllergyIntolerance => "AllergyIntolerance",
            ResourceType::Immunization => "Immunization",
            ResourceType::Device => "Device",
            ResourceType::Observation => "Observation",
            ResourceType::Procedure => "Procedure",
            ResourceType::DiagnosticReport => "DiagnosticReport",
            ResourceType::DocumentReference => "DocumentReference",
            ResourceType::MedicationRequest => "MedicationRequest",
        }
    }

    pub const fn rule(self) -> ResourceRule {
        use TitleRule::{Concept, EncounterStatus};

        let (date_param, title) = match self {
            ResourceType::Encounter => (Some("date"), EncounterStatus),
            ResourceType::Condition => (Some("recorded-date"), Concept("code")),
            ResourceType::AllergyIntolerance => (None, Concept("code")),
            ResourceType::Immunization => (Some("date"), Concept("vaccineCode")),
            ResourceType::Device => (None, Concept("type")),
            ResourceType::Observation => (Some("date"), Concept("code")),
            ResourceType::Procedure => (Some("date"), Concept("code")),
            ResourceType::DiagnosticReport => (Some("date"), Concept("code")),
            ResourceType::DocumentReference => (None, Concept("type")),
            ResourceType::MedicationRequest => (None, Concept("medicationCodeableConcept")),
        };

        ResourceRule { date_param, title }
    }

    /// Search parameter used for date range filtering, if the type supports one.
    pub const fn date_search_param(self) -> Option<&'static str> {
        self.rule().date_param
    }

    pub const fn title_rule(self) -> TitleRule {
        self.rule().title
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = TimelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == value)
            .ok_or_else(|| TimelineError::InvalidInput(format!("Unknown resource type {value}")))
    }
}

/// Inclusive calendar range applied to resource queries.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, TimelineError> {
        if let (Some(start), Some(end)) = (from, to) {
            if start > end {
                return Err(TimelineError::InvalidInput(format!(
                    "Range start {start} is after range end {end}"
                )));
            }
        }
        Ok(Self { from, to })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }
}

/// Order in which resource pages are requested.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    #[default]
    Sequential,
    Concurrent,
}

/// What to do when a single resource page cannot be fetched.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Fail the whole timeline.
    #[default]
    Abort,
    /// Log the failure and treat the type as having no events.
    SkipFailedType,
}

/// Aggregation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimelineConfig {
    #[serde(default)]
    pub fetch_strategy: FetchStrategy,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

/// Demographics of the patient plus statistics derived from the timeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub patient_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_encounter_date: Option<DateTime<Utc>>,
}

/// One normalized clinical occurrence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub resource_type: ResourceType,
    pub id: String,
    pub occurred_at: DateTime<Utc>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practitioner_display: Option<String>,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl TimelineEvent {
    /// `false` when the event carries the unknown-date sentinel.
    pub fn has_known_date(&self) -> bool {
        self.occurred_at != UNKNOWN_OCCURRED_AT
    }

    pub fn is_encounter(&self) -> bool {
        self.resource_type == ResourceType::Encounter
    }
}

/// Summary and ordered events for one patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientTimelineResult {
    pub summary: PatientSummary,
    pub events: Vec<TimelineEvent>,
}

impl PatientTimelineResult {
    /// Sorts events newest first and fills the encounter statistics of `demographics`.
    ///
    /// The sort is stable, so events sharing a timestamp keep the order they were given in.
    pub fn assemble(demographics: PatientSummary, mut events: Vec<TimelineEvent>) -> Self {
        events.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));

        let encounter_count = events.iter().filter(|event| event.is_encounter()).count();
        let latest_encounter_date = events
            .iter()
            .find(|event| event.is_encounter())
            .map(|event| event.occurred_at);

        Self {
            summary: PatientSummary {
                encounter_count: Some(encounter_count),
                latest_encounter_date,
                ..demographics
            },
            events,
        }
    }

    pub fn summary(&self) -> &PatientSummary {
        &self.summary
    }

    /// Events sorted by time, newest first.
    pub fn timeline(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn events_of(&self, resource_type: ResourceType) -> impl Iterator<Item = &TimelineEvent> {
        self.events
            .iter()
            .filter(move |event| event.resource_type == resource_type)
    }
}

/// Errors raised while building a timeline.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("FHIR API error: {status} {reason}. {body}")]
    Upstream {
        status: u16,
        reason: String,
        body: String,
    },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Could not read response: {0}")]
    Parse(String),
    #[error("Request cancelled")]
    Cancelled,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TimelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TimelineError::Cancelled)
    }

    /// HTTP status of an upstream failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            TimelineError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}
