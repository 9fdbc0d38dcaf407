//! Orchestrates the patient fetch and the per-type searches into one result.

use futures::future::try_join_all;
use futures::{stream, StreamExt, TryStreamExt};
use serde_json::Value;
use timeline_core::{
    DateRange, FailurePolicy, FetchStrategy, PatientTimelineResult, ResourceType,
    TimelineConfig, TimelineError, TimelineEvent,
};
use timeline_fhir::{build_query, bundle_events, patient_path, summarize_patient};
use tracing::{debug, info, instrument, warn};

use crate::{CancelSignal, ResourceFetcher};

/// Builds patient timelines on top of a [`ResourceFetcher`].
///
/// Holds no per-request state, so one aggregator can serve concurrent calls.
pub struct TimelineAggregator<F> {
    fetcher: F,
    config: TimelineConfig,
}

impl<F: ResourceFetcher> TimelineAggregator<F> {
    pub fn new(fetcher: F, config: TimelineConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Fetches the patient and every timeline resource type, then merges them.
    ///
    /// Fails if the patient record cannot be read, if the request is cancelled,
    /// or, under [`FailurePolicy::Abort`], if any resource page fails.
    #[instrument(skip(self, range, cancel))]
    pub async fn get_timeline(
        &self,
        patient_id: &str,
        range: &DateRange,
        cancel: &CancelSignal,
    ) -> Result<PatientTimelineResult, TimelineError> {
        if patient_id.trim().is_empty() {
            return Err(TimelineError::InvalidInput("Patient id is empty".to_string()));
        }

        let patient = self.fetch(&patient_path(patient_id), cancel).await?;
        check_patient_record(&patient)?;
        let demographics = summarize_patient(&patient, patient_id);

        debug!(strategy = ?self.config.fetch_strategy, "searching resource types");
        let pages = match self.config.fetch_strategy {
            FetchStrategy::Sequential => self.fetch_sequential(patient_id, range, cancel).await?,
            FetchStrategy::Concurrent => self.fetch_concurrent(patient_id, range, cancel).await?,
        };

        // pages follow ResourceType::ALL, which fixes the tie order after sorting
        let events: Vec<TimelineEvent> = pages.into_iter().flatten().collect();

        let result = PatientTimelineResult::assemble(demographics, events);
        info!(
            events = result.events.len(),
            encounters = result.summary.encounter_count.unwrap_or_default(),
            "timeline assembled"
        );
        Ok(result)
    }

    async fn fetch_sequential(
        &self,
        patient_id: &str,
        range: &DateRange,
        cancel: &CancelSignal,
    ) -> Result<Vec<Vec<TimelineEvent>>, TimelineError> {
        stream::iter(ResourceType::ALL)
            .then(move |resource_type| self.fetch_events(resource_type, patient_id, range, cancel))
            .try_collect()
            .await
    }

    /// Issues all searches at once. The first error drops the remaining futures.
    async fn fetch_concurrent(
        &self,
        patient_id: &str,
        range: &DateRange,
        cancel: &CancelSignal,
    ) -> Result<Vec<Vec<TimelineEvent>>, TimelineError> {
        let searches = ResourceType::ALL
            .map(move |resource_type| self.fetch_events(resource_type, patient_id, range, cancel));
        try_join_all(searches).await
    }

    async fn fetch_events(
        &self,
        resource_type: ResourceType,
        patient_id: &str,
        range: &DateRange,
        cancel: &CancelSignal,
    ) -> Result<Vec<TimelineEvent>, TimelineError> {
        let query = build_query(resource_type, patient_id, range);

        match self.fetch(&query, cancel).await {
            Ok(bundle) => {
                let events = bundle_events(resource_type, &bundle);
                debug!(%resource_type, count = events.len(), "resource page parsed");
                Ok(events)
            }
            Err(err)
                if !err.is_cancelled()
                    && self.config.failure_policy == FailurePolicy::SkipFailedType =>
            {
                warn!(%resource_type, error = %err, "skipping resource type");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    /// One round-trip, abandoned as soon as `cancel` fires.
    async fn fetch(
        &self,
        relative_path: &str,
        cancel: &CancelSignal,
    ) -> Result<Value, TimelineError> {
        if cancel.is_cancelled() {
            return Err(TimelineError::Cancelled);
        }

        debug!(path = relative_path, "fetching");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TimelineError::Cancelled),
            result = self.fetcher.fetch(relative_path) => result,
        }
    }
}

/// The patient document must be an object, and a Patient when it says what it is.
fn check_patient_record(patient: &Value) -> Result<(), TimelineError> {
    if !patient.is_object() {
        return Err(TimelineError::Parse(
            "Patient record is not a JSON object".to_string(),
        ));
    }

    match patient.get("resourceType").and_then(Value::as_str) {
        Some(resource_type) if resource_type != "Patient" => Err(TimelineError::Parse(format!(
            "Expected resourceType Patient, received {resource_type}"
        ))),
        _ => Ok(()),
    }
}
