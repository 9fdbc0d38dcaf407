//! Fetches a patient's resources from a FHIR server and assembles the timeline.

mod aggregator;
mod cancel;
mod config;
mod fetcher;

pub use aggregator::TimelineAggregator;
pub use cancel::CancelSignal;
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
pub use fetcher::{HttpFetcher, ResourceFetcher};
