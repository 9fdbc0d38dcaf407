use serde::{Deserialize, Serialize};
use timeline_core::TimelineError;

pub const DEFAULT_BASE_URL: &str = "https://server.fire.ly/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for [`crate::HttpFetcher`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Root of the FHIR API. Relative resource paths are joined onto it.
    pub base_url: String,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), TimelineError> {
        if self.base_url.trim().is_empty() {
            return Err(TimelineError::InvalidInput("Base URL is empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(TimelineError::InvalidInput(
                "Timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}
