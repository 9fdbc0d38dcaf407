use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Url;
use serde_json::Value;
use timeline_core::TimelineError;

use crate::ClientConfig;

const FHIR_JSON: &str = "application/fhir+json";

/// Source of FHIR documents addressed by paths relative to the API root.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetches and parses one document, e.g. `Patient/123` or `Condition?patient=123`.
    ///
    /// # Errors
    ///
    /// * `TimelineError::Upstream` - the server answered with a non-success status
    /// * `TimelineError::Transport` - the request could not be completed
    /// * `TimelineError::Parse` - the body is not JSON
    async fn fetch(&self, relative_path: &str) -> Result<Value, TimelineError>;
}

#[async_trait]
impl<T: ResourceFetcher + ?Sized> ResourceFetcher for Arc<T> {
    async fn fetch(&self, relative_path: &str) -> Result<Value, TimelineError> {
        (**self).fetch(relative_path).await
    }
}

/// `ResourceFetcher` backed by a reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    base_url: Url,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(config: &ClientConfig) -> Result<Self, TimelineError> {
        config.validate()?;

        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|err| {
            TimelineError::InvalidInput(format!("Invalid base URL {base}: {err}"))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| TimelineError::Transport(err.to_string()))?;

        Ok(Self {
            base_url,
            client,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, relative_path: &str) -> Result<Url, TimelineError> {
        self.base_url
            .join(relative_path.trim_start_matches('/'))
            .map_err(|err| {
                TimelineError::InvalidInput(format!("Invalid path {relative_path}: {err}"))
            })
    }

    fn transport_error(&self, err: reqwest::Error) -> TimelineError {
        if err.is_timeout() {
            TimelineError::Transport(format!("Request timed out after {}s", self.timeout_secs))
        } else if err.is_connect() {
            TimelineError::Transport(format!("Cannot connect to {}: {err}", self.base_url))
        } else {
            TimelineError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, relative_path: &str) -> Result<Value, TimelineError> {
        let url = self.url_for(relative_path)?;

        let response = self
            .client
            .get(url)
            .header(ACCEPT, FHIR_JSON)
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TimelineError::Upstream {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| self.transport_error(err))?;

        serde_json::from_slice(&bytes).map_err(|err| TimelineError::Parse(err.to_string()))
    }
}
