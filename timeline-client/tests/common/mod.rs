#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use timeline_client::ResourceFetcher;
use timeline_core::TimelineError;

pub fn fixture(name: &str) -> Value {
    let path = format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"));
    let text = fs::read_to_string(&path).expect("fixture should be readable");
    serde_json::from_str(&text).expect("fixture should be valid JSON")
}

pub fn empty_bundle() -> Value {
    json!({ "resourceType": "Bundle", "type": "searchset", "total": 0 })
}

#[derive(Clone)]
pub enum MockResponse {
    Json(Value),
    Status(u16, &'static str),
    Delayed(Duration, Value),
    Hang,
}

/// In-memory fetcher keyed by the path prefix before `?`.
///
/// Unknown search paths answer with an empty Bundle, unknown patients with 404.
#[derive(Default)]
pub struct MockFetcher {
    responses: HashMap<String, MockResponse>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, response: MockResponse) -> Self {
        self.responses.insert(path.to_string(), response);
        self
    }

    pub fn with_json(self, path: &str, body: Value) -> Self {
        self.with(path, MockResponse::Json(body))
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested(&self, prefix: &str) -> bool {
        self.requests()
            .iter()
            .any(|path| path.starts_with(prefix))
    }
}

#[async_trait]
impl ResourceFetcher for MockFetcher {
    async fn fetch(&self, relative_path: &str) -> Result<Value, TimelineError> {
        self.requests.lock().unwrap().push(relative_path.to_string());

        let key = relative_path.split('?').next().unwrap_or_default();
        let response = match self.responses.get(key) {
            Some(response) => response.clone(),
            None if key.starts_with("Patient/") => MockResponse::Status(404, "Resource not found"),
            None => MockResponse::Json(empty_bundle()),
        };

        match response {
            MockResponse::Json(body) => Ok(body),
            MockResponse::Status(status, body) => Err(TimelineError::Upstream {
                status,
                reason: "Mock".to_string(),
                body: body.to_string(),
            }),
            MockResponse::Delayed(delay, body) => {
                tokio::time::sleep(delay).await;
                Ok(body)
            }
            MockResponse::Hang => std::future::pending().await,
        }
    }
}
