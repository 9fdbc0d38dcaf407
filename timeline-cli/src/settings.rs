//! Layered settings: command-line flags over a JSON settings file over defaults.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use timeline_client::ClientConfig;
use timeline_core::{FailurePolicy, FetchStrategy, TimelineConfig};

/// Optional values read from `--config <file>`. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default)]
    fetch_strategy: Option<FetchStrategy>,
    #[serde(default)]
    failure_policy: Option<FailurePolicy>,
}

/// Values given on the command line or through the environment.
#[derive(Debug, Default)]
pub struct FlagOverrides {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub concurrent: bool,
    pub skip_failed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub client: ClientConfig,
    pub timeline: TimelineConfig,
}

impl From<FileSettings> for Settings {
    fn from(file: FileSettings) -> Self {
        let mut client = ClientConfig::default();
        if let Some(base_url) = file.base_url {
            client.base_url = base_url;
        }
        if let Some(timeout_secs) = file.timeout_secs {
            client.timeout_secs = timeout_secs;
        }

        let mut timeline = TimelineConfig::default();
        if let Some(strategy) = file.fetch_strategy {
            timeline.fetch_strategy = strategy;
        }
        if let Some(policy) = file.failure_policy {
            timeline.failure_policy = policy;
        }

        Self { client, timeline }
    }
}

impl Settings {
    pub fn resolve(file: Option<FileSettings>, flags: FlagOverrides) -> Self {
        let mut settings = Settings::from(file.unwrap_or_default());

        if let Some(base_url) = flags.base_url {
            settings.client.base_url = base_url;
        }
        if let Some(timeout_secs) = flags.timeout_secs {
            settings.client.timeout_secs = timeout_secs;
        }
        if flags.concurrent {
            settings.timeline.fetch_strategy = FetchStrategy::Concurrent;
        }
        if flags.skip_failed {
            settings.timeline.failure_policy = FailurePolicy::SkipFailedType;
        }

        settings
    }
}

pub fn load_file(path: &Path) -> anyhow::Result<FileSettings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read settings file {path:?}"))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid settings file {path:?}"))
}
