mod settings;

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use settings::{FlagOverrides, Settings};
use timeline_client::{CancelSignal, HttpFetcher, TimelineAggregator};
use timeline_core::DateRange;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "timeline-cli",
    about = "Build a patient's clinical timeline from a FHIR server and print it as JSON."
)]
struct Args {
    /// Id of the Patient resource.
    patient_id: String,

    /// Earliest date to include (YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Latest date to include (YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Root of the FHIR API.
    #[arg(long, env = "FHIR_BASE_URL")]
    base_url: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, env = "FHIR_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// JSON settings file; flags take precedence over it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Issue all resource searches at once.
    #[arg(long)]
    concurrent: bool,

    /// Keep going when a resource type cannot be fetched.
    #[arg(long)]
    skip_failed: bool,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

impl Args {
    fn overrides(&self) -> FlagOverrides {
        FlagOverrides {
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout_secs,
            concurrent: self.concurrent,
            skip_failed: self.skip_failed,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let file = args
        .config
        .as_deref()
        .map(settings::load_file)
        .transpose()?;
    let settings = Settings::resolve(file, args.overrides());
    let range = DateRange::new(args.from, args.to)?;

    let fetcher = HttpFetcher::new(&settings.client)
        .with_context(|| format!("Could not set up client for {}", settings.client.base_url))?;
    let aggregator = TimelineAggregator::new(fetcher, settings.timeline);

    let cancel = CancelSignal::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            trigger.cancel();
        }
    });

    info!(patient_id = %args.patient_id, base_url = %settings.client.base_url, "building timeline");
    let result = aggregator
        .get_timeline(&args.patient_id, &range, &cancel)
        .await
        .with_context(|| format!("Could not build timeline for patient {}", args.patient_id))?;

    let output = if args.pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    }
    .context("Could not serialize timeline")?;

    println!("{output}");
    Ok(())
}
