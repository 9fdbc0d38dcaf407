mod common;

use std::sync::{Arc, Mutex};

use axum::extract::{Path, RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use common::{empty_bundle, fixture};
use timeline_client::{
    CancelSignal, ClientConfig, HttpFetcher, ResourceFetcher, TimelineAggregator,
};
use timeline_core::{DateRange, TimelineConfig, TimelineError};

#[derive(Clone, Default)]
struct ServerLog {
    requests: Arc<Mutex<Vec<String>>>,
    accept: Arc<Mutex<Vec<String>>>,
}

async fn patient(
    State(log): State<ServerLog>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    log.requests.lock().unwrap().push(format!("Patient/{id}"));
    if let Some(accept) = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) {
        log.accept.lock().unwrap().push(accept.to_string());
    }

    match id.as_str() {
        "pat-1" => Json(fixture("patient.json")).into_response(),
        "broken" => (StatusCode::OK, "<html>not json</html>").into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            r#"{"resourceType":"OperationOutcome","issue":[{"severity":"error","code":"not-found"}]}"#,
        )
            .into_response(),
    }
}

async fn search(
    State(log): State<ServerLog>,
    Path(resource_type): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    log.requests
        .lock()
        .unwrap()
        .push(format!("{resource_type}?{}", query.unwrap_or_default()));

    let body = match resource_type.as_str() {
        "Encounter" => fixture("encounters.json"),
        "Condition" => fixture("conditions.json"),
        "Observation" => fixture("observations.json"),
        _ => empty_bundle(),
    };
    Json(body).into_response()
}

async fn spawn_server() -> (String, ServerLog) {
    let log = ServerLog::default();
    let app = Router::new()
        .route("/fhir/Patient/:id", get(patient))
        .route("/fhir/:resource_type", get(search))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/fhir"), log)
}

fn http_fetcher(base_url: &str) -> HttpFetcher {
    HttpFetcher::new(&ClientConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
    })
    .expect("fetcher should build")
}

#[tokio::test]
async fn fetch_parses_json_and_sends_fhir_accept_header() {
    let (base_url, log) = spawn_server().await;
    let fetcher = http_fetcher(&base_url);

    let patient = fetcher.fetch("Patient/pat-1").await.unwrap();

    assert_eq!(patient["id"], "pat-1");
    assert_eq!(*log.accept.lock().unwrap(), ["application/fhir+json"]);
}

#[tokio::test]
async fn non_success_status_carries_status_and_body() {
    let (base_url, _log) = spawn_server().await;
    let fetcher = http_fetcher(&base_url);

    let err = fetcher.fetch("Patient/missing").await.unwrap_err();

    match err {
        TimelineError::Upstream {
            status,
            reason,
            body,
        } => {
            assert_eq!(status, 404);
            assert_eq!(reason, "Not Found");
            assert!(body.contains("not-found"));
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_json_is_a_parse_error() {
    let (base_url, _log) = spawn_server().await;
    let fetcher = http_fetcher(&base_url);

    let err = fetcher.fetch("Patient/broken").await.unwrap_err();

    assert!(matches!(err, TimelineError::Parse(_)));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fetcher = http_fetcher(&format!("http://{addr}/"));
    let err = fetcher.fetch("Patient/pat-1").await.unwrap_err();

    assert!(matches!(err, TimelineError::Transport(_)));
}

#[tokio::test]
async fn aggregator_builds_timeline_over_http() {
    let (base_url, log) = spawn_server().await;
    let aggregator = TimelineAggregator::new(http_fetcher(&base_url), TimelineConfig::default());

    let result = aggregator
        .get_timeline("pat-1", &DateRange::unbounded(), &CancelSignal::new())
        .await
        .unwrap();

    assert_eq!(result.summary().name.as_deref(), Some("Grace Brewster Hopper"));
    assert_eq!(result.summary().encounter_count, Some(2));
    assert_eq!(result.timeline().len(), 6);

    let requests = log.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 11);
    assert_eq!(requests[0], "Patient/pat-1");
    assert_eq!(requests[1], "Encounter?patient=pat-1&_count=200");
    assert_eq!(requests[10], "MedicationRequest?patient=pat-1&_count=200");
}

#[tokio::test]
async fn aggregator_reports_missing_patient_over_http() {
    let (base_url, log) = spawn_server().await;
    let aggregator = TimelineAggregator::new(http_fetcher(&base_url), TimelineConfig::default());

    let err = aggregator
        .get_timeline("nobody", &DateRange::unbounded(), &CancelSignal::new())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(*log.requests.lock().unwrap(), ["Patient/nobody"]);
}
