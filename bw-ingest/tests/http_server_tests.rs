//! HTTP API integration tests
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`.

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use bw_common::db::FilingStore;
use bw_ingest::services::{normalize, FilingSource};
use bw_ingest::workflow::IngestPipeline;
use bw_ingest::{build_router, AppState, RunSettings};
use helpers::{memory_store, raw_filing, raw_page, GatedSource, StubSource, StubSummarizer};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const SETTINGS: RunSettings = RunSettings {
    batch_size: 5,
    max_results: 100,
};

/// Router over `store`, refreshing from `source`
fn app_with(store: Arc<dyn FilingStore>, source: Arc<dyn FilingSource>) -> Router {
    app_with_settings(store, source, SETTINGS)
}

fn app_with_settings(
    store: Arc<dyn FilingStore>,
    source: Arc<dyn FilingSource>,
    settings: RunSettings,
) -> Router {
    let pipeline = IngestPipeline::new(source, store.clone())
        .with_summarizer(Arc::new(StubSummarizer::new()))
        .with_page_delay(Duration::ZERO);
    build_router(AppState::new(store, pipeline, settings))
}

async fn seed(store: &dyn FilingStore, count: usize) {
    for n in 0..count {
        let filing = normalize(&raw_filing(n)).unwrap();
        store.upsert(&filing).await.unwrap();
    }
}

async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_list_filings_newest_first() {
    let store = memory_store().await;
    seed(store.as_ref(), 5).await;
    let app = app_with(store, Arc::new(StubSource::new(Vec::new())));

    let (status, body) = send(app, "GET", "/filings").await;

    assert_eq!(status, StatusCode::OK);
    let filings = body.as_array().unwrap();
    assert_eq!(filings.len(), 5);
    assert_eq!(filings[0]["accessionNumber"], "0000000000-24-000004");
    assert_eq!(filings[4]["accessionNumber"], "0000000000-24-000000");
    assert_eq!(filings[0]["companyName"], "Company 4");
    assert_eq!(filings[0]["filedAt"], "2024-01-05T15:00:00Z");
}

#[tokio::test]
async fn test_list_filings_capped_at_fifty() {
    let store = memory_store().await;
    seed(store.as_ref(), 60).await;
    let app = app_with(store, Arc::new(StubSource::new(Vec::new())));

    let (_, body) = send(app.clone(), "GET", "/filings").await;
    assert_eq!(body.as_array().unwrap().len(), 50);

    let (_, body) = send(app.clone(), "GET", "/filings?limit=500").await;
    assert_eq!(body.as_array().unwrap().len(), 50);

    let (_, body) = send(app.clone(), "GET", "/filings?limit=3").await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (_, body) = send(app, "GET", "/api/filings?limit=0").await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_filings_empty_collection() {
    let store = memory_store().await;
    let app = app_with(store, Arc::new(StubSource::new(Vec::new())));

    let (status, body) = send(app, "GET", "/api/filings").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn test_get_filing_by_accession_number() {
    let store = memory_store().await;
    seed(store.as_ref(), 3).await;
    let app = app_with(store, Arc::new(StubSource::new(Vec::new())));

    let (status, body) = send(app.clone(), "GET", "/filings/0000000000-24-000001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cik"], "100001");
    assert_eq!(body["ticker"], "T1");
    assert!(body.get("summary").is_none());

    let (status, body) = send(app, "GET", "/filings/0000000000-24-999999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_refresh_ingests_and_reports_counts() {
    let store = memory_store().await;
    let mut page = raw_page(0, 5);
    page[1].remove("companyName");
    let source = Arc::new(StubSource::new(vec![page, raw_page(5, 2)]));
    let app = app_with(store.clone(), source);

    let (status, body) = send(app.clone(), "POST", "/refresh").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["processedCount"], 7);
    assert_eq!(body["persistedCount"], 6);
    assert_eq!(body["errors"][0]["recordId"], "0000000000-24-000001");
    assert_eq!(body["errors"][0]["kind"], "MALFORMED_RECORD");
    assert!(body.get("error").is_none());

    let (_, listed) = send(app, "GET", "/filings").await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 6);
    assert!(listed.iter().all(|f| f["summary"].is_string()));
}

#[tokio::test]
async fn test_refresh_reports_source_failure() {
    let store = memory_store().await;
    let source = Arc::new(StubSource::new(vec![raw_page(0, 5)]).failing_on_call(0));
    let app = app_with(store, source);

    let (status, body) = send(app, "POST", "/refresh").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert_eq!(body["processedCount"], 0);
    assert!(body["error"].as_str().unwrap().contains("upstream maintenance"));
}

#[tokio::test]
async fn test_concurrent_refresh_rejected() {
    let store = memory_store().await;
    let source = Arc::new(GatedSource::new());
    let entered = source.entered.clone();
    let release = source.release.clone();
    let app = app_with(store, source);

    // First refresh blocks inside its first page fetch
    let first = tokio::spawn(send(app.clone(), "POST", "/refresh"));
    entered.notified().await;

    let (status, body) = send(app.clone(), "POST", "/refresh").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (_, health) = send(app.clone(), "GET", "/health").await;
    assert_eq!(health["refresh_running"], true);

    release.notify_one();
    let (status, body) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processedCount"], 0);

    // Slot is free again once the first run finished
    let (_, health) = send(app, "GET", "/health").await;
    assert_eq!(health["refresh_running"], false);
}

#[tokio::test]
async fn test_health_reports_last_run() {
    let store = memory_store().await;
    let app = app_with(store, Arc::new(StubSource::new(vec![raw_page(0, 2)])));

    let (status, body) = send(app.clone(), "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "bw-ingest");
    assert!(body.get("last_run").is_none());

    send(app.clone(), "POST", "/refresh").await;

    let (_, body) = send(app, "GET", "/health").await;
    assert_eq!(body["last_run"]["processedCount"], 2);
    assert_eq!(body["last_run"]["outcome"]["status"], "completed");
}

#[tokio::test]
async fn test_refresh_rejected_arguments_use_refresh_shape() {
    let store = memory_store().await;
    let settings = RunSettings {
        batch_size: 0,
        max_results: 100,
    };
    let app = app_with_settings(store, Arc::new(StubSource::new(Vec::new())), settings);

    let (status, body) = send(app.clone(), "POST", "/refresh").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("batch size"));
    assert_eq!(body["processedCount"], 0);
    assert_eq!(body["errors"], serde_json::json!([]));

    // Slot released after the refused run
    let (_, health) = send(app, "GET", "/health").await;
    assert_eq!(health["refresh_running"], false);
}

#[tokio::test]
async fn test_run_summary_kept_when_caller_disconnects() {
    let store = memory_store().await;
    let source = Arc::new(GatedSource::new());
    let entered = source.entered.clone();
    let release = source.release.clone();
    let app = app_with(store, source);

    let request = tokio::spawn(send(app.clone(), "POST", "/refresh"));
    entered.notified().await;

    // Caller goes away mid-run
    request.abort();
    assert!(request.await.unwrap_err().is_cancelled());
    release.notify_one();

    let mut last_run = Value::Null;
    for _ in 0..100 {
        let (_, health) = send(app.clone(), "GET", "/health").await;
        if !health["last_run"].is_null() {
            last_run = health["last_run"].clone();
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(last_run["outcome"]["status"], "completed");
    assert_eq!(last_run["processedCount"], 0);
}
