//! bw-ingest library interface
//!
//! Exposes the ingestion pipeline, its collaborators and the HTTP router for
//! the binary and for integration tests.

pub mod api;
pub mod error;
pub mod services;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult, IngestError};

use axum::Router;
use bw_common::db::FilingStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::workflow::{IngestPipeline, RunGuard, RunSummary};

/// Batch parameters used by `POST /refresh`
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub batch_size: u32,
    pub max_results: u32,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_results: 100,
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Filing collection
    pub store: Arc<dyn FilingStore>,
    /// Pipeline invoked by `POST /refresh`
    pub pipeline: Arc<IngestPipeline>,
    /// Serializes refresh runs
    pub run_guard: RunGuard,
    pub run_settings: RunSettings,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Summary of the most recent refresh
    pub last_run: Arc<RwLock<Option<RunSummary>>>,
}

impl AppState {
    pub fn new(store: Arc<dyn FilingStore>, pipeline: IngestPipeline, run_settings: RunSettings) -> Self {
        Self {
            store,
            pipeline: Arc::new(pipeline),
            run_guard: RunGuard::new(),
            run_settings,
            startup_time: Utc::now(),
            last_run: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::filing_routes())
        .merge(api::refresh_routes())
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
