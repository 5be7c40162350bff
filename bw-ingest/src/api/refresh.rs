//! Refresh trigger
//!
//! `POST /refresh` runs one ingestion pass and answers when it finishes.
//! The run executes on its own task so a client disconnect does not cut it
//! short.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;

use crate::{
    error::{ApiError, ApiResult},
    workflow::{RecordError, RunSummary},
    AppState,
};

/// POST /refresh response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub processed_count: u32,
    pub persisted_count: u32,
    pub errors: Vec<RecordError>,
}

impl From<&RunSummary> for RefreshResponse {
    fn from(summary: &RunSummary) -> Self {
        Self {
            success: summary.is_success(),
            error: summary.abort_error().map(str::to_string),
            processed_count: summary.processed_count,
            persisted_count: summary.persisted_count,
            errors: summary.errors.clone(),
        }
    }
}

impl RefreshResponse {
    /// Run that never started (rejected arguments)
    fn failed(error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
            processed_count: 0,
            persisted_count: 0,
            errors: Vec::new(),
        }
    }
}

/// POST /refresh
///
/// 200 when the run completes (per-record errors included in the body),
/// 502 when the filings source fails, 500 when the run is refused before it
/// starts, 409 while another run is active.
pub async fn refresh(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<RefreshResponse>)> {
    let permit = state
        .run_guard
        .try_start()
        .ok_or_else(|| ApiError::Conflict("Refresh already running".to_string()))?;

    let pipeline = state.pipeline.clone();
    let last_run = state.last_run.clone();
    let settings = state.run_settings;
    tracing::info!(
        batch_size = settings.batch_size,
        max_results = settings.max_results,
        "Refresh triggered"
    );

    // last_run is recorded before the permit drops, even if the caller has gone
    let handle = tokio::spawn(async move {
        let _permit = permit;
        let result = pipeline.run(settings.batch_size, settings.max_results).await;
        if let Ok(summary) = &result {
            *last_run.write().await = Some(summary.clone());
        }
        result
    });

    let result = handle
        .await
        .map_err(|e| ApiError::Internal(format!("Refresh task failed: {}", e)))?;

    let (status, response) = match result {
        Ok(summary) if summary.is_success() => (StatusCode::OK, RefreshResponse::from(&summary)),
        Ok(summary) => (StatusCode::BAD_GATEWAY, RefreshResponse::from(&summary)),
        Err(e) => {
            tracing::error!(error = %e, "Refresh refused");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                RefreshResponse::failed(e.to_string()),
            )
        }
    };
    Ok((status, Json(response)))
}

/// Build refresh routes
pub fn refresh_routes() -> Router<AppState> {
    Router::new().route("/refresh", post(refresh))
}
