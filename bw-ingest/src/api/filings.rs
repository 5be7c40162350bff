//! Filing query handlers

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use bw_common::CanonicalFiling;
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// Most filings a single listing returns
pub const MAX_LISTED: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

/// GET /filings
///
/// Newest `filedAt` first, at most 50. `?limit=` is clamped to 1..=50.
pub async fn list_filings(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<CanonicalFiling>>> {
    let limit = query.limit.unwrap_or(MAX_LISTED).clamp(1, MAX_LISTED);
    let filings = state.store.list(limit).await?;
    tracing::debug!(limit, returned = filings.len(), "Listed filings");
    Ok(Json(filings))
}

/// GET /filings/:accession
pub async fn get_filing(
    State(state): State<AppState>,
    Path(accession): Path<String>,
) -> ApiResult<Json<CanonicalFiling>> {
    state
        .store
        .get(&accession)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Filing not found: {}", accession)))
}

/// Build filing query routes
pub fn filing_routes() -> Router<AppState> {
    Router::new()
        .route("/filings", get(list_filings))
        .route("/api/filings", get(list_filings))
        .route("/filings/:accession", get(get_filing))
}
