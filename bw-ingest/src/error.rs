//! Error types for bw-ingest
//!
//! `IngestError` classifies pipeline failures by how the run reacts to them.
//! `ApiError` maps handler failures onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Pipeline error taxonomy
#[derive(Debug, Clone, Error)]
pub enum IngestError {
    /// Filings API unreachable or returned non-2xx. Fatal to the run.
    #[error("Filings source unavailable{}: {body}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    SourceUnavailable { status: Option<u16>, body: String },

    /// One upstream record could not be normalized. Record is skipped.
    #[error("Malformed record: field '{field}' {reason}")]
    MalformedRecord { field: &'static str, reason: String },

    /// Summary generation failed. Filing is stored without a summary.
    #[error("Enrichment failed: {0}")]
    EnrichmentFailed(String),

    /// Store write failed for one record.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Caller passed an out-of-range argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl IngestError {
    /// Stable identifier used in run summaries
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::SourceUnavailable { .. } => "SOURCE_UNAVAILABLE",
            IngestError::MalformedRecord { .. } => "MALFORMED_RECORD",
            IngestError::EnrichmentFailed(_) => "ENRICHMENT_FAILED",
            IngestError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
            IngestError::InvalidInput(_) => "INVALID_INPUT",
        }
    }
}

impl From<bw_common::Error> for IngestError {
    fn from(err: bw_common::Error) -> Self {
        IngestError::PersistenceFailure(err.to_string())
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflict (409) - refresh already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// bw-common error
    #[error("Common error: {0}")]
    Common(#[from] bw_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, error = %message, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_unavailable_message_includes_status() {
        let err = IngestError::SourceUnavailable {
            status: Some(429),
            body: "quota exceeded".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Filings source unavailable (HTTP 429): quota exceeded"
        );

        let err = IngestError::SourceUnavailable {
            status: None,
            body: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "Filings source unavailable: connection refused");
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let response = ApiError::Conflict("busy".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
