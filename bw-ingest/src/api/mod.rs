//! HTTP API handlers for bw-ingest
//!
//! - `GET /filings`, `GET /api/filings`, `GET /filings/:accession`
//! - `POST /refresh`
//! - `GET /health`

pub mod filings;
pub mod health;
pub mod refresh;

pub use filings::filing_routes;
pub use health::health_routes;
pub use refresh::refresh_routes;
