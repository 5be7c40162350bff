//! External collaborators of the ingestion pipeline
//!
//! - [`sec_api_client`]: paginated filings source
//! - [`normalizer`]: raw upstream record → `CanonicalFiling`
//! - [`groq_client`]: language-model summaries
//!
//! The pipeline only sees the [`FilingSource`] and [`Summarizer`] traits so
//! either side can be swapped for a stub in tests.

pub mod groq_client;
pub mod normalizer;
pub mod sec_api_client;

pub use groq_client::GroqClient;
pub use normalizer::normalize;
pub use sec_api_client::SecApiClient;

use async_trait::async_trait;
use bw_common::CanonicalFiling;

use crate::error::IngestError;

/// Upstream filing as received: a loosely-typed JSON object.
///
/// Never passed beyond [`normalize`].
pub type RawFiling = serde_json::Map<String, serde_json::Value>;

/// Paginated source of raw filings, newest first
#[async_trait]
pub trait FilingSource: Send + Sync {
    /// Fetch `page_size` records starting at `offset`. An empty page means
    /// the source is exhausted.
    ///
    /// Fails with [`IngestError::SourceUnavailable`]; never retries.
    async fn fetch_page(&self, offset: u32, page_size: u32) -> Result<Vec<RawFiling>, IngestError>;
}

/// Generates a one-paragraph summary of a filing
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Fails with [`IngestError::EnrichmentFailed`]
    async fn summarize(&self, filing: &CanonicalFiling) -> Result<String, IngestError>;
}
