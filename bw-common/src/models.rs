//! Canonical filing model
//!
//! A `CanonicalFiling` is the strongly-typed form of one SEC 8-K Item 1.05
//! disclosure. It is produced by the normalizer in `bw-ingest`, persisted by
//! [`crate::db::FilingRepository`] and served as JSON to the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One cybersecurity-incident filing, keyed by accession number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalFiling {
    /// Upstream-assigned unique identifier (deduplication key)
    pub accession_number: String,
    /// Form type, e.g. "8-K" or "8-K/A"
    pub form_type: String,
    /// Filing timestamp, normalized to UTC
    pub filed_at: DateTime<Utc>,
    /// Exchange ticker, absent for private or unlisted filers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    /// Central Index Key of the filer
    pub cik: String,
    /// Filer name
    pub company_name: String,
    /// Link to the filing detail page
    pub filing_link: String,
    /// Generated summary.
    ///
    /// Older rows may hold a JSON object with a `summary` field instead of
    /// plain text; read it through [`crate::view::display_summary`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// When this record was normalized
    pub imported_at: DateTime<Utc>,
}

impl CanonicalFiling {
    /// Replace the summary with a freshly generated one
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}
