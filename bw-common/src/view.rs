//! Dashboard view state
//!
//! The browser dashboard renders a table, charts and a 3D scene from the
//! latest `GET /filings` response. This module owns that client-side state
//! explicitly instead of keeping "last fetched data" in a global, and holds
//! the display rules shared by every view (summary parsing, ticker fallback).

use crate::models::CanonicalFiling;

/// Shown in place of a missing or empty summary
pub const NO_SUMMARY: &str = "No summary available";

/// Shown in place of a missing ticker
pub const NO_TICKER: &str = "N/A";

/// Extract display text from a stored summary.
///
/// Some summaries were stored as a JSON object such as
/// `{"summary": "..."}` rather than plain text. Those are unwrapped; anything
/// else, including malformed JSON that merely starts with `{`, is returned
/// unchanged.
// TODO: drop the JSON branch once stored summaries have been regenerated as plain text
pub fn parse_summary(raw: &str) -> String {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('{') {
        if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(trimmed) {
            if let Some(serde_json::Value::String(text)) = map.get("summary") {
                return text.clone();
            }
        }
    }
    raw.to_string()
}

/// Summary text for display, with an explicit marker when absent
pub fn display_summary(summary: Option<&str>) -> String {
    match summary.map(parse_summary) {
        Some(text) if !text.trim().is_empty() => text,
        _ => NO_SUMMARY.to_string(),
    }
}

/// Ticker for display, with a placeholder when absent
pub fn display_ticker(ticker: Option<&str>) -> &str {
    match ticker {
        Some(t) if !t.trim().is_empty() => t,
        _ => NO_TICKER,
    }
}

/// Status of the most recent refresh trigger
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RefreshStatus {
    #[default]
    Idle,
    InProgress,
    Succeeded,
    Failed(String),
}

/// Client-side dashboard state: loaded filings, search filter, selection
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    filings: Vec<CanonicalFiling>,
    search: String,
    selected: Option<String>,
    refresh: RefreshStatus,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace loaded filings with a fresh `GET /filings` response.
    ///
    /// A selection that no longer exists is cleared.
    pub fn replace(&mut self, filings: Vec<CanonicalFiling>) {
        self.filings = filings;
        if let Some(selected) = &self.selected {
            if !self.filings.iter().any(|f| &f.accession_number == selected) {
                self.selected = None;
            }
        }
    }

    pub fn filings(&self) -> &[CanonicalFiling] {
        &self.filings
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    /// Filings matching the current search (company name, ticker or CIK,
    /// case-insensitive). An empty search matches everything.
    pub fn visible(&self) -> Vec<&CanonicalFiling> {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return self.filings.iter().collect();
        }

        self.filings
            .iter()
            .filter(|f| {
                f.company_name.to_lowercase().contains(&needle)
                    || f.cik.to_lowercase().contains(&needle)
                    || f
                        .ticker
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// CIKs of visible filings, used by the 3D scene to hide nodes
    pub fn visible_ciks(&self) -> Vec<&str> {
        let mut ciks: Vec<&str> = self.visible().into_iter().map(|f| f.cik.as_str()).collect();
        ciks.sort_unstable();
        ciks.dedup();
        ciks
    }

    /// Highlight a row. Returns false if the accession number is not loaded.
    pub fn select(&mut self, accession_number: &str) -> bool {
        if self
            .filings
            .iter()
            .any(|f| f.accession_number == accession_number)
        {
            self.selected = Some(accession_number.to_string());
            true
        } else {
            false
        }
    }

    pub fn selected(&self) -> Option<&CanonicalFiling> {
        let selected = self.selected.as_deref()?;
        self.filings.iter().find(|f| f.accession_number == selected)
    }

    pub fn begin_refresh(&mut self) {
        self.refresh = RefreshStatus::InProgress;
    }

    /// Record the refresh outcome. Loaded filings are only replaced on
    /// success; a failed refresh leaves the current data untouched.
    pub fn finish_refresh(&mut self, result: Result<Vec<CanonicalFiling>, String>) {
        match result {
            Ok(filings) => {
                self.replace(filings);
                self.refresh = RefreshStatus::Succeeded;
            }
            Err(message) => {
                self.refresh = RefreshStatus::Failed(message);
            }
        }
    }

    pub fn refresh_status(&self) -> &RefreshStatus {
        &self.refresh
    }
}
