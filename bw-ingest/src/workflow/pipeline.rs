//! Ingestion pipeline orchestrator
//!
//! # Error Handling
//! - Per-record isolation: a malformed record, a failed summary or a failed
//!   write is recorded in the run summary and the page continues
//! - A page fetch failure aborts the run; counts gathered so far are kept
//! - Nothing is retried inside a run; the caller decides whether to run again

use bw_common::db::FilingStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::IngestError;
use crate::services::normalizer::{normalize, record_id};
use crate::services::{FilingSource, RawFiling, Summarizer};

/// Pause between page fetches unless configured otherwise
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);

/// One per-record failure
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordError {
    /// Accession number, or `#<position>` when the record has none
    pub record_id: String,
    pub kind: &'static str,
    pub message: String,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RunOutcome {
    Completed,
    Aborted { error: String },
}

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Records taken from fetched pages, including ones that failed
    pub processed_count: u32,
    /// Records written to the store
    pub persisted_count: u32,
    /// Records written with a fresh summary
    pub summarized_count: u32,
    pub pages_fetched: u32,
    pub errors: Vec<RecordError>,
    pub outcome: RunOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    fn started() -> Self {
        let now = Utc::now();
        Self {
            processed_count: 0,
            persisted_count: 0,
            summarized_count: 0,
            pages_fetched: 0,
            errors: Vec::new(),
            outcome: RunOutcome::Completed,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }

    /// Error message of an aborted run
    pub fn abort_error(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Aborted { error } => Some(error),
            RunOutcome::Completed => None,
        }
    }

    fn record_error(&mut self, record_id: String, err: &IngestError) {
        self.errors.push(RecordError {
            record_id,
            kind: err.kind(),
            message: err.to_string(),
        });
    }
}

/// Run state machine
enum RunState {
    Paging { offset: u32 },
    PageFetched { offset: u32, page: Vec<RawFiling> },
    Done,
}

/// Sequential fetch → normalize → summarize → upsert pipeline
pub struct IngestPipeline {
    source: Arc<dyn FilingSource>,
    summarizer: Option<Arc<dyn Summarizer>>,
    store: Arc<dyn FilingStore>,
    page_delay: Duration,
}

impl IngestPipeline {
    /// Pipeline without summaries; add one with [`Self::with_summarizer`]
    pub fn new(source: Arc<dyn FilingSource>, store: Arc<dyn FilingStore>) -> Self {
        Self {
            source,
            summarizer: None,
            store,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// Run one ingestion pass.
    ///
    /// Stops at the first empty page or once `max_results` records have been
    /// processed (checked after each full page). Only invalid arguments
    /// return `Err`; a source failure ends the run with
    /// [`RunOutcome::Aborted`].
    pub async fn run(&self, batch_size: u32, max_results: u32) -> Result<RunSummary, IngestError> {
        if batch_size == 0 {
            return Err(IngestError::InvalidInput("batch size must be positive".to_string()));
        }
        if max_results == 0 {
            return Err(IngestError::InvalidInput("max results must be positive".to_string()));
        }

        info!(batch_size, max_results, "Starting ingestion run");
        let mut summary = RunSummary::started();
        let mut state = RunState::Paging { offset: 0 };

        loop {
            state = match state {
                RunState::Paging { offset } => match self.source.fetch_page(offset, batch_size).await {
                    Ok(page) if page.is_empty() => {
                        info!(offset, "No more filings to process");
                        RunState::Done
                    }
                    Ok(page) => {
                        summary.pages_fetched += 1;
                        RunState::PageFetched { offset, page }
                    }
                    Err(e) => {
                        error!(offset, error = %e, "Page fetch failed, aborting run");
                        summary.outcome = RunOutcome::Aborted { error: e.to_string() };
                        RunState::Done
                    }
                },
                RunState::PageFetched { offset, page } => {
                    for (index, raw) in page.iter().enumerate() {
                        self.process_record(raw, offset as usize + index, &mut summary)
                            .await;
                    }
                    summary.processed_count += page.len() as u32;
                    info!(
                        processed = summary.processed_count,
                        persisted = summary.persisted_count,
                        "Page complete"
                    );

                    if summary.processed_count >= max_results {
                        RunState::Done
                    } else {
                        if !self.page_delay.is_zero() {
                            tokio::time::sleep(self.page_delay).await;
                        }
                        RunState::Paging {
                            offset: offset + batch_size,
                        }
                    }
                }
                RunState::Done => break,
            };
        }

        summary.finished_at = Utc::now();
        info!(
            processed = summary.processed_count,
            persisted = summary.persisted_count,
            summarized = summary.summarized_count,
            errors = summary.errors.len(),
            outcome = ?summary.outcome,
            "Ingestion run finished"
        );
        Ok(summary)
    }

    /// Normalize, summarize and upsert one record. Failures land in `summary`.
    async fn process_record(&self, raw: &RawFiling, position: usize, summary: &mut RunSummary) {
        let mut filing = match normalize(raw) {
            Ok(filing) => filing,
            Err(e) => {
                let id = record_id(raw).unwrap_or_else(|| format!("#{}", position));
                warn!(record = %id, error = %e, "Skipping malformed record");
                summary.record_error(id, &e);
                return;
            }
        };

        let mut summarized = false;
        if let Some(summarizer) = &self.summarizer {
            debug!(company = %filing.company_name, "Generating summary");
            match summarizer.summarize(&filing).await {
                Ok(text) => {
                    filing = filing.with_summary(text);
                    summarized = true;
                }
                Err(e) => {
                    warn!(
                        accession = %filing.accession_number,
                        company = %filing.company_name,
                        error = %e,
                        "Summary failed, storing filing without one"
                    );
                    summary.record_error(filing.accession_number.clone(), &e);
                }
            }
        }

        match self.store.upsert(&filing).await {
            Ok(()) => {
                summary.persisted_count += 1;
                if summarized {
                    summary.summarized_count += 1;
                }
                debug!(accession = %filing.accession_number, "Filing stored");
            }
            Err(e) => {
                let e = IngestError::from(e);
                error!(accession = %filing.accession_number, error = %e, "Filing write failed");
                summary.record_error(filing.accession_number.clone(), &e);
            }
        }
    }
}
