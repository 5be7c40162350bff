//! Test Helper Utilities
//!
//! Stub filings sources and summarizers plus an in-memory filing store.

#![allow(dead_code)]

use async_trait::async_trait;
use bw_common::db::{FilingRepository, FilingStore};
use bw_common::CanonicalFiling;
use bw_ingest::services::{FilingSource, RawFiling, Summarizer};
use bw_ingest::IngestError;
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Fresh in-memory filing collection
pub async fn memory_store() -> Arc<FilingRepository> {
    // One connection: every in-memory connection is its own database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    Arc::new(
        FilingRepository::open(pool, "item_1_05_breaches")
            .await
            .unwrap(),
    )
}

/// Well-formed upstream record
pub fn raw_filing(n: usize) -> RawFiling {
    let value = json!({
        "accessionNo": format!("0000000000-24-{:06}", n),
        "formType": "8-K",
        "filedAt": format!("2024-01-{:02}T10:00:00-05:00", (n % 28) + 1),
        "ticker": format!("T{}", n),
        "cik": format!("{}", 100000 + n),
        "companyName": format!("Company {}", n),
        "linkToFilingDetails": format!("https://www.sec.gov/filing/{}", n),
    });
    match value {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// Page of `count` well-formed records numbered from `start`
pub fn raw_page(start: usize, count: usize) -> Vec<RawFiling> {
    (start..start + count).map(raw_filing).collect()
}

/// Serves scripted pages in order, recording requested offsets
pub struct StubSource {
    pages: Vec<Vec<RawFiling>>,
    fail_on_call: Option<u32>,
    calls: AtomicU32,
    offsets: Mutex<Vec<u32>>,
}

impl StubSource {
    /// Returns `pages` in order, then empty pages
    pub fn new(pages: Vec<Vec<RawFiling>>) -> Self {
        Self {
            pages,
            fail_on_call: None,
            calls: AtomicU32::new(0),
            offsets: Mutex::new(Vec::new()),
        }
    }

    /// Fail with SourceUnavailable on the given zero-based call
    pub fn failing_on_call(mut self, call: u32) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn offsets(&self) -> Vec<u32> {
        self.offsets.lock().unwrap().clone()
    }
}

#[async_trait]
impl FilingSource for StubSource {
    async fn fetch_page(&self, offset: u32, _page_size: u32) -> Result<Vec<RawFiling>, IngestError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.offsets.lock().unwrap().push(offset);

        if self.fail_on_call == Some(call) {
            return Err(IngestError::SourceUnavailable {
                status: Some(503),
                body: "upstream maintenance".to_string(),
            });
        }
        Ok(self.pages.get(call as usize).cloned().unwrap_or_default())
    }
}

/// Blocks inside `fetch_page` until released, to hold a run open
pub struct GatedSource {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl GatedSource {
    pub fn new() -> Self {
        Self {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl FilingSource for GatedSource {
    async fn fetch_page(&self, _offset: u32, _page_size: u32) -> Result<Vec<RawFiling>, IngestError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Vec::new())
    }
}

/// Summarizes as "summary N of <company>", failing for chosen accession numbers
pub struct StubSummarizer {
    fail_for: HashSet<String>,
    calls: AtomicU32,
}

impl StubSummarizer {
    pub fn new() -> Self {
        Self {
            fail_for: HashSet::new(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing_for(mut self, accession: &str) -> Self {
        self.fail_for.insert(accession.to_string());
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(&self, filing: &CanonicalFiling) -> Result<String, IngestError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_for.contains(&filing.accession_number) {
            return Err(IngestError::EnrichmentFailed("model request timed out".to_string()));
        }
        Ok(format!("summary {} of {}", n, filing.company_name))
    }
}

/// Store whose writes always fail
pub struct FailingStore;

#[async_trait]
impl FilingStore for FailingStore {
    async fn upsert(&self, _filing: &CanonicalFiling) -> bw_common::Result<()> {
        Err(bw_common::Error::Internal("disk full".to_string()))
    }

    async fn list(&self, _limit: u32) -> bw_common::Result<Vec<CanonicalFiling>> {
        Ok(Vec::new())
    }

    async fn get(&self, _accession_number: &str) -> bw_common::Result<Option<CanonicalFiling>> {
        Ok(None)
    }

    async fn count(&self) -> bw_common::Result<u64> {
        Ok(0)
    }
}
