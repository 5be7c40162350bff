//! Filing ingestion workflow
//!
//! A run walks the filings source page by page, normalizing, summarizing and
//! upserting each record in sequence:
//!
//! ```text
//! Paging ──fetch──▶ PageFetched ──per record──▶ Paging (next offset)
//!    │                    │
//!    └─ empty page ──▶ Done ◀── processed ≥ max_results
//! ```
//!
//! Only one run may be active at a time; see [`RunGuard`].

pub mod pipeline;
pub mod run_guard;

pub use pipeline::{IngestPipeline, RecordError, RunOutcome, RunSummary};
pub use run_guard::{RunGuard, RunPermit};
