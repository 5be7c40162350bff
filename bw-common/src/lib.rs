//! # Breach Watch Common Library
//!
//! Shared code for the Breach Watch ingestion service and its dashboard:
//! - Canonical filing model
//! - Filing store (SQLite) and lock retry
//! - Configuration loading
//! - Dashboard view state and summary display helpers

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod view;

pub use error::{Error, Result};
pub use models::CanonicalFiling;
