//! Raw filing normalization
//!
//! Converts the loosely-typed upstream record into a `CanonicalFiling`.
//! Pure apart from reading the clock for `imported_at`.

use bw_common::CanonicalFiling;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::RawFiling;
use crate::error::IngestError;

/// Normalize one upstream record.
///
/// `accessionNo`, `cik`, `companyName` and `filedAt` are required. A blank
/// ticker becomes `None`; a missing form type or link becomes an empty string.
pub fn normalize(raw: &RawFiling) -> Result<CanonicalFiling, IngestError> {
    normalize_at(raw, Utc::now())
}

/// [`normalize`] with an explicit import time
pub fn normalize_at(raw: &RawFiling, imported_at: DateTime<Utc>) -> Result<CanonicalFiling, IngestError> {
    let accession_number = required_string(raw, "accessionNo")?;
    let cik = required_string(raw, "cik")?;
    let company_name = required_string(raw, "companyName")?;
    let filed_at_raw = required_string(raw, "filedAt")?;

    let filed_at = DateTime::parse_from_rfc3339(&filed_at_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| IngestError::MalformedRecord {
            field: "filedAt",
            reason: format!("is not an RFC 3339 timestamp ({}): {:?}", e, filed_at_raw),
        })?;

    Ok(CanonicalFiling {
        accession_number,
        form_type: optional_string(raw, "formType").unwrap_or_default(),
        filed_at,
        ticker: optional_string(raw, "ticker"),
        cik,
        company_name,
        filing_link: optional_string(raw, "linkToFilingDetails").unwrap_or_default(),
        summary: None,
        imported_at,
    })
}

/// Best-effort identifier for error reporting on records that failed to normalize
pub fn record_id(raw: &RawFiling) -> Option<String> {
    optional_string(raw, "accessionNo")
}

/// Strings and integers are accepted (CIKs arrive as either)
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        _ => None,
    }
}

fn optional_string(raw: &RawFiling, field: &str) -> Option<String> {
    raw.get(field).and_then(as_text)
}

fn required_string(raw: &RawFiling, field: &'static str) -> Result<String, IngestError> {
    match raw.get(field) {
        None | Some(Value::Null) => Err(IngestError::MalformedRecord {
            field,
            reason: "is missing".to_string(),
        }),
        Some(value) => as_text(value).ok_or_else(|| IngestError::MalformedRecord {
            field,
            reason: format!("is empty or not a string: {}", value),
        }),
    }
}
