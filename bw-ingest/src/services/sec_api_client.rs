//! sec-api.io full-text query client
//!
//! Queries 8-K filings that report Item 1.05 (material cybersecurity
//! incidents), newest first.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use super::{FilingSource, RawFiling};
use crate::error::IngestError;

pub const SEC_API_BASE_URL: &str = "https://api.sec-api.io";
const USER_AGENT: &str = concat!("breach-watch/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Query selecting Item 1.05 disclosures
pub const ITEM_105_QUERY: &str = r#"formType:"8-K" AND items:"1.05""#;

/// Largest page the upstream accepts
pub const MAX_PAGE_SIZE: u32 = bw_common::config::MAX_BATCH_SIZE;

/// Request body for the query endpoint.
///
/// `from` and `size` are sent as strings, which is what the API documents.
#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    from: String,
    size: String,
    sort: [SortClause; 1],
}

#[derive(Debug, Serialize)]
struct SortClause {
    #[serde(rename = "filedAt")]
    filed_at: SortOrder,
}

#[derive(Debug, Serialize)]
struct SortOrder {
    order: &'static str,
}

/// sec-api.io client
pub struct SecApiClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SecApiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, IngestError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| IngestError::SourceUnavailable {
                status: None,
                body: e.to_string(),
            })?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: SEC_API_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl FilingSource for SecApiClient {
    async fn fetch_page(&self, offset: u32, page_size: u32) -> Result<Vec<RawFiling>, IngestError> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(IngestError::InvalidInput(format!(
                "page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, page_size
            )));
        }

        let request = QueryRequest {
            query: ITEM_105_QUERY,
            from: offset.to_string(),
            size: page_size.to_string(),
            sort: [SortClause {
                filed_at: SortOrder { order: "desc" },
            }],
        };

        tracing::debug!(offset, page_size, "Querying filings API");

        let response = self
            .http_client
            .post(&self.base_url)
            .query(&[("token", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| IngestError::SourceUnavailable {
                status: e.status().map(|s| s.as_u16()),
                body: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::SourceUnavailable {
                status: Some(status.as_u16()),
                body,
            });
        }

        let body: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| IngestError::SourceUnavailable {
                    status: Some(status.as_u16()),
                    body: format!("invalid response body: {}", e),
                })?;

        let filings = parse_filings(body);
        tracing::info!(offset, count = filings.len(), "Fetched filings page");
        Ok(filings)
    }
}

/// Pull the `filings` array out of a response.
///
/// A missing array is an empty page. Non-object entries are kept as empty
/// records so the normalizer reports them instead of dropping them silently.
fn parse_filings(body: serde_json::Value) -> Vec<RawFiling> {
    match body {
        serde_json::Value::Object(mut map) => match map.remove("filings") {
            Some(serde_json::Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::Object(record) => record,
                    _ => RawFiling::new(),
                })
                .collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
