//! Groq chat-completions client for filing summaries
//!
//! Uses the OpenAI-compatible `/openai/v1/chat/completions` endpoint with a
//! fixed instruction prompt. Model, temperature, token ceiling and request
//! timeout come from configuration, never from the filing.

use async_trait::async_trait;
use bw_common::config::EnrichmentConfig;
use bw_common::CanonicalFiling;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Summarizer;
use crate::error::IngestError;

pub const GROQ_BASE_URL: &str = "https://api.groq.com";
const CHAT_COMPLETIONS_PATH: &str = "/openai/v1/chat/completions";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

/// Build the instruction prompt for one filing
pub fn build_prompt(filing: &CanonicalFiling) -> String {
    format!(
        "You are a professional summarizer.\n\
         Read this SEC 8-K Item 1.05 cybersecurity breach filing and produce a single, \
         concise paragraph that covers:\n\
         - The nature of the breach (e.g., data leak, ransomware)\n\
         - Any known impacts (e.g., SSN/PII leaks)\n\
         - Actions taken by the company\n\
         \n\
         ONLY return the summary text. Do NOT wrap it in JSON or include any labels or fields.\n\
         \n\
         Company: {}\n\
         Filing Date: {}\n\
         Filing URL: {}\n",
        filing.company_name,
        filing.filed_at.to_rfc3339(),
        filing.filing_link
    )
}

/// Groq API client
pub struct GroqClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    settings: EnrichmentConfig,
}

impl GroqClient {
    pub fn new(api_key: impl Into<String>, settings: EnrichmentConfig) -> Result<Self, IngestError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()
            .map_err(|e| IngestError::EnrichmentFailed(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: GROQ_BASE_URL.to_string(),
            settings,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Summarizer for GroqClient {
    async fn summarize(&self, filing: &CanonicalFiling) -> Result<String, IngestError> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_prompt(filing),
            }],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let url = format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            CHAT_COMPLETIONS_PATH
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IngestError::EnrichmentFailed("model request timed out".to_string())
                } else {
                    IngestError::EnrichmentFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(IngestError::EnrichmentFailed(
                "model rate limit or quota exceeded".to_string(),
            ));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(IngestError::EnrichmentFailed(format!(
                "model API error {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| IngestError::EnrichmentFailed(format!("malformed model response: {}", e)))?;

        extract_summary(body)
    }
}

fn extract_summary(body: ChatResponse) -> Result<String, IngestError> {
    let content = body
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .map(|message| message.content.trim().to_string())
        .unwrap_or_default();

    if content.is_empty() {
        return Err(IngestError::EnrichmentFailed(
            "model returned an empty summary".to_string(),
        ));
    }
    Ok(content)
}
