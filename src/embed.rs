//! Text embedding provider boundary.
//!
//! The engine only sees [`EmbedTextProvider`]; the shipped implementation
//! talks to the Gemini `embedContent` endpoint over blocking HTTP. Documents
//! and queries are embedded with different task types, which matters for
//! retrieval quality, so the mode is part of the trait contract.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;

/// Which side of the retrieval pair the text belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedMode {
    /// Catalog descriptions, embedded at index time.
    Document,
    /// User-entered descriptions, embedded per search.
    Query,
}

impl EmbedMode {
    fn task_type(self) -> &'static str {
        match self {
            EmbedMode::Document => "RETRIEVAL_DOCUMENT",
            EmbedMode::Query => "RETRIEVAL_QUERY",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("provider returned an empty vector")]
    EmptyVector,

    #[error("no API key configured (set GOOGLE_API_KEY or embedding.api_key)")]
    MissingApiKey,
}

/// Turns text into an embedding vector. Implementations must be callable
/// from parallel searches.
pub trait EmbedTextProvider: Send + Sync {
    fn embed(&self, text: &str, mode: EmbedMode) -> Result<Vec<f32>, EmbedError>;
}

/// Blocking HTTP client for the Gemini embedding API.
pub struct HttpEmbedder {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: String,
    content: Content<'a>,
    #[serde(rename = "taskType")]
    task_type: &'static str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Embedding,
}

#[derive(Deserialize)]
struct Embedding {
    values: Vec<f32>,
}

impl HttpEmbedder {
    /// Fails when the HTTP client cannot be built; a client without the
    /// configured timeout must never be used silently.
    pub fn new(config: &EmbeddingConfig, api_key: Option<String>) -> Result<Self, EmbedError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }
}

impl EmbedTextProvider for HttpEmbedder {
    fn embed(&self, text: &str, mode: EmbedMode) -> Result<Vec<f32>, EmbedError> {
        let api_key = self.api_key.as_deref().ok_or(EmbedError::MissingApiKey)?;

        let url = format!(
            "{}/v1beta/models/{}:embedContent",
            self.endpoint, self.model
        );

        let request = EmbedRequest {
            model: format!("models/{}", self.model),
            content: Content {
                parts: vec![Part { text }],
            },
            task_type: mode.task_type(),
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbedError::Status(status));
        }

        let body: EmbedResponse = response.json()?;
        if body.embedding.values.is_empty() {
            return Err(EmbedError::EmptyVector);
        }

        Ok(body.embedding.values)
    }
}
