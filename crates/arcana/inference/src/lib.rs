//! Query embeddings from an OpenAI-compatible embedding service.
//!
//! Free-text search needs a vector for the query text. Producing it is the
//! only network call in the engine, so it sits behind the one-method
//! [`Embedder`] trait; tests swap in a deterministic implementation.
//!
//! Calls are blocking, bounded by a timeout, and never retried.

use std::time::Duration;

/// Default service endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Model the shipped corpus was generated with.
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Default bound on one request, connect included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Turns text into a vector.
pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

impl<T: Embedder + ?Sized> Embedder for &T {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        (**self).embed(text)
    }
}

impl<T: Embedder + ?Sized> Embedder for Box<T> {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        (**self).embed(text)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("no API key configured for the embedding service (set OPENAI_API_KEY)")]
    MissingApiKey,

    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout {
        url: String,
        timeout: Duration,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("embedding service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed embedding response")]
    Response(#[source] reqwest::Error),

    #[error("embedding response contained no vectors")]
    EmptyResponse,

    #[error("embedding service returned dimension {actual}, corpus dimension is {expected}")]
    UnexpectedDimension { expected: usize, actual: usize },
}

/// Connection settings for [`OpenAiEmbedder`].
#[derive(Debug, Clone)]
pub struct EmbedderConfig {
    /// Base URL up to and including the API version, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(serde::Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(serde::Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(serde::Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Blocking client for the `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OpenAiEmbedder {
    /// Build a client. Fails when no API key is configured.
    pub fn new(config: EmbedderConfig) -> Result<Self, EmbedError> {
        let api_key = config
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(EmbedError::MissingApiKey)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()
            .map_err(EmbedError::Client)?;

        let url = format!("{}/embeddings", config.base_url.trim_end_matches('/'));

        tracing::debug!(%url, model = %config.model, timeout = ?config.timeout, "embedding client ready");

        Ok(Self {
            client,
            url,
            model: config.model,
            api_key,
            timeout: config.timeout,
        })
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        tracing::debug!(url = %self.url, chars = text.len(), "requesting query embedding");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .map_err(|source| self.transport_error(source))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EmbedError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse = response.json().map_err(|source| {
            if source.is_timeout() {
                self.transport_error(source)
            } else {
                EmbedError::Response(source)
            }
        })?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(EmbedError::EmptyResponse)?;

        tracing::debug!(dimension = embedding.len(), "received query embedding");
        Ok(embedding)
    }
}

impl OpenAiEmbedder {
    fn transport_error(&self, source: reqwest::Error) -> EmbedError {
        if source.is_timeout() {
            EmbedError::Timeout {
                url: self.url.clone(),
                timeout: self.timeout,
                source,
            }
        } else {
            EmbedError::Request {
                url: self.url.clone(),
                source,
            }
        }
    }
}
