//! OpenAI embedding provider.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use termsnap_protocols::{Embedding, EmbeddingError, EmbeddingProvider};

/// Configuration for OpenAI embeddings.
#[derive(Debug, Clone)]
pub struct OpenAIEmbeddingConfig {
    /// API key for OpenAI.
    pub api_key: String,
    /// Model to use (default: text-embedding-3-small).
    pub model: String,
    /// Base URL for API (default: https://api.openai.com/v1).
    pub base_url: String,
    /// Embedding dimension (default: 1536 for text-embedding-3-small).
    pub dimension: usize,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl OpenAIEmbeddingConfig {
    /// Create config with API key using defaults.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            dimension: 1536,
            timeout: Duration::from_secs(30),
        }
    }

    /// Use a different model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set custom base URL (for Azure OpenAI or compatible APIs).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set embedding dimension.
    pub fn with_dimension(mut self, dim: usize) -> Self {
        self.dimension = dim;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// OpenAI embedding provider.
pub struct OpenAIEmbedding {
    client: reqwest::Client,
    config: OpenAIEmbeddingConfig,
}

impl OpenAIEmbedding {
    /// Create a new OpenAI embedding provider.
    pub fn new(config: OpenAIEmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EmbeddingError::Failed(format!("HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create from API key with defaults.
    pub fn from_api_key(api_key: impl Into<String>) -> Result<Self, EmbeddingError> {
        Self::new(OpenAIEmbeddingConfig::new(api_key))
    }

    pub fn config(&self) -> &OpenAIEmbeddingConfig {
        &self.config
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    input: Vec<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let embeddings = self.embed_batch(&[text]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Failed("Empty response".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::InvalidInput("empty text".to_string()));
        }

        let request = EmbeddingRequest {
            input: texts.iter().map(|t| t.to_string()).collect(),
            model: self.config.model.clone(),
        };

        let url = format!("{}/embeddings", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbeddingError::Failed(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EmbeddingError::Failed(format!(
                "API error {}: {}",
                status, body
            )));
        }

        let mut embedding_response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Failed(format!("Parse error: {}", e)))?;

        if embedding_response.data.len() != texts.len() {
            return Err(EmbeddingError::Failed(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embedding_response.data.len()
            )));
        }

        // The API may return items out of order; `index` is authoritative.
        embedding_response
            .data
            .sort_by_key(|d| d.index.unwrap_or(usize::MAX));

        debug!("Generated {} embeddings", embedding_response.data.len());

        embedding_response
            .data
            .into_iter()
            .map(|d| {
                if d.embedding.len() != self.config.dimension {
                    return Err(EmbeddingError::DimensionMismatch {
                        expected: self.config.dimension,
                        actual: d.embedding.len(),
                    });
                }
                Ok(Embedding::new(d.embedding))
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
