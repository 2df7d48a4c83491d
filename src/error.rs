//! Service-level errors.

use thiserror::Error;

use termsnap_config::ConfigError;
use termsnap_protocols::{CacheError, EmbeddingError};

/// Errors raised while assembling or running the cache service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Embedding provider error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}
