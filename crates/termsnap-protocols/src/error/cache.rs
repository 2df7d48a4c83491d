//! Cache and storage errors.

use thiserror::Error;

use super::GenerationError;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache entry not found: {0}")]
    NotFound(i64),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = CacheError::NotFound(42);
        let display = err.to_string();
        assert!(display.contains("not found"));
        assert!(display.contains("42"));
    }

    #[test]
    fn test_storage_error() {
        let err = CacheError::StorageError("disk full".to_string());
        assert!(err.to_string().contains("Storage error"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_generation_error_from() {
        let err = CacheError::from(GenerationError::Failed("timeout".to_string()));
        assert!(matches!(err, CacheError::Generation(_)));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_serde_error_from() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = CacheError::from(parse);
        assert!(matches!(err, CacheError::SerializationError(_)));
    }
}
