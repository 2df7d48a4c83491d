//! Embedding provider errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Embedding failed: {0}")]
    Failed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_error_display() {
        let err = EmbeddingError::Failed("test error".to_string());
        assert_eq!(err.to_string(), "Embedding failed: test error");

        let err = EmbeddingError::InvalidInput("bad input".to_string());
        assert_eq!(err.to_string(), "Invalid input: bad input");
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = EmbeddingError::DimensionMismatch {
            expected: 1536,
            actual: 768,
        };
        let display = err.to_string();
        assert!(display.contains("1536"));
        assert!(display.contains("768"));
    }
}
