//! Generation provider errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation failed: {0}")]
    Failed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
