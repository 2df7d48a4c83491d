//! Generation provider protocol.
//!
//! The generation provider is only invoked on a full cache miss. It is
//! called by the caller (or by `resolve_or_generate`), never by the
//! retrieval stages themselves.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::metadata::EntryMetadata;

/// Output of a generation provider call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generated<M> {
    /// The generated command or answer, stored verbatim.
    pub output_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default)]
    pub metadata: M,
}

impl<M: EntryMetadata> Generated<M> {
    pub fn new(output_text: impl Into<String>) -> Self {
        Self {
            output_text: output_text.into(),
            explanation: None,
            metadata: M::default(),
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn with_metadata(mut self, metadata: M) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Converts a natural-language request into a fresh output.
#[async_trait]
pub trait GenerationProvider<M: EntryMetadata>: Send + Sync {
    async fn generate(&self, text: &str) -> Result<Generated<M>, GenerationError>;
}
