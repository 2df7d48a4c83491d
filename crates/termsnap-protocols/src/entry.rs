//! Cache entry and lookup result types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;
use crate::metadata::EntryMetadata;

/// Store-assigned, monotonically increasing entry identifier.
pub type EntryId = i64;

/// One cached resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry<M> {
    pub id: EntryId,

    /// Normalized natural-language request; keys the search.
    pub input_text: String,

    /// Generated command or answer.
    pub output_text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,

    pub metadata: M,

    /// Absent until computed by the initial persist or by backfill.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Embedding>,

    /// Number of cache hits served by this entry. Never decreases.
    pub use_count: u64,

    /// Optional grouping key (profile, host, ...) for frequency queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_key: Option<String>,

    /// Whether the output worked when it was last used.
    pub succeeded: bool,

    /// Cleared by soft delete.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl<M> Entry<M> {
    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }
}

/// An entry that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewEntry<M> {
    pub input_text: String,
    pub output_text: String,
    pub explanation: Option<String>,
    pub metadata: M,
    pub embedding: Option<Embedding>,
    pub scope_key: Option<String>,
}

impl<M: EntryMetadata> NewEntry<M> {
    pub fn new(input_text: impl Into<String>, output_text: impl Into<String>) -> Self {
        Self {
            input_text: input_text.into(),
            output_text: output_text.into(),
            explanation: None,
            metadata: M::default(),
            embedding: None,
            scope_key: None,
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

    pub fn with_embedding(mut self, embedding: Embedding) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_scope(mut self, scope_key: impl Into<String>) -> Self {
        self.scope_key = Some(scope_key.into());
        self
    }
}

/// Which retrieval stage produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStage {
    Keyword,
    Vector,
    Miss,
}

impl fmt::Display for MatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStage::Keyword => write!(f, "keyword"),
            MatchStage::Vector => write!(f, "vector"),
            MatchStage::Miss => write!(f, "miss"),
        }
    }
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheResult<M> {
    pub is_from_cache: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<Entry<M>>,
    /// Similarity of the hit, or the best similarity seen on a miss.
    pub similarity: f32,
    pub stage: MatchStage,
}

impl<M> CacheResult<M> {
    pub fn hit(entry: Entry<M>, similarity: f32, stage: MatchStage) -> Self {
        Self {
            is_from_cache: true,
            entry: Some(entry),
            similarity,
            stage,
        }
    }

    pub fn miss(best_similarity: f32) -> Self {
        Self {
            is_from_cache: false,
            entry: None,
            similarity: best_similarity,
            stage: MatchStage::Miss,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.is_from_cache
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
