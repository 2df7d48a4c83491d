//! Payload types carried by cache entries.
//!
//! A cache instantiation is defined by its metadata type. The same
//! keyword/vector/threshold machinery runs over every instantiation; the
//! `NAMESPACE` keeps their storage apart.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Per-instantiation payload stored alongside each entry.
pub trait EntryMetadata:
    Serialize + DeserializeOwned + Clone + Default + Debug + Send + Sync + 'static
{
    /// Storage namespace; must be a plain lowercase identifier.
    const NAMESPACE: &'static str;
}

/// Generation-provider metadata for a resolved shell command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandMetadata {
    /// Provider confidence (0.0 - 1.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,

    /// Alternative commands with the same effect.
    #[serde(default)]
    pub alternatives: Vec<String>,

    #[serde(default)]
    pub requires_sudo: bool,

    #[serde(default)]
    pub is_dangerous: bool,

    /// Category tag (e.g., "filesystem", "network").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Human-readable duration estimate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<String>,
}

impl CommandMetadata {
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

impl EntryMetadata for CommandMetadata {
    const NAMESPACE: &'static str = "command";
}

/// Metadata for a curated question/answer pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QaMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Where the answer came from (e.g., "manual", "imported").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl EntryMetadata for QaMetadata {
    const NAMESPACE: &'static str = "qa";
}
