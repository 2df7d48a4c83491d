//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub backfill: BackfillConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Retrieval thresholds and storage location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// SQLite database file shared by the command cache and knowledge base.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Similarity at or above which a keyword or vector candidate is a hit.
    #[serde(default = "default_high_threshold")]
    pub high_threshold: f32,

    /// Floor for vector-stage candidates.
    #[serde(default = "default_min_vector_similarity")]
    pub min_vector_similarity: f32,

    /// Floor for vector results in advisory suggestion lists.
    #[serde(default = "default_suggestion_similarity")]
    pub suggestion_similarity: f32,

    /// Candidates fetched from the keyword index per lookup.
    #[serde(default = "default_candidates")]
    pub keyword_candidates: usize,

    /// Candidates fetched from the vector index per lookup.
    #[serde(default = "default_candidates")]
    pub vector_candidates: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            high_threshold: default_high_threshold(),
            min_vector_similarity: default_min_vector_similarity(),
            suggestion_similarity: default_suggestion_similarity(),
            keyword_candidates: default_candidates(),
            vector_candidates: default_candidates(),
        }
    }
}

fn default_database_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".termsnap")
        .join("cache.db")
}

fn default_high_threshold() -> f32 {
    0.85
}

fn default_min_vector_similarity() -> f32 {
    0.75
}

fn default_suggestion_similarity() -> f32 {
    0.6
}

fn default_candidates() -> usize {
    5
}

/// Embedding provider configuration. Disabled means keyword-only lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            model: default_embedding_model(),
            base_url: default_embedding_base_url(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_dimension() -> usize {
    1536
}

fn default_embedding_timeout() -> u64 {
    30
}

/// Background embedding backfill configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Entries fetched per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between embedding calls, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Seconds between scheduled runs.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Run one pass as soon as the worker starts.
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: default_batch_size(),
            delay_ms: default_delay_ms(),
            interval_secs: default_interval_secs(),
            run_on_startup: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> usize {
    50
}

fn default_delay_ms() -> u64 {
    200
}

fn default_interval_secs() -> u64 {
    3600
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,

    /// Also write daily-rotated log files here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            directory: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_defaults() {
        let config = CacheConfig::default();
        assert!((config.high_threshold - 0.85).abs() < f32::EPSILON);
        assert!((config.min_vector_similarity - 0.75).abs() < f32::EPSILON);
        assert!((config.suggestion_similarity - 0.6).abs() < f32::EPSILON);
        assert!(config.database_path.ends_with(".termsnap/cache.db"));
    }

    #[test]
    fn test_backfill_defaults() {
        let config = BackfillConfig::default();
        assert!(config.enabled);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.delay_ms, 200);
        assert!(config.run_on_startup);
    }

    #[test]
    fn test_embedding_disabled_by_default() {
        let config = EmbeddingConfig::default();
        assert!(!config.enabled);
        assert!(config.api_key.is_none());
        assert_eq!(config.dimension, 1536);
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.backfill.batch_size, config.backfill.batch_size);
        assert_eq!(parsed.logging.level, config.logging.level);
    }
}
