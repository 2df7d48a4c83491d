//! Service assembly from configuration.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use termsnap_cache::{BackfillWorker, CacheSettings, CommandCache, KnowledgeBase};
use termsnap_config::{BackfillConfig, CacheConfig, Config, EmbeddingConfig};
use termsnap_embedding_openai::{OpenAIEmbedding, OpenAIEmbeddingConfig};
use termsnap_protocols::{CommandMetadata, EmbeddingProvider, EntryMetadata, QaMetadata};
use termsnap_store_sqlite::{open_file, SqliteStore};

use crate::error::ServiceError;

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;

/// The command cache and knowledge base over one database, plus their
/// backfill workers.
///
/// Construct one per database and pass it around explicitly; nothing here is
/// global.
pub struct CacheService {
    commands: Arc<CommandCache>,
    knowledge: Arc<KnowledgeBase>,
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

impl CacheService {
    /// Build the service, using the OpenAI-compatible provider when
    /// embeddings are enabled and an API key is configured.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let embedder = build_embedder(&config.embedding)?;
        Self::build(config, embedder).await
    }

    /// Build the service with an explicit embedding provider (or none).
    pub async fn build(
        config: &Config,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Result<Self, ServiceError> {
        let path = &config.cache.database_path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Arc::new(open_file(path).await?);
        let command_store =
            Arc::new(SqliteStore::<CommandMetadata>::with_connection(conn.clone()).await?);
        let qa_store = Arc::new(SqliteStore::<QaMetadata>::with_connection(conn).await?);

        let settings = cache_settings(&config.cache);
        let mut commands =
            CommandCache::new(command_store.clone()).with_settings(settings.clone());
        let mut knowledge = KnowledgeBase::new(qa_store.clone()).with_settings(settings);

        let cancel = CancellationToken::new();
        let mut workers = Vec::new();

        if let Some(embedder) = embedder {
            commands = commands.with_embedder(embedder.clone());
            knowledge = knowledge.with_embedder(embedder.clone());

            if config.backfill.enabled {
                let backfill = &config.backfill;
                workers.push(spawn_backfill(command_store, embedder.clone(), backfill, &cancel));
                workers.push(spawn_backfill(qa_store, embedder, backfill, &cancel));
            }
        }

        info!(
            database = %path.display(),
            vector_search = commands.has_embedder(),
            backfill_workers = workers.len(),
            "Cache service ready"
        );

        Ok(Self {
            commands: Arc::new(commands),
            knowledge: Arc::new(knowledge),
            cancel,
            workers,
        })
    }

    pub fn commands(&self) -> Arc<CommandCache> {
        self.commands.clone()
    }

    pub fn knowledge(&self) -> Arc<KnowledgeBase> {
        self.knowledge.clone()
    }

    /// Stop the backfill workers and wait for them to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!("Backfill worker ended abnormally: {}", e);
            }
        }
    }
}

/// Map configured thresholds onto cache settings.
pub(crate) fn cache_settings(config: &CacheConfig) -> CacheSettings {
    CacheSettings {
        high_threshold: config.high_threshold,
        min_vector_similarity: config.min_vector_similarity,
        suggestion_similarity: config.suggestion_similarity,
        keyword_candidates: config.keyword_candidates,
        vector_candidates: config.vector_candidates,
    }
}

fn build_embedder(
    config: &EmbeddingConfig,
) -> Result<Option<Arc<dyn EmbeddingProvider>>, ServiceError> {
    if !config.enabled {
        return Ok(None);
    }

    let Some(api_key) = config.api_key.as_deref().filter(|k| !k.is_empty()) else {
        warn!("Embeddings enabled without an API key, running keyword-only");
        return Ok(None);
    };

    let provider = OpenAIEmbedding::new(
        OpenAIEmbeddingConfig::new(api_key)
            .with_model(config.model.clone())
            .with_base_url(config.base_url.clone())
            .with_dimension(config.dimension)
            .with_timeout(Duration::from_secs(config.timeout_secs)),
    )?;

    Ok(Some(Arc::new(provider)))
}

fn spawn_backfill<M: EntryMetadata>(
    store: Arc<SqliteStore<M>>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: &BackfillConfig,
    cancel: &CancellationToken,
) -> JoinHandle<()> {
    BackfillWorker::new(store, embedder)
        .with_batch_size(config.batch_size)
        .with_delay(Duration::from_millis(config.delay_ms))
        .with_run_on_startup(config.run_on_startup)
        .spawn(Duration::from_secs(config.interval_secs), cancel.child_token())
}
