//! End-to-end tests over a file-backed SQLite store.
//!
//! These cover the full lifecycle: generate on a miss, serve from cache,
//! backfill embeddings, and reopen the database.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use termsnap_cache::{BackfillWorker, CacheSettings, CommandCache, KnowledgeBase, MatchStage};
use termsnap_protocols::{
    CommandMetadata, Embedding, EmbeddingError, EmbeddingProvider, Generated, GenerationError,
    GenerationProvider, QaMetadata,
};
use termsnap_store_sqlite::{open_file, SqliteStore};

// ============================================================================
// Test Helpers
// ============================================================================

/// Bag-of-letters embedding: similar spellings land close together.
struct LetterEmbedder {
    calls: AtomicUsize,
}

impl LetterEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector = vec![0.0; 26];
        for c in text.to_lowercase().chars().filter(char::is_ascii_lowercase) {
            vector[(c as u8 - b'a') as usize] += 1.0;
        }
        Ok(Embedding::new(vector))
    }

    fn dimension(&self) -> usize {
        26
    }
}

struct CountingGenerator {
    output: &'static str,
    calls: AtomicUsize,
}

impl CountingGenerator {
    fn new(output: &'static str) -> Self {
        Self {
            output,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl GenerationProvider<CommandMetadata> for CountingGenerator {
    async fn generate(&self, _text: &str) -> Result<Generated<CommandMetadata>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Generated::new(self.output)
            .with_metadata(CommandMetadata::default().with_confidence(0.9)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_generate_then_serve_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        SqliteStore::<CommandMetadata>::open(dir.path().join("cache.db"))
            .await
            .unwrap(),
    );
    let cache = CommandCache::new(store);
    let generator = CountingGenerator::new("free -h");

    let first = cache
        .resolve_or_generate("show memory usage", Some("laptop"), &generator)
        .await
        .unwrap();
    assert!(!first.is_from_cache);

    let second = cache
        .resolve_or_generate("Show  memory usage", Some("laptop"), &generator)
        .await
        .unwrap();
    assert!(second.is_from_cache);
    assert_eq!(second.stage, MatchStage::Keyword);
    assert_eq!(second.entry.as_ref().unwrap().output_text, "free -h");
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

    let frequent = cache.frequent_commands(5, Some("laptop")).await.unwrap();
    assert_eq!(frequent.len(), 1);
    assert_eq!(frequent[0].use_count, 1);
    assert!((frequent[0].metadata.confidence.unwrap() - 0.9).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_backfill_enables_vector_hits_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");

    // First session: keyword-only, so nothing gets embedded.
    {
        let store = Arc::new(SqliteStore::<CommandMetadata>::open(&path).await.unwrap());
        let cache = CommandCache::new(store);
        let generator = CountingGenerator::new("sudo systemctl restart nginx");
        cache
            .resolve_or_generate("restart nginx", None, &generator)
            .await
            .unwrap();
        assert_eq!(cache.stats().await.unwrap().pending_embeddings(), 1);
    }

    // Second session: backfill, then a misspelled request hits via vectors.
    let store = Arc::new(SqliteStore::<CommandMetadata>::open(&path).await.unwrap());
    let embedder = Arc::new(LetterEmbedder::new());

    let worker = BackfillWorker::new(store.clone(), embedder.clone())
        .with_delay(Duration::ZERO);
    assert_eq!(worker.run_until_complete().await.unwrap(), 1);

    let cache = CommandCache::new(store).with_embedder(embedder.clone());
    let result = cache.resolve("restart ngnix", None).await.unwrap();

    assert!(result.is_hit());
    assert_eq!(result.stage, MatchStage::Vector);
    assert_eq!(
        result.entry.unwrap().output_text,
        "sudo systemctl restart nginx"
    );
}

#[tokio::test]
async fn test_both_caches_share_one_database() {
    let dir = tempfile::tempdir().unwrap();
    let conn = Arc::new(open_file(dir.path().join("shared.db")).await.unwrap());

    let commands = CommandCache::new(Arc::new(
        SqliteStore::<CommandMetadata>::with_connection(conn.clone())
            .await
            .unwrap(),
    ));
    let knowledge = KnowledgeBase::new(Arc::new(
        SqliteStore::<QaMetadata>::with_connection(conn)
            .await
            .unwrap(),
    ))
    .with_settings(CacheSettings {
        high_threshold: 0.8,
        min_vector_similarity: 0.7,
        ..CacheSettings::default()
    });

    commands
        .persist("list open ports", Generated::new("ss -tulpn"), None)
        .await
        .unwrap();
    let faq = knowledge
        .persist(
            "which ports are open on the gateway",
            Generated::new("22 and 443."),
            None,
        )
        .await
        .unwrap();

    assert_eq!(commands.stats().await.unwrap().total, 1);
    assert_eq!(knowledge.stats().await.unwrap().total, 1);

    // Each namespace only sees its own entries.
    let miss = commands
        .resolve("which ports are open on the gateway", None)
        .await
        .unwrap();
    assert!(miss.entry.is_none());
    let hit = knowledge.resolve("which ports are open on gateway", None).await.unwrap();
    assert_eq!(hit.entry.unwrap().id, faq.id);
}
