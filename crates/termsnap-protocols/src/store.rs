//! Storage protocol definitions.
//!
//! A semantic cache needs three capabilities from its backend: durable
//! entry storage, ranked keyword candidates and a vector similarity scan.
//! [`HybridStore`] bundles them so one backend object serves all three.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;
use crate::entry::{Entry, EntryId, NewEntry};
use crate::error::CacheError;
use crate::metadata::EntryMetadata;

/// Durable record storage. Every mutation is atomic on its own.
#[async_trait]
pub trait EntryStore<M: EntryMetadata>: Send + Sync {
    /// Insert an entry (and its embedding, if any) in one transaction.
    async fn insert(&self, entry: NewEntry<M>) -> Result<EntryId, CacheError>;

    async fn get(&self, id: EntryId) -> Result<Option<Entry<M>>, CacheError>;

    /// Add one to the use count at the storage layer.
    async fn increment_use_count(&self, id: EntryId) -> Result<(), CacheError>;

    async fn update_embedding(&self, id: EntryId, embedding: &Embedding) -> Result<(), CacheError>;

    /// Record whether the output worked when the caller ran it.
    async fn record_outcome(&self, id: EntryId, succeeded: bool) -> Result<(), CacheError>;

    /// Active entries that still lack an embedding, least recently touched first.
    async fn entries_without_embedding(&self, batch_size: usize) -> Result<Vec<Entry<M>>, CacheError>;

    /// Push a pending entry to the back of the backfill queue.
    async fn defer_backfill(&self, id: EntryId) -> Result<(), CacheError>;

    /// Active entries ranked by use count, optionally restricted to a scope.
    async fn frequent(&self, limit: usize, scope_key: Option<&str>) -> Result<Vec<Entry<M>>, CacheError>;

    /// Soft delete. Returns `false` if no active entry had this id.
    async fn deactivate(&self, id: EntryId) -> Result<bool, CacheError>;

    /// Physical delete. Returns `false` if no entry had this id.
    async fn hard_delete(&self, id: EntryId) -> Result<bool, CacheError>;

    async fn stats(&self) -> Result<StoreStats, CacheError>;
}

/// Full-text candidate search. Ranks are for ordering only.
#[async_trait]
pub trait KeywordIndex<M: EntryMetadata>: Send + Sync {
    /// Ranked candidates among active, successful entries.
    ///
    /// With `scope_key` set, entries stored under another scope are excluded
    /// before `limit` applies; unscoped entries always qualify.
    async fn keyword_search(
        &self,
        query: &str,
        limit: usize,
        scope_key: Option<&str>,
    ) -> Result<Vec<Entry<M>>, CacheError>;

    /// Broader ranked match over all active entries, for suggestion lists.
    async fn find_similar(&self, query: &str, limit: usize) -> Result<Vec<Entry<M>>, CacheError>;
}

/// Similarity scan over stored embeddings.
#[async_trait]
pub trait VectorIndex<M: EntryMetadata>: Send + Sync {
    /// Entries with `similarity >= min_similarity`, best first, at most `limit`.
    ///
    /// `scope_key` filters the same way as [`KeywordIndex::keyword_search`].
    async fn vector_search(
        &self,
        query: &Embedding,
        min_similarity: f32,
        limit: usize,
        scope_key: Option<&str>,
    ) -> Result<Vec<VectorMatch<M>>, CacheError>;
}

/// Everything the retrieval orchestrator needs from a backend.
pub trait HybridStore<M: EntryMetadata>: EntryStore<M> + KeywordIndex<M> + VectorIndex<M> {}

impl<M, T> HybridStore<M> for T
where
    M: EntryMetadata,
    T: EntryStore<M> + KeywordIndex<M> + VectorIndex<M>,
{
}

/// One vector-search result.
#[derive(Debug, Clone)]
pub struct VectorMatch<M> {
    pub entry: Entry<M>,
    pub similarity: f32,
}

/// Entry counts for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total: u64,
    pub active: u64,
    pub embedded: u64,
}

impl StoreStats {
    /// Active entries still waiting for backfill.
    pub fn pending_embeddings(&self) -> u64 {
        self.active.saturating_sub(self.embedded)
    }
}
