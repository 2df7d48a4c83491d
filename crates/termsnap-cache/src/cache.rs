//! Hybrid retrieval orchestrator.
//!
//! A lookup runs the keyword stage, then the vector stage, then reports a
//! miss. Backend ranks (BM25, scan order) only pick candidates; the hit
//! decision always compares a bounded similarity against the threshold.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use termsnap_protocols::{
    CacheError, CacheResult, Embedding, EmbeddingProvider, Entry, EntryId, EntryMetadata,
    Generated, GenerationProvider, HybridStore, MatchStage, NewEntry, StoreStats,
};

use crate::similarity::{jaccard_similarity, normalize_input};

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;

/// Thresholds and candidate counts for one cache.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Similarity at or above which either stage reports a hit.
    pub high_threshold: f32,
    /// Floor below which vector candidates are not considered.
    pub min_vector_similarity: f32,
    /// Vector floor for advisory suggestion lists.
    pub suggestion_similarity: f32,
    /// Keyword candidates scored per lookup. The best Jaccard score among
    /// them decides the hit; `1` scores only the top-ranked candidate.
    pub keyword_candidates: usize,
    /// Vector candidates requested per lookup.
    pub vector_candidates: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            high_threshold: 0.85,
            min_vector_similarity: 0.75,
            suggestion_similarity: 0.6,
            keyword_candidates: 5,
            vector_candidates: 5,
        }
    }
}

/// A lookup result plus the query embedding, if one was computed.
struct Lookup<M> {
    result: CacheResult<M>,
    query_embedding: Option<Embedding>,
}

/// Semantic cache over one payload type.
///
/// Cheap to share behind an `Arc`; every method takes `&self` and holds no
/// lock across awaits. All mutable state lives in the store.
pub struct SemanticCache<M: EntryMetadata> {
    store: Arc<dyn HybridStore<M>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    settings: CacheSettings,
}

impl<M: EntryMetadata> SemanticCache<M> {
    /// Create a keyword-only cache with default settings.
    pub fn new(store: Arc<dyn HybridStore<M>>) -> Self {
        Self {
            store,
            embedder: None,
            settings: CacheSettings::default(),
        }
    }

    /// Enable the vector stage.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_settings(mut self, settings: CacheSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn has_embedder(&self) -> bool {
        self.embedder.is_some()
    }

    pub(crate) fn store(&self) -> &dyn HybridStore<M> {
        self.store.as_ref()
    }

    /// Look `input` up without generating anything.
    ///
    /// When `scope_key` is set, entries stored under a different scope are
    /// not eligible; unscoped entries always are. A hit bumps the entry's
    /// use count. Embedding and vector-scan failures degrade to a miss.
    pub async fn resolve(
        &self,
        input: &str,
        scope_key: Option<&str>,
    ) -> Result<CacheResult<M>, CacheError> {
        let query = normalize_input(input);
        if query.is_empty() {
            return Ok(CacheResult::miss(0.0));
        }

        Ok(self.lookup(&query, scope_key).await?.result)
    }

    /// Resolve `input`, generating and persisting a fresh entry on a miss.
    ///
    /// Generation failures surface as [`CacheError::Generation`]. The new
    /// entry reuses the query embedding from the vector stage when there was
    /// one; otherwise one best-effort embedding call is made.
    pub async fn resolve_or_generate(
        &self,
        input: &str,
        scope_key: Option<&str>,
        generator: &dyn GenerationProvider<M>,
    ) -> Result<CacheResult<M>, CacheError> {
        let query = normalize_input(input);
        if query.is_empty() {
            return Err(CacheError::QueryError("input is empty".to_string()));
        }

        let lookup = self.lookup(&query, scope_key).await?;
        if lookup.result.is_hit() {
            return Ok(lookup.result);
        }

        let generated = generator.generate(&query).await?;
        let embedding = match lookup.query_embedding {
            Some(embedding) => Some(embedding),
            None => self.embed_best_effort(&query).await,
        };
        let entry = self.insert(&query, generated, scope_key, embedding).await?;

        Ok(CacheResult {
            is_from_cache: false,
            entry: Some(entry),
            similarity: lookup.result.similarity,
            stage: MatchStage::Miss,
        })
    }

    /// Store a generation for `input`, embedding it if a provider is set.
    ///
    /// An embedding failure leaves the entry for the backfill worker.
    pub async fn persist(
        &self,
        input: &str,
        generated: Generated<M>,
        scope_key: Option<&str>,
    ) -> Result<Entry<M>, CacheError> {
        let text = normalize_input(input);
        if text.is_empty() {
            return Err(CacheError::QueryError("input is empty".to_string()));
        }

        let embedding = self.embed_best_effort(&text).await;
        self.insert(&text, generated, scope_key, embedding).await
    }

    /// Record whether an entry's output worked when it was run.
    ///
    /// Failed entries stop being served as hits but still show up in
    /// [`SemanticCache::find_similar`].
    pub async fn record_outcome(&self, id: EntryId, succeeded: bool) -> Result<(), CacheError> {
        self.store.record_outcome(id, succeeded).await
    }

    pub async fn get(&self, id: EntryId) -> Result<Option<Entry<M>>, CacheError> {
        self.store.get(id).await
    }

    /// Active entries ranked by use count, optionally within one scope.
    pub async fn frequent(
        &self,
        limit: usize,
        scope_key: Option<&str>,
    ) -> Result<Vec<Entry<M>>, CacheError> {
        self.store.frequent(limit, scope_key).await
    }

    /// Advisory suggestions for `input`.
    ///
    /// Keyword matches come first, then vector matches above the lower
    /// suggestion floor, de-duplicated by id and capped at `limit`. Never
    /// touches use counts.
    pub async fn find_similar(&self, input: &str, limit: usize) -> Result<Vec<Entry<M>>, CacheError> {
        let query = normalize_input(input);
        if query.is_empty() || limit == 0 {
            return Ok(vec![]);
        }

        let mut seen = HashSet::new();
        let mut results: Vec<Entry<M>> = self
            .store
            .find_similar(&query, limit)
            .await?
            .into_iter()
            .filter(|entry| seen.insert(entry.id))
            .collect();

        if results.len() < limit {
            if let Some(embedding) = self.embed_best_effort(&query).await {
                match self
                    .store
                    .vector_search(&embedding, self.settings.suggestion_similarity, limit, None)
                    .await
                {
                    Ok(matches) => results.extend(
                        matches
                            .into_iter()
                            .map(|m| m.entry)
                            .filter(|entry| seen.insert(entry.id)),
                    ),
                    Err(e) => warn!("Vector suggestions unavailable: {}", e),
                }
            }
        }

        results.truncate(limit);
        Ok(results)
    }

    pub async fn stats(&self) -> Result<StoreStats, CacheError> {
        self.store.stats().await
    }

    async fn lookup(&self, query: &str, scope_key: Option<&str>) -> Result<Lookup<M>, CacheError> {
        let mut best_similarity = 0.0_f32;

        let candidates = self
            .store
            .keyword_search(query, self.settings.keyword_candidates, scope_key)
            .await?;
        let mut top: Option<(Entry<M>, f32)> = None;
        for entry in candidates {
            let similarity = jaccard_similarity(query, &entry.input_text);
            best_similarity = best_similarity.max(similarity);
            if top.as_ref().is_none_or(|(_, s)| similarity > *s) {
                top = Some((entry, similarity));
            }
        }

        if let Some((entry, similarity)) = top {
            if similarity >= self.settings.high_threshold {
                let entry = self.record_hit(entry).await?;
                info!(id = entry.id, similarity, stage = %MatchStage::Keyword, "Cache hit");
                return Ok(Lookup {
                    result: CacheResult::hit(entry, similarity, MatchStage::Keyword),
                    query_embedding: None,
                });
            }
        }

        let Some(embedder) = &self.embedder else {
            debug!(best_similarity, "Cache miss (keyword only)");
            return Ok(Lookup {
                result: CacheResult::miss(best_similarity),
                query_embedding: None,
            });
        };

        let embedding = match embedder.embed(query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Query embedding failed, skipping vector stage: {}", e);
                return Ok(Lookup {
                    result: CacheResult::miss(best_similarity),
                    query_embedding: None,
                });
            }
        };

        let matches = match self
            .store
            .vector_search(
                &embedding,
                self.settings.min_vector_similarity,
                self.settings.vector_candidates,
                scope_key,
            )
            .await
        {
            Ok(matches) => matches,
            Err(e) => {
                warn!("Vector search failed: {}", e);
                Vec::new()
            }
        };

        if let Some(best) = matches.into_iter().next() {
            best_similarity = best_similarity.max(best.similarity);
            if best.similarity >= self.settings.high_threshold {
                let entry = self.record_hit(best.entry).await?;
                info!(id = entry.id, similarity = best.similarity, stage = %MatchStage::Vector, "Cache hit");
                return Ok(Lookup {
                    result: CacheResult::hit(entry, best.similarity, MatchStage::Vector),
                    query_embedding: Some(embedding),
                });
            }
        }

        debug!(best_similarity, "Cache miss");
        Ok(Lookup {
            result: CacheResult::miss(best_similarity),
            query_embedding: Some(embedding),
        })
    }

    /// Bump the stored counter and reflect it in the returned entry.
    async fn record_hit(&self, mut entry: Entry<M>) -> Result<Entry<M>, CacheError> {
        self.store.increment_use_count(entry.id).await?;
        entry.use_count += 1;
        Ok(entry)
    }

    async fn embed_best_effort(&self, text: &str) -> Option<Embedding> {
        let embedder = self.embedder.as_ref()?;
        match embedder.embed(text).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!("Embedding failed, entry left for backfill: {}", e);
                None
            }
        }
    }

    async fn insert(
        &self,
        text: &str,
        generated: Generated<M>,
        scope_key: Option<&str>,
        embedding: Option<Embedding>,
    ) -> Result<Entry<M>, CacheError> {
        let mut new_entry =
            NewEntry::new(text, generated.output_text).with_metadata(generated.metadata);
        new_entry.explanation = generated.explanation;
        new_entry.scope_key = scope_key.map(str::to_string);
        new_entry.embedding = embedding;

        let id = self.store.insert(new_entry).await?;
        debug!(id, namespace = M::NAMESPACE, "Persisted entry");

        self.store.get(id).await?.ok_or(CacheError::NotFound(id))
    }
}

