//! Linear-scan vector index.

use std::cmp::Ordering;

use async_trait::async_trait;
use tracing::debug;

use termsnap_protocols::{CacheError, Embedding, Entry, EntryMetadata, VectorIndex, VectorMatch};

use crate::keyword::scope_filter;
use crate::store::{row_to_entry, SqliteStore, ENTRY_COLUMNS};

/// Score `candidates` against `query`, keeping the best `limit` at or above
/// `min_similarity`.
///
/// Candidates without an embedding, or whose dimension differs from the
/// query, are skipped. Ties keep the candidates' incoming order.
pub(crate) fn rank_by_similarity<M>(
    query: &Embedding,
    candidates: Vec<Entry<M>>,
    min_similarity: f32,
    limit: usize,
) -> (Vec<VectorMatch<M>>, usize) {
    let mut skipped = 0;
    let mut results: Vec<VectorMatch<M>> = candidates
        .into_iter()
        .filter_map(|entry| {
            let similarity = entry
                .embedding
                .as_ref()
                .and_then(|emb| query.cosine_similarity(emb));
            match similarity {
                Some(similarity) => Some(VectorMatch { entry, similarity }),
                None => {
                    skipped += 1;
                    None
                }
            }
        })
        .filter(|m| m.similarity >= min_similarity)
        .collect();

    // Stable sort, descending by score
    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
    });

    results.truncate(limit);
    (results, skipped)
}

#[async_trait]
impl<M: EntryMetadata> VectorIndex<M> for SqliteStore<M> {
    async fn vector_search(
        &self,
        query: &Embedding,
        min_similarity: f32,
        limit: usize,
        scope_key: Option<&str>,
    ) -> Result<Vec<VectorMatch<M>>, CacheError> {
        if limit == 0 || query.dimension == 0 {
            return Ok(vec![]);
        }

        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM {ns}_entries e
             WHERE e.is_active = 1 AND e.succeeded = 1 AND e.embedding IS NOT NULL
               AND {scope}
             ORDER BY e.use_count DESC, e.id DESC",
            ns = M::NAMESPACE,
            scope = scope_filter(1)
        );

        let scope = scope_key.map(str::to_string);

        let candidates = self
            .conn()
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let entries = stmt
                    .query_map([scope], row_to_entry::<M>)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(|e| CacheError::QueryError(format!("Vector scan failed: {}", e)))?;

        let scanned = candidates.len();
        let (results, skipped) = rank_by_similarity(query, candidates, min_similarity, limit);

        debug!(
            namespace = M::NAMESPACE,
            scanned,
            skipped,
            matched = results.len(),
            "Vector scan"
        );
        Ok(results)
    }
}

#[cfg(test)]
#[path = "vector_tests.rs"]
mod tests;
