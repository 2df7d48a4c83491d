//! FTS5 keyword index.
//!
//! `bm25()` only orders candidates. Its scale depends on corpus size, so
//! callers must not compare it against any threshold.

use async_trait::async_trait;
use tracing::{debug, warn};

use termsnap_protocols::{CacheError, Entry, EntryMetadata, KeywordIndex};

use crate::store::{row_to_entry, SqliteStore, ENTRY_COLUMNS};

/// Terms shorter than this are matched exactly, longer ones as prefixes.
const MIN_PREFIX_LEN: usize = 3;

/// Scope predicate bound to parameter `?{param}`.
///
/// A NULL parameter admits every entry; otherwise unscoped entries and
/// entries of that scope qualify.
pub(crate) fn scope_filter(param: usize) -> String {
    format!("(?{param} IS NULL OR e.scope_key IS NULL OR e.scope_key = ?{param})")
}

/// Which entries a keyword query may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Filter {
    /// Active entries whose output worked.
    Successful,
    /// All active entries.
    Active,
}

impl Filter {
    fn sql(self) -> &'static str {
        match self {
            Filter::Successful => "e.is_active = 1 AND e.succeeded = 1",
            Filter::Active => "e.is_active = 1",
        }
    }
}

/// Split text on Unicode word boundaries (anything that is not alphanumeric).
pub(crate) fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
}

/// Build an FTS5 MATCH expression from free text.
///
/// Each term is double-quoted so user input can never be parsed as FTS5
/// operators, then the terms are OR-ed so partial overlaps still rank.
pub(crate) fn build_match_query(query: &str) -> Option<String> {
    let terms: Vec<String> = tokenize(query)
        .map(|t| {
            let term = t.to_lowercase();
            if term.chars().count() >= MIN_PREFIX_LEN {
                format!("\"{}\"*", term)
            } else {
                format!("\"{}\"", term)
            }
        })
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

impl<M: EntryMetadata> SqliteStore<M> {
    async fn ranked_search(
        &self,
        query: &str,
        limit: usize,
        scope_key: Option<&str>,
        filter: Filter,
    ) -> Result<Vec<Entry<M>>, CacheError> {
        let Some(match_query) = build_match_query(query) else {
            return Ok(vec![]);
        };

        let sql = format!(
            "SELECT {ENTRY_COLUMNS}
             FROM {ns}_fts
             JOIN {ns}_entries e ON e.id = {ns}_fts.rowid
             WHERE {ns}_fts MATCH ?1 AND {filter} AND {scope}
             ORDER BY bm25({ns}_fts), e.use_count DESC, e.id DESC
             LIMIT ?2",
            ns = M::NAMESPACE,
            filter = filter.sql(),
            scope = scope_filter(3)
        );

        let scope = scope_key.map(str::to_string);

        let ranked = self
            .conn()
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let entries = stmt
                    .query_map(
                        rusqlite::params![match_query, limit as i64, scope],
                        row_to_entry::<M>,
                    )?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await;

        match ranked {
            Ok(entries) => {
                debug!(namespace = M::NAMESPACE, count = entries.len(), "FTS search");
                Ok(entries)
            }
            Err(e) => {
                warn!(
                    namespace = M::NAMESPACE,
                    "FTS search failed, falling back to substring scan: {}", e
                );
                self.substring_search(query, limit, scope_key, filter).await
            }
        }
    }

    /// Plain substring scan over the request text.
    ///
    /// Case-insensitive for ASCII only: SQLite's `lower()` leaves other
    /// characters alone, so the needle is folded the same way.
    async fn substring_search(
        &self,
        query: &str,
        limit: usize,
        scope_key: Option<&str>,
        filter: Filter,
    ) -> Result<Vec<Entry<M>>, CacheError> {
        let needle = query.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return Ok(vec![]);
        }

        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM {ns}_entries e
             WHERE {filter} AND {scope} AND instr(lower(e.input_text), ?1) > 0
             ORDER BY e.use_count DESC, e.id DESC
             LIMIT ?2",
            ns = M::NAMESPACE,
            filter = filter.sql(),
            scope = scope_filter(3)
        );

        let scope = scope_key.map(str::to_string);
        self.conn()
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let entries = stmt
                    .query_map(rusqlite::params![needle, limit as i64, scope], row_to_entry::<M>)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(|e| CacheError::QueryError(format!("Substring search failed: {}", e)))
    }
}

#[async_trait]
impl<M: EntryMetadata> KeywordIndex<M> for SqliteStore<M> {
    async fn keyword_search(
        &self,
        query: &str,
        limit: usize,
        scope_key: Option<&str>,
    ) -> Result<Vec<Entry<M>>, CacheError> {
        self.ranked_search(query, limit, scope_key, Filter::Successful)
            .await
    }

    async fn find_similar(&self, query: &str, limit: usize) -> Result<Vec<Entry<M>>, CacheError> {
        self.ranked_search(query, limit, None, Filter::Active).await
    }
}

#[cfg(test)]
#[path = "keyword_tests.rs"]
mod tests;
