//! The two cache instantiations.

use termsnap_protocols::{CacheError, CommandMetadata, Entry, EntryId, QaMetadata};

use crate::cache::SemanticCache;

/// Natural-language request to shell command history.
///
/// Entries are never deleted; failed commands are demoted with
/// [`SemanticCache::record_outcome`] instead.
pub type CommandCache = SemanticCache<CommandMetadata>;

/// Curated question and answer store.
pub type KnowledgeBase = SemanticCache<QaMetadata>;

impl SemanticCache<CommandMetadata> {
    /// Most used commands, optionally for one profile.
    pub async fn frequent_commands(
        &self,
        limit: usize,
        scope_key: Option<&str>,
    ) -> Result<Vec<Entry<CommandMetadata>>, CacheError> {
        self.frequent(limit, scope_key).await
    }
}

impl SemanticCache<QaMetadata> {
    /// Questions related to `input`, for a "see also" list.
    pub async fn find_similar_questions(
        &self,
        input: &str,
        limit: usize,
    ) -> Result<Vec<Entry<QaMetadata>>, CacheError> {
        self.find_similar(input, limit).await
    }

    /// Hide an entry from every lookup. Returns `false` if it was not active.
    pub async fn deactivate(&self, id: EntryId) -> Result<bool, CacheError> {
        self.store().deactivate(id).await
    }

    /// Remove an entry permanently.
    pub async fn hard_delete(&self, id: EntryId) -> Result<bool, CacheError> {
        self.store().hard_delete(id).await
    }
}
