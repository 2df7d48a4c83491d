//! # termsnap Cache
//!
//! Hybrid semantic cache: a keyword stage, then a vector stage, then a miss
//! that the caller resolves with a generation provider.
//!
//! The retrieval logic is written once in [`SemanticCache`] and
//! instantiated for shell commands ([`CommandCache`]) and for curated
//! questions and answers ([`KnowledgeBase`]). [`BackfillWorker`] fills in
//! embeddings for entries stored while no embedding was available.

mod backfill;
mod cache;
mod instances;
mod similarity;

#[cfg(test)]
mod test_support;

pub use backfill::BackfillWorker;
pub use cache::{CacheSettings, SemanticCache};
pub use instances::{CommandCache, KnowledgeBase};
pub use similarity::{jaccard_similarity, normalize_input};

pub use termsnap_protocols::{CacheResult, Entry, EntryId, MatchStage};
