//! # termsnap Protocols
//!
//! Core types and trait definitions shared by the termsnap crates.
//! Contains only interface definitions and small value types - no storage
//! or network implementations.
//!
//! ## Core Traits
//!
//! - [`EntryStore`] - Durable record storage for cache entries
//! - [`KeywordIndex`] - Full-text candidate search over entry input text
//! - [`VectorIndex`] - Linear cosine-similarity scan over stored embeddings
//! - [`HybridStore`] - Everything a semantic cache needs from its backend
//! - [`EmbeddingProvider`] - Text to fixed-dimension vector conversion
//! - [`GenerationProvider`] - Fresh generation on a full cache miss
//! - [`EntryMetadata`] - Payload type carried by one cache instantiation

pub mod embedding;
pub mod entry;
pub mod error;
pub mod generation;
pub mod metadata;
pub mod store;

pub use embedding::{Embedding, EmbeddingProvider};
pub use entry::{CacheResult, Entry, EntryId, MatchStage, NewEntry};
pub use error::{CacheError, EmbeddingError, GenerationError};
pub use generation::{Generated, GenerationProvider};
pub use metadata::{CommandMetadata, EntryMetadata, QaMetadata};
pub use store::{EntryStore, HybridStore, KeywordIndex, StoreStats, VectorIndex, VectorMatch};
