//! termsnap - a hybrid semantic cache for natural-language shell requests.
//!
//! This crate wires the workspace together for a host application:
//! [`CacheService`] builds the command cache and the knowledge base from a
//! [`Config`], and [`logging::init`] installs the tracing subscriber.
//!
//! ```no_run
//! # async fn demo() -> Result<(), termsnap::ServiceError> {
//! let config = termsnap::ConfigLoader::load_str("")?;
//! termsnap::logging::init(&config.logging)?;
//!
//! let service = termsnap::CacheService::from_config(&config).await?;
//! let result = service.commands().resolve("list files by size", None).await?;
//! if !result.is_from_cache {
//!     // ask the generation provider, then persist
//! }
//! service.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod logging;
mod service;

pub use error::ServiceError;
pub use service::CacheService;

pub use termsnap_cache::{
    BackfillWorker, CacheSettings, CommandCache, KnowledgeBase, SemanticCache,
};
pub use termsnap_config::{Config, ConfigLoader};
pub use termsnap_protocols::{
    CacheError, CacheResult, CommandMetadata, Entry, EntryId, Generated, GenerationProvider,
    MatchStage, QaMetadata,
};
