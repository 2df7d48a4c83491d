//! OpenAI-compatible embedding provider for termsnap.
//!
//! Talks to any service exposing the `/embeddings` endpoint shape
//! (OpenAI, Azure OpenAI, local gateways).

mod provider;

pub use provider::{OpenAIEmbedding, OpenAIEmbeddingConfig};
