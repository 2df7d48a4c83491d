//! Error types for the termsnap protocol layer.

mod cache;
mod embedding;
mod generation;

pub use cache::*;
pub use embedding::*;
pub use generation::*;
