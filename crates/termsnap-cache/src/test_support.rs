//! Scripted providers shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use termsnap_protocols::{
    Embedding, EmbeddingError, EmbeddingProvider, EntryMetadata, Generated, GenerationError,
    GenerationProvider,
};
use termsnap_store_sqlite::SqliteStore;

/// Returns fixed vectors per text; unknown texts get `fallback` or fail.
pub struct ScriptedEmbedder {
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
    fallback: Option<Vec<f32>>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl ScriptedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: HashMap::new(),
            fallback: None,
            failing: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn with_fallback(mut self, vector: Vec<f32>) -> Self {
        self.fallback = Some(vector);
        self
    }

    pub fn fail_on(self, text: &str) -> Self {
        self.failing.lock().unwrap().insert(text.to_string());
        self
    }

    pub fn recover(&self, text: &str) {
        self.failing.lock().unwrap().remove(text);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(text) {
            return Err(EmbeddingError::Failed(format!("scripted failure for '{}'", text)));
        }
        self.vectors
            .get(text)
            .or(self.fallback.as_ref())
            .map(|v| Embedding::new(v.clone()))
            .ok_or_else(|| EmbeddingError::Failed(format!("no vector for '{}'", text)))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Counts calls and returns a fixed output, or fails.
pub struct ScriptedGenerator {
    output: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn returning(output: &str) -> Self {
        Self {
            output: Some(output.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            output: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<M: EntryMetadata> GenerationProvider<M> for ScriptedGenerator {
    async fn generate(&self, _text: &str) -> Result<Generated<M>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.output {
            Some(output) => Ok(Generated::new(output.clone())),
            None => Err(GenerationError::Failed("provider unavailable".to_string())),
        }
    }
}

pub async fn memory_store<M: EntryMetadata>() -> Arc<SqliteStore<M>> {
    Arc::new(SqliteStore::in_memory().await.unwrap())
}
