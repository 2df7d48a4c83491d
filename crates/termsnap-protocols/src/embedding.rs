//! Embedding value type and provider protocol.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EmbeddingError;

/// A fixed-dimension vector representation of a piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// Vector representation.
    pub vector: Vec<f32>,
    /// Dimension of the embedding.
    pub dimension: usize,
}

impl Embedding {
    pub fn new(vector: Vec<f32>) -> Self {
        let dimension = vector.len();
        Self { vector, dimension }
    }

    /// Cosine similarity with another embedding.
    ///
    /// Returns `None` when the dimensions differ; callers skip such pairs
    /// instead of comparing them. Zero vectors have similarity `0.0`.
    pub fn cosine_similarity(&self, other: &Self) -> Option<f32> {
        if self.dimension != other.dimension || self.vector.len() != other.vector.len() {
            return None;
        }

        let dot: f32 = self
            .vector
            .iter()
            .zip(other.vector.iter())
            .map(|(a, b)| a * b)
            .sum();

        let norm_a: f32 = self.vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = other.vector.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return Some(0.0);
        }

        Some(dot / (norm_a * norm_b))
    }
}

/// Converts text into embeddings.
///
/// Providers are optional collaborators: a cache without one runs keyword-only.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for text.
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// The dimension every embedding from this provider has.
    fn dimension(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(Vec<f32>);

    #[async_trait]
    impl EmbeddingProvider for Constant {
        async fn embed(&self, _text: &str) -> Result<Embedding, EmbeddingError> {
            Ok(Embedding::new(self.0.clone()))
        }

        fn dimension(&self) -> usize {
            self.0.len()
        }
    }

    #[test]
    fn test_embedding_creation() {
        let emb = Embedding::new(vec![0.5, 0.5, 0.0, 0.0]);
        assert_eq!(emb.dimension, 4);
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let emb1 = Embedding::new(vec![1.0, 0.0, 0.0]);
        let emb2 = Embedding::new(vec![1.0, 0.0, 0.0]);
        let sim = emb1.cosine_similarity(&emb2).unwrap();
        assert!((sim - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let emb1 = Embedding::new(vec![1.0, 0.0, 0.0]);
        let emb2 = Embedding::new(vec![0.0, 1.0, 0.0]);
        assert!(emb1.cosine_similarity(&emb2).unwrap().abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_is_scale_invariant() {
        let emb1 = Embedding::new(vec![1.0, 2.0, 3.0]);
        let emb2 = Embedding::new(vec![2.0, 4.0, 6.0]);
        let sim = emb1.cosine_similarity(&emb2).unwrap();
        assert!((sim - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_different_dimensions() {
        let emb1 = Embedding::new(vec![1.0, 0.0, 0.0]);
        let emb2 = Embedding::new(vec![1.0, 0.0]);
        assert!(emb1.cosine_similarity(&emb2).is_none());
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let emb1 = Embedding::new(vec![1.0, 0.0, 0.0]);
        let emb2 = Embedding::new(vec![0.0, 0.0, 0.0]);
        assert_eq!(emb1.cosine_similarity(&emb2), Some(0.0));
    }

    #[test]
    fn test_embedding_deserialization() {
        let json = r#"{"vector":[0.5,0.5],"dimension":2}"#;
        let emb: Embedding = serde_json::from_str(json).unwrap();
        assert_eq!(emb.dimension, 2);
        assert_eq!(emb.vector, vec![0.5, 0.5]);
    }

    #[tokio::test]
    async fn test_default_embed_batch() {
        let provider = Constant(vec![1.0, 0.0]);
        let embeddings = provider.embed_batch(&["a", "b", "c"]).await.unwrap();
        assert_eq!(embeddings.len(), 3);
        assert!(embeddings.iter().all(|e| e.dimension == 2));
    }
}
