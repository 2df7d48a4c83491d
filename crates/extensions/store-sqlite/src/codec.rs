//! Embedding blob encoding.
//!
//! Vectors are stored as packed little-endian `f32` values, so a blob of
//! `4 * d` bytes decodes to a `d`-dimensional embedding bit-for-bit.

use termsnap_protocols::Embedding;

/// Serialize an embedding to its storage blob.
pub fn encode_embedding(embedding: &Embedding) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.vector.len() * 4);
    for value in &embedding.vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Deserialize a storage blob.
///
/// Returns `None` for empty or truncated blobs; such rows are treated as
/// having no usable embedding.
pub fn decode_embedding(blob: &[u8]) -> Option<Embedding> {
    if blob.is_empty() || blob.len() % 4 != 0 {
        return None;
    }

    let vector = blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    Some(Embedding::new(vector))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-random vector (xorshift) in [-1, 1).
    fn pseudo_random_vector(seed: u64, dimension: usize) -> Vec<f32> {
        let mut state = seed.max(1);
        (0..dimension)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                ((state % 20_000) as f32 / 10_000.0) - 1.0
            })
            .collect()
    }

    #[test]
    fn test_round_trip_random_vectors() {
        for seed in 1..=32u64 {
            let original = Embedding::new(pseudo_random_vector(seed, 1536));
            let decoded = decode_embedding(&encode_embedding(&original)).unwrap();

            assert_eq!(decoded.dimension, original.dimension);
            for (a, b) in original.vector.iter().zip(decoded.vector.iter()) {
                assert!((a - b).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_round_trip_preserves_similarity() {
        let a = Embedding::new(pseudo_random_vector(7, 64));
        let b = Embedding::new(pseudo_random_vector(11, 64));
        let before = a.cosine_similarity(&b).unwrap();

        let a2 = decode_embedding(&encode_embedding(&a)).unwrap();
        let b2 = decode_embedding(&encode_embedding(&b)).unwrap();
        let after = a2.cosine_similarity(&b2).unwrap();

        assert!((before - after).abs() < 1e-6);
    }

    #[test]
    fn test_encoded_length() {
        let emb = Embedding::new(vec![0.1, 0.2, 0.3]);
        assert_eq!(encode_embedding(&emb).len(), 12);
    }

    #[test]
    fn test_decode_truncated_blob() {
        assert!(decode_embedding(&[0u8, 0, 128]).is_none());
        assert!(decode_embedding(&[0u8; 9]).is_none());
    }

    #[test]
    fn test_decode_empty_blob() {
        assert!(decode_embedding(&[]).is_none());
    }
}
