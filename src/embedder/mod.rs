//! Sentence encoders used by the feature fusion stage.
//!
//! The fusion engine only depends on the [`SentenceEncoder`] seam. The
//! default implementation is a deterministic seeded projection that needs
//! no model download; the fastembed MiniLM encoder lives behind the
//! `local-embeddings` feature.

#[cfg(feature = "local-embeddings")]
pub mod minilm;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::common::error::Result;

/// Turns narrative text into fixed-dimension dense vectors, one per input,
/// in input order.
pub trait SentenceEncoder {
    /// Fixed output dimension of every vector this encoder produces.
    fn dimension(&self) -> usize;

    /// Encode a batch of texts. The result has exactly one vector per
    /// input, each of `dimension()` length.
    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
}

/// Hash bucket space for the projection encoder's bag-of-tokens input.
const HASH_BUCKETS: usize = 2048;

/// Deterministic sentence encoder: tokens are hashed into a fixed bucket
/// space and projected to the target dimension through a seeded
/// Xavier-uniform matrix, then L2-normalized. The same seed always yields
/// the same projection, so transforms replay exactly across runs.
pub struct HashedProjectionEncoder {
    dim: usize,
    // Row-major [HASH_BUCKETS, dim]
    projection: Vec<f32>,
}

impl HashedProjectionEncoder {
    pub fn new(dim: usize, seed: u64) -> Self {
        // Xavier/Glorot uniform init range
        let limit = (6.0f32 / ((HASH_BUCKETS + dim) as f32)).sqrt();
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let projection: Vec<f32> = (0..HASH_BUCKETS * dim)
            .map(|_| rng.gen_range(-limit..limit))
            .collect();
        Self { dim, projection }
    }

    fn encode_one(&self, text: &str) -> Vec<f32> {
        let mut out = vec![0.0f32; self.dim];
        let mut token_count = 0usize;
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let lowered = token.to_lowercase();
            let bucket = (fnv1a(lowered.as_bytes()) as usize) % HASH_BUCKETS;
            let row = &self.projection[bucket * self.dim..(bucket + 1) * self.dim];
            for (acc, w) in out.iter_mut().zip(row) {
                *acc += w;
            }
            token_count += 1;
        }
        if token_count == 0 {
            return out;
        }
        let norm = out.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut out {
                *v /= norm;
            }
        }
        out
    }
}

impl SentenceEncoder for HashedProjectionEncoder {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.encode_one(t)).collect())
    }
}

/// FNV-1a, 64-bit. Stable across builds, unlike the std hasher.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
