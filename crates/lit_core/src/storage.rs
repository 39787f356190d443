use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Chunk;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

#[async_trait]
pub trait ChunkStorage: Send + Sync {
    fn name(&self) -> &str;

    /// Store embedded chunks under a namespace. Chunks already present in the
    /// namespace are skipped; returns how many were inserted.
    async fn store_chunks(&self, namespace: &str, entries: Vec<(Chunk, Vec<f32>)>) -> Result<usize>;

    /// Nearest chunks by cosine similarity, best first
    async fn find_similar(&self, namespace: &str, embedding: &[f32], limit: usize) -> Result<Vec<ScoredChunk>>;

    /// Drop everything stored under a namespace
    async fn drop_namespace(&self, namespace: &str) -> Result<()>;
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
