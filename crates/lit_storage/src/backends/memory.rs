use async_trait::async_trait;
use lit_core::{cosine_similarity, Chunk, ChunkStorage, Error, Result, ScoredChunk};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Brute-force cosine index kept in process memory, one vector list per
/// namespace. Insertion order is preserved so equal scores rank by it.
#[derive(Default)]
pub struct InMemoryStorage {
    namespaces: RwLock<HashMap<String, Vec<(Chunk, Vec<f32>)>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .await
            .get(namespace)
            .map_or(0, |entries| entries.len())
    }

    pub async fn namespace_count(&self) -> usize {
        self.namespaces.read().await.len()
    }
}

#[async_trait]
impl ChunkStorage for InMemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    async fn store_chunks(&self, namespace: &str, entries: Vec<(Chunk, Vec<f32>)>) -> Result<usize> {
        let mut namespaces = self.namespaces.write().await;
        let stored = namespaces.entry(namespace.to_string()).or_default();
        let mut inserted = 0;
        for (chunk, embedding) in entries {
            if let Some((_, existing)) = stored.first() {
                if existing.len() != embedding.len() {
                    return Err(Error::Index(format!(
                        "embedding dimension {} does not match index dimension {}",
                        embedding.len(),
                        existing.len()
                    )));
                }
            }
            if stored.iter().any(|(c, _)| c == &chunk) {
                continue;
            }
            stored.push((chunk, embedding));
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn find_similar(&self, namespace: &str, embedding: &[f32], limit: usize) -> Result<Vec<ScoredChunk>> {
        let namespaces = self.namespaces.read().await;
        let Some(stored) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ScoredChunk> = stored
            .iter()
            .map(|(chunk, vector)| {
                let score = cosine_similarity(embedding, vector);
                ScoredChunk {
                    chunk: chunk.clone(),
                    // NaN ranks last
                    score: if score.is_nan() { f32::NEG_INFINITY } else { score },
                }
            })
            .collect();
        // stable sort keeps insertion order for ties
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn drop_namespace(&self, namespace: &str) -> Result<()> {
        self.namespaces.write().await.remove(namespace);
        Ok(())
    }
}
