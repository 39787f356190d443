use lit_core::{Chunk, ChunkStorage, Error, InferenceModel, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// A built index for one pipeline run. Dropping the handle does not free
/// the namespace; call [`VectorIndex::release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHandle {
    namespace: String,
    size: usize,
}

impl IndexHandle {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Embeds chunks with an [`InferenceModel`] and keeps them in a
/// [`ChunkStorage`] under a namespace private to the run.
#[derive(Clone)]
pub struct VectorIndex {
    model: Arc<dyn InferenceModel>,
    storage: Arc<dyn ChunkStorage>,
    batch_size: usize,
}

impl VectorIndex {
    pub fn new(model: Arc<dyn InferenceModel>, storage: Arc<dyn ChunkStorage>) -> Self {
        Self {
            model,
            storage,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn storage_name(&self) -> &str {
        self.storage.name()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self.model.generate_embeddings(texts).await?;
        if embeddings.len() != texts.len() {
            return Err(Error::Index(format!(
                "{} returned {} embeddings for {} texts",
                self.model.name(),
                embeddings.len(),
                texts.len()
            )));
        }
        if embeddings.iter().flatten().any(|x| !x.is_finite()) {
            return Err(Error::Index(format!("{} returned a non-finite embedding", self.model.name())));
        }
        Ok(embeddings)
    }

    /// Embed and store every chunk. An empty input yields `None`.
    pub async fn build(&self, chunks: Vec<Chunk>) -> Result<Option<IndexHandle>> {
        if chunks.is_empty() {
            debug!("No chunks to index");
            return Ok(None);
        }

        let namespace = format!("run-{}", Uuid::new_v4());
        info!("Indexing {} chunks into {} ({})", chunks.len(), namespace, self.storage.name());

        let mut entries = Vec::with_capacity(chunks.len());
        let mut dimension = None;
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embed(&texts).await?;
            for (chunk, embedding) in batch.iter().zip(embeddings) {
                let expected = *dimension.get_or_insert(embedding.len());
                if embedding.is_empty() || embedding.len() != expected {
                    return Err(Error::Index(format!(
                        "inconsistent embedding dimension: got {}, expected {}",
                        embedding.len(),
                        expected
                    )));
                }
                entries.push((chunk.clone(), embedding));
            }
        }

        let size = match self.storage.store_chunks(&namespace, entries).await {
            Ok(size) => size,
            Err(e) => {
                if let Err(cleanup) = self.storage.drop_namespace(&namespace).await {
                    warn!("Failed to clean up {}: {}", namespace, cleanup);
                }
                return Err(e);
            }
        };
        debug!("Stored {} chunks in {}", size, namespace);

        Ok(Some(IndexHandle { namespace, size }))
    }

    /// Up to `k` chunks most similar to `text`, best first. A missing handle
    /// yields no results.
    pub async fn query(&self, handle: Option<&IndexHandle>, text: &str, k: usize) -> Result<Vec<Chunk>> {
        let Some(handle) = handle else {
            return Ok(Vec::new());
        };
        if k == 0 || handle.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();
        let scored = self.storage.find_similar(&handle.namespace, &embedding, k).await?;
        Ok(scored.into_iter().take(k).map(|s| s.chunk).collect())
    }

    pub async fn release(&self, handle: IndexHandle) -> Result<()> {
        debug!("Releasing {}", handle.namespace);
        self.storage.drop_namespace(&handle.namespace).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStorage;
    use async_trait::async_trait;
    use lit_core::{ChatMessage, ChunkMetadata};

    /// Embeds a text by counting a few marker words.
    #[derive(Debug)]
    struct MockInference;

    #[async_trait]
    impl InferenceModel for MockInference {
        fn name(&self) -> &str {
            "mock"
        }

        async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    ["neural", "protein", "galaxy"]
                        .iter()
                        .map(|w| t.matches(w).count() as f32)
                        .collect()
                })
                .collect())
        }

        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            Ok(String::new())
        }
    }

    /// Every embedding carries a NaN component.
    #[derive(Debug)]
    struct NanInference;

    #[async_trait]
    impl InferenceModel for NanInference {
        fn name(&self) -> &str {
            "nan"
        }

        async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![f32::NAN, 1.0]).collect())
        }

        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            Ok(String::new())
        }
    }

    #[derive(Debug)]
    struct FailingInference;

    #[async_trait]
    impl InferenceModel for FailingInference {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate_embeddings(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(Error::Inference("connection refused".to_string()))
        }

        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            Err(Error::Inference("connection refused".to_string()))
        }
    }

    fn chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            metadata: ChunkMetadata {
                title: text.to_string(),
                url: format!("http://test.com/{}", text.len()),
                authors: "Test Author".to_string(),
                source: "test".to_string(),
            },
        }
    }

    fn index() -> (VectorIndex, Arc<InMemoryStorage>) {
        let storage = Arc::new(InMemoryStorage::new());
        (VectorIndex::new(Arc::new(MockInference), storage.clone()), storage)
    }

    #[tokio::test]
    async fn test_query_ranks_by_similarity() {
        let (index, _) = index();
        let handle = index
            .build(vec![
                chunk("galaxy survey"),
                chunk("neural networks and neural nets"),
                chunk("protein folding"),
            ])
            .await
            .unwrap();

        let results = index.query(handle.as_ref(), "neural", 3).await.unwrap();
        assert_eq!(results[0].text, "neural networks and neural nets");
    }

    #[tokio::test]
    async fn test_query_respects_k() {
        let (index, _) = index();
        let chunks = (0..6).map(|i| chunk(&format!("neural {}", i))).collect();
        let handle = index.build(chunks).await.unwrap();
        assert_eq!(handle.as_ref().map(IndexHandle::len), Some(6));

        let results = index.query(handle.as_ref(), "neural", DEFAULT_TOP_K).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_build_returns_no_handle() {
        let (index, _) = index();
        let handle = index.build(Vec::new()).await.unwrap();
        assert!(handle.is_none());
        assert!(index.query(handle.as_ref(), "neural", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_runs_do_not_share_results() {
        let (index, _) = index();
        let first = index.build(vec![chunk("neural")]).await.unwrap().unwrap();
        let second = index.build(vec![chunk("galaxy")]).await.unwrap().unwrap();
        assert_ne!(first.namespace(), second.namespace());

        let results = index.query(Some(&second), "neural", 3).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "galaxy");
    }

    #[tokio::test]
    async fn test_release_drops_namespace() {
        let (index, storage) = index();
        let handle = index.build(vec![chunk("neural")]).await.unwrap().unwrap();
        assert_eq!(storage.namespace_count().await, 1);
        index.release(handle).await.unwrap();
        assert_eq!(storage.namespace_count().await, 0);
    }

    #[tokio::test]
    async fn test_batches_cover_every_chunk() {
        let (index, storage) = index();
        let index = index.with_batch_size(2);
        let chunks = (0..5).map(|i| chunk(&format!("protein {}", i))).collect();
        let handle = index.build(chunks).await.unwrap().unwrap();
        assert_eq!(storage.len(handle.namespace()).await, 5);
    }

    #[tokio::test]
    async fn test_non_finite_embeddings_are_rejected() {
        let storage = Arc::new(InMemoryStorage::new());
        let index = VectorIndex::new(Arc::new(NanInference), storage.clone());
        let result = index.build(vec![chunk("neural")]).await;
        assert!(matches!(result, Err(Error::Index(_))));
        assert_eq!(storage.namespace_count().await, 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_reported() {
        let index = VectorIndex::new(Arc::new(FailingInference), Arc::new(InMemoryStorage::new()));
        assert_eq!(index.storage_name(), "memory");
        let result = index.build(vec![chunk("neural")]).await;
        assert!(matches!(result, Err(Error::Inference(_))));
    }
}
