use async_trait::async_trait;
use lit_core::{Chunk, ChunkStorage, Error, Result, ScoredChunk};
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::{HashMap, HashSet};
use std::env;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::StorageConfig;

#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub collection_prefix: String,
}

impl QdrantConfig {
    /// Reads `QDRANT_HOST`, defaulting to `localhost`, on the gRPC port.
    pub fn new() -> Self {
        let host = env::var("QDRANT_HOST").unwrap_or_else(|_| "localhost".to_string());
        Self {
            url: format!("http://{}:6334", host),
            collection_prefix: StorageConfig::default().collection_prefix,
        }
    }

    pub fn from_storage_config(config: &StorageConfig) -> Self {
        let mut qdrant = Self::new();
        if let Some(url) = &config.url {
            qdrant.url = url.clone();
        }
        qdrant.collection_prefix = config.collection_prefix.clone();
        qdrant
    }

    fn collection(&self, namespace: &str) -> String {
        format!("{}-{}", self.collection_prefix, namespace)
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One Qdrant collection per namespace, created lazily with the dimension
/// of the first stored vector and deleted when the namespace is dropped.
pub struct QdrantStorage {
    client: Qdrant,
    config: QdrantConfig,
}

fn storage_error(e: impl ToString) -> Error {
    Error::Storage(e.to_string())
}

/// Stable point id so re-inserting the same chunk overwrites instead of duplicating.
fn point_id(chunk: &Chunk) -> String {
    let key = format!("{}\u{1f}{}\u{1f}{}", chunk.metadata.url, chunk.metadata.title, chunk.text);
    Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()).to_string()
}

impl QdrantStorage {
    pub async fn new(config: QdrantConfig) -> Result<Self> {
        let client = Qdrant::from_url(&config.url).build().map_err(storage_error)?;
        // fail early when the server is unreachable
        client.health_check().await.map_err(|e| {
            Error::Storage(format!("Qdrant should be running on {}: {}", config.url, e))
        })?;
        Ok(Self { client, config })
    }

    async fn ensure_collection(&self, name: &str, dimension: u64) -> Result<()> {
        if self.client.collection_exists(name).await.map_err(storage_error)? {
            return Ok(());
        }
        debug!("Creating collection {} ({} dimensions)", name, dimension);
        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimension, Distance::Cosine)),
            )
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}

#[async_trait]
impl ChunkStorage for QdrantStorage {
    fn name(&self) -> &str {
        "qdrant"
    }

    /// Point ids are derived from chunk content, so a repeated chunk is
    /// upserted in place. The returned count covers distinct chunks in the batch.
    async fn store_chunks(&self, namespace: &str, entries: Vec<(Chunk, Vec<f32>)>) -> Result<usize> {
        let Some((_, first)) = entries.first() else {
            return Ok(0);
        };
        let collection = self.config.collection(namespace);
        self.ensure_collection(&collection, first.len() as u64).await?;

        let mut seen = HashSet::new();
        let mut points = Vec::with_capacity(entries.len());
        for (chunk, embedding) in entries {
            let id = point_id(&chunk);
            if !seen.insert(id.clone()) {
                continue;
            }
            let mut payload: HashMap<String, Value> = HashMap::new();
            payload.insert("doc".to_string(), serde_json::to_string(&chunk)?.into());
            payload.insert("url".to_string(), chunk.metadata.url.clone().into());
            payload.insert("source".to_string(), chunk.metadata.source.clone().into());
            points.push(PointStruct::new(id, embedding, payload));
        }

        let inserted = points.len();
        self.client
            .upsert_points(UpsertPointsBuilder::new(&collection, points).wait(true))
            .await
            .map_err(storage_error)?;
        Ok(inserted)
    }

    async fn find_similar(&self, namespace: &str, embedding: &[f32], limit: usize) -> Result<Vec<ScoredChunk>> {
        let collection = self.config.collection(namespace);
        if !self.client.collection_exists(&collection).await.map_err(storage_error)? {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&collection, embedding.to_vec(), limit as u64)
                    .with_payload(true),
            )
            .await
            .map_err(storage_error)?;

        let mut chunks = Vec::with_capacity(response.result.len());
        for point in response.result {
            let Some(doc) = point.payload.get("doc").and_then(|v| v.as_str()) else {
                continue;
            };
            match serde_json::from_str::<Chunk>(doc) {
                Ok(chunk) => chunks.push(ScoredChunk { chunk, score: point.score }),
                Err(e) => warn!("Skipping unreadable point in {}: {}", collection, e),
            }
        }
        Ok(chunks)
    }

    async fn drop_namespace(&self, namespace: &str) -> Result<()> {
        let collection = self.config.collection(namespace);
        if self.client.collection_exists(&collection).await.map_err(storage_error)? {
            self.client.delete_collection(&collection).await.map_err(storage_error)?;
        }
        Ok(())
    }
}
