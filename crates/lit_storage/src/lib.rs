use lit_core::{ChunkStorage, Error, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub mod backends;
pub mod index;

pub use backends::*;
pub use index::{IndexHandle, VectorIndex};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageKind {
    #[default]
    Memory,
    Qdrant,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageKind::Memory),
            "qdrant" => Ok(StorageKind::Qdrant),
            other => Err(Error::InvalidInput(format!("unknown storage backend: {}", other))),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Memory => write!(f, "memory"),
            StorageKind::Qdrant => write!(f, "qdrant"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub kind: StorageKind,
    /// Backend URL; `None` uses the backend default.
    pub url: Option<String>,
    /// Prefix for per-run collections on persistent backends.
    pub collection_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::Memory,
            url: None,
            collection_prefix: "litscout-articles".to_string(),
        }
    }
}

pub async fn create_storage(config: &StorageConfig) -> Result<Arc<dyn ChunkStorage>> {
    match config.kind {
        StorageKind::Memory => Ok(Arc::new(InMemoryStorage::new())),
        StorageKind::Qdrant => create_qdrant(config).await,
    }
}

#[cfg(feature = "qdrant")]
async fn create_qdrant(config: &StorageConfig) -> Result<Arc<dyn ChunkStorage>> {
    let storage = QdrantStorage::new(QdrantConfig::from_storage_config(config)).await?;
    Ok(Arc::new(storage))
}

#[cfg(not(feature = "qdrant"))]
async fn create_qdrant(_config: &StorageConfig) -> Result<Arc<dyn ChunkStorage>> {
    Err(Error::Storage(
        "qdrant support is not compiled in (build with --features qdrant)".to_string(),
    ))
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, IndexHandle, StorageConfig, StorageKind, VectorIndex};
}
