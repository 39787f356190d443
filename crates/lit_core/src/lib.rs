pub mod error;
pub mod logging;
pub mod models;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::{ChatMessage, InferenceModel};
pub use storage::{cosine_similarity, ChunkStorage, ScoredChunk};
pub use types::{
    Article, CitationFormat, Chunk, ChunkMetadata, Condition, Report, ReportRequest, YearRange,
};
