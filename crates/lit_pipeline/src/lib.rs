pub mod chunk;
pub mod citation;
pub mod document;
pub mod pipeline;

pub use chunk::{Chunker, ChunkerConfig};
pub use citation::{format_authors, render_citation, render_citations};
pub use document::render_markdown;
pub use pipeline::{Pipeline, PipelineConfig};

pub mod prelude {
    pub use super::{render_citation, render_markdown, Chunker, ChunkerConfig, Pipeline, PipelineConfig};
    pub use lit_core::{Article, CitationFormat, Report, ReportRequest, YearRange};
}
