use lit_core::types::form_value;
use lit_core::{Article, Condition, Report, ReportRequest, Result};
use lit_inference::summarizer::{build_context, failure_text};
use lit_inference::Summarizer;
use lit_sources::SearchRouter;
use lit_storage::index::DEFAULT_TOP_K;
use lit_storage::VectorIndex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::chunk::{Chunker, ChunkerConfig};
use crate::citation::render_citations;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub chunker: ChunkerConfig,
    /// Chunks retrieved as summarization context
    pub top_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Search, chunk, index, retrieve, summarize and cite, in that order.
/// Holds no per-run state, so one instance serves concurrent requests.
pub struct Pipeline {
    router: Arc<SearchRouter>,
    chunker: Chunker,
    index: VectorIndex,
    summarizer: Summarizer,
    top_k: usize,
}

impl Pipeline {
    pub fn new(router: Arc<SearchRouter>, chunker: Chunker, index: VectorIndex, summarizer: Summarizer) -> Self {
        let chunking = chunker.config();
        info!(
            "Pipeline ready: {}-char chunks ({} overlap), {} index, {} summaries",
            chunking.max_chars,
            chunking.overlap,
            index.storage_name(),
            summarizer.model_name()
        );
        Self {
            router,
            chunker,
            index,
            summarizer,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn from_config(
        router: Arc<SearchRouter>,
        config: PipelineConfig,
        index: VectorIndex,
        summarizer: Summarizer,
    ) -> Result<Self> {
        let chunker = Chunker::new(config.chunker)?;
        Ok(Self::new(router, chunker, index, summarizer).with_top_k(config.top_k))
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn router(&self) -> &SearchRouter {
        &self.router
    }

    /// Chunk and index `articles`, then pull the `top_k` chunks closest to
    /// `query` as labeled context. Index failures leave the context empty.
    pub async fn retrieve_context(&self, query: &str, articles: &[Article]) -> (String, Option<Condition>) {
        let chunks = self.chunker.chunk(articles);
        let handle = match self.index.build(chunks).await {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to build vector index: {}", e);
                return (String::new(), Some(Condition::EmbeddingOrIndexFailure { message: e.to_string() }));
            }
        };

        let retrieved = self.index.query(handle.as_ref(), query, self.top_k).await;
        if let Some(handle) = handle {
            if let Err(e) = self.index.release(handle).await {
                warn!("Failed to release vector index: {}", e);
            }
        }

        match retrieved {
            Ok(chunks) => {
                info!("Retrieved {} context chunks", chunks.len());
                (build_context(&chunks), None)
            }
            Err(e) => {
                error!("Failed to query vector index: {}", e);
                (String::new(), Some(Condition::EmbeddingOrIndexFailure { message: e.to_string() }))
            }
        }
    }

    /// Always produces a report; recovered failures are listed in
    /// [`Report::conditions`].
    pub async fn generate_report(&self, request: &ReportRequest) -> Report {
        let mut query = request.search_query();
        if query.trim().is_empty() {
            query = request.research_topic.trim().to_string();
        }
        info!("Generating report for '{}' from {}", query, request.provider);

        let mut conditions = Vec::new();
        let outcome = self
            .router
            .search_with_outcome(&query, &request.year_range, &request.provider)
            .await;
        conditions.extend(outcome.condition);
        let articles = outcome.articles;

        let generated_summary = if articles.is_empty() {
            if conditions.is_empty() {
                conditions.push(Condition::NoArticlesFound);
            }
            warn!("No articles found for '{}', skipping summarization", query);
            String::new()
        } else {
            let (context, condition) = self.retrieve_context(&query, &articles).await;
            conditions.extend(condition);
            match self.summarizer.try_summarize(&query, &context).await {
                Ok(summary) => summary,
                Err(e) => {
                    error!("Summarization failed: {}", e);
                    conditions.push(Condition::SummarizationFailure { message: e.to_string() });
                    failure_text(&e)
                }
            }
        };

        let citations = render_citations(&articles, request.citation_format);
        let report = Report {
            research_topic: request.research_topic.clone(),
            generated_summary,
            articles,
            citation_format: request.citation_format,
            citations,
            field_of_study: form_value(&request.field_of_study).map(str::to_string),
            type_of_publication: form_value(&request.type_of_publication).map(str::to_string),
            provider: request.provider.clone(),
            conditions,
        };
        if report.is_degraded() {
            warn!("Report for '{}' is degraded: {} recovered failure(s)", query, report.conditions.len());
        }
        report
    }
}
