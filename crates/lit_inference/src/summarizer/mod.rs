use lit_core::{ChatMessage, Chunk, Error, InferenceModel, Result};
use std::sync::Arc;
use tracing::{error, info};

pub const SYSTEM_PROMPT: &str = "You are a research assistant that provides comprehensive and academic summaries. \
Use the provided context retrieved from the embeddings to enhance your response.";

/// Labels each chunk with its 1-based position: `Document i: ...`.
pub fn build_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("Document {}: {}", i + 1, chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn user_prompt(query: &str, context: &str) -> String {
    format!(
        "Provide a comprehensive research summary on: {}. Use these contextually relevant document excerpts: {}",
        query, context
    )
}

/// Text substituted for the summary when the model call fails.
pub fn failure_text(error: &Error) -> String {
    format!("Error generating response: {}", error)
}

pub struct Summarizer {
    model: Arc<dyn InferenceModel>,
}

impl Summarizer {
    pub fn new(model: Arc<dyn InferenceModel>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub async fn try_summarize(&self, query: &str, context: &str) -> Result<String> {
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user_prompt(query, context))];
        let summary = self.model.complete(&messages).await?;
        info!("Generated {} character summary with {}", summary.len(), self.model.name());
        Ok(summary)
    }

    /// Never fails: a model error comes back as the summary text.
    pub async fn summarize(&self, query: &str, context: &str) -> String {
        match self.try_summarize(query, context).await {
            Ok(summary) => summary,
            Err(e) => {
                error!("Summarization with {} failed: {}", self.model.name(), e);
                failure_text(&e)
            }
        }
    }
}
