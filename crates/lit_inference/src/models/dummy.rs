use async_trait::async_trait;
use lit_core::{ChatMessage, InferenceModel, Result};
use std::fmt;

pub const DUMMY_DIMENSION: usize = 256;

/// Offline model: hashed bag-of-words embeddings and an extractive
/// "summary" built from the prompt itself.
#[derive(Default)]
pub struct DummyModel;

impl DummyModel {
    pub fn new() -> Self {
        Self
    }

    pub fn embed(text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; DUMMY_DIMENSION];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let slot = fnv1a(&token.to_lowercase()) as usize % DUMMY_DIMENSION;
            embedding[slot] += 1.0;
        }
        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        embedding
    }
}

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x100000001b3)
    })
}

#[async_trait]
impl InferenceModel for DummyModel {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::embed(t)).collect())
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        // first 40 words of the last user message
        let words: Vec<&str> = prompt.split_whitespace().take(40).collect();
        Ok(words.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lit_core::cosine_similarity;

    #[tokio::test]
    async fn test_dummy_model() {
        let model = DummyModel::new();

        let texts = vec![
            "Transformer models for language".to_string(),
            "transformer MODELS for language".to_string(),
            "Protein folding dynamics".to_string(),
        ];
        let embeddings = model.generate_embeddings(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 3);
        assert!(embeddings.iter().all(|e| e.len() == DUMMY_DIMENSION));
        assert!((cosine_similarity(&embeddings[0], &embeddings[1]) - 1.0).abs() < 1e-5);
        assert!(cosine_similarity(&embeddings[0], &embeddings[2]) < 0.5);

        let summary = model
            .complete(&[ChatMessage::system("ignored"), ChatMessage::user("Summarize this text.")])
            .await
            .unwrap();
        assert_eq!(summary, "Summarize this text.");
    }

    #[test]
    fn test_empty_text_embeds_to_zero_vector() {
        assert!(DummyModel::embed("").iter().all(|x| *x == 0.0));
    }
}
