use async_trait::async_trait;
use lit_core::{ChatMessage, Error, InferenceModel, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use url::Url;

use crate::Config;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Client for the OpenAI chat/embeddings wire format, which DeepSeek and
/// Ollama's `/v1` endpoint also speak.
pub struct OpenAiModel {
    client: Client,
    name: String,
    api_key: Option<String>,
    base_url: String,
    chat_model: String,
    embedding_model: String,
}

impl OpenAiModel {
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .base_url()
            .ok_or_else(|| Error::Inference(format!("{} has no API endpoint", config.kind)))?;
        Url::parse(&base_url)
            .map_err(|e| Error::InvalidInput(format!("invalid model URL {}: {}", base_url, e)))?;

        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            name: config.kind.to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            base_url,
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(&self, path: &str, body: &B) -> Result<R> {
        let mut request = self.client.post(format!("{}/{}", self.base_url, path)).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!("{} returned {}: {}", self.name, status, body.trim())));
        }
        Ok(response.json::<R>().await?)
    }
}

impl fmt::Debug for OpenAiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("chat_model", &self.chat_model)
            .finish()
    }
}

fn first_choice(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| Error::Inference("model returned no content".to_string()))
}

fn ordered_embeddings(mut response: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if response.data.len() != expected {
        return Err(Error::Inference(format!(
            "expected {} embeddings, got {}",
            expected,
            response.data.len()
        )));
    }
    response.data.sort_by_key(|d| d.index);
    Ok(response.data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl InferenceModel for OpenAiModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Embedding {} texts with {}", texts.len(), self.embedding_model);
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };
        let response: EmbeddingResponse = self.post("embeddings", &request).await?;
        ordered_embeddings(response, texts.len())
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        debug!("Requesting completion from {}", self.chat_model);
        let request = ChatRequest {
            model: &self.chat_model,
            messages,
        };
        let response: ChatResponse = self.post("chat/completions", &request).await?;
        first_choice(response)
    }
}
