use lit_core::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub mod models;
pub mod summarizer;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Which backend serves chat completions and embeddings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModelKind {
    #[default]
    OpenAi,
    DeepSeek,
    Ollama,
    /// Offline deterministic model, for tests and dry runs
    Dummy,
}

impl ModelKind {
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            ModelKind::OpenAi => Some("https://api.openai.com/v1"),
            ModelKind::DeepSeek => Some("https://api.deepseek.com/v1"),
            ModelKind::Ollama => Some("http://localhost:11434/v1"),
            ModelKind::Dummy => None,
        }
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, ModelKind::OpenAi | ModelKind::DeepSeek)
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ModelKind::OpenAi),
            "deepseek" => Ok(ModelKind::DeepSeek),
            "ollama" => Ok(ModelKind::Ollama),
            "dummy" => Ok(ModelKind::Dummy),
            other => Err(Error::InvalidInput(format!("unknown model: {}", other))),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelKind::OpenAi => "openai",
            ModelKind::DeepSeek => "deepseek",
            ModelKind::Ollama => "ollama",
            ModelKind::Dummy => "dummy",
        };
        f.write_str(name)
    }
}

#[derive(Clone)]
pub struct Config {
    pub kind: ModelKind,
    pub api_key: Option<String>,
    /// Overrides the kind's default API root (e.g. a self-hosted gateway)
    pub base_url: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub timeout: Duration,
}

impl Config {
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn base_url(&self) -> Option<String> {
        self.base_url
            .clone()
            .or_else(|| self.kind.default_base_url().map(str::to_string))
            .map(|url| url.trim_end_matches('/').to_string())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kind: ModelKind::default(),
            api_key: None,
            base_url: None,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("kind", &self.kind)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub mod prelude {
    pub use super::models::create_model;
    pub use super::summarizer::Summarizer;
    pub use super::{Config, ModelKind};
    pub use lit_core::{ChatMessage, Error, InferenceModel, Result};
}

pub use models::create_model;
pub use summarizer::Summarizer;
