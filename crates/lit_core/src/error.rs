use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} is unavailable: {message}")]
    ProviderUnavailable { provider: String, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported database: {0}")]
    UnsupportedProvider(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn provider(provider: impl Into<String>, message: impl ToString) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::UnsupportedProvider("scopus".to_string());
        assert_eq!(err.to_string(), "Unsupported database: scopus");

        let err = Error::provider("ArXiv", "connection refused");
        assert_eq!(err.to_string(), "ArXiv is unavailable: connection refused");
    }
}
