use async_trait::async_trait;
use lit_core::{Article, Error, Result, YearRange};
use reqwest::Client;
use scraper::Selector;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub mod arxiv;
pub mod openaire;
pub mod pubmed;
pub mod scholar;

pub use arxiv::ArxivSource;
pub use openaire::OpenAireSource;
pub use pubmed::PubMedSource;
pub use scholar::ScholarSource;

#[derive(Debug, Clone)]
pub struct SourceMetadata {
    /// Display name, also stamped on every article as its provenance
    pub name: &'static str,
    pub emoji: &'static str,
    pub description: &'static str,
}

#[async_trait]
pub trait Source: Send + Sync {
    fn metadata(&self) -> SourceMetadata;

    /// Lowercase names the router accepts for this provider
    fn cli_names(&self) -> Vec<&str>;

    /// Query the provider. Transport and document-level failures are errors;
    /// individual malformed records are skipped.
    async fn fetch(&self, query: &str, range: &YearRange) -> Result<Vec<Article>>;

    /// Like [`Source::fetch`], but a failure is logged and yields no articles.
    async fn search(&self, query: &str, range: &YearRange) -> Vec<Article> {
        let name = self.metadata().name;
        if query.trim().is_empty() {
            warn!("{}: empty query, skipping search", name);
            return Vec::new();
        }
        match self.fetch(query, range).await {
            Ok(articles) => {
                info!("{}: {} articles for '{}' ({})", name, articles.len(), query, range);
                articles
            }
            Err(e) => {
                error!("{}: search failed: {}", name, e);
                Vec::new()
            }
        }
    }
}

/// HTTP and per-provider settings shared by all sources.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub pubmed_api_key: Option<String>,
    pub arxiv_url: String,
    pub pubmed_url: String,
    pub openaire_url: String,
    pub scholar_url: String,
    pub arxiv_max_results: usize,
    pub pubmed_max_results: usize,
    pub openaire_max_results: usize,
    pub scholar_max_results: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("litscout/", env!("CARGO_PKG_VERSION")).to_string(),
            pubmed_api_key: None,
            arxiv_url: "http://export.arxiv.org/api/query".to_string(),
            pubmed_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string(),
            openaire_url: "https://api.openaire.eu/search/publications".to_string(),
            scholar_url: "https://scholar.google.com/scholar".to_string(),
            arxiv_max_results: 10,
            pubmed_max_results: 20,
            openaire_max_results: 10,
            scholar_max_results: 10,
        }
    }
}

impl SourceConfig {
    pub fn http_client(&self) -> Result<Client> {
        Ok(Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .build()?)
    }
}

pub type SourceFactory = Box<dyn Fn(&SourceConfig, &Client) -> Arc<dyn Source> + Send + Sync>;

pub fn get_source_factories() -> Vec<SourceFactory> {
    vec![
        Box::new(|config, client| Arc::new(ArxivSource::new(config, client.clone()))),
        Box::new(|config, client| Arc::new(PubMedSource::new(config, client.clone()))),
        Box::new(|config, client| Arc::new(OpenAireSource::new(config, client.clone()))),
        Box::new(|config, client| Arc::new(ScholarSource::new(config, client.clone()))),
    ]
}

/// Fail with [`Error::ProviderUnavailable`] on a non-2xx reply.
pub(crate) async fn read_body(provider: &str, response: reqwest::Response) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        return Err(Error::provider(provider, format!("HTTP {}", status)));
    }
    response.text().await.map_err(|e| Error::provider(provider, e))
}

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Parse(format!("Invalid selector {}: {}", css, e)))
}

/// Trimmed, non-empty text.
pub(crate) fn non_empty(text: &str) -> Option<String> {
    let text = lit_core::types::normalize_whitespace(text);
    (!text.is_empty()).then_some(text)
}

/// Drop articles whose resolved year is unknown or outside `range`.
pub(crate) fn filter_by_year(articles: Vec<Article>, range: &YearRange) -> Vec<Article> {
    articles
        .into_iter()
        .filter(|a| a.year().is_some_and(|y| range.contains(y)))
        .collect()
}
