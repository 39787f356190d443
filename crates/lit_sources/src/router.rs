use lit_core::{Article, Condition, Result, YearRange};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::sources::{get_source_factories, Source, SourceConfig, SourceMetadata};

/// Articles from one routed search plus the failure that was recovered, if any.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub articles: Vec<Article>,
    pub condition: Option<Condition>,
}

pub struct SearchRouter {
    sources: Vec<Arc<dyn Source>>,
}

impl SearchRouter {
    pub fn new() -> Self {
        Self { sources: Vec::new() }
    }

    /// Router with every built-in provider sharing one HTTP client.
    pub fn with_defaults(config: &SourceConfig) -> Result<Self> {
        let client = config.http_client()?;
        let sources = get_source_factories()
            .iter()
            .map(|factory| factory(config, &client))
            .collect();
        Ok(Self { sources })
    }

    /// Later registrations win over earlier ones with the same name.
    pub fn register(&mut self, source: Arc<dyn Source>) {
        self.sources.insert(0, source);
    }

    pub fn resolve(&self, provider: &str) -> Option<Arc<dyn Source>> {
        let provider = provider.trim().to_lowercase();
        self.sources
            .iter()
            .find(|s| {
                s.cli_names().iter().any(|n| n.eq_ignore_ascii_case(&provider))
                    || s.metadata().name.eq_ignore_ascii_case(&provider)
            })
            .cloned()
    }

    pub fn providers(&self) -> Vec<(SourceMetadata, Vec<String>)> {
        self.sources
            .iter()
            .map(|s| {
                let names = s.cli_names().into_iter().map(str::to_string).collect();
                (s.metadata(), names)
            })
            .collect()
    }

    pub async fn search(&self, query: &str, range: &YearRange, provider: &str) -> Vec<Article> {
        self.search_with_outcome(query, range, provider).await.articles
    }

    pub async fn search_with_outcome(&self, query: &str, range: &YearRange, provider: &str) -> SearchOutcome {
        let Some(source) = self.resolve(provider) else {
            error!("Unsupported database: {}", provider);
            return SearchOutcome {
                articles: Vec::new(),
                condition: Some(Condition::UnsupportedProvider {
                    provider: provider.to_string(),
                }),
            };
        };

        let name = source.metadata().name;
        if query.trim().is_empty() {
            warn!("{}: empty query, skipping search", name);
            return SearchOutcome::default();
        }

        info!("Searching {} for '{}' ({})", name, query, range);
        match source.fetch(query, range).await {
            Ok(articles) => {
                info!("{} returned {} articles", name, articles.len());
                SearchOutcome {
                    articles,
                    condition: None,
                }
            }
            Err(e) => {
                error!("Error retrieving data from {}: {}", name, e);
                SearchOutcome {
                    articles: Vec::new(),
                    condition: Some(Condition::ProviderUnavailable {
                        provider: name.to_string(),
                        message: e.to_string(),
                    }),
                }
            }
        }
    }
}

impl Default for SearchRouter {
    fn default() -> Self {
        Self::new()
    }
}
