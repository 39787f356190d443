use async_trait::async_trait;
use lit_core::{Article, Error, Result, YearRange};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use tracing::{debug, warn};

use super::{filter_by_year, non_empty, read_body, Source, SourceConfig, SourceMetadata};

const NAME: &str = "arXiv";

pub struct ArxivSource {
    client: Client,
    base_url: String,
    max_results: usize,
}

impl ArxivSource {
    pub fn new(config: &SourceConfig, client: Client) -> Self {
        Self {
            client,
            base_url: config.arxiv_url.clone(),
            max_results: config.arxiv_max_results,
        }
    }
}

#[derive(Default)]
struct Entry {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    doi: Option<String>,
    journal_ref: Option<String>,
}

impl Entry {
    fn finish(self) -> Result<Article> {
        if self.id.is_empty() {
            return Err(Error::Parse("entry has no id".to_string()));
        }
        // arXiv reports query errors as a feed entry
        if self.id.contains("/api/errors") {
            return Err(Error::Parse(format!("API error entry: {}", self.summary)));
        }
        let mut article = Article::new(&self.title, NAME);
        article.summary = self.summary;
        article.authors = self.authors;
        article.published = self.published;
        article.url = Some(self.id);
        article.doi = self.doi;
        article.journal = self.journal_ref;
        Ok(article)
    }
}

/// Parse an arXiv Atom feed. Entries that cannot be turned into an article
/// are logged and skipped; a malformed document is an error.
pub fn parse_feed(xml: &str) -> Result<Vec<Article>> {
    let mut reader = Reader::from_str(xml);
    let mut articles = Vec::new();
    let mut entry: Option<Entry> = None;
    let mut in_author = false;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                match e.local_name().as_ref() {
                    b"entry" => entry = Some(Entry::default()),
                    b"author" => in_author = true,
                    _ => {}
                }
                text.clear();
            }
            Ok(Event::Text(t)) => {
                if entry.is_some() {
                    let chunk = t.unescape().map_err(|e| Error::Parse(format!("arXiv feed: {}", e)))?;
                    text.push_str(&chunk);
                }
            }
            Ok(Event::CData(c)) => {
                if entry.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                let Some(current) = entry.as_mut() else {
                    continue;
                };
                let value = non_empty(&text);
                match name.as_ref() {
                    b"id" if !in_author => current.id = value.unwrap_or_default(),
                    b"title" => current.title = value.unwrap_or_default(),
                    b"summary" => current.summary = value.unwrap_or_default(),
                    b"published" => current.published = value.unwrap_or_default(),
                    b"name" if in_author => current.authors.extend(value),
                    b"author" => in_author = false,
                    b"doi" => current.doi = value,
                    b"journal_ref" => current.journal_ref = value,
                    b"entry" => {
                        if let Some(finished) = entry.take() {
                            match finished.finish() {
                                Ok(article) => articles.push(article),
                                Err(e) => warn!("Skipping arXiv entry: {}", e),
                            }
                        }
                    }
                    _ => {}
                }
                text.clear();
            }
            Ok(_) => {}
            Err(e) => return Err(Error::Parse(format!("arXiv feed: {}", e))),
        }
    }

    Ok(articles)
}

#[async_trait]
impl Source for ArxivSource {
    fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: NAME,
            emoji: "📐",
            description: "arXiv preprints (Atom API, year filtered locally)",
        }
    }

    fn cli_names(&self) -> Vec<&str> {
        vec!["arxiv"]
    }

    async fn fetch(&self, query: &str, range: &YearRange) -> Result<Vec<Article>> {
        debug!("arXiv query: {}", query);
        let max_results = self.max_results.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", query),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "relevance"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await
            .map_err(|e| Error::provider(NAME, e))?;
        let body = read_body(NAME, response).await?;

        // the API has no date filter, so the window is applied here
        let articles = filter_by_year(parse_feed(&body)?, range);
        Ok(articles.into_iter().take(self.max_results).collect())
    }
}
