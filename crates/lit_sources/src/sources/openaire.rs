use async_trait::async_trait;
use lit_core::types::json_text;
use lit_core::{Article, Error, Result, YearRange};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use super::{non_empty, read_body, Source, SourceConfig, SourceMetadata};

const NAME: &str = "OpenAIRE";

pub struct OpenAireSource {
    client: Client,
    base_url: String,
    max_results: usize,
}

impl OpenAireSource {
    pub fn new(config: &SourceConfig, client: Client) -> Self {
        Self {
            client,
            base_url: config.openaire_url.clone(),
            max_results: config.openaire_max_results,
        }
    }
}

/// OpenAIRE renders single-element lists as a bare object.
fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other],
    }
}

fn attr<'a>(value: &'a Value, name: &str) -> Option<&'a str> {
    value.get(name).and_then(Value::as_str)
}

fn main_title(result: &Value) -> Option<String> {
    let titles = as_list(result.get("title"));
    titles
        .iter()
        .find(|t| attr(t, "@classid") == Some("main title"))
        .and_then(|t| json_text(t))
        .or_else(|| titles.iter().find_map(|t| json_text(t)))
}

fn doi(result: &Value) -> Option<String> {
    as_list(result.get("pid"))
        .into_iter()
        .find(|p| attr(p, "@classid").is_some_and(|c| c.eq_ignore_ascii_case("doi")))
        .and_then(json_text)
}

fn landing_url(result: &Value) -> Option<String> {
    let instances = as_list(result.get("children").and_then(|c| c.get("instance")));
    instances
        .into_iter()
        .flat_map(|instance| as_list(instance.get("webresource")))
        .find_map(|resource| resource.get("url").and_then(json_text))
}

fn pages(journal: &Value) -> Option<String> {
    match (attr(journal, "@sp").and_then(non_empty), attr(journal, "@ep").and_then(non_empty)) {
        (Some(sp), Some(ep)) => Some(format!("{}-{}", sp, ep)),
        (Some(sp), None) => Some(sp),
        _ => None,
    }
}

fn parse_result(entry: &Value) -> Result<Article> {
    let result = entry
        .pointer("/metadata/oaf:entity/oaf:result")
        .ok_or_else(|| Error::Parse("result without oaf:result metadata".to_string()))?;

    let mut article = Article::new(&main_title(result).unwrap_or_default(), NAME);
    article.summary = as_list(result.get("description"))
        .into_iter()
        .find_map(json_text)
        .and_then(|d| non_empty(&d))
        .unwrap_or_default();
    article.authors = as_list(result.get("creator"))
        .into_iter()
        .filter_map(json_text)
        .collect();
    // keep the raw node when it is not a plain date so the year can still be recovered
    article.published = match result.get("dateofacceptance") {
        Some(date) => json_text(date).unwrap_or_else(|| date.to_string()),
        None => String::new(),
    };
    article.doi = doi(result);
    article.url = landing_url(result)
        .or_else(|| article.doi.as_ref().map(|d| format!("https://doi.org/{}", d)));

    if let Some(journal) = result.get("journal").filter(|j| !j.is_null()) {
        article.journal = json_text(journal);
        article.volume = attr(journal, "@vol").and_then(non_empty);
        article.issue = attr(journal, "@iss").and_then(non_empty);
        article.pages = pages(journal);
    }
    Ok(article)
}

/// Parse the JSON search response. Unusable results are logged and skipped.
pub fn parse_response(json: &str) -> Result<Vec<Article>> {
    let value: Value = serde_json::from_str(json)?;
    let response = value
        .get("response")
        .ok_or_else(|| Error::Parse("OpenAIRE reply has no response object".to_string()))?;
    let results = as_list(response.get("results").and_then(|r| r.get("result")));

    let mut articles = Vec::with_capacity(results.len());
    for entry in results {
        match parse_result(entry) {
            Ok(article) => articles.push(article),
            Err(e) => warn!("Skipping OpenAIRE result: {}", e),
        }
    }
    Ok(articles)
}

#[async_trait]
impl Source for OpenAireSource {
    fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: NAME,
            emoji: "🇪🇺",
            description: "OpenAIRE research graph publications (accepted-date filtered)",
        }
    }

    fn cli_names(&self) -> Vec<&str> {
        vec!["openaire"]
    }

    async fn fetch(&self, query: &str, range: &YearRange) -> Result<Vec<Article>> {
        let size = self.max_results.to_string();
        let from = format!("{}-01-01", range.start);
        let to = format!("{}-12-31", range.end);
        debug!("OpenAIRE query: {} ({} to {})", query, from, to);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("keywords", query),
                ("format", "json"),
                ("size", size.as_str()),
                ("fromDateAccepted", from.as_str()),
                ("toDateAccepted", to.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::provider(NAME, e))?;
        let body = read_body(NAME, response).await?;
        let articles = parse_response(&body)?;
        Ok(articles.into_iter().take(self.max_results).collect())
    }
}
