use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

pub const NO_TITLE: &str = "No title available";
pub const NO_YEAR: &str = "N/A";
pub const MIN_YEAR: i32 = 1900;

/// Placeholders the report form sends for "nothing selected".
const FORM_PLACEHOLDERS: &[&str] = &["-- Select --", "-- Not Specified --"];

/// A literature record normalized from any provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    /// Summary (ArXiv) or abstract (everything else). May be empty.
    pub summary: String,
    pub authors: Vec<String>,
    /// Raw publication token as returned by the provider.
    pub published: String,
    pub url: Option<String>,
    pub doi: Option<String>,
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    /// Provider that produced the record.
    pub source: String,
}

impl Article {
    pub fn new(title: &str, source: &str) -> Self {
        let title = normalize_whitespace(title);
        Self {
            title: if title.is_empty() { NO_TITLE.to_string() } else { title },
            source: source.to_string(),
            ..Default::default()
        }
    }

    /// Publication year resolved from the raw `published` token.
    pub fn year(&self) -> Option<i32> {
        extract_year(&self.published)
    }

    /// Four digit year, or `N/A` when it cannot be resolved.
    pub fn year_label(&self) -> String {
        self.year()
            .map(|y| y.to_string())
            .unwrap_or_else(|| NO_YEAR.to_string())
    }

    pub fn authors_joined(&self) -> String {
        self.authors.join(", ")
    }
}

/// Collapse runs of whitespace (feeds wrap titles over several lines).
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pull a year out of a provider date token.
///
/// Handles ISO timestamps (`2021-03-04T10:00:00Z`), bare years, and
/// stringified structures such as `{'$': '2021-03-04'}` where the date sits
/// inside a wrapper object.
pub fn extract_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with('{') || raw.starts_with('[') {
        let inner = serde_json::from_str::<Value>(raw)
            .or_else(|_| serde_json::from_str::<Value>(&raw.replace('\'', "\"")))
            .ok()
            .and_then(|v| json_text(&v));
        return match inner {
            Some(token) => extract_year(&token),
            None => first_year_run(raw),
        };
    }
    let mut chars = raw.chars();
    let leading: String = chars.by_ref().take(4).collect();
    let followed_by_digit = chars.next().is_some_and(|c| c.is_ascii_digit());
    if leading.len() == 4 && leading.chars().all(|c| c.is_ascii_digit()) && !followed_by_digit {
        return leading.parse().ok();
    }
    first_year_run(raw)
}

/// First run of exactly four ASCII digits.
fn first_year_run(s: &str) -> Option<i32> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i - start == 4 {
                return s[start..i].parse().ok();
            }
        } else {
            i += 1;
        }
    }
    None
}

/// Text content of a JSON node that may be a plain string, a `{"$": ...}`
/// wrapper, or a list of either (first usable entry wins).
pub fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("$").and_then(json_text),
        Value::Array(items) => items.iter().find_map(json_text),
        _ => None,
    }
}

/// Inclusive publication year window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawYearRange")]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

#[derive(Deserialize)]
struct RawYearRange {
    start: i32,
    end: i32,
}

impl TryFrom<RawYearRange> for YearRange {
    type Error = Error;

    fn try_from(raw: RawYearRange) -> Result<Self> {
        YearRange::new(raw.start, raw.end)
    }
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Result<Self> {
        let current = current_year();
        if start > end {
            return Err(Error::InvalidInput(format!(
                "start year {} is after end year {}",
                start, end
            )));
        }
        for year in [start, end] {
            if !(MIN_YEAR..=current).contains(&year) {
                return Err(Error::InvalidInput(format!(
                    "year {} is outside {}..={}",
                    year, MIN_YEAR, current
                )));
            }
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            start: 2000,
            end: current_year(),
        }
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

pub fn current_year() -> i32 {
    Utc::now().year()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CitationFormat {
    #[default]
    #[serde(rename = "APA", alias = "apa")]
    Apa,
    #[serde(rename = "MLA", alias = "mla")]
    Mla,
}

impl fmt::Display for CitationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CitationFormat::Apa => write!(f, "APA"),
            CitationFormat::Mla => write!(f, "MLA"),
        }
    }
}

impl FromStr for CitationFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "APA" => Ok(CitationFormat::Apa),
            "MLA" => Ok(CitationFormat::Mla),
            other => Err(Error::InvalidInput(format!(
                "unknown citation format: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub title: String,
    pub url: String,
    /// Authors flattened to `A, B, C`.
    pub authors: String,
    pub source: String,
}

/// A bounded window of article text, the unit of embedding and retrieval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Parameters of one report invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub research_topic: String,
    #[serde(default)]
    pub related_topic: String,
    #[serde(default)]
    pub field_of_study: String,
    #[serde(default)]
    pub type_of_publication: String,
    #[serde(default)]
    pub year_range: YearRange,
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub citation_format: CitationFormat,
    pub provider: String,
}

impl ReportRequest {
    pub fn new(research_topic: &str, year_range: YearRange, provider: &str) -> Self {
        Self {
            research_topic: research_topic.trim().to_string(),
            related_topic: String::new(),
            field_of_study: String::new(),
            type_of_publication: String::new(),
            year_range,
            keywords: String::new(),
            citation_format: CitationFormat::default(),
            provider: provider.trim().to_string(),
        }
    }

    /// Query sent to the provider and used for retrieval.
    pub fn search_query(&self) -> String {
        let mut query = self.research_topic.trim().to_string();
        if let Some(related) = form_value(&self.related_topic) {
            query.push_str(&format!(" related to {}", related));
        }
        if let Some(field) = form_value(&self.field_of_study) {
            query.push_str(&format!(" in {}", field));
        }
        if let Some(kind) = form_value(&self.type_of_publication) {
            query.push_str(&format!(" {}", kind));
        }
        if let Some(keywords) = form_value(&self.keywords) {
            query.push_str(&format!(" keywords: {}", keywords));
        }
        query
    }
}

/// `None` for empty inputs and form placeholders.
pub fn form_value(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.is_empty() || FORM_PLACEHOLDERS.contains(&value) {
        None
    } else {
        Some(value)
    }
}

/// A recovered failure recorded on a degraded report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    ProviderUnavailable { provider: String, message: String },
    UnsupportedProvider { provider: String },
    NoArticlesFound,
    EmbeddingOrIndexFailure { message: String },
    SummarizationFailure { message: String },
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::ProviderUnavailable { provider, message } => {
                write!(f, "{} unavailable: {}", provider, message)
            }
            Condition::UnsupportedProvider { provider } => {
                write!(f, "Unsupported database: {}", provider)
            }
            Condition::NoArticlesFound => write!(f, "No articles found"),
            Condition::EmbeddingOrIndexFailure { message } => {
                write!(f, "Retrieval skipped: {}", message)
            }
            Condition::SummarizationFailure { message } => {
                write!(f, "Summarization failed: {}", message)
            }
        }
    }
}

/// Output of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub research_topic: String,
    pub generated_summary: String,
    pub articles: Vec<Article>,
    pub citation_format: CitationFormat,
    pub citations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_of_study: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_of_publication: Option<String>,
    pub provider: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Report {
    pub fn is_degraded(&self) -> bool {
        !self.conditions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_title_fallback() {
        assert_eq!(Article::new("   ", "arXiv").title, NO_TITLE);
        assert_eq!(
            Article::new("Attention\n   Is All You Need", "arXiv").title,
            "Attention Is All You Need"
        );
    }

    #[test]
    fn test_extract_year_formats() {
        assert_eq!(extract_year("2021-03-04T10:00:00Z"), Some(2021));
        assert_eq!(extract_year("1999"), Some(1999));
        assert_eq!(extract_year("{'$': '2019-07-01'}"), Some(2019));
        assert_eq!(extract_year(r#"{"$": "2018-01-01"}"#), Some(2018));
        assert_eq!(extract_year("[{'$': '2017'}]"), Some(2017));
        assert_eq!(extract_year("Spring 2016"), Some(2016));
        assert_eq!(extract_year(""), None);
        assert_eq!(extract_year("unknown"), None);
        assert_eq!(extract_year("12345"), None);
    }

    #[test]
    fn test_year_label_placeholder() {
        let article = Article::new("Title", "PubMed");
        assert_eq!(article.year_label(), NO_YEAR);
    }

    #[test]
    fn test_json_text_unwraps_wrappers() {
        let value = serde_json::json!([{ "$": "" }, { "$": "Main title", "@classid": "main title" }]);
        assert_eq!(json_text(&value).as_deref(), Some("Main title"));
        assert_eq!(json_text(&serde_json::json!(null)), None);
    }

    #[test]
    fn test_year_range_validation() {
        assert!(YearRange::new(2020, 2023).is_ok());
        assert!(YearRange::new(2023, 2020).is_err());
        assert!(YearRange::new(1899, 2000).is_err());
        assert!(YearRange::new(2000, current_year() + 1).is_err());

        let range = YearRange::new(2020, 2023).unwrap();
        assert!(range.contains(2020));
        assert!(range.contains(2023));
        assert!(!range.contains(2024));
    }

    #[test]
    fn test_citation_format_parsing() {
        assert_eq!("apa".parse::<CitationFormat>().unwrap(), CitationFormat::Apa);
        assert_eq!(" MLA ".parse::<CitationFormat>().unwrap(), CitationFormat::Mla);
        assert!("chicago".parse::<CitationFormat>().is_err());
        assert_eq!(CitationFormat::Mla.to_string(), "MLA");
    }

    #[test]
    fn test_search_query_composition() {
        let mut request = ReportRequest::new("transformer models", YearRange::default(), "arxiv");
        assert_eq!(request.search_query(), "transformer models");

        request.related_topic = "attention".to_string();
        request.field_of_study = "-- Select --".to_string();
        request.type_of_publication = "Journal Article".to_string();
        request.keywords = "nlp, vision".to_string();
        assert_eq!(
            request.search_query(),
            "transformer models related to attention Journal Article keywords: nlp, vision"
        );
    }

    #[test]
    fn test_year_range_deserialization_is_validated() {
        let range: YearRange = serde_json::from_str(r#"{"start": 2010, "end": 2020}"#).unwrap();
        assert_eq!(range, YearRange::new(2010, 2020).unwrap());

        assert!(serde_json::from_str::<YearRange>(r#"{"start": 2020, "end": 2010}"#).is_err());
        assert!(serde_json::from_str::<YearRange>(r#"{"start": 1500, "end": 2010}"#).is_err());
        assert!(serde_json::from_str::<ReportRequest>(
            r#"{"research_topic": "graphs", "provider": "arxiv", "year_range": {"start": 2020, "end": 2019}}"#,
        )
        .is_err());
    }

    #[test]
    fn test_report_request_json_defaults() {
        let request: ReportRequest = serde_json::from_str(
            r#"{"research_topic": "graphs", "provider": "pubmed", "citation_format": "MLA"}"#,
        )
        .unwrap();
        assert_eq!(request.citation_format, CitationFormat::Mla);
        assert_eq!(request.year_range, YearRange::default());
        assert!(request.keywords.is_empty());
    }
}
