use async_trait::async_trait;
use lit_core::{Article, Error, Result, YearRange};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{non_empty, read_body, Source, SourceConfig, SourceMetadata};

const NAME: &str = "PubMed";

pub struct PubMedSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    esearchresult: SearchResult,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

impl PubMedSource {
    pub fn new(config: &SourceConfig, client: Client) -> Self {
        Self {
            client,
            base_url: config.pubmed_url.trim_end_matches('/').to_string(),
            api_key: config.pubmed_api_key.clone().filter(|k| !k.is_empty()),
            max_results: config.pubmed_max_results,
        }
    }

    async fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String> {
        let mut request = self
            .client
            .get(format!("{}/{}", self.base_url, endpoint))
            .query(params);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key.as_str())]);
        }
        let response = request.send().await.map_err(|e| Error::provider(NAME, e))?;
        read_body(NAME, response).await
    }
}

/// Field-tagged query with an inclusive publication date window.
pub fn format_query(query: &str, range: &YearRange) -> String {
    let sanitized: String = query.chars().filter(|c| !matches!(c, '"' | '[' | ']')).collect();
    format!(
        r#"{} AND ("{}/01/01"[Date - Publication] : "{}/12/31"[Date - Publication])"#,
        sanitized.trim(),
        range.start,
        range.end
    )
}

pub fn parse_id_list(json: &str) -> Result<Vec<String>> {
    let response: SearchResponse = serde_json::from_str(json)?;
    Ok(response.esearchresult.idlist)
}

#[derive(Default)]
struct Record {
    pmid: Option<String>,
    title: String,
    abstract_parts: Vec<String>,
    authors: Vec<String>,
    last_name: Option<String>,
    fore_name: Option<String>,
    year: Option<String>,
    medline_date: Option<String>,
    journal: Option<String>,
    volume: Option<String>,
    issue: Option<String>,
    pages: Option<String>,
    doi: Option<String>,
}

impl Record {
    fn finish(self) -> Result<Article> {
        let pmid = self
            .pmid
            .ok_or_else(|| Error::Parse("PubmedArticle without PMID".to_string()))?;
        let mut article = Article::new(&self.title, NAME);
        article.summary = self.abstract_parts.join(" ");
        article.authors = self.authors;
        article.published = self.year.or(self.medline_date).unwrap_or_default();
        article.url = Some(format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid));
        article.doi = self.doi;
        article.journal = self.journal;
        article.volume = self.volume;
        article.issue = self.issue;
        article.pages = self.pages;
        Ok(article)
    }
}

/// What the text being captured will be stored as.
#[derive(Clone)]
enum Field {
    Pmid,
    Title,
    Abstract(Option<String>),
    LastName,
    ForeName,
    CollectiveName,
    Year,
    MedlineDate,
    Journal,
    Volume,
    Issue,
    Pages,
    Doi,
}

fn attribute(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn field_for(path: &[Vec<u8>], e: &BytesStart) -> Option<Field> {
    let parent = path.last().map(Vec::as_slice);
    match (e.local_name().as_ref(), parent) {
        (b"PMID", Some(b"MedlineCitation")) => Some(Field::Pmid),
        (b"ArticleTitle", _) => Some(Field::Title),
        (b"AbstractText", _) => Some(Field::Abstract(attribute(e, b"Label"))),
        (b"LastName", Some(b"Author")) => Some(Field::LastName),
        (b"ForeName", Some(b"Author")) => Some(Field::ForeName),
        (b"CollectiveName", Some(b"Author")) => Some(Field::CollectiveName),
        (b"Year", Some(b"PubDate")) => Some(Field::Year),
        (b"MedlineDate", Some(b"PubDate")) => Some(Field::MedlineDate),
        (b"Title", Some(b"Journal")) => Some(Field::Journal),
        (b"Volume", Some(b"JournalIssue")) => Some(Field::Volume),
        (b"Issue", Some(b"JournalIssue")) => Some(Field::Issue),
        (b"MedlinePgn", Some(b"Pagination")) => Some(Field::Pages),
        (b"ArticleId", Some(b"ArticleIdList")) if attribute(e, b"IdType").as_deref() == Some("doi") => {
            Some(Field::Doi)
        }
        (b"ELocationID", _) if attribute(e, b"EIdType").as_deref() == Some("doi") => Some(Field::Doi),
        _ => None,
    }
}

fn store(record: &mut Record, field: Field, text: &str) {
    let value = non_empty(text);
    match field {
        Field::Pmid => {
            if record.pmid.is_none() {
                record.pmid = value;
            }
        }
        Field::Title => record.title = value.unwrap_or_default(),
        Field::Abstract(label) => {
            if let Some(text) = value {
                record.abstract_parts.push(match label {
                    Some(label) => format!("{}: {}", label, text),
                    None => text,
                });
            }
        }
        Field::LastName => record.last_name = value,
        Field::ForeName => record.fore_name = value,
        Field::CollectiveName => record.authors.extend(value),
        Field::Year => record.year = value,
        Field::MedlineDate => record.medline_date = value,
        Field::Journal => record.journal = value,
        Field::Volume => record.volume = value,
        Field::Issue => record.issue = value,
        Field::Pages => record.pages = value,
        Field::Doi => {
            if record.doi.is_none() {
                record.doi = value;
            }
        }
    }
}

/// Parse an efetch `PubmedArticleSet`. Records without a PMID are skipped.
pub fn parse_articles(xml: &str) -> Result<Vec<Article>> {
    let mut reader = Reader::from_str(xml);
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut articles = Vec::new();
    let mut record: Option<Record> = None;
    // field being captured and the depth it started at
    let mut capture: Option<(Field, usize)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"PubmedArticle" {
                    record = Some(Record::default());
                }
                if record.is_some() && capture.is_none() {
                    if let Some(field) = field_for(&path, &e) {
                        capture = Some((field, path.len()));
                        text.clear();
                    }
                }
                path.push(name);
            }
            Ok(Event::Text(t)) => {
                if capture.is_some() {
                    let chunk = t.unescape().map_err(|e| Error::Parse(format!("PubMed XML: {}", e)))?;
                    text.push_str(&chunk);
                }
            }
            Ok(Event::End(_)) => {
                let name = path.pop().unwrap_or_default();
                if let Some((_, depth)) = &capture {
                    if *depth == path.len() {
                        if let (Some((field, _)), Some(current)) = (capture.take(), record.as_mut()) {
                            store(current, field, &text);
                        }
                        text.clear();
                    }
                }
                match name.as_slice() {
                    b"Author" => {
                        if let Some(current) = record.as_mut() {
                            let last = current.last_name.take();
                            let fore = current.fore_name.take();
                            if let Some(last) = last {
                                current.authors.push(match fore {
                                    Some(fore) => format!("{} {}", fore, last),
                                    None => last,
                                });
                            }
                        }
                    }
                    b"PubmedArticle" => {
                        if let Some(finished) = record.take() {
                            match finished.finish() {
                                Ok(article) => articles.push(article),
                                Err(e) => warn!("Skipping PubMed record: {}", e),
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(_) => {}
            Err(e) => return Err(Error::Parse(format!("PubMed XML: {}", e))),
        }
    }

    Ok(articles)
}

#[async_trait]
impl Source for PubMedSource {
    fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: NAME,
            emoji: "🧬",
            description: "PubMed biomedical literature (E-utilities esearch + efetch)",
        }
    }

    fn cli_names(&self) -> Vec<&str> {
        vec!["pubmed"]
    }

    async fn fetch(&self, query: &str, range: &YearRange) -> Result<Vec<Article>> {
        let term = format_query(query, range);
        info!("Formatted PubMed query: {}", term);

        let retmax = self.max_results.to_string();
        let body = self
            .get(
                "esearch.fcgi",
                &[("db", "pubmed"), ("term", term.as_str()), ("retmax", retmax.as_str()), ("retmode", "json")],
            )
            .await?;
        let ids = parse_id_list(&body)?;
        if ids.is_empty() {
            warn!("No PubMed results for query: {}", term);
            return Ok(Vec::new());
        }
        debug!("Fetching {} PubMed records", ids.len());

        let ids = ids.join(",");
        let body = self
            .get("efetch.fcgi", &[("db", "pubmed"), ("id", ids.as_str()), ("retmode", "xml")])
            .await?;
        parse_articles(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EFETCH: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2024//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_240101.dtd">
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">34567890</PMID>
      <Article PubModel="Print">
        <Journal>
          <JournalIssue CitedMedium="Internet">
            <Volume>12</Volume>
            <Issue>3</Issue>
            <PubDate><Year>2021</Year><Month>Mar</Month></PubDate>
          </JournalIssue>
          <Title>Nature communications</Title>
        </Journal>
        <ArticleTitle>Deep learning for <i>protein</i> structure.</ArticleTitle>
        <Pagination><MedlinePgn>100-110</MedlinePgn></Pagination>
        <ELocationID EIdType="doi" ValidYN="Y">10.1038/s41467-021-0001</ELocationID>
        <Abstract>
          <AbstractText Label="BACKGROUND">Proteins fold.</AbstractText>
          <AbstractText Label="RESULTS">Models &amp; methods work.</AbstractText>
        </Abstract>
        <AuthorList CompleteYN="Y">
          <Author ValidYN="Y"><LastName>Curie</LastName><ForeName>Marie</ForeName></Author>
          <Author ValidYN="Y"><LastName>Franklin</LastName></Author>
          <Author ValidYN="Y"><CollectiveName>AlphaFold Consortium</CollectiveName></Author>
        </AuthorList>
      </Article>
      <CommentsCorrectionsList>
        <CommentsCorrections RefType="Cites"><PMID Version="1">11111111</PMID></CommentsCorrections>
      </CommentsCorrectionsList>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">34567890</ArticleId>
        <ArticleId IdType="doi">10.1038/ignored-second-doi</ArticleId>
      </ArticleIdList>
    </PubmedData>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation>
      <PMID>22222222</PMID>
      <Article>
        <Journal><JournalIssue><PubDate><MedlineDate>1998 Dec-1999 Jan</MedlineDate></PubDate></JournalIssue></Journal>
        <ArticleTitle>Unstructured abstract</ArticleTitle>
        <Abstract><AbstractText>Plain text.</AbstractText></Abstract>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation><Article><ArticleTitle>Missing PMID</ArticleTitle></Article></MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn test_format_query() {
        let range = YearRange::new(2020, 2023).unwrap();
        assert_eq!(
            format_query(r#"cancer "immunotherapy" [MeSH]"#, &range),
            r#"cancer immunotherapy MeSH AND ("2020/01/01"[Date - Publication] : "2023/12/31"[Date - Publication])"#
        );
    }

    #[test]
    fn test_parse_id_list() {
        let json = r#"{"header":{"type":"esearch"},"esearchresult":{"count":"2","idlist":["34567890","22222222"]}}"#;
        assert_eq!(parse_id_list(json).unwrap(), vec!["34567890", "22222222"]);
        assert!(parse_id_list(r#"{"esearchresult":{"count":"0"}}"#).unwrap().is_empty());
        assert!(parse_id_list("<html>").is_err());
    }

    #[test]
    fn test_parse_articles() {
        let articles = parse_articles(EFETCH).unwrap();
        assert_eq!(articles.len(), 2);

        let first = &articles[0];
        assert_eq!(first.title, "Deep learning for protein structure.");
        assert_eq!(first.summary, "BACKGROUND: Proteins fold. RESULTS: Models & methods work.");
        assert_eq!(first.authors, vec!["Marie Curie", "Franklin", "AlphaFold Consortium"]);
        assert_eq!(first.published, "2021");
        assert_eq!(first.url.as_deref(), Some("https://pubmed.ncbi.nlm.nih.gov/34567890/"));
        assert_eq!(first.doi.as_deref(), Some("10.1038/s41467-021-0001"));
        assert_eq!(first.journal.as_deref(), Some("Nature communications"));
        assert_eq!(first.volume.as_deref(), Some("12"));
        assert_eq!(first.issue.as_deref(), Some("3"));
        assert_eq!(first.pages.as_deref(), Some("100-110"));

        let second = &articles[1];
        assert_eq!(second.summary, "Plain text.");
        assert_eq!(second.year(), Some(1998));
        assert!(second.authors.is_empty());
    }
}
