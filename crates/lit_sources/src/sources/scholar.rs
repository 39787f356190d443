use async_trait::async_trait;
use lit_core::types::extract_year;
use lit_core::{Article, Error, Result, YearRange};
use reqwest::Client;
use scraper::{ElementRef, Html};
use tracing::debug;

use super::{non_empty, read_body, selector, Source, SourceConfig, SourceMetadata};

const NAME: &str = "Google Scholar";

pub struct ScholarSource {
    client: Client,
    base_url: String,
    max_results: usize,
}

impl ScholarSource {
    pub fn new(config: &SourceConfig, client: Client) -> Self {
        Self {
            client,
            base_url: config.scholar_url.clone(),
            max_results: config.scholar_max_results,
        }
    }
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>()
}

/// Split the green byline, `A Author, B Author - Venue, 2020 - host.com`,
/// into authors, venue and year token.
fn parse_byline(byline: &str) -> (Vec<String>, Option<String>, String) {
    let byline = byline.replace('\u{a0}', " ");
    let mut parts = byline.split(" - ");
    let authors = parts
        .next()
        .unwrap_or_default()
        .split(',')
        .map(|a| a.trim().trim_end_matches('…').trim())
        .filter(|a| !a.is_empty() && *a != "…")
        .map(str::to_string)
        .collect();

    let venue_part = parts.next().unwrap_or_default().trim();
    let (venue, year) = match venue_part.rsplit_once(',') {
        Some((venue, tail)) if extract_year(tail).is_some() => (venue, extract_year(tail)),
        // a bare year with no venue
        _ if venue_part.len() == 4 && extract_year(venue_part).is_some() => ("", extract_year(venue_part)),
        _ => (venue_part, None),
    };
    let venue = non_empty(venue.trim_end_matches('…'));
    let year = year.map(|y| y.to_string()).unwrap_or_default();
    (authors, venue, year)
}

/// Parse a Scholar result page. A captcha or block page is an error.
pub fn parse_results(html: &str) -> Result<Vec<Article>> {
    if html.contains("gs_captcha") || html.contains("unusual traffic") {
        return Err(Error::provider(NAME, "request was blocked (captcha)"));
    }

    let document = Html::parse_document(html);
    let result_sel = selector("div.gs_ri")?;
    let title_sel = selector("h3.gs_rt")?;
    let link_sel = selector("a")?;
    let byline_sel = selector("div.gs_a")?;
    let snippet_sel = selector("div.gs_rs")?;

    let mut articles = Vec::new();
    for result in document.select(&result_sel) {
        let Some(heading) = result.select(&title_sel).next() else {
            debug!("Skipping Scholar result without a title");
            continue;
        };
        let link = heading.select(&link_sel).next();
        // linked titles carry only the title; bare ones carry a [CITATION] style tag
        let title = match link {
            Some(a) => text_of(a),
            None => strip_tags(&text_of(heading)).to_string(),
        };

        let mut article = Article::new(&title, NAME);
        article.url = link
            .and_then(|a| a.value().attr("href"))
            .filter(|href| href.starts_with("http"))
            .map(str::to_string);
        article.summary = result
            .select(&snippet_sel)
            .next()
            .and_then(|s| non_empty(&text_of(s)))
            .unwrap_or_default();
        if let Some(byline) = result.select(&byline_sel).next() {
            let (authors, venue, year) = parse_byline(&text_of(byline));
            article.authors = authors;
            article.journal = venue;
            article.published = year;
        }
        articles.push(article);
    }
    Ok(articles)
}

/// Drop leading `[CITATION]`, `[PDF]` style tags from an unlinked title.
fn strip_tags(title: &str) -> &str {
    let mut rest = title.trim_start();
    while rest.starts_with('[') {
        match rest.find(']') {
            Some(end) => rest = rest[end + 1..].trim_start(),
            None => break,
        }
    }
    rest
}

#[async_trait]
impl Source for ScholarSource {
    fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: NAME,
            emoji: "🎓",
            description: "Google Scholar result pages (scraped, may be rate limited)",
        }
    }

    fn cli_names(&self) -> Vec<&str> {
        vec!["scholar", "google-scholar", "googlescholar"]
    }

    async fn fetch(&self, query: &str, range: &YearRange) -> Result<Vec<Article>> {
        let start = range.start.to_string();
        let end = range.end.to_string();
        let num = self.max_results.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("hl", "en"),
                ("as_ylo", start.as_str()),
                ("as_yhi", end.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::provider(NAME, e))?;
        let body = read_body(NAME, response).await?;

        // results with a known year outside the window are dropped, undated ones kept
        let articles = parse_results(&body)?
            .into_iter()
            .filter(|a| a.year().map_or(true, |y| range.contains(y)))
            .take(self.max_results)
            .collect();
        Ok(articles)
    }
}
