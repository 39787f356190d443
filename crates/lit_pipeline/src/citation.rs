use lit_core::types::NO_TITLE;
use lit_core::{Article, CitationFormat};

pub const NO_AUTHORS: &str = "No authors listed";
pub const NO_URL: &str = "No URL available";

pub fn format_authors(authors: &[String], format: CitationFormat) -> String {
    let authors: Vec<&str> = authors
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .collect();
    match authors.as_slice() {
        [] => NO_AUTHORS.to_string(),
        [only] => only.to_string(),
        [first, second] => match format {
            CitationFormat::Apa => format!("{} & {}", first, second),
            CitationFormat::Mla => format!("{} and {}", first, second),
        },
        [first, ..] => format!("{} et al.", first),
    }
}

/// `DOI: https://doi.org/...` when a DOI is known, otherwise the URL with a
/// label picked from its host.
pub fn source_text(article: &Article) -> String {
    if let Some(doi) = article.doi.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        let doi = doi
            .trim_start_matches("https://doi.org/")
            .trim_start_matches("http://doi.org/")
            .trim_start_matches("doi:");
        return format!("DOI: https://doi.org/{}", doi);
    }

    let Some(url) = article.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
        return NO_URL.to_string();
    };
    let host = url.to_lowercase();
    if host.contains("arxiv.org") {
        format!("Retrieved from arXiv: {}", url)
    } else if host.contains("semanticscholar.org") {
        format!("Retrieved from Semantic Scholar: {}", url)
    } else if host.contains("core.ac.uk") {
        format!("Retrieved from CORE: {}", url)
    } else {
        format!("Retrieved from: {}", url)
    }
}

/// Journal, volume, issue and pages joined with `, `; `None` when all are missing.
pub fn journal_block(article: &Article) -> Option<String> {
    let present = |field: &Option<String>| {
        field
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let parts: Vec<String> = [
        present(&article.journal),
        present(&article.volume).map(|v| format!("Vol. {}", v)),
        present(&article.issue).map(|i| format!("No. {}", i)),
        present(&article.pages).map(|p| format!("pp. {}", p)),
    ]
    .into_iter()
    .flatten()
    .collect();

    (!parts.is_empty()).then(|| parts.join(", "))
}

pub fn render_citation(article: &Article, format: CitationFormat) -> String {
    let authors = format_authors(&article.authors, format);
    let year = article.year_label();
    let title = match article.title.trim() {
        "" => NO_TITLE,
        title => title,
    };
    let source = source_text(article);

    match (format, journal_block(article)) {
        (CitationFormat::Apa, Some(journal)) => {
            format!("{} ({}). {}. {}. {}", authors, year, title, journal, source)
        }
        (CitationFormat::Apa, None) => format!("{} ({}). {}. {}", authors, year, title, source),
        (CitationFormat::Mla, Some(journal)) => {
            format!("{}. \"{}\". {}, {}. {}", authors, title, journal, year, source)
        }
        (CitationFormat::Mla, None) => format!("{}. \"{}\". {}, {}.", authors, title, source, year),
    }
}

pub fn render_citations(articles: &[Article], format: CitationFormat) -> Vec<String> {
    articles.iter().map(|a| render_citation(a, format)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn attention() -> Article {
        let mut article = Article::new("Attention Is All You Need", "arXiv");
        article.authors = names(&["Ashish Vaswani", "Noam Shazeer", "Niki Parmar"]);
        article.published = "2017-06-12T17:57:34Z".to_string();
        article.url = Some("http://arxiv.org/abs/1706.03762v5".to_string());
        article
    }

    #[test]
    fn test_format_authors() {
        assert_eq!(format_authors(&[], CitationFormat::Apa), "No authors listed");
        assert_eq!(format_authors(&names(&["A"]), CitationFormat::Apa), "A");
        assert_eq!(format_authors(&names(&["A", "B"]), CitationFormat::Apa), "A & B");
        assert_eq!(format_authors(&names(&["A", "B"]), CitationFormat::Mla), "A and B");
        assert_eq!(format_authors(&names(&["A", "B", "C"]), CitationFormat::Mla), "A et al.");
        assert_eq!(format_authors(&names(&["  ", ""]), CitationFormat::Apa), "No authors listed");
    }

    #[test]
    fn test_source_text_precedence() {
        let mut article = attention();
        assert_eq!(
            source_text(&article),
            "Retrieved from arXiv: http://arxiv.org/abs/1706.03762v5"
        );

        article.doi = Some("https://doi.org/10.48550/arXiv.1706.03762".to_string());
        assert_eq!(source_text(&article), "DOI: https://doi.org/10.48550/arXiv.1706.03762");

        article.doi = None;
        article.url = Some("https://www.semanticscholar.org/paper/123".to_string());
        assert!(source_text(&article).starts_with("Retrieved from Semantic Scholar: "));
        article.url = Some("https://core.ac.uk/works/1".to_string());
        assert!(source_text(&article).starts_with("Retrieved from CORE: "));
        article.url = Some("https://pubmed.ncbi.nlm.nih.gov/1/".to_string());
        assert_eq!(source_text(&article), "Retrieved from: https://pubmed.ncbi.nlm.nih.gov/1/");
        article.url = None;
        assert_eq!(source_text(&article), "No URL available");
    }

    #[test]
    fn test_journal_block() {
        let mut article = attention();
        assert_eq!(journal_block(&article), None);

        article.journal = Some("Nature".to_string());
        article.issue = Some("4".to_string());
        article.pages = Some("1-9".to_string());
        assert_eq!(journal_block(&article).as_deref(), Some("Nature, No. 4, pp. 1-9"));

        article.journal = None;
        article.volume = Some("30".to_string());
        assert_eq!(journal_block(&article).as_deref(), Some("Vol. 30, No. 4, pp. 1-9"));
    }

    #[test]
    fn test_apa_citation() {
        let mut article = attention();
        assert_eq!(
            render_citation(&article, CitationFormat::Apa),
            "Ashish Vaswani et al. (2017). Attention Is All You Need. Retrieved from arXiv: http://arxiv.org/abs/1706.03762v5"
        );

        article.journal = Some("Advances in NeurIPS".to_string());
        article.volume = Some("30".to_string());
        assert_eq!(
            render_citation(&article, CitationFormat::Apa),
            "Ashish Vaswani et al. (2017). Attention Is All You Need. Advances in NeurIPS, Vol. 30. Retrieved from arXiv: http://arxiv.org/abs/1706.03762v5"
        );
    }

    #[test]
    fn test_mla_citation() {
        let mut article = attention();
        article.authors.truncate(2);
        assert_eq!(
            render_citation(&article, CitationFormat::Mla),
            "Ashish Vaswani and Noam Shazeer. \"Attention Is All You Need\". Retrieved from arXiv: http://arxiv.org/abs/1706.03762v5, 2017."
        );

        article.journal = Some("NeurIPS".to_string());
        article.doi = Some("10.5555/3295222".to_string());
        assert_eq!(
            render_citation(&article, CitationFormat::Mla),
            "Ashish Vaswani and Noam Shazeer. \"Attention Is All You Need\". NeurIPS, 2017. DOI: https://doi.org/10.5555/3295222"
        );
    }

    #[test]
    fn test_empty_article_degrades_to_placeholders() {
        let citation = render_citation(&Article::default(), CitationFormat::Apa);
        assert_eq!(citation, "No authors listed (N/A). No title available. No URL available");
    }

    #[test]
    fn test_structured_date_year() {
        let mut article = attention();
        article.published = "{'$': '2019-07-01'}".to_string();
        assert!(render_citation(&article, CitationFormat::Apa).contains("(2019)"));
    }
}
