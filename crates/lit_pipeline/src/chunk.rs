use lit_core::{Article, Chunk, ChunkMetadata, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum window length, in characters
    pub max_chars: usize,
    /// Characters shared by consecutive windows
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Splits article text into fixed-size overlapping character windows.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        if config.max_chars == 0 || config.overlap >= config.max_chars {
            return Err(Error::InvalidInput(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                config.overlap, config.max_chars
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkerConfig {
        self.config
    }

    /// Windows of at most `max_chars` characters, each starting
    /// `max_chars - overlap` after the previous one. The last window ends
    /// at the end of the text.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = self.config.max_chars - self.config.overlap;
        let mut windows = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.config.max_chars).min(chars.len());
            windows.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        windows
    }

    pub fn chunk(&self, articles: &[Article]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for article in articles {
            let text = composite_text(article);
            if text.is_empty() {
                debug!("Skipping article with no text: {:?}", article.url);
                continue;
            }
            let metadata = ChunkMetadata {
                title: article.title.clone(),
                url: article.url.clone().unwrap_or_default(),
                authors: article.authors_joined(),
                source: article.source.clone(),
            };
            chunks.extend(self.split(&text).into_iter().map(|text| Chunk {
                text,
                metadata: metadata.clone(),
            }));
        }
        debug!("Split {} articles into {} chunks", articles.len(), chunks.len());
        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            config: ChunkerConfig::default(),
        }
    }
}

/// Title and abstract, separated by a blank line.
pub fn composite_text(article: &Article) -> String {
    let title = article.title.trim();
    let body = article.summary.trim();
    match (title.is_empty(), body.is_empty()) {
        (true, true) => String::new(),
        (false, true) => title.to_string(),
        (true, false) => body.to_string(),
        (false, false) => format!("{}\n\n{}", title, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(max_chars: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkerConfig { max_chars, overlap }).unwrap()
    }

    #[test]
    fn test_invalid_config() {
        assert!(Chunker::new(ChunkerConfig { max_chars: 100, overlap: 100 }).is_err());
        assert!(Chunker::new(ChunkerConfig { max_chars: 0, overlap: 0 }).is_err());
        let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
        assert_eq!(chunker.config(), ChunkerConfig::default());
    }

    #[test]
    fn test_split_windows() {
        let windows = chunker(4, 1).split("abcdefghij");
        assert_eq!(windows, vec!["abcd", "defg", "ghij"]);

        let windows = chunker(4, 1).split("abcdefgh");
        assert_eq!(windows, vec!["abcd", "defg", "gh"]);

        assert_eq!(chunker(4, 1).split("abc"), vec!["abc"]);
        assert!(chunker(4, 1).split("").is_empty());
    }

    #[test]
    fn test_split_counts_characters_not_bytes() {
        let windows = chunker(3, 1).split("ñandú");
        assert_eq!(windows, vec!["ñan", "ndú"]);
    }

    #[test]
    fn test_chunk_carries_provenance() {
        let mut article = Article::new("Protein folding", "PubMed");
        article.summary = "x".repeat(900);
        article.authors = vec!["Marie Curie".to_string(), "Rosalind Franklin".to_string()];
        article.url = Some("https://pubmed.ncbi.nlm.nih.gov/1/".to_string());

        let chunks = Chunker::default().chunk(&[article]);
        // 917 characters, windows start at 0, 400 and 800
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].text.starts_with("Protein folding\n\nxxx"));
        assert!(chunks.iter().all(|c| c.text.chars().count() <= DEFAULT_CHUNK_SIZE));
        assert_eq!(chunks[2].metadata.authors, "Marie Curie, Rosalind Franklin");
        assert_eq!(chunks[2].metadata.url, "https://pubmed.ncbi.nlm.nih.gov/1/");
        assert_eq!(chunks[2].metadata.source, "PubMed");
    }

    #[test]
    fn test_empty_article_yields_no_chunks() {
        let article = Article::default();
        assert!(Chunker::default().chunk(&[article]).is_empty());
    }
}
