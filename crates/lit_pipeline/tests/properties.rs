use lit_core::{Article, CitationFormat};
use lit_pipeline::citation::{format_authors, render_citation};
use lit_pipeline::{Chunker, ChunkerConfig};
use proptest::prelude::*;

fn chunker_params() -> impl Strategy<Value = (usize, usize)> {
    (2usize..200).prop_flat_map(|max_chars| (Just(max_chars), 0..max_chars))
}

fn optional_text() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[ a-zA-Z0-9.,-]{0,20}")
}

prop_compose! {
    fn any_article()(
        title in "[ a-zA-Z0-9:]{0,40}",
        summary in ".{0,80}",
        authors in prop::collection::vec("[ a-zA-Z.]{0,15}", 0..5),
        published in prop_oneof![
            Just(String::new()),
            "[0-9]{4}-[0-9]{2}-[0-9]{2}T00:00:00Z",
            "\\{'\\$': '[0-9]{4}'\\}",
            ".{0,12}",
        ],
        url in optional_text(),
        doi in optional_text(),
        journal in optional_text(),
        volume in optional_text(),
        issue in optional_text(),
        pages in optional_text(),
    ) -> Article {
        Article {
            title,
            summary,
            authors,
            published,
            url,
            doi,
            journal,
            volume,
            issue,
            pages,
            source: "test".to_string(),
        }
    }
}

proptest! {
    #[test]
    fn chunks_are_bounded_and_overlap_exactly(
        (max_chars, overlap) in chunker_params(),
        text in "\\PC{0,600}",
    ) {
        let chunker = Chunker::new(ChunkerConfig { max_chars, overlap }).unwrap();
        let windows = chunker.split(&text);

        for window in &windows {
            prop_assert!(window.chars().count() <= max_chars);
        }
        for pair in windows.windows(2) {
            let previous: Vec<char> = pair[0].chars().collect();
            let next: Vec<char> = pair[1].chars().collect();
            // every window except the last is full length
            prop_assert_eq!(previous.len(), max_chars);
            prop_assert_eq!(&previous[max_chars - overlap..], &next[..overlap]);
        }
    }

    #[test]
    fn chunking_is_lossless(
        (max_chars, overlap) in chunker_params(),
        text in "\\PC{0,600}",
    ) {
        let chunker = Chunker::new(ChunkerConfig { max_chars, overlap }).unwrap();
        let windows = chunker.split(&text);

        let mut rebuilt = String::new();
        for (i, window) in windows.iter().enumerate() {
            let skip = if i == 0 { 0 } else { overlap };
            rebuilt.extend(window.chars().skip(skip));
        }
        prop_assert_eq!(rebuilt, text);
    }

    #[test]
    fn citation_rendering_is_total(article in any_article(), mla in any::<bool>()) {
        let format = if mla { CitationFormat::Mla } else { CitationFormat::Apa };
        let citation = render_citation(&article, format);
        prop_assert!(!citation.is_empty());
        let year = article.year_label();
        prop_assert!(citation.contains(&year));
    }

    #[test]
    fn three_or_more_authors_use_et_al(
        first in "[A-Z][a-z]{1,10}",
        rest in prop::collection::vec("[A-Z][a-z]{1,10}", 2..6),
    ) {
        let mut authors = vec![first.clone()];
        authors.extend(rest);
        prop_assert_eq!(format_authors(&authors, CitationFormat::Apa), format!("{} et al.", first));
    }
}
