use clap::{Args, Subcommand};
use lit_core::{Article, Result, YearRange};

use crate::router::SearchRouter;

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    #[command(subcommand)]
    pub command: SourceCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SourceCommands {
    /// Search one provider and print the normalized articles
    Search {
        /// Provider name (arxiv, pubmed, openaire, scholar)
        #[arg(short, long, default_value = "arxiv")]
        provider: String,

        /// First publication year, inclusive
        #[arg(long, default_value_t = 2000)]
        start_year: i32,

        /// Last publication year, inclusive; defaults to the current year
        #[arg(long)]
        end_year: Option<i32>,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,

        /// Free-text query
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// List available providers
    #[command(name = "providers", alias = "list")]
    List,
}

pub async fn handle_command(args: SourceArgs, router: &SearchRouter) -> Result<()> {
    match args.command {
        SourceCommands::Search {
            provider,
            start_year,
            end_year,
            json,
            query,
        } => {
            let range = YearRange::new(start_year, end_year.unwrap_or_else(lit_core::types::current_year))?;
            let query = query.join(" ");
            let outcome = router.search_with_outcome(&query, &range, &provider).await;
            if let Some(condition) = &outcome.condition {
                eprintln!("⚠️  {}", condition);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.articles)?);
            } else {
                println!("Found {} articles", outcome.articles.len());
                for article in &outcome.articles {
                    println!("{}", listing_line(article));
                }
            }
        }
        SourceCommands::List => {
            println!("Available providers:");
            for (metadata, names) in router.providers() {
                println!("  {} {} [{}] - {}", metadata.emoji, metadata.name, names.join(", "), metadata.description);
            }
        }
    }
    Ok(())
}

fn listing_line(article: &Article) -> String {
    format!(
        "📄 {} ({}) - {}",
        article.title,
        article.year_label(),
        article.url.as_deref().unwrap_or("no url")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: SourceArgs,
    }

    #[test]
    fn test_parse_search_command() {
        let cli = TestCli::parse_from(["lit", "search", "-p", "pubmed", "--start-year", "2020", "gene", "editing"]);
        match cli.args.command {
            SourceCommands::Search { provider, start_year, end_year, query, json } => {
                assert_eq!(provider, "pubmed");
                assert_eq!(start_year, 2020);
                assert_eq!(end_year, None);
                assert_eq!(query, vec!["gene", "editing"]);
                assert!(!json);
            }
            SourceCommands::List => panic!("expected search"),
        }
    }

    #[test]
    fn test_parse_providers_command() {
        let cli = TestCli::parse_from(["lit", "providers"]);
        assert!(matches!(cli.args.command, SourceCommands::List));
        let cli = TestCli::parse_from(["lit", "list"]);
        assert!(matches!(cli.args.command, SourceCommands::List));
    }

    #[test]
    fn test_listing_line() {
        let mut article = Article::new("Attention Is All You Need", "arXiv");
        article.published = "2017-06-12T17:57:34Z".to_string();
        assert_eq!(listing_line(&article), "📄 Attention Is All You Need (2017) - no url");
    }
}
