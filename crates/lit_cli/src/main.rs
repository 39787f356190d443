use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use lit_core::logging::init_logging;
use lit_core::types::current_year;
use lit_core::{Chunk, ChunkMetadata, ChunkStorage, CitationFormat, ReportRequest, Result, YearRange};
use lit_inference::{create_model, Config as InferenceConfig, ModelKind, Summarizer};
use lit_pipeline::chunk::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use lit_pipeline::{render_markdown, ChunkerConfig, Pipeline, PipelineConfig};
use lit_sources::{handle_command, SearchRouter, SourceArgs, SourceCommands, SourceConfig};
use lit_storage::index::DEFAULT_TOP_K;
use lit_storage::{StorageConfig, StorageKind, VectorIndex};
use lit_web::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const HEALTH_NAMESPACE: &str = "health-check";
const HEALTH_DIMENSION: usize = 8;

/// Durations like `30s`, `2m` or `1m30s`; a bare number is seconds.
#[derive(Debug, Clone)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if let Ok(num) = current_number.parse::<u64>() {
                match c {
                    's' => total_seconds += num,
                    'm' => total_seconds += num * 60,
                    'h' => total_seconds += num * 3600,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                }
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        if !current_number.is_empty() {
            total_seconds += current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            has_unit = true;
        }

        if !has_unit || total_seconds == 0 {
            return Err("Duration must be a positive number".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Literature search and research report generator", long_about = None)]
struct Cli {
    /// Vector store backend: memory or qdrant
    #[arg(long, env = "LIT_STORAGE", default_value = "memory", global = true)]
    storage: String,
    /// Vector store URL (qdrant defaults to http://$QDRANT_HOST:6334)
    #[arg(long, env = "LIT_BACKEND_URL", global = true)]
    backend_url: Option<String>,
    #[arg(
        long,
        env = "LIT_MODEL",
        default_value = "openai",
        global = true,
        help = "Model to use for inference. Available models: openai (default), deepseek, ollama, dummy"
    )]
    model: String,
    /// Override the model's API root
    #[arg(long, env = "LIT_MODEL_URL", global = true)]
    model_url: Option<String>,
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,
    #[arg(long, env = "LIT_CHAT_MODEL", global = true)]
    chat_model: Option<String>,
    #[arg(long, env = "LIT_EMBEDDING_MODEL", global = true)]
    embedding_model: Option<String>,
    #[arg(long, env = "PUBMED_API_KEY", hide_env_values = true, global = true)]
    pubmed_api_key: Option<String>,
    /// HTTP timeout for providers and models (e.g. 30s, 1m)
    #[arg(long, default_value = "30s", global = true)]
    timeout: HumanDuration,
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, global = true)]
    chunk_size: usize,
    #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP, global = true)]
    chunk_overlap: usize,
    /// Chunks retrieved as summarization context
    #[arg(long, default_value_t = DEFAULT_TOP_K, global = true)]
    top_k: usize,
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search, summarize and cite articles on a topic
    Report(ReportArgs),
    #[command(flatten)]
    Sources(SourceCommands),
    /// Serve the report API over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:5000")]
        addr: SocketAddr,
    },
}

#[derive(Args, Debug)]
struct ReportArgs {
    #[arg(long)]
    related_topic: Option<String>,
    #[arg(long)]
    field: Option<String>,
    #[arg(long = "type")]
    publication_type: Option<String>,
    #[arg(long)]
    keywords: Option<String>,
    #[arg(long, default_value_t = 2000)]
    start_year: i32,
    /// Defaults to the current year
    #[arg(long)]
    end_year: Option<i32>,
    /// APA or MLA
    #[arg(long, default_value = "APA")]
    format: CitationFormat,
    /// arxiv, pubmed, openaire or scholar
    #[arg(short, long, default_value = "arxiv")]
    provider: String,
    /// Write the Markdown report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
    /// Research topic
    #[arg(required = true)]
    topic: Vec<String>,
}

impl ReportArgs {
    fn to_request(&self) -> Result<ReportRequest> {
        let range = YearRange::new(self.start_year, self.end_year.unwrap_or_else(current_year))?;
        let mut request = ReportRequest::new(&self.topic.join(" "), range, &self.provider);
        request.related_topic = self.related_topic.clone().unwrap_or_default();
        request.field_of_study = self.field.clone().unwrap_or_default();
        request.type_of_publication = self.publication_type.clone().unwrap_or_default();
        request.keywords = self.keywords.clone().unwrap_or_default();
        request.citation_format = self.format;
        Ok(request)
    }
}

impl Cli {
    fn source_config(&self) -> SourceConfig {
        SourceConfig {
            timeout: self.timeout.0,
            pubmed_api_key: self.pubmed_api_key.clone(),
            ..SourceConfig::default()
        }
    }

    fn inference_config(&self) -> Result<InferenceConfig> {
        let mut config = InferenceConfig::new(self.model.parse::<ModelKind>()?);
        config.api_key = self.api_key.clone();
        config.base_url = self.model_url.clone();
        config.timeout = self.timeout.0;
        if let Some(chat_model) = &self.chat_model {
            config.chat_model = chat_model.clone();
        }
        if let Some(embedding_model) = &self.embedding_model {
            config.embedding_model = embedding_model.clone();
        }
        Ok(config)
    }

    fn storage_config(&self) -> Result<StorageConfig> {
        Ok(StorageConfig {
            kind: self.storage.parse::<StorageKind>()?,
            url: self.backend_url.clone(),
            ..StorageConfig::default()
        })
    }

    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            chunker: ChunkerConfig {
                max_chars: self.chunk_size,
                overlap: self.chunk_overlap,
            },
            top_k: self.top_k,
        }
    }
}

/// Round-trip a probe chunk through a scratch namespace.
async fn check_storage(storage: &Arc<dyn ChunkStorage>) -> Result<()> {
    let probe = Chunk {
        text: "storage health check".to_string(),
        metadata: ChunkMetadata {
            title: "Health Check".to_string(),
            source: "lit".to_string(),
            ..ChunkMetadata::default()
        },
    };
    let mut embedding = vec![0.0; HEALTH_DIMENSION];
    embedding[0] = 1.0;

    storage
        .store_chunks(HEALTH_NAMESPACE, vec![(probe.clone(), embedding.clone())])
        .await?;
    let found = storage.find_similar(HEALTH_NAMESPACE, &embedding, 1).await;

    if let Err(e) = storage.drop_namespace(HEALTH_NAMESPACE).await {
        warn!("⚠️ Failed to clean up health check namespace: {}", e);
    }

    if !found?.iter().any(|scored| scored.chunk == probe) {
        return Err(lit_core::Error::Storage("Failed to retrieve health check chunk".to_string()));
    }
    Ok(())
}

async fn check_storage_with_retry(storage: &Arc<dyn ChunkStorage>, max_retries: u32, timeout: Duration) -> Result<()> {
    let mut retries = 0;
    let mut last_error = None;

    while retries < max_retries {
        match tokio::time::timeout(timeout, check_storage(storage)).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => last_error = Some(e),
            Err(_) => {
                last_error = Some(lit_core::Error::Storage(format!(
                    "Storage health check timed out after {}s",
                    timeout.as_secs()
                )))
            }
        }
        retries += 1;
        if retries < max_retries {
            info!("Storage health check failed, retrying {}/{}...", retries, max_retries);
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }

    Err(last_error
        .unwrap_or_else(|| lit_core::Error::Storage("Storage health check failed after all retries".to_string())))
}

async fn build_pipeline(cli: &Cli, router: Arc<SearchRouter>) -> anyhow::Result<Pipeline> {
    let storage = lit_storage::create_storage(&cli.storage_config()?).await?;
    info!("💾 Checking storage connection...");
    check_storage_with_retry(&storage, 3, Duration::from_secs(10))
        .await
        .with_context(|| format!("storage backend '{}' is not usable", storage.name()))?;
    info!("🏦 Storage initialized successfully (using {})", storage.name());

    let model = create_model(&cli.inference_config()?)?;
    info!("🧠 Inference model initialized successfully (using {})", model.name());

    let index = VectorIndex::new(model.clone(), storage);
    let pipeline = Pipeline::from_config(router, cli.pipeline_config(), index, Summarizer::new(model))?;
    Ok(pipeline)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let router = Arc::new(SearchRouter::with_defaults(&cli.source_config())?);
    let names: Vec<&str> = router.providers().iter().map(|(metadata, _)| metadata.name).collect();
    info!("🔎 Providers initialized: {}", names.join(", "));

    match &cli.command {
        Commands::Sources(command) => {
            let args = SourceArgs {
                command: command.clone(),
            };
            handle_command(args, &router).await?;
        }
        Commands::Report(args) => {
            let request = args.to_request()?;
            let pipeline = build_pipeline(&cli, router.clone()).await?;

            let report = pipeline.generate_report(&request).await;
            for condition in &report.conditions {
                warn!("⚠️ {}", condition);
            }

            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let markdown = render_markdown(&report);
                match &args.output {
                    Some(path) => {
                        tokio::fs::write(path, markdown)
                            .await
                            .with_context(|| format!("failed to write {}", path.display()))?;
                        info!("📄 Report written to {}", path.display());
                    }
                    None => println!("{}", markdown),
                }
            }
        }
        Commands::Serve { addr } => {
            let pipeline = build_pipeline(&cli, router.clone()).await?;
            lit_web::serve(*addr, AppState::new(Arc::new(pipeline))).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_duration() {
        assert_eq!("30s".parse::<HumanDuration>().unwrap().0, Duration::from_secs(30));
        assert_eq!("1m30s".parse::<HumanDuration>().unwrap().0, Duration::from_secs(90));
        assert_eq!("45".parse::<HumanDuration>().unwrap().0, Duration::from_secs(45));
        assert!("10x".parse::<HumanDuration>().is_err());
        assert!("0s".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_parse_report_command() {
        let cli = Cli::parse_from([
            "lit", "--model", "dummy", "report", "--format", "mla", "-p", "pubmed", "--start-year", "2018",
            "crispr", "off-target",
        ]);
        assert_eq!(cli.model, "dummy");
        let Commands::Report(args) = cli.command else {
            panic!("expected report");
        };
        let request = args.to_request().unwrap();
        assert_eq!(request.research_topic, "crispr off-target");
        assert_eq!(request.provider, "pubmed");
        assert_eq!(request.citation_format, CitationFormat::Mla);
        assert_eq!(request.year_range.start, 2018);
        assert_eq!(request.year_range.end, current_year());
    }

    #[test]
    fn test_parse_source_commands() {
        let cli = Cli::parse_from(["lit", "search", "-p", "openaire", "graph", "learning"]);
        assert!(matches!(cli.command, Commands::Sources(SourceCommands::Search { .. })));
        let cli = Cli::parse_from(["lit", "providers"]);
        assert!(matches!(cli.command, Commands::Sources(SourceCommands::List)));
    }

    #[tokio::test]
    async fn test_memory_storage_health_check() {
        let storage: Arc<dyn ChunkStorage> = Arc::new(lit_storage::InMemoryStorage::new());
        check_storage_with_retry(&storage, 1, Duration::from_secs(1)).await.unwrap();
    }
}
