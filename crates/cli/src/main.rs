use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use command::{CommandAction, CommandResponse};
use config::{Overrides, RagConfig};
use rag_vector_store::{EmbeddingMode, IndexKind};
use std::path::PathBuf;

mod command;
mod config;

#[derive(Parser)]
#[command(name = "rag")]
#[command(about = "Vector, keyword and hybrid retrieval over a local document store", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Store directory (overrides RAG_STORE_DIR)
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Config file (default: <store-dir>/config.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Index kind for a new store: flat|ivf
    #[arg(long, global = true)]
    index_kind: Option<IndexKind>,

    /// Embedding dimension for a new store
    #[arg(long, global = true)]
    dimension: Option<usize>,

    /// Clusters probed per ivf query
    #[arg(long, global = true)]
    nprobe: Option<usize>,

    /// Override embedding backend (overrides RAG_EMBEDDING_MODE)
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedMode>,

    /// Override embedding model id (overrides RAG_EMBEDDING_MODEL)
    #[arg(long, global = true)]
    embed_model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add documents from a JSON Lines file and save the store
    Ingest(IngestArgs),

    /// Nearest documents to a query
    Search(SearchArgs),

    /// Nearest documents with neighbouring chunks from the same source
    Context(ContextArgs),

    /// Rank every document by query word overlap
    Keyword(KeywordArgs),

    /// Vector candidates re-ranked with keyword overlap
    Hybrid(HybridArgs),

    /// Store and retriever statistics
    Stats,

    /// Remove the saved index and documents
    Clear,
}

#[derive(Args)]
struct IngestArgs {
    /// JSON Lines file: {"text", "metadata"?, "embedding"?} per line
    file: PathBuf,
}

#[derive(Args)]
struct SearchArgs {
    query: String,

    /// Number of results
    #[arg(short = 'k', long)]
    k: Option<usize>,

    /// Keep results whose raw distance is at least this value
    #[arg(long)]
    threshold: Option<f64>,
}

#[derive(Args)]
struct ContextArgs {
    query: String,

    /// Number of results
    #[arg(short = 'k', long)]
    k: Option<usize>,

    /// Page radius for neighbouring chunks
    #[arg(long)]
    window: Option<usize>,
}

#[derive(Args)]
struct KeywordArgs {
    query: String,

    /// Number of results
    #[arg(short = 'k', long)]
    k: Option<usize>,
}

#[derive(Args)]
struct HybridArgs {
    query: String,

    /// Number of results
    #[arg(short = 'k', long)]
    k: Option<usize>,

    /// Weight of the vector score, within [0, 1]
    #[arg(long)]
    alpha: Option<f64>,
}

#[derive(Copy, Clone, ValueEnum)]
enum EmbedMode {
    Hash,
    Stub,
}

impl EmbedMode {
    const fn as_domain(self) -> EmbeddingMode {
        match self {
            EmbedMode::Hash => EmbeddingMode::Hash,
            EmbedMode::Stub => EmbeddingMode::Stub,
        }
    }
}

impl Commands {
    fn into_action(self) -> CommandAction {
        match self {
            Commands::Ingest(args) => CommandAction::Ingest { file: args.file },
            Commands::Search(args) => CommandAction::Search {
                query: args.query,
                k: args.k,
                threshold: args.threshold,
            },
            Commands::Context(args) => CommandAction::Context {
                query: args.query,
                k: args.k,
                window: args.window,
            },
            Commands::Keyword(args) => CommandAction::Keyword {
                query: args.query,
                k: args.k,
            },
            Commands::Hybrid(args) => CommandAction::Hybrid {
                query: args.query,
                k: args.k,
                alpha: args.alpha,
            },
            Commands::Stats => CommandAction::Stats,
            Commands::Clear => CommandAction::Clear,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let overrides = Overrides {
        store_dir: cli.store_dir,
        config: cli.config,
        dimension: cli.dimension,
        index_kind: cli.index_kind,
        nprobe: cli.nprobe,
        embed_mode: cli.embed_mode.map(EmbedMode::as_domain),
        embed_model: cli.embed_model,
    };

    let response = match RagConfig::resolve(&overrides).await {
        Ok(config) => command::execute(cli.command.into_action(), &config).await,
        Err(err) => CommandResponse::error(&err),
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    if response.is_error() {
        std::process::exit(1);
    }
    Ok(())
}
