//! CV Ingest CLI
//!
//! Usage:
//!   cv-ingest run --docs-dir src/docs
//!   cv-ingest check
//!
//! Cloudflare KV credentials come from CF_ACCOUNT_ID, CF_KV_NAMESPACE_ID,
//! and CF_API_TOKEN; records land under `"<file>-chunk-<index>"`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use cv_ingest::{ingest_dir, OllamaEmbedder};
use cv_store::CloudflareKv;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cv-ingest")]
#[command(about = "Batch embedding generation for the CV site profile")]
#[command(version)]
struct Cli {
    /// Ollama server URL
    #[arg(long, default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Embedding model name
    #[arg(long, default_value = "nomic-embed-text")]
    model: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed every document in a directory and store the records
    Run {
        /// Directory of profile documents
        #[arg(long, default_value = "src/docs")]
        docs_dir: PathBuf,
    },
    /// Check that Ollama is running and the model is available
    Check,
}

fn store_from_env() -> anyhow::Result<CloudflareKv> {
    let account = std::env::var("CF_ACCOUNT_ID").context("CF_ACCOUNT_ID not set")?;
    let namespace = std::env::var("CF_KV_NAMESPACE_ID").context("CF_KV_NAMESPACE_ID not set")?;
    let token = std::env::var("CF_API_TOKEN").context("CF_API_TOKEN not set")?;
    Ok(CloudflareKv::new(account, namespace, token))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cv_ingest=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let embedder = OllamaEmbedder::new(cli.ollama_url, cli.model);

    match cli.command {
        Commands::Check => {
            embedder.check_available().await?;
            println!("Ollama is running and the model answers embed requests");
        }
        Commands::Run { docs_dir } => {
            embedder.check_available().await?;
            let store = store_from_env()?;

            let total = ingest_dir(&embedder, &store, &docs_dir).await?;
            println!("Successfully processed {total} chunks");
        }
    }

    Ok(())
}
