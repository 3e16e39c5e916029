//! patchbank-ingest - Populate the asset store from a raw asset tree
//!
//! Exits nonzero when the source root is missing or the store fails; per-file
//! parse and fetch failures are reported in the summary only.

use anyhow::{bail, Context, Result};
use clap::Parser;
use patchbank_common::config::TomlConfig;
use patchbank_common::db;
use patchbank_common::logging::init_tracing;
use patchbank_ingest::{IngestOptions, IngestPipeline, LocalDirectorySource};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Command-line arguments for patchbank-ingest
#[derive(Parser, Debug)]
#[command(name = "patchbank-ingest")]
#[command(about = "Ingest wavetables and presets into the patchbank asset store")]
#[command(version)]
struct Args {
    /// Config file (defaults to $PATCHBANK_CONFIG, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root of the raw asset tree
    #[arg(short, long)]
    source_root: Option<PathBuf>,

    /// Asset store file
    #[arg(long)]
    store: Option<PathBuf>,

    /// Concurrent parse workers
    #[arg(short, long, env = "PATCHBANK_WORKERS")]
    workers: Option<usize>,

    /// Records per store transaction
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Prefix to ingest, relative to the source root (repeatable)
    #[arg(short, long = "prefix")]
    prefixes: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    init_tracing(&config.logging).context("Failed to initialize logging")?;

    info!(
        "Starting patchbank-ingest v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let source_root = config.resolve_source_root(args.source_root.as_deref());
    let store_path = config.resolve_store_path(args.store.as_deref());
    info!("Source root: {}", source_root.display());
    info!("Asset store: {}", store_path.display());

    if !source_root.is_dir() {
        error!("Source root is not a directory: {}", source_root.display());
        bail!("source root not found: {}", source_root.display());
    }

    let mut options = IngestOptions::from(&config.ingest);
    if let Some(workers) = args.workers {
        options.workers = workers.max(1);
    }
    if let Some(batch_size) = args.batch_size {
        options.batch_size = batch_size.max(1);
    }
    if !args.prefixes.is_empty() {
        options.prefixes = args.prefixes;
    }

    let pool = db::open_store(&store_path)
        .await
        .with_context(|| format!("Failed to open asset store {}", store_path.display()))?;

    let source = Arc::new(LocalDirectorySource::new(source_root));
    let pipeline = IngestPipeline::new(source, pool.clone(), options);

    let stats = match pipeline.run().await {
        Ok(stats) => stats,
        Err(e) => {
            error!("Ingestion aborted: {}", e);
            pool.close().await;
            return Err(e).context("Ingestion aborted by store failure");
        }
    };
    pool.close().await;

    println!("Ingestion complete: {}", stats);
    for (kind, count) in &stats.parse_failures_by_kind {
        println!("  {} parse failures: {}", kind, count);
    }

    Ok(())
}
