//! patchbank-classify - Derive the instrument store from the asset store
//!
//! Exits nonzero when either store cannot be opened or written, or when the
//! ruleset is invalid.

use anyhow::{bail, Context, Result};
use clap::Parser;
use patchbank_classify::db::{connect_readonly, open_instrument_store, same_store_file};
use patchbank_classify::{ClassificationPass, Classifier, Ruleset};
use patchbank_common::config::TomlConfig;
use patchbank_common::logging::init_tracing;
use std::path::PathBuf;
use tracing::{error, info};

/// Command-line arguments for patchbank-classify
#[derive(Parser, Debug)]
#[command(name = "patchbank-classify")]
#[command(about = "Classify the patchbank asset store into the instrument store")]
#[command(version)]
struct Args {
    /// Config file (defaults to $PATCHBANK_CONFIG, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Asset store to read
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Instrument store to write
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML ruleset replacing the built-in keyword tables
    #[arg(short, long, env = "PATCHBANK_RULESET")]
    ruleset: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    init_tracing(&config.logging).context("Failed to initialize logging")?;

    info!(
        "Starting patchbank-classify v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let store_path = config.resolve_store_path(args.store.as_deref());
    let output_path = config.resolve_instrument_store_path(args.output.as_deref());
    info!("Asset store: {}", store_path.display());
    info!("Instrument store: {}", output_path.display());

    if same_store_file(&store_path, &output_path) {
        bail!("asset store and instrument store must be different files");
    }

    let ruleset = match args.ruleset.or(config.classify.ruleset) {
        Some(path) => {
            info!("Ruleset: {}", path.display());
            Ruleset::load(&path).with_context(|| format!("Invalid ruleset {}", path.display()))?
        }
        None => Ruleset::builtin().context("Built-in ruleset failed to compile")?,
    };
    let classifier = Classifier::new(ruleset);

    let assets = connect_readonly(&store_path).await?;
    let instruments = open_instrument_store(&output_path).await?;

    let result = ClassificationPass::new(&assets, &instruments, &classifier)
        .run()
        .await;

    assets.close().await;
    instruments.close().await;

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            error!("Classification aborted: {}", e);
            return Err(e).context("Classification aborted");
        }
    };

    println!("Classification complete: {}", summary);
    let mut ranked = summary.preset_distribution.clone();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    for (category, count) in ranked {
        println!("  {}: {}", category, count);
    }

    Ok(())
}
