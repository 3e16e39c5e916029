//! Ingestion pipeline
//!
//! List every prefix, fetch and parse entries with bounded concurrency, and
//! hand parsed assets to a single writer that commits them in batches.
//!
//! Per-asset failures (fetch, parse) are counted and logged; the run keeps
//! going. Store failures end the run: a half-written store must not be
//! reported as a finished ingestion.

use crate::error::{ParseError, SourceError};
use crate::parsers::AssetFormat;
use crate::services::statistics::IngestStatistics;
use crate::sources::{AssetSource, SourceEntry};
use futures::stream::{self, StreamExt};
use patchbank_common::config::IngestConfig;
use patchbank_common::db::{self, retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS, SCHEMA_VERSION};
use patchbank_common::models::Asset;
use patchbank_common::{Error, Result};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Pipeline tuning
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Concurrent fetch+parse tasks
    pub workers: usize,
    /// Records per store transaction
    pub batch_size: usize,
    /// Prefixes to list, relative to the source root
    pub prefixes: Vec<String>,
    /// Upper bound on waiting for the store write lock, per batch
    pub max_lock_wait_ms: u64,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from(&IngestConfig::default())
    }
}

impl From<&IngestConfig> for IngestOptions {
    fn from(config: &IngestConfig) -> Self {
        Self {
            workers: config.workers.max(1),
            batch_size: config.batch_size.max(1),
            prefixes: config.prefixes.clone(),
            max_lock_wait_ms: DEFAULT_MAX_LOCK_WAIT_MS,
        }
    }
}

/// Result of fetching and parsing one entry
enum Outcome {
    Parsed(Asset),
    FetchFailed(SourceError),
    ParseFailed(ParseError),
}

/// Drives one ingestion run from an [`AssetSource`] into the asset store
pub struct IngestPipeline {
    source: Arc<dyn AssetSource>,
    pool: SqlitePool,
    options: IngestOptions,
}

impl IngestPipeline {
    pub fn new(source: Arc<dyn AssetSource>, pool: SqlitePool, options: IngestOptions) -> Self {
        Self {
            source,
            pool,
            options,
        }
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Run to completion
    ///
    /// Returns the run counters, or the store error that aborted the run.
    pub async fn run(&self) -> Result<IngestStatistics> {
        let started = Instant::now();
        let mut stats = IngestStatistics::default();

        info!(
            source = self.source.name(),
            workers = self.options.workers,
            batch_size = self.options.batch_size,
            prefixes = ?self.options.prefixes,
            "Starting ingestion"
        );

        let entries = self.list_all(&mut stats).await;
        let work = self.select_supported(entries, &mut stats);
        let total = work.len();
        info!("{} supported entries to ingest ({} skipped)", total, stats.skipped);

        let workers = self.options.workers.max(1);
        let batch_size = self.options.batch_size.max(1);

        let results = stream::iter(work)
            .map(|(entry, format)| {
                let source = Arc::clone(&self.source);
                async move {
                    let path = entry.path.clone();
                    let outcome = fetch_and_parse(source, entry, format).await;
                    (path, outcome)
                }
            })
            .buffer_unordered(workers);
        let mut results = std::pin::pin!(results);

        let mut batch: Vec<Asset> = Vec::with_capacity(batch_size);
        let mut processed = 0usize;

        // Single writer: every store write happens on this task
        while let Some((path, outcome)) = results.next().await {
            processed += 1;
            match outcome {
                Outcome::Parsed(asset) => batch.push(asset),
                Outcome::FetchFailed(e) => {
                    stats.fetch_failures += 1;
                    warn!(path = %path, error = %e, "Fetch failed, skipping");
                }
                Outcome::ParseFailed(e) => {
                    stats.record_parse_failure(e.kind());
                    warn!(path = %path, kind = e.kind(), error = %e, "Parse failed, skipping");
                }
            }

            if batch.len() >= batch_size {
                self.commit(&mut batch, &mut stats).await?;
                info!(
                    "Progress: {}/{} processed, {} stored, {} failed",
                    processed,
                    total,
                    stats.stored(),
                    stats.failures()
                );
            }
        }

        if !batch.is_empty() {
            self.commit(&mut batch, &mut stats).await?;
        }

        self.record_provenance(&stats).await?;

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ingestion complete: {}",
            stats
        );
        if !stats.parse_failures_by_kind.is_empty() {
            info!("Parse failures by kind: {:?}", stats.parse_failures_by_kind);
        }

        Ok(stats)
    }

    /// List every configured prefix; overlapping prefixes list an entry once
    async fn list_all(&self, stats: &mut IngestStatistics) -> Vec<SourceEntry> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for prefix in &self.options.prefixes {
            match self.source.list(prefix).await {
                Ok(listed) => {
                    debug!(prefix = %prefix, count = listed.len(), "Listed prefix");
                    for entry in listed {
                        if seen.insert(entry.path.clone()) {
                            entries.push(entry);
                        }
                    }
                }
                Err(e) => {
                    stats.list_failures += 1;
                    error!(prefix = %prefix, error = %e, "Listing failed, prefix skipped");
                }
            }
        }

        stats.listed = entries.len() as u64;
        entries
    }

    fn select_supported(
        &self,
        entries: Vec<SourceEntry>,
        stats: &mut IngestStatistics,
    ) -> Vec<(SourceEntry, AssetFormat)> {
        entries
            .into_iter()
            .filter_map(|entry| match AssetFormat::from_path(&entry.path) {
                Some(format) => Some((entry, format)),
                None => {
                    stats.skipped += 1;
                    debug!(path = %entry.path, "Unsupported file type, skipped");
                    None
                }
            })
            .collect()
    }

    /// Commit and clear the pending batch
    async fn commit(&self, batch: &mut Vec<Asset>, stats: &mut IngestStatistics) -> Result<()> {
        let pool = &self.pool;
        let pending: &[Asset] = batch;
        let written = retry_on_lock("batch commit", self.options.max_lock_wait_ms, || {
            db::write_batch(pool, pending)
        })
        .await
        .map_err(into_store_failure)?;

        for asset in batch.iter() {
            match asset {
                Asset::Wavetable(_) => stats.wavetables += 1,
                Asset::Preset(_) => stats.presets += 1,
            }
        }
        stats.batches += 1;
        debug!(records = written, batch = stats.batches, "Batch committed");

        batch.clear();
        Ok(())
    }

    /// Write totals and run provenance into the metadata table
    async fn record_provenance(&self, stats: &IngestStatistics) -> Result<()> {
        let pool = &self.pool;
        let total_wavetables = db::count_wavetables(pool).await.map_err(into_store_failure)?;
        let total_presets = db::count_presets(pool).await.map_err(into_store_failure)?;
        let failures = stats.failures();

        retry_on_lock("record run", self.options.max_lock_wait_ms, || {
            db::record_run(pool, SCHEMA_VERSION, total_wavetables, total_presets, failures)
        })
        .await
        .map_err(into_store_failure)?;

        info!(
            total_wavetables,
            total_presets, "Store totals recorded (schema {})", SCHEMA_VERSION
        );
        Ok(())
    }
}

async fn fetch_and_parse(
    source: Arc<dyn AssetSource>,
    entry: SourceEntry,
    format: AssetFormat,
) -> Outcome {
    let raw = match source.fetch(&entry).await {
        Ok(raw) => raw,
        Err(e) => return Outcome::FetchFailed(e),
    };

    // Parsing is CPU-bound; keep it off the async workers
    let path = entry.path;
    let parsed = tokio::task::spawn_blocking(move || format.parse(&path, &raw)).await;

    match parsed {
        Ok(Ok(asset)) => Outcome::Parsed(asset),
        Ok(Err(e)) => Outcome::ParseFailed(e),
        Err(join_err) => Outcome::ParseFailed(ParseError::structural(format!(
            "parser task aborted: {}",
            join_err
        ))),
    }
}

/// Any store error during a run means the store cannot be trusted
fn into_store_failure(err: Error) -> Error {
    match err {
        Error::StoreUnavailable(_) => err,
        other => Error::StoreUnavailable(other.to_string()),
    }
}
