//! Normalized asset store (schema A)

pub mod init;
pub mod metadata;
pub mod presets;
pub mod retry;
pub mod wavetables;

pub use init::{connect, create_metadata_table, create_schema, open_store, SCHEMA_VERSION};
pub use metadata::{get_metadata, record_run, set_metadata};
pub use presets::{
    count_presets, list_presets_by_author, list_presets_by_category, load_preset, save_preset,
    search_presets,
};
pub use retry::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};
pub use wavetables::{
    count_wavetables, list_wavetables_by_category, load_wavetable, save_wavetable,
    search_wavetables,
};

use crate::models::{Asset, Ecosystem};
use crate::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

/// Lightweight listing row (no payload, no nested lists)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSummary {
    pub id: String,
    pub name: String,
    pub source: Ecosystem,
    pub category: String,
    pub path: String,
}

impl AssetSummary {
    fn from_row(row: &SqliteRow) -> Result<Self> {
        let source: String = row.try_get("source")?;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            source: source.parse()?,
            category: row.try_get("category")?,
            path: row.try_get("path")?,
        })
    }
}

/// Save any normalized asset
pub async fn save_asset(conn: &mut SqliteConnection, asset: &Asset) -> Result<()> {
    match asset {
        Asset::Wavetable(wt) => save_wavetable(conn, wt).await,
        Asset::Preset(preset) => save_preset(conn, preset).await,
    }
}

/// Write a batch of assets in one transaction
///
/// Either every record of the batch is committed or none is, so a failed
/// commit never leaves a partially written asset behind.
pub async fn write_batch(pool: &SqlitePool, batch: &[Asset]) -> Result<usize> {
    let mut tx = pool.begin().await?;
    for asset in batch {
        save_asset(&mut *tx, asset).await?;
    }
    tx.commit().await?;
    Ok(batch.len())
}

/// Build a `LIKE` pattern matching `needle` anywhere, with wildcards escaped
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
