//! Store access for the classification pass
//!
//! The asset store is only ever read (opened `mode=ro`); everything derived
//! goes to the instrument store.

pub mod instruments;
pub mod schema;

pub use instruments::{
    load_preset_class, load_wavetable_sound_category, preset_tags, preset_wavetable_refs,
    PresetClassRow,
};
pub use schema::{
    create_instrument_schema, open_instrument_store, seed_taxonomy, INSTRUMENT_SCHEMA_VERSION,
};

use patchbank_common::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Connect to an existing asset store read-only
///
/// Equivalent to `mode=ro`: SQLite refuses every write on these
/// connections. A missing file is reported instead of created.
pub async fn connect_readonly(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.is_file() {
        return Err(Error::StoreUnavailable(format!(
            "asset store not found: {} (run patchbank-ingest first)",
            db_path.display()
        )));
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .read_only(true)
        .busy_timeout(Duration::from_millis(patchbank_common::db::init::BUSY_TIMEOUT_MS));

    SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await
        .map_err(|e| Error::StoreUnavailable(format!("{}: {}", db_path.display(), e)))
}

/// True when both paths name the same database file
///
/// The instrument store may not exist yet, so a missing file is resolved
/// through its parent directory. Paths that cannot be resolved at all are
/// compared as given.
pub fn same_store_file(a: &Path, b: &Path) -> bool {
    match (resolve_store_file(a), resolve_store_file(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

fn resolve_store_file(path: &Path) -> Option<PathBuf> {
    if let Ok(resolved) = path.canonicalize() {
        return Some(resolved);
    }
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    parent.canonicalize().ok().map(|dir| dir.join(name))
}
