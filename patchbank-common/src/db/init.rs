//! Store initialization
//!
//! Opens (creating on first run) the normalized asset store and makes sure
//! every table and index exists. All statements are `IF NOT EXISTS`, so
//! opening an existing store is idempotent.

use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Schema version recorded in the asset store metadata
pub const SCHEMA_VERSION: &str = "1.0.0";

/// SQLite busy timeout applied to every pooled connection
pub const BUSY_TIMEOUT_MS: u64 = 5000;

/// Connect to a SQLite file with the shared pragmas (WAL, busy timeout,
/// foreign keys), creating it if missing
///
/// Any failure here means the store cannot be used at all and is reported
/// as [`Error::StoreUnavailable`].
pub async fn connect(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::StoreUnavailable(format!("{}: {}", parent.display(), e))
            })?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .map_err(|e| Error::StoreUnavailable(format!("{}: {}", db_path.display(), e)))
}

/// Open the normalized asset store, creating tables and indexes if needed
pub async fn open_store(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();
    let pool = connect(db_path).await?;

    create_schema(&pool)
        .await
        .map_err(|e| Error::StoreUnavailable(format!("{}: {}", db_path.display(), e)))?;

    if newly_created {
        info!("Initialized new asset store: {}", db_path.display());
    } else {
        info!("Opened existing asset store: {}", db_path.display());
    }

    Ok(pool)
}

/// Create every schema A table and index
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_wavetables_table(pool).await?;
    create_presets_table(pool).await?;
    create_metadata_table(pool).await?;
    Ok(())
}

async fn create_wavetables_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wavetables (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            source TEXT NOT NULL,
            category TEXT NOT NULL,
            path TEXT NOT NULL,
            frame_count INTEGER NOT NULL,
            frame_size INTEGER NOT NULL,
            sample_rate INTEGER NOT NULL,
            bit_depth INTEGER NOT NULL,
            is_third_party INTEGER NOT NULL DEFAULT 0,
            contributor TEXT,
            sample_data BLOB NOT NULL,
            content_hash TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_wavetables_browse ON wavetables(source, category, name)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_presets_table(pool: &SqlitePool) -> Result<()> {
    // Nested lists are stored as JSON arrays in list order
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS presets (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            source TEXT NOT NULL,
            category TEXT NOT NULL,
            path TEXT NOT NULL,
            is_third_party INTEGER NOT NULL DEFAULT 0,
            author TEXT,
            description TEXT,
            tags TEXT NOT NULL DEFAULT '[]',
            oscillators TEXT NOT NULL DEFAULT '[]',
            filters TEXT NOT NULL DEFAULT '[]',
            envelopes TEXT NOT NULL DEFAULT '[]',
            lfos TEXT NOT NULL DEFAULT '[]',
            modulations TEXT NOT NULL DEFAULT '[]',
            effects TEXT NOT NULL DEFAULT '[]',
            master_volume REAL NOT NULL,
            master_tune REAL NOT NULL,
            polyphony INTEGER NOT NULL,
            portamento REAL NOT NULL,
            raw_excerpt TEXT,
            content_hash TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_presets_browse ON presets(source, category, name)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_presets_author ON presets(author)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Key/value provenance table (shared shape between both schemas)
pub async fn create_metadata_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_store_creates_file_and_tables() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("assets.db");

        let pool = open_store(&db_path).await.unwrap();
        assert!(db_path.exists());

        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert!(tables.contains(&"wavetables".to_string()));
        assert!(tables.contains(&"presets".to_string()));
        assert!(tables.contains(&"metadata".to_string()));
    }

    #[tokio::test]
    async fn test_open_store_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("assets.db");

        let pool = open_store(&db_path).await.unwrap();
        pool.close().await;
        let pool = open_store(&db_path).await.unwrap();

        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_unopenable_store_is_store_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        // A directory cannot be opened as a database file
        let result = open_store(temp_dir.path()).await;
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
    }
}
