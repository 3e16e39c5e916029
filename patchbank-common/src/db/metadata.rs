//! Provenance metadata
//!
//! Both stores carry the same `metadata(key, value)` table; these helpers
//! work against either one.

use crate::Result;
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

pub const KEY_LAST_UPDATED: &str = "last_updated";
pub const KEY_VERSION: &str = "version";
pub const KEY_TOTAL_WAVETABLES: &str = "total_wavetables";
pub const KEY_TOTAL_PRESETS: &str = "total_presets";
pub const KEY_LAST_RUN_FAILURES: &str = "last_run_failures";

/// Insert or replace one metadata entry
pub async fn set_metadata<'e, E>(executor: E, key: &str, value: &str) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO metadata (key, value, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn get_metadata(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM metadata WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

/// Record the provenance of a completed run
///
/// Totals are the table counts after the run, not the number of assets
/// touched by it.
pub async fn record_run(
    pool: &SqlitePool,
    version: &str,
    total_wavetables: i64,
    total_presets: i64,
    failures: u64,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    set_metadata(&mut *tx, KEY_LAST_UPDATED, &Utc::now().to_rfc3339()).await?;
    set_metadata(&mut *tx, KEY_VERSION, version).await?;
    set_metadata(&mut *tx, KEY_TOTAL_WAVETABLES, &total_wavetables.to_string()).await?;
    set_metadata(&mut *tx, KEY_TOTAL_PRESETS, &total_presets.to_string()).await?;
    set_metadata(&mut *tx, KEY_LAST_RUN_FAILURES, &failures.to_string()).await?;

    tx.commit().await?;
    Ok(())
}
