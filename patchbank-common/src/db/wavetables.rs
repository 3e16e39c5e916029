//! Wavetable persistence
//!
//! Rows are keyed by logical id; saving an asset whose id already exists
//! replaces every column except `created_at`.

use super::{like_pattern, AssetSummary};
use crate::models::{decode_samples, encode_samples, Ecosystem, WavetableAsset};
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

/// Upsert one wavetable
pub async fn save_wavetable(conn: &mut SqliteConnection, wt: &WavetableAsset) -> Result<()> {
    if !wt.is_consistent() {
        return Err(Error::InvalidInput(format!(
            "Wavetable {} payload has {} samples, expected {} x {}",
            wt.path,
            wt.samples.len(),
            wt.frame_count,
            wt.frame_size
        )));
    }

    sqlx::query(
        r#"
        INSERT INTO wavetables (
            id, name, source, category, path, frame_count, frame_size, sample_rate,
            bit_depth, is_third_party, contributor, sample_data, content_hash, file_size,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            source = excluded.source,
            category = excluded.category,
            path = excluded.path,
            frame_count = excluded.frame_count,
            frame_size = excluded.frame_size,
            sample_rate = excluded.sample_rate,
            bit_depth = excluded.bit_depth,
            is_third_party = excluded.is_third_party,
            contributor = excluded.contributor,
            sample_data = excluded.sample_data,
            content_hash = excluded.content_hash,
            file_size = excluded.file_size,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&wt.id)
    .bind(&wt.name)
    .bind(wt.source.as_str())
    .bind(&wt.category)
    .bind(&wt.path)
    .bind(wt.frame_count as i64)
    .bind(wt.frame_size as i64)
    .bind(wt.sample_rate as i64)
    .bind(wt.bit_depth as i64)
    .bind(wt.is_third_party)
    .bind(&wt.contributor)
    .bind(encode_samples(&wt.samples))
    .bind(&wt.content_hash)
    .bind(wt.file_size as i64)
    .execute(conn)
    .await?;

    Ok(())
}

/// Load one wavetable with its full sample payload
pub async fn load_wavetable(pool: &SqlitePool, id: &str) -> Result<Option<WavetableAsset>> {
    let row = sqlx::query("SELECT * FROM wavetables WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_wavetable).transpose()
}

/// List wavetables of one ecosystem and category, ordered by name
pub async fn list_wavetables_by_category(
    pool: &SqlitePool,
    source: Ecosystem,
    category: &str,
) -> Result<Vec<AssetSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, source, category, path FROM wavetables
        WHERE source = ? AND category = ?
        ORDER BY name
        "#,
    )
    .bind(source.as_str())
    .bind(category)
    .fetch_all(pool)
    .await?;

    rows.iter().map(AssetSummary::from_row).collect()
}

/// Case-insensitive substring search on wavetable names
pub async fn search_wavetables(pool: &SqlitePool, needle: &str) -> Result<Vec<AssetSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, source, category, path FROM wavetables
        WHERE name LIKE ? ESCAPE '\'
        ORDER BY source, category, name
        "#,
    )
    .bind(like_pattern(needle))
    .fetch_all(pool)
    .await?;

    rows.iter().map(AssetSummary::from_row).collect()
}

pub async fn count_wavetables(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM wavetables")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Decode a full wavetable row, sample payload included
pub fn row_to_wavetable(row: &SqliteRow) -> Result<WavetableAsset> {
    let source: String = row.try_get("source")?;
    let payload: Vec<u8> = row.try_get("sample_data")?;

    Ok(WavetableAsset {
        id: row.try_get("id")?,
        content_hash: row.try_get("content_hash")?,
        name: row.try_get("name")?,
        source: source.parse()?,
        category: row.try_get("category")?,
        path: row.try_get("path")?,
        contributor: row.try_get("contributor")?,
        frame_count: row.try_get::<i64, _>("frame_count")? as u32,
        frame_size: row.try_get::<i64, _>("frame_size")? as u32,
        sample_rate: row.try_get::<i64, _>("sample_rate")? as u32,
        bit_depth: row.try_get::<i64, _>("bit_depth")? as u16,
        is_third_party: row.try_get("is_third_party")?,
        samples: decode_samples(&payload)?,
        file_size: row.try_get::<i64, _>("file_size")? as u64,
    })
}
