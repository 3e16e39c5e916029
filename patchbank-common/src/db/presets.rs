//! Preset persistence
//!
//! The six nested spec lists and the tag list are stored as JSON arrays;
//! list order is preserved exactly.

use super::{like_pattern, AssetSummary};
use crate::models::{Ecosystem, PresetAsset};
use crate::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

/// Upsert one preset
pub async fn save_preset(conn: &mut SqliteConnection, preset: &PresetAsset) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO presets (
            id, name, source, category, path, is_third_party, author, description, tags,
            oscillators, filters, envelopes, lfos, modulations, effects,
            master_volume, master_tune, polyphony, portamento, raw_excerpt,
            content_hash, file_size, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            source = excluded.source,
            category = excluded.category,
            path = excluded.path,
            is_third_party = excluded.is_third_party,
            author = excluded.author,
            description = excluded.description,
            tags = excluded.tags,
            oscillators = excluded.oscillators,
            filters = excluded.filters,
            envelopes = excluded.envelopes,
            lfos = excluded.lfos,
            modulations = excluded.modulations,
            effects = excluded.effects,
            master_volume = excluded.master_volume,
            master_tune = excluded.master_tune,
            polyphony = excluded.polyphony,
            portamento = excluded.portamento,
            raw_excerpt = excluded.raw_excerpt,
            content_hash = excluded.content_hash,
            file_size = excluded.file_size,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&preset.id)
    .bind(&preset.name)
    .bind(preset.source.as_str())
    .bind(&preset.category)
    .bind(&preset.path)
    .bind(preset.is_third_party)
    .bind(&preset.author)
    .bind(&preset.description)
    .bind(serde_json::to_string(&preset.tags)?)
    .bind(serde_json::to_string(&preset.oscillators)?)
    .bind(serde_json::to_string(&preset.filters)?)
    .bind(serde_json::to_string(&preset.envelopes)?)
    .bind(serde_json::to_string(&preset.lfos)?)
    .bind(serde_json::to_string(&preset.modulations)?)
    .bind(serde_json::to_string(&preset.effects)?)
    .bind(preset.master_volume)
    .bind(preset.master_tune)
    .bind(preset.polyphony as i64)
    .bind(preset.portamento)
    .bind(&preset.raw_excerpt)
    .bind(&preset.content_hash)
    .bind(preset.file_size as i64)
    .execute(conn)
    .await?;

    Ok(())
}

/// Load one preset with every nested list decoded
pub async fn load_preset(pool: &SqlitePool, id: &str) -> Result<Option<PresetAsset>> {
    let row = sqlx::query("SELECT * FROM presets WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_preset).transpose()
}

/// List presets of one ecosystem and category, ordered by name
pub async fn list_presets_by_category(
    pool: &SqlitePool,
    source: Ecosystem,
    category: &str,
) -> Result<Vec<AssetSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, source, category, path FROM presets
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

pub async fn list_presets_by_author(pool: &SqlitePool, author: &str) -> Result<Vec<AssetSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, source, category, path FROM presets
        WHERE author = ?
        ORDER BY source, category, name
        "#,
    )
    .bind(author)
    .fetch_all(pool)
    .await?;

    rows.iter().map(AssetSummary::from_row).collect()
}

/// Case-insensitive substring search on preset names
pub async fn search_presets(pool: &SqlitePool, needle: &str) -> Result<Vec<AssetSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, source, category, path FROM presets
        WHERE name LIKE ? ESCAPE '\'
        ORDER BY source, category, name
        "#,
    )
    .bind(like_pattern(needle))
    .fetch_all(pool)
    .await?;

    rows.iter().map(AssetSummary::from_row).collect()
}

pub async fn count_presets(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM presets")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Decode a full preset row
pub fn row_to_preset(row: &SqliteRow) -> Result<PresetAsset> {
    let source: String = row.try_get("source")?;
    let tags: String = row.try_get("tags")?;
    let oscillators: String = row.try_get("oscillators")?;
    let filters: String = row.try_get("filters")?;
    let envelopes: String = row.try_get("envelopes")?;
    let lfos: String = row.try_get("lfos")?;
    let modulations: String = row.try_get("modulations")?;
    let effects: String = row.try_get("effects")?;

    Ok(PresetAsset {
        id: row.try_get("id")?,
        content_hash: row.try_get("content_hash")?,
        name: row.try_get("name")?,
        source: source.parse()?,
        category: row.try_get("category")?,
        path: row.try_get("path")?,
        is_third_party: row.try_get("is_third_party")?,
        author: row.try_get("author")?,
        description: row.try_get("description")?,
        tags: serde_json::from_str(&tags)?,
        oscillators: serde_json::from_str(&oscillators)?,
        filters: serde_json::from_str(&filters)?,
        envelopes: serde_json::from_str(&envelopes)?,
        lfos: serde_json::from_str(&lfos)?,
        modulations: serde_json::from_str(&modulations)?,
        effects: serde_json::from_str(&effects)?,
        master_volume: row.try_get("master_volume")?,
        master_tune: row.try_get("master_tune")?,
        polyphony: row.try_get::<i64, _>("polyphony")? as u32,
        portamento: row.try_get("portamento")?,
        raw_excerpt: row.try_get("raw_excerpt")?,
        file_size: row.try_get::<i64, _>("file_size")? as u64,
    })
}
