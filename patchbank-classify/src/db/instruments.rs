//! Classified asset rows and their derived join/tag rows

use crate::classifier::PresetClass;
use patchbank_common::models::PresetAsset;
use patchbank_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

/// Schema A wavetable row, sample payload kept as the stored bytes
#[derive(Debug, Clone)]
pub struct SourceWavetable {
    pub id: String,
    pub name: String,
    pub source: String,
    pub category: String,
    pub path: String,
    pub frame_count: i64,
    pub frame_size: i64,
    pub sample_rate: i64,
    pub bit_depth: i64,
    pub is_third_party: bool,
    pub contributor: Option<String>,
    pub sample_data: Vec<u8>,
    pub content_hash: String,
    pub file_size: i64,
}

impl SourceWavetable {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            source: row.try_get("source")?,
            category: row.try_get("category")?,
            path: row.try_get("path")?,
            frame_count: row.try_get("frame_count")?,
            frame_size: row.try_get("frame_size")?,
            sample_rate: row.try_get("sample_rate")?,
            bit_depth: row.try_get("bit_depth")?,
            is_third_party: row.try_get("is_third_party")?,
            contributor: row.try_get("contributor")?,
            sample_data: row.try_get("sample_data")?,
            content_hash: row.try_get("content_hash")?,
            file_size: row.try_get("file_size")?,
        })
    }
}

pub async fn save_classified_wavetable(
    conn: &mut SqliteConnection,
    wt: &SourceWavetable,
    sound_category: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO wavetables (
            id, name, sound_category, original_source, original_category, path,
            frame_count, frame_size, sample_rate, bit_depth, is_third_party,
            contributor, sample_data, content_hash, file_size
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            sound_category = excluded.sound_category,
            original_source = excluded.original_source,
            original_category = excluded.original_category,
            path = excluded.path,
            frame_count = excluded.frame_count,
            frame_size = excluded.frame_size,
            sample_rate = excluded.sample_rate,
            bit_depth = excluded.bit_depth,
            is_third_party = excluded.is_third_party,
            contributor = excluded.contributor,
            sample_data = excluded.sample_data,
            content_hash = excluded.content_hash,
            file_size = excluded.file_size
        "#,
    )
    .bind(&wt.id)
    .bind(&wt.name)
    .bind(sound_category)
    .bind(&wt.source)
    .bind(&wt.category)
    .bind(&wt.path)
    .bind(wt.frame_count)
    .bind(wt.frame_size)
    .bind(wt.sample_rate)
    .bind(wt.bit_depth)
    .bind(wt.is_third_party)
    .bind(&wt.contributor)
    .bind(&wt.sample_data)
    .bind(&wt.content_hash)
    .bind(wt.file_size)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn save_classified_preset(
    conn: &mut SqliteConnection,
    preset: &PresetAsset,
    class: &PresetClass,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO presets (
            id, name, category_id, subcategory_id, original_source, original_category,
            path, is_third_party, author, description, tags, oscillators, filters,
            envelopes, lfos, modulations, effects, master_volume, master_tune, polyphony, portamento,
            raw_excerpt, content_hash, file_size
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            category_id = excluded.category_id,
            subcategory_id = excluded.subcategory_id,
            original_source = excluded.original_source,
            original_category = excluded.original_category,
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
            file_size = excluded.file_size
        "#,
    )
    .bind(&preset.id)
    .bind(&preset.name)
    .bind(&class.category)
    .bind(&class.subcategory)
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

/// Replace the wavetable-reference and tag rows of one preset
///
/// Returns (references written, tags written).
pub async fn replace_preset_links(
    conn: &mut SqliteConnection,
    preset: &PresetAsset,
) -> Result<(u64, u64)> {
    sqlx::query("DELETE FROM preset_wavetables WHERE preset_id = ?")
        .bind(&preset.id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM preset_tags WHERE preset_id = ?")
        .bind(&preset.id)
        .execute(&mut *conn)
        .await?;

    let mut refs = 0;
    // Slot = position in the oscillator list
    for (slot, osc) in preset.oscillators.iter().enumerate() {
        let Some(name) = osc.wavetable_name.as_deref().filter(|n| !n.is_empty()) else {
            continue;
        };
        sqlx::query(
            "INSERT INTO preset_wavetables (preset_id, wavetable_name, oscillator_index) VALUES (?, ?, ?)",
        )
        .bind(&preset.id)
        .bind(name)
        .bind(slot as i64)
        .execute(&mut *conn)
        .await?;
        refs += 1;
    }

    let mut tags = 0;
    for tag in preset.tags.iter().map(|t| t.trim().to_lowercase()) {
        if tag.is_empty() {
            continue;
        }
        // Tags differing only in case collapse to one row
        let result = sqlx::query("INSERT OR IGNORE INTO preset_tags (preset_id, tag) VALUES (?, ?)")
            .bind(&preset.id)
            .bind(&tag)
            .execute(&mut *conn)
            .await?;
        tags += result.rows_affected();
    }

    Ok((refs, tags))
}

pub async fn count_rows(conn: &mut SqliteConnection, table: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(conn)
        .await?;
    Ok(count)
}

/// Classification of one preset as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetClassRow {
    pub category_id: String,
    pub subcategory_id: Option<String>,
    pub original_source: String,
    pub original_category: String,
    pub is_third_party: bool,
}

pub async fn load_preset_class(pool: &SqlitePool, id: &str) -> Result<Option<PresetClassRow>> {
    let row = sqlx::query(
        "SELECT category_id, subcategory_id, original_source, original_category, is_third_party \
         FROM presets WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(|row| {
        Ok(PresetClassRow {
            category_id: row.try_get("category_id")?,
            subcategory_id: row.try_get("subcategory_id")?,
            original_source: row.try_get("original_source")?,
            original_category: row.try_get("original_category")?,
            is_third_party: row.try_get("is_third_party")?,
        })
    })
    .transpose()
}

pub async fn load_wavetable_sound_category(pool: &SqlitePool, id: &str) -> Result<Option<String>> {
    let category = sqlx::query_scalar("SELECT sound_category FROM wavetables WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(category)
}

/// (oscillator slot, wavetable name) pairs of a preset, by slot
pub async fn preset_wavetable_refs(pool: &SqlitePool, preset_id: &str) -> Result<Vec<(i64, String)>> {
    let refs = sqlx::query_as(
        "SELECT oscillator_index, wavetable_name FROM preset_wavetables WHERE preset_id = ? ORDER BY oscillator_index",
    )
    .bind(preset_id)
    .fetch_all(pool)
    .await?;
    Ok(refs)
}

pub async fn preset_tags(pool: &SqlitePool, preset_id: &str) -> Result<Vec<String>> {
    let tags = sqlx::query_scalar("SELECT tag FROM preset_tags WHERE preset_id = ? ORDER BY tag")
        .bind(preset_id)
        .fetch_all(pool)
        .await?;
    Ok(tags)
}
