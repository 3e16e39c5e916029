//! Instrument store schema (schema B)
//!
//! Taxonomy reference tables, the classified copies of both asset tables,
//! and the derived wavetable-reference and tag tables.

use crate::ruleset::Ruleset;
use patchbank_common::db::{connect, create_metadata_table};
use patchbank_common::{Error, Result};
use sqlx::{SqliteConnection, SqlitePool};
use std::path::Path;
use tracing::info;

/// Schema version recorded in the instrument store metadata
pub const INSTRUMENT_SCHEMA_VERSION: &str = "2.0.0";

/// Open the instrument store, creating tables and indexes if needed
pub async fn open_instrument_store(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();
    let pool = connect(db_path).await?;

    create_instrument_schema(&pool)
        .await
        .map_err(|e| Error::StoreUnavailable(format!("{}: {}", db_path.display(), e)))?;

    if newly_created {
        info!("Initialized new instrument store: {}", db_path.display());
    } else {
        info!("Opened existing instrument store: {}", db_path.display());
    }
    Ok(pool)
}

pub async fn create_instrument_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            display_order INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subcategories (
            id TEXT PRIMARY KEY,
            category_id TEXT NOT NULL REFERENCES categories(id),
            name TEXT NOT NULL,
            display_order INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wavetables (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            sound_category TEXT NOT NULL,
            original_source TEXT NOT NULL,
            original_category TEXT NOT NULL,
            path TEXT NOT NULL,
            frame_count INTEGER NOT NULL,
            frame_size INTEGER NOT NULL,
            sample_rate INTEGER NOT NULL,
            bit_depth INTEGER NOT NULL,
            is_third_party INTEGER NOT NULL DEFAULT 0,
            contributor TEXT,
            sample_data BLOB NOT NULL,
            content_hash TEXT NOT NULL,
            file_size INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS presets (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category_id TEXT NOT NULL REFERENCES categories(id),
            subcategory_id TEXT REFERENCES subcategories(id),
            original_source TEXT NOT NULL,
            original_category TEXT NOT NULL,
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
            file_size INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS preset_wavetables (
            preset_id TEXT NOT NULL REFERENCES presets(id),
            wavetable_name TEXT NOT NULL,
            oscillator_index INTEGER NOT NULL,
            PRIMARY KEY (preset_id, oscillator_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS preset_tags (
            preset_id TEXT NOT NULL REFERENCES presets(id),
            tag TEXT NOT NULL,
            PRIMARY KEY (preset_id, tag)
        )
        "#,
    )
    .execute(pool)
    .await?;

    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_wavetables_sound_category ON wavetables(sound_category)",
        "CREATE INDEX IF NOT EXISTS idx_presets_category ON presets(category_id)",
        "CREATE INDEX IF NOT EXISTS idx_presets_subcategory ON presets(subcategory_id)",
        "CREATE INDEX IF NOT EXISTS idx_preset_tags_tag ON preset_tags(tag)",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    create_metadata_table(pool).await?;
    Ok(())
}

/// Upsert the ruleset's categories and subcategories
pub async fn seed_taxonomy(conn: &mut SqliteConnection, ruleset: &Ruleset) -> Result<()> {
    for (order, category) in ruleset.categories.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, display_order)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                display_order = excluded.display_order
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(order as i64)
        .execute(&mut *conn)
        .await?;

        for (sub_order, sub) in category.subcategories.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO subcategories (id, category_id, name, display_order)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    category_id = excluded.category_id,
                    name = excluded.name,
                    display_order = excluded.display_order
                "#,
            )
            .bind(&sub.id)
            .bind(&category.id)
            .bind(&sub.name)
            .bind(sub_order as i64)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_seeded_taxonomy() {
        let dir = TempDir::new().unwrap();
        let pool = open_instrument_store(&dir.path().join("instruments.db"))
            .await
            .unwrap();
        let ruleset = Ruleset::builtin().unwrap();

        let mut conn = pool.acquire().await.unwrap();
        seed_taxonomy(&mut conn, &ruleset).await.unwrap();
        // Seeding twice is harmless
        seed_taxonomy(&mut conn, &ruleset).await.unwrap();

        let categories: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(categories, 13);

        let (name, parent): (String, String) =
            sqlx::query_as("SELECT name, category_id FROM subcategories WHERE id = 'pluck-bass'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(name, "Pluck Bass");
        assert_eq!(parent, "bass");
    }
}
