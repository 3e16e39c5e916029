//! Classification pass
//!
//! Reads every asset from the asset store, classifies it, and writes the
//! instrument store in one transaction. Derived rows are overwritten on
//! every run, so re-running over unchanged input reproduces the same rows.

use crate::classifier::Classifier;
use crate::db::instruments::{
    count_rows, replace_preset_links, save_classified_preset, save_classified_wavetable,
    SourceWavetable,
};
use crate::db::schema::{seed_taxonomy, INSTRUMENT_SCHEMA_VERSION};
use chrono::Utc;
use futures::TryStreamExt;
use patchbank_common::db::metadata::{
    set_metadata, KEY_LAST_UPDATED, KEY_TOTAL_PRESETS, KEY_TOTAL_WAVETABLES, KEY_VERSION,
};
use patchbank_common::db::presets::row_to_preset;
use patchbank_common::{Error, Result};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

/// Counts produced by one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub wavetables: u64,
    pub presets: u64,
    pub wavetable_refs: u64,
    pub tags: u64,
    /// Presets per category, in ruleset order (zero counts included)
    pub preset_distribution: Vec<(String, u64)>,
    /// Wavetables per sound category
    pub wavetable_distribution: BTreeMap<String, u64>,
}

impl PassSummary {
    pub fn presets_in(&self, category: &str) -> u64 {
        self.preset_distribution
            .iter()
            .find(|(c, _)| c == category)
            .map_or(0, |(_, n)| *n)
    }
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} wavetables, {} presets, {} wavetable references, {} tags",
            self.wavetables, self.presets, self.wavetable_refs, self.tags
        )
    }
}

/// Asset store (read) to instrument store (write)
pub struct ClassificationPass<'a> {
    assets: &'a SqlitePool,
    instruments: &'a SqlitePool,
    classifier: &'a Classifier,
}

impl<'a> ClassificationPass<'a> {
    pub fn new(assets: &'a SqlitePool, instruments: &'a SqlitePool, classifier: &'a Classifier) -> Self {
        Self {
            assets,
            instruments,
            classifier,
        }
    }

    pub async fn run(&self) -> Result<PassSummary> {
        let started = Instant::now();
        let ruleset = self.classifier.ruleset();
        let mut summary = PassSummary {
            preset_distribution: ruleset.categories.iter().map(|c| (c.id.clone(), 0)).collect(),
            ..Default::default()
        };

        let mut tx = self.instruments.begin().await.map_err(store_failure)?;
        seed_taxonomy(&mut tx, ruleset).await.map_err(store_failure)?;

        info!("Classifying wavetables...");
        let mut rows = sqlx::query("SELECT * FROM wavetables ORDER BY id").fetch(self.assets);
        while let Some(row) = rows.try_next().await.map_err(source_failure)? {
            let wt = SourceWavetable::from_row(&row)?;
            let sound_category = self.classifier.classify_wavetable(&wt.name, &wt.category);
            debug!(name = %wt.name, sound_category = %sound_category, "Wavetable classified");

            save_classified_wavetable(&mut tx, &wt, &sound_category)
                .await
                .map_err(store_failure)?;
            *summary.wavetable_distribution.entry(sound_category).or_insert(0) += 1;
            summary.wavetables += 1;
        }
        drop(rows);
        info!("  Processed {} wavetables", summary.wavetables);

        info!("Classifying presets...");
        let mut rows = sqlx::query("SELECT * FROM presets ORDER BY id").fetch(self.assets);
        while let Some(row) = rows.try_next().await.map_err(source_failure)? {
            let preset = row_to_preset(&row)?;
            let class = self.classifier.classify_preset(
                &preset.name,
                &preset.category,
                &preset.oscillators,
                &preset.envelopes,
            );
            debug!(
                name = %preset.name,
                category = %class.category,
                subcategory = %class.subcategory,
                score = class.score,
                "Preset classified"
            );

            save_classified_preset(&mut tx, &preset, &class)
                .await
                .map_err(store_failure)?;
            let (refs, tags) = replace_preset_links(&mut tx, &preset)
                .await
                .map_err(store_failure)?;

            summary.wavetable_refs += refs;
            summary.tags += tags;
            summary.presets += 1;
            if let Some(entry) = summary
                .preset_distribution
                .iter_mut()
                .find(|(c, _)| *c == class.category)
            {
                entry.1 += 1;
            }
        }
        drop(rows);
        info!("  Processed {} presets", summary.presets);

        let total_wavetables = count_rows(&mut tx, "wavetables").await.map_err(store_failure)?;
        let total_presets = count_rows(&mut tx, "presets").await.map_err(store_failure)?;
        let provenance = [
            (KEY_LAST_UPDATED, Utc::now().to_rfc3339()),
            (KEY_VERSION, INSTRUMENT_SCHEMA_VERSION.to_string()),
            (KEY_TOTAL_WAVETABLES, total_wavetables.to_string()),
            (KEY_TOTAL_PRESETS, total_presets.to_string()),
        ];
        for (key, value) in &provenance {
            set_metadata(&mut *tx, key, value).await.map_err(store_failure)?;
        }

        tx.commit().await.map_err(store_failure)?;

        self.log_distribution(&summary);
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Classification complete: {}",
            summary
        );
        Ok(summary)
    }

    fn log_distribution(&self, summary: &PassSummary) {
        let mut ranked: Vec<&(String, u64)> = summary.preset_distribution.iter().collect();
        // Stable sort keeps ruleset order among equal counts
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        info!("Category distribution:");
        for (category, count) in ranked {
            info!("  {}: {}", category, count);
        }

        info!("Wavetable sound categories:");
        for (category, count) in &summary.wavetable_distribution {
            info!("  {}: {}", category, count);
        }
    }
}

/// Failures writing the instrument store
fn store_failure(err: impl Into<Error>) -> Error {
    match err.into() {
        Error::StoreUnavailable(msg) => Error::StoreUnavailable(msg),
        other => Error::StoreUnavailable(format!("instrument store: {}", other)),
    }
}

/// Failures reading the asset store
fn source_failure(err: sqlx::Error) -> Error {
    Error::StoreUnavailable(format!("asset store: {}", err))
}
