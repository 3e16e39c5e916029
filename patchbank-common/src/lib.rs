//! # Patchbank Common Library
//!
//! Shared code for the patchbank ingestion and classification passes:
//! - Normalized asset models (wavetables and presets)
//! - Asset identity (logical id and content hash)
//! - Asset store (schema, upserts, queries, metadata)
//! - Configuration loading and logging setup

pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod logging;
pub mod models;

pub use error::{Error, Result};
pub use models::{Asset, Ecosystem, PresetAsset, WavetableAsset};
