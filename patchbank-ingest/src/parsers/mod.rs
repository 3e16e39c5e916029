//! Format parsers
//!
//! Each parser turns one raw byte buffer plus its logical path into a
//! normalized asset, or a [`ParseError`] saying why it could not. Parsers
//! never panic on hostile input and never retry: the buffer is all they get.

pub mod decode;
pub mod fxp_preset;
pub mod path_convention;
pub mod surge_wavetable;
pub mod type_names;
pub mod vital_preset;
pub mod vital_wavetable;
pub mod wav_wavetable;

use crate::error::ParseError;
use patchbank_common::identity::AssetIdentity;
use patchbank_common::models::{Asset, Ecosystem, WavetableAsset};
use path_convention::{file_stem, wavetable_placement};

/// Container formats recognized by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetFormat {
    /// `.wt` proprietary binary wavetable
    SurgeWavetable,
    /// `.wav` single-cycle frames in a RIFF container
    WavWavetable,
    /// `.vitaltable` compressed-JSON wavetable
    VitalWavetable,
    /// `.fxp` binary-chunk preset with embedded markup
    SurgePreset,
    /// `.vital` compressed-JSON preset
    VitalPreset,
}

impl AssetFormat {
    pub fn from_path(path: &str) -> Option<Self> {
        match path_convention::extension(path)?.as_str() {
            "wt" => Some(AssetFormat::SurgeWavetable),
            "wav" => Some(AssetFormat::WavWavetable),
            "vitaltable" => Some(AssetFormat::VitalWavetable),
            "fxp" => Some(AssetFormat::SurgePreset),
            "vital" => Some(AssetFormat::VitalPreset),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AssetFormat::SurgeWavetable => "wt",
            AssetFormat::WavWavetable => "wav",
            AssetFormat::VitalWavetable => "vitaltable",
            AssetFormat::SurgePreset => "fxp",
            AssetFormat::VitalPreset => "vital",
        }
    }

    pub fn parse(self, path: &str, raw: &[u8]) -> Result<Asset, ParseError> {
        match self {
            AssetFormat::SurgeWavetable => surge_wavetable::parse(path, raw).map(Asset::Wavetable),
            AssetFormat::WavWavetable => wav_wavetable::parse(path, raw).map(Asset::Wavetable),
            AssetFormat::VitalWavetable => vital_wavetable::parse(path, raw).map(Asset::Wavetable),
            AssetFormat::SurgePreset => fxp_preset::parse(path, raw).map(Asset::Preset),
            AssetFormat::VitalPreset => vital_preset::parse(path, raw).map(Asset::Preset),
        }
    }
}

/// Parse a buffer, choosing the parser from the path's extension
pub fn parse_asset(path: &str, raw: &[u8]) -> Result<Asset, ParseError> {
    let format = AssetFormat::from_path(path)
        .ok_or_else(|| ParseError::encoding(format!("unsupported file type: {}", path)))?;
    format.parse(path, raw)
}

/// Frame geometry and samples produced by a wavetable decoder
#[derive(Debug)]
pub(crate) struct DecodedTable {
    pub frame_count: u32,
    pub frame_size: u32,
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub samples: Vec<f32>,
}

/// Wrap a decoded table with identity, name and path-derived placement
pub(crate) fn finish_wavetable(
    path: &str,
    raw: &[u8],
    source: Ecosystem,
    table: DecodedTable,
) -> Result<WavetableAsset, ParseError> {
    if table.frame_count == 0 || table.frame_size == 0 {
        return Err(ParseError::structural("wavetable has no frames"));
    }
    if table.samples.len() as u64 != table.frame_count as u64 * table.frame_size as u64 {
        return Err(ParseError::structural(format!(
            "decoded {} samples for {} frames of {}",
            table.samples.len(),
            table.frame_count,
            table.frame_size
        )));
    }

    let identity = AssetIdentity::derive(path, raw);
    let placement = wavetable_placement(path);

    Ok(WavetableAsset {
        id: identity.id,
        content_hash: identity.content_hash,
        name: file_stem(path).to_string(),
        source,
        category: placement.category,
        path: path.to_string(),
        contributor: placement.contributor,
        frame_count: table.frame_count,
        frame_size: table.frame_size,
        sample_rate: table.sample_rate,
        bit_depth: table.bit_depth,
        is_third_party: placement.is_third_party,
        samples: table.samples,
        file_size: raw.len() as u64,
    })
}
