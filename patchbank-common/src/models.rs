//! Normalized asset model
//!
//! Every parser, whatever its source format, produces one of the two asset
//! records below. Nested preset sections are flat value records whose fields
//! are always populated (documented defaults fill the gaps), so a consumer
//! never has to tell "missing" apart from "default".

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Sample rate recorded when the source format carries none
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Synthesizer ecosystem an asset was ingested from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Surge,
    Vital,
}

impl Ecosystem {
    pub fn as_str(self) -> &'static str {
        match self {
            Ecosystem::Surge => "surge",
            Ecosystem::Vital => "vital",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ecosystem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "surge" => Ok(Ecosystem::Surge),
            "vital" => Ok(Ecosystem::Vital),
            other => Err(Error::InvalidInput(format!("Unknown ecosystem: {}", other))),
        }
    }
}

// ============================================================================
// Wavetables
// ============================================================================

/// A decoded wavetable: `frame_count` single-cycle frames of `frame_size`
/// samples each, stored flat.
#[derive(Debug, Clone, PartialEq)]
pub struct WavetableAsset {
    pub id: String,
    pub content_hash: String,
    pub name: String,
    pub source: Ecosystem,
    pub category: String,
    pub path: String,
    pub contributor: Option<String>,
    pub frame_count: u32,
    pub frame_size: u32,
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub is_third_party: bool,
    /// Always `frame_count * frame_size` long
    pub samples: Vec<f32>,
    /// Size of the raw input in bytes
    pub file_size: u64,
}

impl WavetableAsset {
    /// Borrow one frame, or None past the end
    pub fn frame(&self, index: usize) -> Option<&[f32]> {
        let size = self.frame_size as usize;
        let start = index.checked_mul(size)?;
        self.samples.get(start..start + size)
    }

    /// Interpolated frame at a normalized position in [0, 1]
    ///
    /// `pos = position * (frame_count - 1)`; the two bounding frames are
    /// blended sample by sample. Positions outside [0, 1] are clamped.
    pub fn interpolate_frame(&self, position: f32) -> Vec<f32> {
        if self.frame_count == 0 || self.frame_size == 0 {
            return Vec::new();
        }

        let last = (self.frame_count - 1) as usize;
        let pos = position.clamp(0.0, 1.0) * last as f32;
        let lower = (pos.floor() as usize).min(last);
        let upper = (lower + 1).min(last);
        let t = pos - lower as f32;

        match (self.frame(lower), self.frame(upper)) {
            (Some(a), Some(b)) => a.iter().zip(b).map(|(x, y)| x + (y - x) * t).collect(),
            _ => Vec::new(),
        }
    }

    /// True when the payload length matches the declared geometry
    pub fn is_consistent(&self) -> bool {
        self.samples.len() as u64 == self.frame_count as u64 * self.frame_size as u64
    }
}

/// Encode samples as little-endian float32 bytes (the stored payload form)
pub fn encode_samples(samples: &[f32]) -> Vec<u8> {
    let mut bytes = vec![0u8; samples.len() * 4];
    LittleEndian::write_f32_into(samples, &mut bytes);
    bytes
}

/// Decode a little-endian float32 payload
pub fn decode_samples(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::InvalidInput(format!(
            "Sample payload length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    let mut samples = vec![0f32; bytes.len() / 4];
    LittleEndian::read_f32_into(bytes, &mut samples);
    Ok(samples)
}

// ============================================================================
// Presets
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillatorSpec {
    pub index: u32,
    pub osc_type: i64,
    pub osc_type_name: String,
    pub wavetable_name: Option<String>,
    pub wavetable_position: f64,
    pub level: f64,
    pub pan: f64,
    pub tune_semitones: f64,
    pub tune_cents: f64,
    pub unison_voices: i64,
    pub unison_detune: f64,
    pub unison_blend: f64,
    pub phase: f64,
    pub phase_randomize: f64,
    pub distortion: f64,
    pub fm_depth: f64,
    pub extra_params: Map<String, Value>,
}

impl OscillatorSpec {
    pub fn new(index: u32, osc_type: i64, osc_type_name: impl Into<String>) -> Self {
        Self {
            index,
            osc_type,
            osc_type_name: osc_type_name.into(),
            ..Default::default()
        }
    }
}

impl Default for OscillatorSpec {
    fn default() -> Self {
        Self {
            index: 0,
            osc_type: 0,
            osc_type_name: String::new(),
            wavetable_name: None,
            wavetable_position: 0.0,
            level: 1.0,
            pan: 0.0,
            tune_semitones: 0.0,
            tune_cents: 0.0,
            unison_voices: 1,
            unison_detune: 0.0,
            unison_blend: 0.0,
            phase: 0.0,
            phase_randomize: 0.0,
            distortion: 0.0,
            fm_depth: 0.0,
            extra_params: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub index: u32,
    pub filter_type: i64,
    pub filter_type_name: String,
    pub cutoff: f64,
    pub resonance: f64,
    pub drive: f64,
    pub mix: f64,
    pub keytrack: f64,
    pub env_depth: f64,
    pub extra_params: Map<String, Value>,
}

impl FilterSpec {
    pub fn new(index: u32, filter_type: i64, filter_type_name: impl Into<String>) -> Self {
        Self {
            index,
            filter_type,
            filter_type_name: filter_type_name.into(),
            ..Default::default()
        }
    }
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            index: 0,
            filter_type: 0,
            filter_type_name: String::new(),
            cutoff: 1000.0,
            resonance: 0.0,
            drive: 0.0,
            mix: 1.0,
            keytrack: 0.0,
            env_depth: 0.0,
            extra_params: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeSpec {
    pub name: String,
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
    pub attack_curve: f64,
    pub decay_curve: f64,
    pub release_curve: f64,
}

impl EnvelopeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Default for EnvelopeSpec {
    fn default() -> Self {
        Self {
            name: "amp".to_string(),
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.3,
            attack_curve: 0.0,
            decay_curve: 0.0,
            release_curve: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LfoSpec {
    pub index: u32,
    pub waveform: i64,
    pub waveform_name: String,
    pub rate: f64,
    pub sync: bool,
    pub sync_rate: String,
    pub depth: f64,
    pub phase: f64,
    pub delay: f64,
    pub fade_in: f64,
}

impl LfoSpec {
    pub fn new(index: u32, waveform: i64, waveform_name: impl Into<String>) -> Self {
        Self {
            index,
            waveform,
            waveform_name: waveform_name.into(),
            ..Default::default()
        }
    }
}

impl Default for LfoSpec {
    fn default() -> Self {
        Self {
            index: 0,
            waveform: 0,
            waveform_name: String::new(),
            rate: 1.0,
            sync: false,
            sync_rate: "1/4".to_string(),
            depth: 1.0,
            phase: 0.0,
            delay: 0.0,
            fade_in: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulationRoute {
    pub source: String,
    pub destination: String,
    pub amount: f64,
    pub bipolar: bool,
}

impl Default for ModulationRoute {
    fn default() -> Self {
        Self {
            source: String::new(),
            destination: String::new(),
            amount: 0.0,
            bipolar: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSpec {
    pub effect_type: String,
    pub enabled: bool,
    pub mix: f64,
    pub params: Map<String, Value>,
}

impl EffectSpec {
    pub fn new(effect_type: impl Into<String>) -> Self {
        Self {
            effect_type: effect_type.into(),
            ..Default::default()
        }
    }
}

impl Default for EffectSpec {
    fn default() -> Self {
        Self {
            effect_type: "off".to_string(),
            enabled: true,
            mix: 1.0,
            params: Map::new(),
        }
    }
}

/// A normalized preset
#[derive(Debug, Clone, PartialEq)]
pub struct PresetAsset {
    pub id: String,
    pub content_hash: String,
    pub name: String,
    pub source: Ecosystem,
    pub category: String,
    pub path: String,
    /// Lives under the third-party patch root
    pub is_third_party: bool,
    pub author: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub oscillators: Vec<OscillatorSpec>,
    pub filters: Vec<FilterSpec>,
    pub envelopes: Vec<EnvelopeSpec>,
    pub lfos: Vec<LfoSpec>,
    pub modulations: Vec<ModulationRoute>,
    pub effects: Vec<EffectSpec>,
    pub master_volume: f64,
    pub master_tune: f64,
    pub polyphony: u32,
    pub portamento: f64,
    pub raw_excerpt: Option<String>,
    pub file_size: u64,
}

/// Master section defaults shared by every preset format
pub const DEFAULT_MASTER_VOLUME: f64 = 1.0;
pub const DEFAULT_MASTER_TUNE: f64 = 0.0;
pub const DEFAULT_POLYPHONY: u32 = 16;
pub const DEFAULT_PORTAMENTO: f64 = 0.0;

/// Either kind of normalized asset, as handed from a parser to the store
#[derive(Debug, Clone)]
pub enum Asset {
    Wavetable(WavetableAsset),
    Preset(PresetAsset),
}

impl Asset {
    pub fn id(&self) -> &str {
        match self {
            Asset::Wavetable(w) => &w.id,
            Asset::Preset(p) => &p.id,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Asset::Wavetable(w) => &w.path,
            Asset::Preset(p) => &p.path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(frames: &[&[f32]]) -> WavetableAsset {
        WavetableAsset {
            id: "0000000000000000".to_string(),
            content_hash: String::new(),
            name: "test".to_string(),
            source: Ecosystem::Surge,
            category: "root".to_string(),
            path: "wavetables/test.wt".to_string(),
            contributor: None,
            frame_count: frames.len() as u32,
            frame_size: frames[0].len() as u32,
            sample_rate: DEFAULT_SAMPLE_RATE,
            bit_depth: 32,
            is_third_party: false,
            samples: frames.iter().flat_map(|f| f.iter().copied()).collect(),
            file_size: 0,
        }
    }

    #[test]
    fn test_float_payload_roundtrip_is_exact() {
        let samples = vec![0.0, -1.0, 1.0, 0.123_456_79, f32::MIN_POSITIVE, -0.5];
        let decoded = decode_samples(&encode_samples(&samples)).unwrap();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_decode_rejects_ragged_payload() {
        assert!(decode_samples(&[0u8; 7]).is_err());
    }

    #[test]
    fn test_interpolate_endpoints() {
        let wt = table(&[&[0.0, 0.0], &[1.0, -1.0]]);
        assert_eq!(wt.interpolate_frame(0.0), vec![0.0, 0.0]);
        assert_eq!(wt.interpolate_frame(1.0), vec![1.0, -1.0]);
    }

    #[test]
    fn test_interpolate_midpoint_of_three_frames() {
        let wt = table(&[&[0.0], &[1.0], &[3.0]]);
        // pos = 0.75 * 2 = 1.5, halfway between frames 1 and 2
        let frame = wt.interpolate_frame(0.75);
        assert!((frame[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_interpolate_clamps_position() {
        let wt = table(&[&[0.0], &[1.0]]);
        assert_eq!(wt.interpolate_frame(-3.0), vec![0.0]);
        assert_eq!(wt.interpolate_frame(7.0), vec![1.0]);
    }

    #[test]
    fn test_single_frame_interpolation() {
        let wt = table(&[&[0.25, 0.5]]);
        assert_eq!(wt.interpolate_frame(0.6), vec![0.25, 0.5]);
        assert!(wt.is_consistent());
    }

    #[test]
    fn test_spec_serialization_keeps_every_field() {
        let osc = OscillatorSpec::new(0, 2, "Wavetable");
        let json = serde_json::to_value(&osc).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 17);
        assert!(obj.get("wavetable_name").unwrap().is_null());
        assert_eq!(obj.get("level").unwrap().as_f64(), Some(1.0));
    }

    #[test]
    fn test_envelope_defaults() {
        let env = EnvelopeSpec::new("filter");
        assert_eq!(env.name, "filter");
        assert_eq!(env.sustain, 0.7);
        assert_eq!(env.release, 0.3);
    }

    #[test]
    fn test_ecosystem_parse() {
        assert_eq!("vital".parse::<Ecosystem>().unwrap(), Ecosystem::Vital);
        assert!("serum".parse::<Ecosystem>().is_err());
    }
}
