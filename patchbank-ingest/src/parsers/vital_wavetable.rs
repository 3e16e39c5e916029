//! Compressed-JSON wavetable parser (`.vitaltable`)
//!
//! Document shape: `groups[] -> components[] -> keyframes[] -> wave_data`,
//! where `wave_data` is base64 of little-endian float32 samples. Every
//! keyframe becomes one frame, in encounter order.

use super::decode::decode_json;
use super::{finish_wavetable, DecodedTable};
use crate::error::ParseError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use byteorder::{ByteOrder, LittleEndian};
use patchbank_common::models::{Ecosystem, WavetableAsset, DEFAULT_SAMPLE_RATE};
use serde_json::Value;

/// Samples per keyframe in this format
pub const VITAL_FRAME_SIZE: usize = 2048;

pub fn parse(path: &str, raw: &[u8]) -> Result<WavetableAsset, ParseError> {
    let (doc, _) = decode_json(raw)?;

    let groups = doc
        .get("groups")
        .and_then(Value::as_array)
        .filter(|g| !g.is_empty())
        .ok_or_else(|| ParseError::structural("no wavetable groups"))?;

    let keyframes = groups
        .iter()
        .filter_map(|g| g.get("components").and_then(Value::as_array))
        .flatten()
        .filter_map(|c| c.get("keyframes").and_then(Value::as_array))
        .flatten()
        .filter_map(|kf| kf.get("wave_data").and_then(Value::as_str))
        .filter(|data| !data.is_empty());

    let mut samples = Vec::new();
    let mut frame_count = 0u32;
    for (index, encoded) in keyframes.enumerate() {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ParseError::encoding(format!("keyframe {}: bad base64: {}", index, e)))?;
        if bytes.len() != VITAL_FRAME_SIZE * 4 {
            return Err(ParseError::structural(format!(
                "keyframe {} holds {} bytes, expected {}",
                index,
                bytes.len(),
                VITAL_FRAME_SIZE * 4
            )));
        }

        let start = samples.len();
        samples.resize(start + VITAL_FRAME_SIZE, 0.0);
        LittleEndian::read_f32_into(&bytes, &mut samples[start..]);
        frame_count += 1;
    }

    if frame_count == 0 {
        return Err(ParseError::structural("no keyframes with wave data"));
    }

    finish_wavetable(
        path,
        raw,
        Ecosystem::Vital,
        DecodedTable {
            frame_count,
            frame_size: VITAL_FRAME_SIZE as u32,
            sample_rate: DEFAULT_SAMPLE_RATE,
            bit_depth: 32,
            samples,
        },
    )
}
