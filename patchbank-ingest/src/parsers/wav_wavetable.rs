//! WAV-as-wavetable parser
//!
//! Only the first channel is decoded. The frame size is not stored in the
//! container, so it is inferred from the sample count.

use super::{finish_wavetable, DecodedTable};
use crate::error::ParseError;
use byteorder::{ByteOrder, LittleEndian};
use patchbank_common::models::{Ecosystem, WavetableAsset};

/// Smallest buffer that can hold RIFF header, `fmt ` and `data` headers
pub const MIN_WAV_LEN: usize = 44;
/// Candidate frame sizes, tried in order
pub const CANONICAL_FRAME_SIZES: [usize; 5] = [256, 512, 1024, 2048, 4096];
/// Frame size used when no candidate divides the sample count
pub const DEFAULT_FRAME_SIZE: usize = 2048;

const FORMAT_PCM: u16 = 1;
const FORMAT_IEEE_FLOAT: u16 = 3;

/// The `fmt ` fields this parser needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl WavFormat {
    fn read(chunk: &[u8]) -> Result<Self, ParseError> {
        if chunk.len() < 16 {
            return Err(ParseError::structural(format!(
                "fmt chunk is {} bytes, need 16",
                chunk.len()
            )));
        }
        Ok(Self {
            audio_format: LittleEndian::read_u16(&chunk[0..2]),
            channels: LittleEndian::read_u16(&chunk[2..4]),
            sample_rate: LittleEndian::read_u32(&chunk[4..8]),
            bits_per_sample: LittleEndian::read_u16(&chunk[14..16]),
        })
    }

    fn validate(&self) -> Result<(), ParseError> {
        if self.audio_format != FORMAT_PCM && self.audio_format != FORMAT_IEEE_FLOAT {
            return Err(ParseError::encoding(format!(
                "unsupported audio format tag {}",
                self.audio_format
            )));
        }
        if self.channels == 0 {
            return Err(ParseError::encoding("zero channels"));
        }
        if !matches!(self.bits_per_sample, 16 | 24 | 32) {
            return Err(ParseError::encoding(format!(
                "unsupported bit depth {}",
                self.bits_per_sample
            )));
        }
        Ok(())
    }

    fn bytes_per_sample(&self) -> usize {
        self.bits_per_sample as usize / 8
    }

    /// Decode one sample starting at `bytes[0]`
    fn decode_sample(&self, bytes: &[u8]) -> f32 {
        match self.bits_per_sample {
            16 => LittleEndian::read_i16(bytes) as f32 / 32768.0,
            24 => LittleEndian::read_i24(bytes) as f32 / 8_388_608.0,
            _ if self.audio_format == FORMAT_IEEE_FLOAT => LittleEndian::read_f32(bytes),
            _ => (LittleEndian::read_i32(bytes) as f64 / 2_147_483_648.0) as f32,
        }
    }
}

/// Walk the RIFF chunks, returning the `fmt ` and `data` bodies
///
/// Scanning stops at the first `data` chunk. Chunk bodies that claim more
/// bytes than remain are clamped to the buffer.
fn find_chunks(raw: &[u8]) -> (Option<&[u8]>, Option<&[u8]>) {
    let mut fmt = None;
    let mut pos = 12usize;

    while pos + 8 < raw.len() {
        let id = &raw[pos..pos + 4];
        let size = LittleEndian::read_u32(&raw[pos + 4..pos + 8]) as usize;
        let start = pos + 8;
        let end = start.saturating_add(size).min(raw.len());
        let body = &raw[start..end];

        match id {
            b"fmt " => fmt = Some(body),
            b"data" => return (fmt, Some(body)),
            _ => {}
        }

        // Odd-sized chunks carry one pad byte
        pos = start.saturating_add(size).saturating_add(size % 2);
    }

    (fmt, None)
}

/// First canonical size dividing `total`, else the default
pub fn infer_frame_size(total: usize) -> usize {
    CANONICAL_FRAME_SIZES
        .iter()
        .copied()
        .find(|size| total % size == 0)
        .unwrap_or(DEFAULT_FRAME_SIZE)
}

pub fn parse(path: &str, raw: &[u8]) -> Result<WavetableAsset, ParseError> {
    if raw.len() < MIN_WAV_LEN {
        return Err(ParseError::structural(format!(
            "{} bytes is shorter than a WAV header",
            raw.len()
        )));
    }
    if &raw[0..4] != b"RIFF" || &raw[8..12] != b"WAVE" {
        return Err(ParseError::structural("missing RIFF/WAVE tags"));
    }

    let (fmt_chunk, data_chunk) = find_chunks(raw);
    let fmt_chunk = fmt_chunk.ok_or_else(|| ParseError::structural("no fmt chunk"))?;
    let data = data_chunk.ok_or_else(|| ParseError::structural("no data chunk"))?;

    let format = WavFormat::read(fmt_chunk)?;
    format.validate()?;

    let width = format.bytes_per_sample();
    let stride = width * format.channels as usize;
    let total = data.len() / stride;

    let frame_size = infer_frame_size(total);
    let frame_count = total / frame_size;
    if frame_count == 0 {
        return Err(ParseError::structural(format!(
            "{} samples do not fill one {}-sample frame",
            total, frame_size
        )));
    }

    // Trailing partial frame is dropped
    let samples: Vec<f32> = data
        .chunks_exact(stride)
        .take(frame_count * frame_size)
        .map(|frame| format.decode_sample(&frame[..width]))
        .collect();

    finish_wavetable(
        path,
        raw,
        Ecosystem::Surge,
        DecodedTable {
            frame_count: frame_count as u32,
            frame_size: frame_size as u32,
            sample_rate: format.sample_rate,
            bit_depth: format.bits_per_sample,
            samples,
        },
    )
}
