//! `.wt` wavetable parser
//!
//! Layout (all little-endian):
//! ```text
//! 0   u32  magic 0x77617673
//! 4   u32  frame_size   (samples per frame)
//! 8   u32  frame_count
//! 12  u32  flags        (optional; present when the buffer has >= 16 bytes)
//! 12|16    samples      (int16, or float32 when flags & 0x04)
//! ```

use super::{finish_wavetable, DecodedTable};
use crate::error::ParseError;
use byteorder::{ByteOrder, LittleEndian};
use patchbank_common::models::{Ecosystem, WavetableAsset, DEFAULT_SAMPLE_RATE};

pub const WT_MAGIC: u32 = 0x7761_7673;
/// Header length without the flags word
pub const SHORT_HEADER_LEN: usize = 12;
/// Header length with the flags word
pub const FULL_HEADER_LEN: usize = 16;
/// Flag bit selecting float32 samples
pub const FLAG_FLOAT32: u32 = 0x04;

/// Parsed `.wt` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WtHeader {
    pub frame_size: u32,
    pub frame_count: u32,
    pub flags: Option<u32>,
}

impl WtHeader {
    pub fn read(raw: &[u8]) -> Result<Self, ParseError> {
        if raw.len() < SHORT_HEADER_LEN {
            return Err(ParseError::structural(format!(
                "{} bytes is shorter than the {}-byte header",
                raw.len(),
                SHORT_HEADER_LEN
            )));
        }

        let magic = LittleEndian::read_u32(&raw[0..4]);
        if magic != WT_MAGIC {
            return Err(ParseError::structural(format!("bad magic 0x{:08x}", magic)));
        }

        let flags = if raw.len() >= FULL_HEADER_LEN {
            Some(LittleEndian::read_u32(&raw[12..16]))
        } else {
            None
        };

        Ok(Self {
            frame_size: LittleEndian::read_u32(&raw[4..8]),
            frame_count: LittleEndian::read_u32(&raw[8..12]),
            flags,
        })
    }

    pub fn header_len(&self) -> usize {
        if self.flags.is_some() {
            FULL_HEADER_LEN
        } else {
            SHORT_HEADER_LEN
        }
    }

    pub fn is_float(&self) -> bool {
        self.flags.is_some_and(|f| f & FLAG_FLOAT32 != 0)
    }

    pub fn sample_width(&self) -> usize {
        if self.is_float() {
            4
        } else {
            2
        }
    }

    /// Number of samples declared by the header
    pub fn sample_count(&self) -> Option<usize> {
        (self.frame_size as usize).checked_mul(self.frame_count as usize)
    }

    /// Total bytes the declared geometry requires, header included
    pub fn required_len(&self) -> Option<usize> {
        self.sample_count()?
            .checked_mul(self.sample_width())?
            .checked_add(self.header_len())
    }
}

pub fn parse(path: &str, raw: &[u8]) -> Result<WavetableAsset, ParseError> {
    let header = WtHeader::read(raw)?;

    let required = header
        .required_len()
        .ok_or_else(|| ParseError::structural("declared frame geometry overflows"))?;
    if raw.len() < required {
        return Err(ParseError::structural(format!(
            "declared {} x {} frames need {} bytes, buffer has {}",
            header.frame_count,
            header.frame_size,
            required,
            raw.len()
        )));
    }

    let count = header.sample_count().unwrap_or(0);
    let body = &raw[header.header_len()..required];
    let mut samples = vec![0f32; count];

    if header.is_float() {
        LittleEndian::read_f32_into(body, &mut samples);
    } else {
        let mut ints = vec![0i16; count];
        LittleEndian::read_i16_into(body, &mut ints);
        for (dst, src) in samples.iter_mut().zip(&ints) {
            *dst = *src as f32 / 32768.0;
        }
    }

    finish_wavetable(
        path,
        raw,
        Ecosystem::Surge,
        DecodedTable {
            frame_count: header.frame_count,
            frame_size: header.frame_size,
            sample_rate: DEFAULT_SAMPLE_RATE,
            bit_depth: if header.is_float() { 32 } else { 16 },
            samples,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wt_bytes(frame_size: u32, frame_count: u32, flags: Option<u32>, body: &[u8]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&WT_MAGIC.to_le_bytes());
        raw.extend_from_slice(&frame_size.to_le_bytes());
        raw.extend_from_slice(&frame_count.to_le_bytes());
        if let Some(flags) = flags {
            raw.extend_from_slice(&flags.to_le_bytes());
        }
        raw.extend_from_slice(body);
        raw
    }

    fn f32_body(samples: &[f32]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn i16_body(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_twelve_byte_header_without_flags() {
        let raw = wt_bytes(0, 0, None, &[]);
        let header = WtHeader::read(&raw).unwrap();
        assert_eq!(header.flags, None);
        assert_eq!(header.header_len(), 12);
        assert!(!header.is_float());
    }

    #[test]
    fn test_flags_make_sixteen_byte_header() {
        let raw = wt_bytes(2, 1, Some(FLAG_FLOAT32), &f32_body(&[0.5, -0.25]));
        let header = WtHeader::read(&raw).unwrap();
        assert_eq!(header.header_len(), 16);
        assert!(header.is_float());
        assert_eq!(header.required_len(), Some(24));
    }

    #[test]
    fn test_float_samples_decode_exactly() {
        let samples = [0.5, -0.25, 1.5, -3.0, 0.0, 0.125];
        let raw = wt_bytes(3, 2, Some(FLAG_FLOAT32), &f32_body(&samples));
        let wt = parse("wavetables/basic/odd.wt", &raw).unwrap();
        assert_eq!(wt.samples, samples);
        assert_eq!(wt.bit_depth, 32);
        assert_eq!(wt.frame_count, 2);
        assert_eq!(wt.frame_size, 3);
    }

    #[test]
    fn test_int16_samples_scale_within_tolerance() {
        let ints = [i16::MIN, -16384, 0, 16384, i16::MAX, 1];
        let raw = wt_bytes(6, 1, Some(0), &i16_body(&ints));
        let wt = parse("wavetables/basic/int.wt", &raw).unwrap();
        assert_eq!(wt.bit_depth, 16);
        for (decoded, original) in wt.samples.iter().zip(ints) {
            let expected = original as f32 / 32768.0;
            assert!((decoded - expected).abs() <= 1.0 / 32768.0);
        }
        assert_eq!(wt.samples[0], -1.0);
    }

    #[test]
    fn test_flag_bit_selects_decode_path() {
        // Same body, read as int16 when the float bit is clear
        let body = f32_body(&[1.0]);
        let raw = wt_bytes(2, 1, Some(0x01), &body);
        let wt = parse("wavetables/basic/x.wt", &raw).unwrap();
        assert_eq!(wt.bit_depth, 16);
        assert_eq!(wt.samples.len(), 2);
    }

    #[test]
    fn test_short_body_is_rejected() {
        // 4 float samples declared, only 3 present
        let raw = wt_bytes(2, 2, Some(FLAG_FLOAT32), &f32_body(&[0.0, 0.1, 0.2]));
        assert!(matches!(
            parse("wavetables/basic/short.wt", &raw),
            Err(ParseError::Structural(_))
        ));
    }

    #[test]
    fn test_overflowing_geometry_is_rejected() {
        let raw = wt_bytes(u32::MAX, u32::MAX, Some(FLAG_FLOAT32), &[]);
        assert!(parse("wavetables/basic/huge.wt", &raw).is_err());
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let mut body = f32_body(&[0.25, 0.75]);
        body.extend_from_slice(b"junk");
        let raw = wt_bytes(2, 1, Some(FLAG_FLOAT32), &body);
        let wt = parse("wavetables/basic/tail.wt", &raw).unwrap();
        assert_eq!(wt.samples, vec![0.25, 0.75]);
        assert_eq!(wt.file_size, raw.len() as u64);
    }

    #[test]
    fn test_bad_magic_and_tiny_buffer() {
        assert!(parse("a.wt", b"RIFF00000000").is_err());
        assert!(parse("a.wt", b"vaw").is_err());
    }

    #[test]
    fn test_identity_and_placement() {
        let raw = wt_bytes(1, 1, Some(FLAG_FLOAT32), &f32_body(&[0.0]));
        let wt = parse("data/wavetables_3rdparty/Alice/Pads/soft.wt", &raw).unwrap();
        assert_eq!(wt.name, "soft");
        assert_eq!(wt.contributor.as_deref(), Some("Alice"));
        assert_eq!(wt.category, "Alice/Pads");
        assert!(wt.is_third_party);
        assert_eq!(wt.id.len(), 16);
        assert_eq!(wt.content_hash.len(), 64);
    }
}
