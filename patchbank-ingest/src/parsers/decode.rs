//! Container decoder chain
//!
//! Compressed-JSON formats may or may not be gzip-wrapped. Instead of
//! "try to decompress, on any failure use the raw bytes", every candidate
//! decoder states exactly what it accepts and the chain reports why each one
//! rejected the input.

use crate::error::ParseError;
use flate2::read::GzDecoder;
use std::borrow::Cow;
use std::io::Read;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// One way of turning container bytes into JSON text bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// gzip stream (requires the gzip magic)
    Gzip,
    /// Already plain JSON text (requires a JSON object/array opener)
    Identity,
}

/// Decoder order for `.vital` and `.vitaltable` containers
pub const JSON_CONTAINER_DECODERS: &[Decoder] = &[Decoder::Gzip, Decoder::Identity];

impl Decoder {
    pub fn name(self) -> &'static str {
        match self {
            Decoder::Gzip => "gzip",
            Decoder::Identity => "identity",
        }
    }

    /// Decode, or explain why this decoder does not apply
    pub fn decode(self, raw: &[u8]) -> Result<Cow<'_, [u8]>, String> {
        match self {
            Decoder::Gzip => {
                if !raw.starts_with(&GZIP_MAGIC) {
                    return Err("no gzip magic".to_string());
                }
                let mut out = Vec::new();
                GzDecoder::new(raw)
                    .read_to_end(&mut out)
                    .map_err(|e| format!("corrupt gzip stream: {}", e))?;
                Ok(Cow::Owned(out))
            }
            Decoder::Identity => {
                let body = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);
                match body.iter().find(|b| !b.is_ascii_whitespace()) {
                    Some(b'{') | Some(b'[') => Ok(Cow::Borrowed(raw)),
                    _ => Err("not JSON text".to_string()),
                }
            }
        }
    }
}

/// Try each decoder in order; the first success wins
pub fn decode_first<'a>(
    raw: &'a [u8],
    decoders: &[Decoder],
) -> Result<(Decoder, Cow<'a, [u8]>), ParseError> {
    let mut rejections = Vec::with_capacity(decoders.len());
    for &decoder in decoders {
        match decoder.decode(raw) {
            Ok(bytes) => return Ok((decoder, bytes)),
            Err(reason) => rejections.push(format!("{}: {}", decoder.name(), reason)),
        }
    }
    Err(ParseError::encoding(format!(
        "no decoder accepted the container ({})",
        rejections.join("; ")
    )))
}

/// Decode a JSON container and parse the document
///
/// Decoding failures are encoding errors; a decoded buffer that is not valid
/// JSON is malformed markup.
pub fn decode_json(raw: &[u8]) -> Result<(serde_json::Value, String), ParseError> {
    let (_, bytes) = decode_first(raw, JSON_CONTAINER_DECODERS)?;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    let value = serde_json::from_str(text.trim_start_matches('\u{feff}'))
        .map_err(|e| ParseError::markup(format!("invalid JSON: {}", e)))?;
    Ok((value, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(bytes).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn test_gzip_wins_when_present() {
        let raw = gzip(br#"{"a": 1}"#);
        let (decoder, bytes) = decode_first(&raw, JSON_CONTAINER_DECODERS).unwrap();
        assert_eq!(decoder, Decoder::Gzip);
        assert_eq!(&*bytes, br#"{"a": 1}"#);
    }

    #[test]
    fn test_plain_json_falls_through_to_identity() {
        let raw = b"  {\"a\": 1}";
        let (decoder, _) = decode_first(raw, JSON_CONTAINER_DECODERS).unwrap();
        assert_eq!(decoder, Decoder::Identity);
    }

    #[test]
    fn test_corrupt_gzip_is_not_masked() {
        let mut raw = gzip(br#"{"a": 1}"#);
        raw.truncate(12);
        let err = decode_first(&raw, JSON_CONTAINER_DECODERS).unwrap_err();
        assert!(matches!(err, ParseError::Encoding(_)));
        assert!(err.to_string().contains("gzip"));
    }

    #[test]
    fn test_invalid_json_is_markup_error() {
        let err = decode_json(b"{not json").unwrap_err();
        assert!(matches!(err, ParseError::MalformedMarkup(_)));
    }
}
