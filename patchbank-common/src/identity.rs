//! Asset identity
//!
//! Two independent hashes are kept per asset:
//! - **Logical id**: first 16 hex digits of SHA-256 over the logical path.
//!   Stable for a location, so re-ingesting a changed file upserts in place.
//! - **Content hash**: full SHA-256 hex digest of the raw bytes. Changes
//!   whenever the bytes do, independent of the location.

use sha2::{Digest, Sha256};

/// Number of hex digits kept for a logical id
pub const LOGICAL_ID_LEN: usize = 16;

/// Compute the logical identifier for a path
pub fn logical_id(logical_path: &str) -> String {
    let digest = Sha256::digest(logical_path.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(LOGICAL_ID_LEN);
    hex
}

/// Compute the SHA-256 content hash of a raw byte payload
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Identity pair carried by every normalized asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetIdentity {
    pub id: String,
    pub content_hash: String,
}

impl AssetIdentity {
    pub fn derive(logical_path: &str, raw: &[u8]) -> Self {
        Self {
            id: logical_id(logical_path),
            content_hash: content_hash(raw),
        }
    }
}
