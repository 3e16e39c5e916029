//! Retrieval collaborators
//!
//! A source lists logical paths under a prefix and fetches the raw bytes of
//! one entry. Both operations may fail; the pipeline counts such failures and
//! keeps going.

use crate::error::SourceError;
use async_trait::async_trait;

pub mod local;

pub use local::LocalDirectorySource;

/// One listed asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Logical path, '/'-separated, relative to the source root
    pub path: String,
    /// Opaque handle the source needs to fetch the bytes (file path, URL)
    pub descriptor: String,
}

/// Supplies raw asset bytes by logical path
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Source identifier for logs
    fn name(&self) -> &str;

    /// Every entry under `prefix`, recursing into subdirectories
    ///
    /// Entries come back in a stable order.
    async fn list(&self, prefix: &str) -> Result<Vec<SourceEntry>, SourceError>;

    /// Raw bytes of one entry
    async fn fetch(&self, entry: &SourceEntry) -> Result<Vec<u8>, SourceError>;
}
