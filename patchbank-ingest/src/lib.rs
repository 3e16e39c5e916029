//! patchbank-ingest: wavetable and preset ingestion
//!
//! Parses the five supported container formats (`.wt`, `.wav`,
//! `.vitaltable`, `.fxp`, `.vital`) into normalized assets and writes them to
//! the asset store in batched transactions.

pub mod error;
pub mod parsers;
pub mod services;
pub mod sources;

pub use error::{ParseError, SourceError};
pub use parsers::{parse_asset, AssetFormat};
pub use services::{IngestOptions, IngestPipeline, IngestStatistics};
pub use sources::{AssetSource, LocalDirectorySource, SourceEntry};
