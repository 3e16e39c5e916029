//! Ingestion services

pub mod ingest;
pub mod statistics;

pub use ingest::{IngestOptions, IngestPipeline};
pub use statistics::IngestStatistics;
