//! Ingest error types
//!
//! `ParseError` and `SourceError` are per-asset: the pipeline counts them
//! and moves on. Store failures travel as `patchbank_common::Error` and end
//! the run.

use thiserror::Error;

/// Why a raw byte buffer could not be turned into an asset
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Bad magic, truncated buffer, byte-length mismatch, missing section
    #[error("Structural error: {0}")]
    Structural(String),

    /// Unsupported bit depth, format tag or container encoding
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Embedded markup or JSON could not be parsed
    #[error("Malformed markup: {0}")]
    MalformedMarkup(String),
}

impl ParseError {
    pub fn structural(msg: impl Into<String>) -> Self {
        ParseError::Structural(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        ParseError::Encoding(msg.into())
    }

    pub fn markup(msg: impl Into<String>) -> Self {
        ParseError::MalformedMarkup(msg.into())
    }

    /// Short label used in logs and failure summaries
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::Structural(_) => "structural",
            ParseError::Encoding(_) => "encoding",
            ParseError::MalformedMarkup(_) => "markup",
        }
    }
}

/// Retrieval collaborator failure (listing or fetching)
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Listing '{prefix}' failed: {reason}")]
    List { prefix: String, reason: String },

    #[error("Fetching '{path}' failed: {reason}")]
    Fetch { path: String, reason: String },
}
