//! Common error types for patchbank

use thiserror::Error;

/// Common result type for patchbank operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the patchbank crates
///
/// Per-asset parse failures are not represented here; they live in the ingest
/// crate and never escape the pipeline. Everything in this enum is either a
/// store problem or a bootstrap problem.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Nested list column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Destination store cannot be opened or written (fatal for a run)
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
