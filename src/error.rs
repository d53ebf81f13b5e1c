// src/error.rs

//! Crate-wide error type
//!
//! Hard faults only: graph-service failures, I/O problems, unusable input
//! at the API boundary. Resolution outcomes (conflicts, infeasibility) are
//! never errors; they travel inside `ResolutionResult`.

use thiserror::Error;

/// Errors surfaced by pyplan operations
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to construct a client or other component
    #[error("Initialization error: {0}")]
    InitError(String),

    /// A graph query failed after exhausting retries
    ///
    /// Means "could not determine", not "determined infeasible" — callers
    /// must not present this as a dependency conflict.
    #[error("Graph query error: {0}")]
    QueryError(String),

    /// Input at the API boundary could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Filesystem error while reading environment or requirement files
    #[error("I/O error: {0}")]
    IoError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e.to_string())
    }
}
