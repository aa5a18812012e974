//! Error types for the fallible surfaces around the filter.
//!
//! The per-packet path never fails: malformed input maps to a configured
//! verdict and full tables evict. Errors only arise while loading
//! configuration, reading files or parsing replay traces.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced outside the dataplane.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Configuration is invalid or could not be decoded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A file could not be read.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        /// Path that was being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Input (trace line, frame encoding, address) could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;
