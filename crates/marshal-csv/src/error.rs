//! Error types for delimited-text encoding.

use thiserror::Error;

/// Errors that can occur while encoding a value tree as delimited text.
#[derive(Error, Debug)]
pub enum CsvError {
    /// The tree nests compounds deeper than the row/column grammar allows:
    /// a compound inside a row, or a compound map value.
    #[error("unsupported nested structure: {context}")]
    UnsupportedNesting { context: &'static str },

    /// A map key is itself a map or sequence and compound keys are not
    /// enabled in the config.
    #[error("compound map keys are not allowed")]
    CompoundKey,

    /// The destination writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A permitted compound key could not be rendered as JSON text.
    #[error("cannot render compound key: {0}")]
    Render(#[from] serde_json::Error),
}

/// Convenience alias used throughout marshal-csv.
pub type Result<T> = std::result::Result<T, CsvError>;
