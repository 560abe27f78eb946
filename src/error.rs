//! Error types for gridstream.

use thiserror::Error;

/// Gridstream error types.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Configuration parameter outside its admissible range
    #[error("parameter `{name}` = {value} out of range (expected {expected})")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },

    /// A record's attribute count differs from the stream's
    #[error("schema mismatch: stream has {expected} attributes, record has {got}")]
    SchemaMismatch { expected: usize, got: usize },

    /// Configuration JSON parsing error
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Result type alias for gridstream operations.
pub type Result<T> = std::result::Result<T, StreamError>;
