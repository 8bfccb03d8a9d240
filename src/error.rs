//! Error types for cidrtree

use thiserror::Error;

/// Result type alias for cidrtree operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cidrtree operations
///
/// Lookups on networks that are not in a trie are not errors: they resolve
/// to `None` or a zero host count.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    #[error("Invalid aggregation threshold: {0} (must be finite and greater than 0)")]
    InvalidThreshold(f64),

    #[error("Config error: {0}")]
    Config(String),
}
