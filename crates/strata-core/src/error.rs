//! Error types for strata operations

use std::path::PathBuf;

use thiserror::Error;

/// Result type for strata operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures that abort a run or an explicit persistence call.
///
/// Per-file problems are never reported through this type; they are collected
/// as [`crate::model::FileError`] values and surfaced in the summary report.
#[derive(Debug, Error)]
pub enum Error {
    /// The analysis root does not exist
    #[error("root directory not found: {0}")]
    RootNotFound(PathBuf),

    /// The analysis root exists but is not a directory
    #[error("root is not a directory: {0}")]
    RootNotDirectory(PathBuf),

    /// The analysis root could not be listed
    #[error("root directory is not readable: {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary state encoding or decoding failed
    #[error("state encoding error: {0}")]
    Bincode(#[from] bincode::Error),

    /// The project configuration file is malformed
    #[error("invalid configuration in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),
}
