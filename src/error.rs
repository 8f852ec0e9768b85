use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a grouping run as a whole
///
/// Per-file problems (unreadable document, failed embedding, failed move)
/// never show up here; they are collected in the run summary instead.
#[derive(Debug, Error)]
pub enum GroupingError {
    #[error("source path is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),

    #[error("invalid cluster count {requested}: {reason}")]
    InvalidClusterCount { requested: usize, reason: String },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("configuration error: {0}")]
    Config(String),
}
