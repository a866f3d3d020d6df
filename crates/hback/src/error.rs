//! Error types for the hback library

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the hback library
#[derive(Error, Debug)]
pub enum HbackError {
    // Repository errors
    #[error("Could not open hback repo {path}: {source}")]
    RepoOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not create repo directory {path}: {source}")]
    RepoCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    // Object errors
    #[error("Could not read file {path}: {source}")]
    ObjectRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not parse file {path}: {source}")]
    ObjectParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Could not write object {path}: {source}")]
    ObjectWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // Save errors
    #[error("Could not read source path {path}: {source}")]
    SourceRead {
        path: PathBuf,
        source: std::io::Error,
    },

    // Restore errors
    #[error("Backup {0} does not exist")]
    SnapshotNotFound(String),

    #[error("Destination {0} already exists")]
    DestinationExists(PathBuf),

    #[error("Could not write to destination {path}: {source}")]
    DestinationWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // Mount errors
    #[error("Mount failed: {0}")]
    Mount(String),

    // Catch-alls
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for hback operations
pub type Result<T> = std::result::Result<T, HbackError>;
