//! Error types for the document layer
//!
//! Most of these never reach a settings consumer: the document layer recovers
//! from parse and write failures locally and only logs them. They are returned
//! from the strict helpers (`try_read_root`, `write_text`) that callers use
//! when they want to see the failure.

use std::path::PathBuf;

/// Errors while reading or writing a scoped document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// IO error on the backing store
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backing text is not valid JSON
    #[error("parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A root that cannot be rendered as text
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl DocumentError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create parse error for path
    pub fn parse_error(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for document operations
pub type DocumentResult<T> = Result<T, DocumentError>;
