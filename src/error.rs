//! Error types for the persisted stores.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while reading or writing one of the persisted TOML documents.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document could not be serialized.
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The file exists but is not a valid document.
    #[error("Deserialize error in {path}: {source}")]
    Deserialize {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
