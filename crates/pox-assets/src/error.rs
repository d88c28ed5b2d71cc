use thiserror::Error;

use crate::archive::ArchiveError;
use crate::retrieve::RetrieveError;

/// Errors produced while resolving, retrieving and unpacking asset sources.
///
/// Every per-source variant carries the `location` of the declared source so
/// callers can report exactly which entry of the manifest failed.
#[derive(Error, Debug)]
pub enum AssetError {
    // Retrieval errors
    #[error("{location}: {source}")]
    Retrieve {
        location: String,
        #[source]
        source: RetrieveError,
    },

    // Checksum errors
    #[error("{location}: checksum mismatch (expected {expected}, got {actual})")]
    ChecksumMismatch {
        location: String,
        expected: String,
        actual: String,
    },

    #[error("{location}: unknown checksum algorithm '{algorithm}'")]
    UnknownAlgorithm { location: String, algorithm: String },

    // Archive errors
    #[error("{location}: {source}")]
    Archive {
        location: String,
        #[source]
        source: ArchiveError,
    },

    #[error("{location}: unknown archive format '{format}'")]
    UnknownArchiveFormat { location: String, format: String },

    #[error("{location}: invalid path pattern: {source}")]
    InvalidPattern {
        location: String,
        #[source]
        source: regex::Error,
    },

    // Declaration errors
    #[error("{location}: invalid source: {reason}")]
    InvalidSource { location: String, reason: String },

    // Manifest errors
    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("Failed to parse manifest: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse manifest: {0}")]
    Json(#[from] serde_json::Error),

    // Network errors
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssetError {
    /// The location of the source that failed, if the error is tied to one.
    pub fn location(&self) -> Option<&str> {
        match self {
            AssetError::Retrieve { location, .. }
            | AssetError::ChecksumMismatch { location, .. }
            | AssetError::UnknownAlgorithm { location, .. }
            | AssetError::Archive { location, .. }
            | AssetError::UnknownArchiveFormat { location, .. }
            | AssetError::InvalidPattern { location, .. }
            | AssetError::InvalidSource { location, .. } => Some(location),
            AssetError::Manifest(_)
            | AssetError::Toml(_)
            | AssetError::Json(_)
            | AssetError::Client(_)
            | AssetError::Io(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AssetError>;
