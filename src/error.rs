//! Error types for Cassette

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for Cassette operations
pub type Result<T> = std::result::Result<T, CassetteError>;

/// Errors that can occur in Cassette
#[derive(Debug, Error)]
pub enum CassetteError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Archive file exists but cannot be decoded as HAR
    #[error("malformed archive {path}: {source}")]
    MalformedArchive {
        /// Path of the offending file
        path: PathBuf,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// Archive file required but not present
    #[error("archive not found: {0}")]
    ArchiveNotFound(PathBuf),

    /// Recorded body declared as base64 but failed to decode
    #[error("invalid base64 body: {0}")]
    BodyDecode(#[from] base64::DecodeError),

    /// Forwarded call failed at the transport layer
    #[error("transport error: {0}")]
    Transport(String),

    /// Request could not be rebuilt for forwarding
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
