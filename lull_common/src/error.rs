//! Error types shared across the daemon.

use thiserror::Error;

/// Errors that can occur while bringing the daemon up.
#[derive(Error, Debug)]
pub enum LullError {
    /// A time zone name that is not a known IANA zone
    #[error("Unknown time zone: {name}")]
    UnknownTimeZone {
        /// The rejected zone name
        name: String,
    },

    /// The base directory could not be created
    #[error("Failed to create base directory '{path}': {source}")]
    BaseDir {
        /// The directory that could not be created
        path: String,
        /// Source IO error
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    Json {
        /// Source JSON error
        #[from]
        source: serde_json::Error,
    },
}

/// Result type for daemon setup operations.
pub type LullResult<T> = Result<T, LullError>;
