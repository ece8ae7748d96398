//! Error types for bs-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use thiserror::Error;

/// Result type alias for bs-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for bs-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local tree or file could not be read
    #[error("Filesystem error: {0}")]
    Filesystem(String),

    /// Listing, upload or delete failed at the storage transport
    #[error("Storage error: {0}")]
    Storage(String),

    /// Malformed setting: filter pattern, header rules, missing value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::Configuration(_) => 2,                          // UsageError
            Error::TomlParse(_) | Error::Json(_) => 2,             // UsageError
            Error::InvalidUrl(_) => 2,                             // UsageError
            Error::Storage(_) => 3,                                // StorageError
            Error::Filesystem(_) | Error::Io(_) => 4,              // FilesystemError
        }
    }

    /// Wrap an IO failure on a specific path as a filesystem error
    pub fn filesystem(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Error::Filesystem(format!("{}: {err}", path.display()))
    }
}
