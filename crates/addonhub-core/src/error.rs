//! Error types for AddonHub.
//!
//! One taxonomy covers the whole engine: entry validation, asset resolution,
//! remote API failures and the local I/O done by the entries store.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the AddonHub core.
#[derive(Debug, Error)]
pub enum AddonHubError {
    // Entry source errors
    #[error("Invalid entry schema: {message}")]
    InvalidSchema { message: String },

    // Lookup errors
    #[error("No such addon: {id}")]
    AddonNotFound { id: String },

    #[error("Release asset {asset} not found in release {release}")]
    ReleaseAssetNotFound { release: String, asset: String },

    // Template and format errors
    #[error("Invalid asset template {template:?}: {message}")]
    InvalidAssetTemplate { template: String, message: String },

    #[error("Invalid version format: {version:?}")]
    InvalidVersionFormat { version: String },

    // Remote errors
    #[error("Call to {url} failed with HTTP {status_code}")]
    RemoteApi { url: String, status_code: u16 },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Request timed out: {message}")]
    Timeout { message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("XML error: {message}")]
    Xml { message: String },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias for AddonHub operations.
pub type Result<T> = std::result::Result<T, AddonHubError>;

impl From<std::io::Error> for AddonHubError {
    fn from(err: std::io::Error) -> Self {
        AddonHubError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for AddonHubError {
    fn from(err: serde_json::Error) -> Self {
        AddonHubError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for AddonHubError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AddonHubError::Timeout {
                message: err.to_string(),
            }
        } else {
            AddonHubError::Network {
                message: err.to_string(),
                source: Some(err),
            }
        }
    }
}

impl AddonHubError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        AddonHubError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        AddonHubError::InvalidSchema {
            message: message.into(),
        }
    }

    /// Whether the route layer should answer with 404.
    pub fn is_not_found(&self) -> bool {
        match self {
            AddonHubError::AddonNotFound { .. } | AddonHubError::ReleaseAssetNotFound { .. } => {
                true
            }
            AddonHubError::RemoteApi { status_code, .. } => *status_code == 404,
            _ => false,
        }
    }
}
