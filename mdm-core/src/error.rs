//! Error types for the AI and sync services.
//!
//! Everything else in the crate reports failures through `anyhow`. These two
//! enums exist because callers branch on the variant: the CLI turns an
//! [`AiError`] into a structured failure outcome, and the sync commands need
//! to tell "container missing" apart from transport failures.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the AI summarization service.
#[derive(Debug, Error)]
pub enum AiError {
    /// Endpoint or API key missing.
    #[error("AI service is not properly configured. Please check your Azure OpenAI credentials.")]
    NotConfigured,

    #[error("Invalid template key: {0}")]
    InvalidTemplateKey(String),

    /// Transport-level failure (connect, timeout, TLS).
    #[error("request to AI backend failed: {0}")]
    Http(String),

    /// The backend answered with a non-success status.
    #[error("AI backend returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The backend answered without any completion choice.
    #[error("Failed to get response from Azure OpenAI")]
    EmptyResponse,

    #[error("could not decode AI backend response: {0}")]
    Decode(String),
}

/// Failures of the cloud sync service.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration is missing. Please save the configuration first.")]
    MissingConfiguration,

    #[error("invalid storage connection string: {0}")]
    InvalidConnectionString(String),

    #[error("Container '{0}' does not exist. Nothing to pull.")]
    ContainerNotFound(String),

    #[error("Container '{0}' already exists")]
    ContainerAlreadyExists(String),

    /// A remote key that would resolve outside the local folder.
    #[error("refusing to write blob '{0}' outside the document folder")]
    UnsafeBlobKey(String),

    #[error("storage service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("storage request failed: {0}")]
    Http(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse storage listing: {0}")]
    Xml(String),
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
