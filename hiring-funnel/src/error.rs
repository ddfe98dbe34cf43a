//! Application-wide error types.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::credentials::CredentialError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Remote API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No accounts available for the configured credential")]
    NoAccounts,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed {op} {}: {source}", path.display())]
    Persistence {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed cache file {}: {reason}", path.display())]
    MalformedCache { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn io_path(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Persistence {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// True when only a manually issued token pair can fix the failure.
    pub fn requires_relogin(&self) -> bool {
        matches!(self, Self::Credential(e) if e.requires_relogin())
    }

    /// True when the failure is likely to clear on a later cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Credential(e) => e.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::from(CredentialError::NotConfigured).requires_relogin());
        assert!(!Error::api(503, "busy").requires_relogin());

        assert!(Error::api(503, "busy").is_transient());
        assert!(Error::api(429, "slow down").is_transient());
        assert!(!Error::api(404, "gone").is_transient());
        assert!(!Error::NoAccounts.is_transient());
        assert!(!Error::from(CredentialError::Auth("expired".into())).is_transient());
    }
}
