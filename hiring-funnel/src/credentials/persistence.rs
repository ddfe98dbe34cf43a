//! Credential persistence abstraction.
//!
//! Refreshed token pairs must reach durable storage before they are used:
//! the refresh token is single-use, so a pair that only lived in memory is
//! lost for good on a crash.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::error::CredentialError;
use super::types::{CredentialPair, TokenFile};
use crate::utils::fs;

#[async_trait]
pub trait CredentialPersistence: Send + Sync {
    /// Load the last persisted pair.
    ///
    /// Returns `None` when nothing usable is stored (missing, unreadable or
    /// incomplete); the caller falls back to its bootstrap source.
    async fn load(&self) -> Option<CredentialPair>;

    /// Durably store `pair`. Must not return before the data is on disk.
    async fn persist(&self, pair: &CredentialPair) -> Result<(), CredentialError>;
}

/// JSON credential file (`{"ACCESS_TOKEN": .., "REFRESH_TOKEN": ..}`).
#[derive(Debug, Clone)]
pub struct FileCredentialPersistence {
    path: PathBuf,
}

impl FileCredentialPersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialPersistence for FileCredentialPersistence {
    async fn load(&self) -> Option<CredentialPair> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Credential file not found");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read credential file");
                return None;
            }
        };

        let file: TokenFile = match serde_json::from_str(&raw) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Credential file is not valid JSON");
                return None;
            }
        };

        let pair = CredentialPair::from(file);
        if !pair.is_complete() {
            warn!(path = %self.path.display(), "Credential file is incomplete");
            return None;
        }

        info!(path = %self.path.display(), "Loaded credentials from file");
        Some(pair)
    }

    async fn persist(&self, pair: &CredentialPair) -> Result<(), CredentialError> {
        let json = serde_json::to_vec_pretty(&TokenFile::from(pair))
            .map_err(|e| CredentialError::Persistence(e.to_string()))?;

        fs::write_atomic_with_backup(&self.path, &json)
            .await
            .map_err(|e| CredentialError::Persistence(e.to_string()))?;

        debug!(path = %self.path.display(), "Credentials persisted");
        Ok(())
    }
}
