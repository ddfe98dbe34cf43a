//! Credential error types.

use thiserror::Error;

/// Errors that can occur during credential operations.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The remote API rejected the credential (401 or non-200 refresh).
    #[error("Authorization failed: {0}")]
    Auth(String),

    /// The submitted access token equals the one already held.
    #[error("Refreshed access token is identical to the current one")]
    DuplicateToken,

    /// Transport failure or timeout while talking to the token endpoint.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The new credential could not be written to durable storage.
    #[error("Failed to persist credentials: {0}")]
    Persistence(String),

    /// The refresh response is missing a required field.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// No credential is available (neither on disk nor in the environment).
    #[error("No credentials configured")]
    NotConfigured,
}

impl CredentialError {
    /// Check if this error requires a manually issued token pair.
    pub fn requires_relogin(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::NotConfigured)
    }

    /// Check if this error is transient and may be retried later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::DuplicateToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(CredentialError::Auth("expired".into()).requires_relogin());
        assert!(CredentialError::NotConfigured.requires_relogin());
        assert!(!CredentialError::DuplicateToken.requires_relogin());

        assert!(CredentialError::DuplicateToken.is_transient());
        assert!(!CredentialError::Persistence("disk full".into()).is_transient());
        assert!(!CredentialError::InvalidResponse("access_token".into()).is_transient());
    }
}
