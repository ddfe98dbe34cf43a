//! Core credential types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::CredentialError;

/// Bearer access token plus the one-time refresh token that renews it.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Both halves are present.
    #[inline]
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }

    /// Reject pairs with an empty half.
    pub fn validate(&self) -> Result<(), CredentialError> {
        if self.access_token.is_empty() {
            return Err(CredentialError::InvalidResponse(
                "access_token is empty".to_string(),
            ));
        }
        if self.refresh_token.is_empty() {
            return Err(CredentialError::InvalidResponse(
                "refresh_token is empty".to_string(),
            ));
        }
        Ok(())
    }
}

// Tokens never reach logs in full.
impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &mask_token(&self.access_token))
            .field("refresh_token", &mask_token(&self.refresh_token))
            .finish()
    }
}

/// Short printable prefix of a secret.
pub fn mask_token(token: &str) -> String {
    if token.is_empty() {
        return "<empty>".to_string();
    }
    let prefix: String = token.chars().take(6).collect();
    format!("{prefix}…")
}

/// On-disk shape of the credential file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenFile {
    #[serde(rename = "ACCESS_TOKEN", default)]
    pub access_token: String,
    #[serde(rename = "REFRESH_TOKEN", default)]
    pub refresh_token: String,
}

impl From<&CredentialPair> for TokenFile {
    fn from(pair: &CredentialPair) -> Self {
        Self {
            access_token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
        }
    }
}

impl From<TokenFile> for CredentialPair {
    fn from(file: TokenFile) -> Self {
        Self::new(file.access_token, file.refresh_token)
    }
}

/// Body returned by `POST /v2/token/refresh`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRefreshResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Refresh token lifetime in seconds.
    #[serde(default)]
    pub refresh_token_expires_in: Option<u64>,
}

impl TokenRefreshResponse {
    /// Convert into a pair, failing if either token is missing or empty.
    pub fn into_pair(self) -> Result<CredentialPair, CredentialError> {
        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CredentialError::InvalidResponse("missing access_token".to_string()))?;
        let refresh_token = self
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                CredentialError::InvalidResponse("missing refresh_token".to_string())
            })?;
        Ok(CredentialPair::new(access_token, refresh_token))
    }
}

/// Seconds expressed as (approximate) days, for log lines.
pub fn seconds_as_days(seconds: u64) -> f64 {
    seconds as f64 / 86_400.0
}
