//! Token endpoint exchange.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{info, instrument, warn};

use super::error::CredentialError;
use super::types::{CredentialPair, TokenRefreshResponse, seconds_as_days};

/// Exchanges a refresh token for a new credential pair.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn exchange(&self, refresh_token: &str) -> Result<CredentialPair, CredentialError>;
}

/// `POST /v2/token/refresh` against the Huntflow API.
pub struct HuntflowTokenRefresher {
    client: Client,
    url: String,
}

impl HuntflowTokenRefresher {
    const REFRESH_PATH: &str = "/v2/token/refresh";

    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), Self::REFRESH_PATH),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TokenRefresher for HuntflowTokenRefresher {
    #[instrument(skip(self, refresh_token), fields(url = %self.url))]
    async fn exchange(&self, refresh_token: &str) -> Result<CredentialPair, CredentialError> {
        if refresh_token.is_empty() {
            return Err(CredentialError::NotConfigured);
        }

        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "Token refresh rejected");
            return Err(CredentialError::Auth(format!(
                "token refresh returned {status}"
            )));
        }

        let body: TokenRefreshResponse = response
            .json()
            .await
            .map_err(|e| CredentialError::InvalidResponse(e.to_string()))?;

        info!(
            access_days = body.expires_in.map(seconds_as_days),
            refresh_days = body.refresh_token_expires_in.map(seconds_as_days),
            "Received new token pair"
        );

        body.into_pair()
    }
}
