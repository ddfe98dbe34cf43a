//! Credential management module.
//!
//! Keeps the Huntflow bearer credential valid across an unattended,
//! long-running process.
//!
//! # Architecture
//!
//! - [`CredentialStore`]: Current pair, serialized refresh, 401 recovery
//! - [`CredentialPersistence`]: Durable storage for the pair (crash-safe file)
//! - [`TokenRefresher`]: Exchange of a refresh token at the token endpoint
//! - [`RefreshFailureTracker`]: Consecutive failure bookkeeping

mod error;
mod persistence;
mod refresher;
mod store;
mod tracker;
mod types;

pub use error::CredentialError;
pub use persistence::{CredentialPersistence, FileCredentialPersistence};
pub use refresher::{HuntflowTokenRefresher, TokenRefresher};
pub use store::{AuthHeader, CredentialStore};
pub use tracker::{FailureInfo, RefreshFailureTracker};
pub use types::{CredentialPair, TokenFile, TokenRefreshResponse, mask_token};
