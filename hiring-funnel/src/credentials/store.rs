//! Process-wide holder of the bearer credential.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::error::CredentialError;
use super::persistence::CredentialPersistence;
use super::refresher::TokenRefresher;
use super::tracker::{FailureInfo, RefreshFailureTracker};
use super::types::{CredentialPair, mask_token};

/// `Authorization` header built from a snapshot of the access token.
#[derive(Debug, Clone)]
pub struct AuthHeader {
    access_token: String,
}

impl AuthHeader {
    pub const NAME: &'static str = "Authorization";

    /// The access token this header was built from.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Header value (`Bearer <token>`).
    pub fn value(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

/// Holds the current credential pair and serializes every refresh.
///
/// Reads never wait on a refresh: the pair sits behind a short-lived
/// `RwLock`, while the validate-persist-swap sequence runs under a separate
/// async mutex.
///
/// The update lock is innermost: it may be taken while the report cache's
/// write lock is held, never the other way around, and nothing here calls
/// back into the cache.
pub struct CredentialStore {
    pair: RwLock<CredentialPair>,
    /// Held for the full validate-persist-swap sequence.
    update_lock: Mutex<()>,
    updated: AtomicBool,
    persistence: Arc<dyn CredentialPersistence>,
    refresher: Arc<dyn TokenRefresher>,
    failure_tracker: RefreshFailureTracker,
}

impl CredentialStore {
    /// Create a store around an already known pair.
    pub fn new(
        pair: CredentialPair,
        persistence: Arc<dyn CredentialPersistence>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        Self {
            pair: RwLock::new(pair),
            update_lock: Mutex::new(()),
            updated: AtomicBool::new(false),
            persistence,
            refresher,
            failure_tracker: RefreshFailureTracker::new(),
        }
    }

    /// Load the pair from durable storage, falling back to `bootstrap`.
    pub async fn load(
        persistence: Arc<dyn CredentialPersistence>,
        refresher: Arc<dyn TokenRefresher>,
        bootstrap: CredentialPair,
    ) -> Self {
        let pair = match persistence.load().await {
            Some(pair) => pair,
            None => {
                warn!("No usable credential file; falling back to environment tokens");
                if bootstrap.access_token.is_empty() {
                    error!("No access token configured in credential file or environment");
                } else {
                    info!("Loaded credentials from environment");
                }
                bootstrap
            }
        };

        Self::new(pair, persistence, refresher)
    }

    /// Whether an access token is available at all.
    pub fn is_configured(&self) -> bool {
        !self.pair.read().access_token.is_empty()
    }

    /// Current access token.
    pub fn get_access_token(&self) -> String {
        self.pair.read().access_token.clone()
    }

    /// Current refresh token.
    pub fn get_refresh_token(&self) -> String {
        self.pair.read().refresh_token.clone()
    }

    /// Build the bearer header and clear the "recently updated" flag.
    pub fn get_auth_header(&self) -> AuthHeader {
        self.updated.store(false, Ordering::SeqCst);
        AuthHeader {
            access_token: self.get_access_token(),
        }
    }

    /// True if a refresh landed since the last [`get_auth_header`](Self::get_auth_header).
    pub fn is_updated(&self) -> bool {
        self.updated.load(Ordering::SeqCst)
    }

    /// Consecutive failed refresh attempts.
    pub fn failure_info(&self) -> Option<FailureInfo> {
        self.failure_tracker.failure_info()
    }

    /// Install `new_pair` as the live credential.
    ///
    /// The pair is persisted before it replaces the in-memory one. A
    /// duplicate access token is rejected without touching disk.
    pub async fn refresh(&self, new_pair: CredentialPair) -> Result<(), CredentialError> {
        let _guard = self.update_lock.lock().await;
        self.apply_locked(new_pair).await
    }

    /// Exchange `refresh_token` at the token endpoint and install the result.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_via_network(&self, refresh_token: &str) -> Result<(), CredentialError> {
        let result = match self.refresher.exchange(refresh_token).await {
            Ok(pair) => self.refresh(pair).await,
            Err(e) => Err(e),
        };
        self.track(result)
    }

    /// Recover from a 401 observed while using `rejected_access_token`.
    ///
    /// Concurrent callers that saw the same rejected token collapse into a
    /// single network refresh: whoever gets the lock second finds the token
    /// already replaced and returns immediately.
    #[instrument(skip_all, fields(rejected = %mask_token(rejected_access_token)))]
    pub async fn recover_from_unauthorized(
        &self,
        rejected_access_token: &str,
    ) -> Result<(), CredentialError> {
        let _guard = self.update_lock.lock().await;

        if self.pair.read().access_token != rejected_access_token {
            debug!("Access token already refreshed by another task");
            return Ok(());
        }

        let refresh_token = self.get_refresh_token();
        if refresh_token.is_empty() {
            return self.track(Err(CredentialError::NotConfigured));
        }

        info!("Access token rejected; refreshing");
        let result = match self.refresher.exchange(&refresh_token).await {
            Ok(pair) => self.apply_locked(pair).await,
            Err(e) => Err(e),
        };
        self.track(result)
    }

    fn track(&self, result: Result<(), CredentialError>) -> Result<(), CredentialError> {
        match &result {
            Ok(()) => self.failure_tracker.clear(),
            // A stale duplicate is not a failed refresh.
            Err(CredentialError::DuplicateToken) => {}
            Err(e) => {
                let failure_count = self.failure_tracker.record_failure(&e.to_string());
                if e.requires_relogin() {
                    error!(
                        error = %e,
                        failure_count,
                        "Credential refresh failed; a new token pair must be issued manually"
                    );
                } else if e.is_transient() {
                    warn!(error = %e, failure_count, "Credential refresh failed; will retry on next use");
                } else {
                    error!(error = %e, failure_count, "Credential refresh failed");
                }
            }
        }
        result
    }

    async fn apply_locked(&self, new_pair: CredentialPair) -> Result<(), CredentialError> {
        new_pair.validate()?;

        if self.pair.read().access_token == new_pair.access_token {
            warn!("Refresh returned the access token already in use; ignoring");
            return Err(CredentialError::DuplicateToken);
        }

        if let Err(e) = self.persistence.persist(&new_pair).await {
            error!("============================================================");
            error!(error = %e, "FAILED TO PERSIST NEW CREDENTIALS");
            error!(
                access_token = %new_pair.access_token,
                refresh_token = %new_pair.refresh_token,
                "Save this pair manually; the previous refresh token is already spent"
            );
            error!("============================================================");
            return Err(e);
        }

        info!(
            access_token = %mask_token(&new_pair.access_token),
            "Credentials refreshed and persisted"
        );
        *self.pair.write() = new_pair;
        self.updated.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::persistence::FileCredentialPersistence;
    use crate::credentials::refresher::HuntflowTokenRefresher;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MemoryPersistence {
        saved: parking_lot::Mutex<Vec<CredentialPair>>,
        fail: bool,
    }

    #[async_trait]
    impl CredentialPersistence for MemoryPersistence {
        async fn load(&self) -> Option<CredentialPair> {
            self.saved.lock().last().cloned()
        }

        async fn persist(&self, pair: &CredentialPair) -> Result<(), CredentialError> {
            if self.fail {
                return Err(CredentialError::Persistence("disk full".to_string()));
            }
            self.saved.lock().push(pair.clone());
            Ok(())
        }
    }

    /// Hands out `a1`, `a2`, ... and counts exchanges.
    #[derive(Default)]
    struct CountingRefresher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenRefresher for CountingRefresher {
        async fn exchange(&self, _refresh_token: &str) -> Result<CredentialPair, CredentialError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(CredentialPair::new(format!("a{n}"), format!("r{n}")))
        }
    }

    fn store_with(
        persistence: Arc<MemoryPersistence>,
        refresher: Arc<CountingRefresher>,
    ) -> CredentialStore {
        CredentialStore::new(CredentialPair::new("a0", "r0"), persistence, refresher)
    }

    #[tokio::test]
    async fn test_refresh_swaps_after_persisting() {
        let persistence = Arc::new(MemoryPersistence::default());
        let store = store_with(persistence.clone(), Arc::new(CountingRefresher::default()));

        store
            .refresh(CredentialPair::new("a1", "r1"))
            .await
            .unwrap();

        assert_eq!(store.get_access_token(), "a1");
        assert_eq!(store.get_refresh_token(), "r1");
        assert_eq!(persistence.saved.lock().len(), 1);
        assert!(store.is_updated());
    }

    #[tokio::test]
    async fn test_duplicate_refresh_is_rejected() {
        let persistence = Arc::new(MemoryPersistence::default());
        let store = store_with(persistence.clone(), Arc::new(CountingRefresher::default()));

        store
            .refresh(CredentialPair::new("a1", "r1"))
            .await
            .unwrap();
        let second = store.refresh(CredentialPair::new("a1", "r-other")).await;

        assert!(matches!(second, Err(CredentialError::DuplicateToken)));
        assert_eq!(store.get_refresh_token(), "r1");
        assert_eq!(persistence.saved.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_old_pair() {
        let persistence = Arc::new(MemoryPersistence {
            fail: true,
            ..Default::default()
        });
        let store = store_with(persistence, Arc::new(CountingRefresher::default()));

        let result = store.refresh(CredentialPair::new("a1", "r1")).await;

        assert!(matches!(result, Err(CredentialError::Persistence(_))));
        assert_eq!(store.get_access_token(), "a0");
        assert!(!store.is_updated());
    }

    #[tokio::test]
    async fn test_empty_pair_is_rejected() {
        let persistence = Arc::new(MemoryPersistence::default());
        let store = store_with(persistence.clone(), Arc::new(CountingRefresher::default()));

        let result = store.refresh(CredentialPair::new("", "r1")).await;

        assert!(matches!(result, Err(CredentialError::InvalidResponse(_))));
        assert!(persistence.saved.lock().is_empty());
    }

    #[tokio::test]
    async fn test_auth_header_clears_updated_flag() {
        let store = store_with(
            Arc::new(MemoryPersistence::default()),
            Arc::new(CountingRefresher::default()),
        );
        store
            .refresh(CredentialPair::new("a1", "r1"))
            .await
            .unwrap();
        assert!(store.is_updated());

        let header = store.get_auth_header();
        assert_eq!(header.value(), "Bearer a1");
        assert_eq!(header.access_token(), "a1");
        assert!(!store.is_updated());
    }

    #[tokio::test]
    async fn test_concurrent_unauthorized_collapse_into_one_refresh() {
        let refresher = Arc::new(CountingRefresher::default());
        let store = Arc::new(store_with(
            Arc::new(MemoryPersistence::default()),
            refresher.clone(),
        ));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.recover_from_unauthorized("a0").await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get_access_token(), "a1");
    }

    #[tokio::test]
    async fn test_refresh_via_network_tracks_failures() {
        let persistence = Arc::new(MemoryPersistence {
            fail: true,
            ..Default::default()
        });
        let store = store_with(persistence, Arc::new(CountingRefresher::default()));

        assert!(store.refresh_via_network("r0").await.is_err());
        assert!(store.refresh_via_network("r0").await.is_err());
        assert_eq!(store.failure_info().unwrap().count, 2);
    }

    #[tokio::test]
    async fn test_load_falls_back_to_bootstrap() {
        let store = CredentialStore::load(
            Arc::new(MemoryPersistence::default()),
            Arc::new(CountingRefresher::default()),
            CredentialPair::new("env-a", "env-r"),
        )
        .await;
        assert!(store.is_configured());
        assert_eq!(store.get_access_token(), "env-a");

        let unconfigured = CredentialStore::load(
            Arc::new(MemoryPersistence::default()),
            Arc::new(CountingRefresher::default()),
            CredentialPair::default(),
        )
        .await;
        assert!(!unconfigured.is_configured());
    }

    #[tokio::test]
    async fn test_response_missing_access_token_writes_nothing() {
        use axum::{Json, Router, routing::post};

        let router = Router::new().route(
            "/v2/token/refresh",
            post(|| async { Json(serde_json::json!({ "refresh_token": "r2" })) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let temp_dir = TempDir::new().unwrap();
        let token_path = temp_dir.path().join("tokens.json");
        let store = CredentialStore::new(
            CredentialPair::new("a0", "r0"),
            Arc::new(FileCredentialPersistence::new(&token_path)),
            Arc::new(HuntflowTokenRefresher::new(
                crate::utils::http_client::build_api_client(std::time::Duration::from_secs(5)),
                &format!("http://{addr}"),
            )),
        );

        let result = store.refresh_via_network("r0").await;

        assert!(matches!(result, Err(CredentialError::InvalidResponse(_))));
        assert_eq!(store.get_access_token(), "a0");
        assert!(!token_path.exists());
    }
}
