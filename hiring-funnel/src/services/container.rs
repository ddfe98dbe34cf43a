//! Service container for dependency injection.
//!
//! The ServiceContainer builds every component from [`AppConfig`] and owns
//! the lifecycle of the background refresh.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::credentials::{CredentialStore, FileCredentialPersistence, HuntflowTokenRefresher};
use crate::huntflow::{HuntflowClient, RecruitingApi};
use crate::report::{CommentArchive, FunnelFetcher, JsonFileReportStorage, ReportCache, ReportStorage};
use crate::scheduler::ReportRefreshJob;
use crate::utils::http_client::build_api_client;
use crate::Result;

/// How long shutdown waits for the periodic task to exit.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Service container holding all application services.
pub struct ServiceContainer {
    pub config: AppConfig,
    /// Bearer credential shared by every remote call.
    pub credentials: Arc<CredentialStore>,
    /// Committed report and comments.
    pub cache: Arc<ReportCache>,
    /// Fetch-and-commit cycle.
    pub refresh_job: Arc<ReportRefreshJob>,
    cancellation_token: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ServiceContainer {
    /// Build the production wiring from configuration.
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("Initializing service container");

        // Shared HTTP client for the API and the token endpoint
        let http = build_api_client(config.request_timeout);

        // Credential store: token file first, environment as fallback
        let credentials = Arc::new(
            CredentialStore::load(
                Arc::new(FileCredentialPersistence::new(&config.token_file)),
                Arc::new(HuntflowTokenRefresher::new(
                    http.clone(),
                    &config.huntflow_base_url,
                )),
                config.bootstrap_credentials.clone(),
            )
            .await,
        );

        let api = Arc::new(HuntflowClient::new(
            http,
            &config.huntflow_base_url,
            credentials.clone(),
        ));
        let storage = Arc::new(JsonFileReportStorage::new(&config.cache_file));

        let archive = match &config.comments_file {
            Some(path) => Some(Arc::new(CommentArchive::open(path).await)),
            None => None,
        };

        Ok(Self::with_components(config, credentials, api, storage, archive))
    }

    /// Assemble a container from already built parts.
    pub fn with_components(
        config: AppConfig,
        credentials: Arc<CredentialStore>,
        api: Arc<dyn RecruitingApi>,
        storage: Arc<dyn ReportStorage>,
        archive: Option<Arc<CommentArchive>>,
    ) -> Self {
        let mut cache = ReportCache::new(storage);
        if let Some(archive) = archive {
            cache = cache.with_comment_archive(archive);
        }
        let cache = Arc::new(cache);

        let fetcher = Arc::new(FunnelFetcher::new(api, config.fetch.clone()));
        let refresh_job = Arc::new(ReportRefreshJob::new(fetcher, cache.clone()));

        Self {
            config,
            credentials,
            cache,
            refresh_job,
            cancellation_token: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Load durable state and arm the periodic refresh.
    ///
    /// With an empty cache the first refresh runs inline so the first page
    /// view has data; otherwise it runs in the background.
    pub async fn initialize(&self) -> Result<()> {
        info!("Initializing services");

        self.cache.load().await;

        if !self.credentials.is_configured() {
            error!("No Huntflow credential configured; periodic refresh disabled");
            return Ok(());
        }

        if self.cache.is_empty() {
            info!("Report cache empty; running first refresh now");
            if let Err(e) = self.refresh_job.run_now().await {
                warn!(error = %e, "Initial refresh failed; serving empty report");
            }
        } else {
            let job = self.refresh_job.clone();
            let handle = tokio::spawn(async move {
                if let Err(e) = job.run_now().await {
                    warn!(error = %e, "Background refresh at startup failed");
                }
            });
            self.tasks.lock().push(handle);
        }

        let handle = self
            .refresh_job
            .clone()
            .spawn_periodic(self.config.update_interval, self.cancellation_token.clone());
        self.tasks.lock().push(handle);

        info!("Services initialized");
        Ok(())
    }

    /// Token cancelled on shutdown.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Whether the periodic refresh has been armed.
    pub fn is_refresh_armed(&self) -> bool {
        !self.tasks.lock().is_empty()
    }

    /// Stop background work.
    pub async fn shutdown(&self) {
        info!("Shutting down services");
        self.cancellation_token.cancel();

        let tasks: Vec<_> = std::mem::take(&mut *self.tasks.lock());
        for mut handle in tasks {
            if tokio::time::timeout(DEFAULT_SHUTDOWN_TIMEOUT, &mut handle)
                .await
                .is_err()
            {
                warn!("Background task did not stop in time; aborting");
                handle.abort();
            }
        }

        info!("Services shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportScope;
    use crate::credentials::{
        CredentialError, CredentialPair, CredentialPersistence, TokenRefresher,
    };
    use crate::huntflow::fake::FakeApi;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct NoPersistence;

    #[async_trait]
    impl CredentialPersistence for NoPersistence {
        async fn load(&self) -> Option<CredentialPair> {
            None
        }

        async fn persist(&self, _pair: &CredentialPair) -> std::result::Result<(), CredentialError> {
            Ok(())
        }
    }

    struct NoRefresher;

    #[async_trait]
    impl TokenRefresher for NoRefresher {
        async fn exchange(
            &self,
            _refresh_token: &str,
        ) -> std::result::Result<CredentialPair, CredentialError> {
            Err(CredentialError::Auth("not available in tests".to_string()))
        }
    }

    fn container(dir: &TempDir, access_token: &str) -> ServiceContainer {
        let mut config = AppConfig::default();
        config.fetch.scope = ReportScope::All;
        config.update_interval = Duration::from_secs(3600);

        let credentials = Arc::new(CredentialStore::new(
            CredentialPair::new(access_token, "r"),
            Arc::new(NoPersistence),
            Arc::new(NoRefresher),
        ));
        ServiceContainer::with_components(
            config,
            credentials,
            Arc::new(FakeApi::with_defaults().vacancy(1, "QA")),
            Arc::new(JsonFileReportStorage::new(dir.path().join("cache.json"))),
            None,
        )
    }

    #[tokio::test]
    async fn test_initialize_with_empty_cache_refreshes_inline() {
        let dir = TempDir::new().unwrap();
        let services = container(&dir, "a");

        services.initialize().await.unwrap();
        assert_eq!(services.cache.get_rows().len(), 1);
        assert!(services.is_refresh_armed());

        services.shutdown().await;
        assert!(services.cancellation_token().is_cancelled());
        assert!(!services.is_refresh_armed());
    }

    #[tokio::test]
    async fn test_initialize_without_credentials_does_not_arm() {
        let dir = TempDir::new().unwrap();
        let services = container(&dir, "");

        services.initialize().await.unwrap();
        assert!(services.cache.is_empty());
        assert!(!services.is_refresh_armed());
        services.shutdown().await;
    }
}
