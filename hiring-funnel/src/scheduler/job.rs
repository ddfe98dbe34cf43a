use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::report::{FunnelFetcher, RefreshOutcome, ReportCache};

/// Bookkeeping exposed through the health endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobStats {
    pub runs: u64,
    pub skipped_overlaps: u64,
    pub consecutive_failures: u32,
    pub last_run: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Fetch-and-commit cycle with a single-instance guard.
pub struct ReportRefreshJob {
    fetcher: Arc<FunnelFetcher>,
    cache: Arc<ReportCache>,
    cycle_lock: AsyncMutex<()>,
    stats: Mutex<JobStats>,
}

impl ReportRefreshJob {
    pub fn new(fetcher: Arc<FunnelFetcher>, cache: Arc<ReportCache>) -> Self {
        Self {
            fetcher,
            cache,
            cycle_lock: AsyncMutex::new(()),
            stats: Mutex::new(JobStats::default()),
        }
    }

    pub fn stats(&self) -> JobStats {
        self.stats.lock().clone()
    }

    /// Whether a cycle is running right now.
    pub fn is_running(&self) -> bool {
        self.cycle_lock.try_lock().is_err()
    }

    /// Entry point for the timer: skips when a cycle is already in flight.
    ///
    /// Returns `None` when skipped.
    pub async fn run_scheduled(&self) -> Option<Result<RefreshOutcome>> {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            warn!("Previous refresh cycle still running; skipping this tick");
            self.stats.lock().skipped_overlaps += 1;
            return None;
        };
        Some(self.run_cycle().await)
    }

    /// Entry point for manual refreshes: waits for an in-flight cycle, then
    /// runs a fresh one.
    pub async fn run_now(&self) -> Result<RefreshOutcome> {
        let _guard = self.cycle_lock.lock().await;
        self.run_cycle().await
    }

    async fn run_cycle(&self) -> Result<RefreshOutcome> {
        let started = Utc::now();
        info!("Report refresh cycle started");

        let fetcher = self.fetcher.clone();
        let result = self
            .cache
            .refresh_from_source(|| async move { fetcher.fetch_report().await })
            .await;

        let mut stats = self.stats.lock();
        stats.runs += 1;
        stats.last_run = Some(started);
        match &result {
            Ok(RefreshOutcome::Updated { rows }) => {
                stats.consecutive_failures = 0;
                stats.last_success = Some(Utc::now());
                stats.last_error = None;
                info!(rows, "Report refresh cycle finished");
            }
            Ok(RefreshOutcome::Skipped) => {
                stats.consecutive_failures += 1;
                stats.last_error = Some("fetch produced no data".to_string());
                warn!(
                    consecutive_failures = stats.consecutive_failures,
                    "Report refresh cycle produced no data"
                );
            }
            Err(e) => {
                stats.consecutive_failures += 1;
                stats.last_error = Some(e.to_string());
                error!(
                    error = %e,
                    consecutive_failures = stats.consecutive_failures,
                    "Report refresh cycle failed"
                );
            }
        }
        drop(stats);

        result
    }

    /// Run [`run_scheduled`](Self::run_scheduled) every `period` until
    /// `cancel` fires. The first run happens one period after the call.
    pub fn spawn_periodic(
        self: Arc<Self>,
        period: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_secs = period.as_secs(), "Periodic report refresh armed");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Periodic report refresh stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let _ = self.run_scheduled().await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FetchConfig, ReportScope};
    use crate::huntflow::fake::FakeApi;
    use crate::report::JsonFileReportStorage;
    use tempfile::TempDir;

    fn job_with(api: FakeApi, dir: &TempDir) -> Arc<ReportRefreshJob> {
        let fetcher = Arc::new(FunnelFetcher::new(
            Arc::new(api),
            FetchConfig {
                scope: ReportScope::All,
                ..FetchConfig::default()
            },
        ));
        let cache = Arc::new(ReportCache::new(Arc::new(JsonFileReportStorage::new(
            dir.path().join("report_cache.json"),
        ))));
        Arc::new(ReportRefreshJob::new(fetcher, cache))
    }

    #[tokio::test]
    async fn test_run_now_commits_and_resets_failures() {
        let dir = TempDir::new().unwrap();
        let job = job_with(FakeApi::with_defaults().vacancy(1, "QA"), &dir);

        let outcome = job.run_now().await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Updated { rows: 1 });
        assert_eq!(job.cache.get_rows()[0].vacancy_name, "QA");

        let stats = job.stats();
        assert_eq!(stats.runs, 1);
        assert_eq!(stats.consecutive_failures, 0);
        assert!(stats.last_success.is_some());
    }

    #[tokio::test]
    async fn test_failed_fetch_is_counted() {
        let dir = TempDir::new().unwrap();
        let mut api = FakeApi::with_defaults();
        api.accounts.clear();
        let job = job_with(api, &dir);

        assert_eq!(job.run_now().await.unwrap(), RefreshOutcome::Skipped);
        assert_eq!(job.run_now().await.unwrap(), RefreshOutcome::Skipped);
        assert_eq!(job.stats().consecutive_failures, 2);
        assert!(job.cache.is_empty());
    }

    #[tokio::test]
    async fn test_scheduled_run_skips_while_cycle_in_flight() {
        let dir = TempDir::new().unwrap();
        let job = job_with(FakeApi::with_defaults().vacancy(1, "QA"), &dir);

        let guard = job.cycle_lock.lock().await;
        assert!(job.is_running());
        assert!(job.run_scheduled().await.is_none());
        assert_eq!(job.stats().skipped_overlaps, 1);
        drop(guard);

        assert!(matches!(
            job.run_scheduled().await,
            Some(Ok(RefreshOutcome::Updated { rows: 1 }))
        ));
    }

    #[tokio::test]
    async fn test_periodic_runs_and_stops_on_cancel() {
        let dir = TempDir::new().unwrap();
        let job = job_with(FakeApi::with_defaults().vacancy(1, "QA"), &dir);
        let cancel = CancellationToken::new();

        let handle = job
            .clone()
            .spawn_periodic(Duration::from_millis(50), cancel.clone());
        assert_eq!(job.stats().runs, 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(job.stats().runs >= 1);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
