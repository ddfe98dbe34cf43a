//! Report cache.
//!
//! Holds the last committed report and the per-vacancy comments. Readers
//! clone an `Arc` snapshot under a short `RwLock`; refresh cycles and comment
//! edits run their whole read-modify-write sequence under one async mutex.
//! Every write is persisted before the new snapshot becomes visible.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::comments::CommentArchive;
use super::model::{Coworkers, Report, VacancyFunnelRow};
use crate::utils::fs::write_atomic_with_backup;
use crate::{Error, Result};

/// Offset the dashboard displays timestamps in (UTC+3).
pub const DISPLAY_OFFSET_SECS: i32 = 3 * 3600;

/// Committed cache state, also the on-disk layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedReport {
    #[serde(rename = "report_data", default)]
    pub rows: Vec<VacancyFunnelRow>,
    #[serde(default)]
    pub coworkers: Coworkers,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl CachedReport {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Durable backend for [`ReportCache`].
#[async_trait]
pub trait ReportStorage: Send + Sync {
    /// `Ok(None)` when nothing was stored yet, `Err(MalformedCache)` when
    /// the stored data cannot be read back.
    async fn load(&self) -> Result<Option<CachedReport>>;

    async fn save(&self, report: &CachedReport) -> Result<()>;
}

/// JSON file storage using the atomic write + `.bak` helper.
pub struct JsonFileReportStorage {
    path: PathBuf,
}

impl JsonFileReportStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReportStorage for JsonFileReportStorage {
    async fn load(&self) -> Result<Option<CachedReport>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io_path("reading", &self.path, e)),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| Error::MalformedCache {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }

    async fn save(&self, report: &CachedReport) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(report)?;
        write_atomic_with_backup(&self.path, &bytes).await
    }
}

/// Result of [`ReportCache::refresh_from_source`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New data committed.
    Updated { rows: usize },
    /// The source produced nothing; previous data kept.
    Skipped,
}

/// In-memory report snapshot with durable write-through.
///
/// Lock order: `write_lock` is held for the whole fetch, so a 401 during a
/// refresh takes [`CredentialStore`](crate::credentials::CredentialStore)'s
/// update lock inside it. Nothing may take the cache lock while holding the
/// credential lock. Comment edits wait for an in-flight refresh.
pub struct ReportCache {
    snapshot: RwLock<Arc<CachedReport>>,
    write_lock: Mutex<()>,
    storage: Arc<dyn ReportStorage>,
    archive: Option<Arc<CommentArchive>>,
}

impl ReportCache {
    pub fn new(storage: Arc<dyn ReportStorage>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(CachedReport::default())),
            write_lock: Mutex::new(()),
            storage,
            archive: None,
        }
    }

    /// Also record edits into `archive` and fall back to it for rows
    /// that arrive without a comment.
    pub fn with_comment_archive(mut self, archive: Arc<CommentArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Replace the in-memory state with what storage holds.
    ///
    /// Missing data starts empty; unreadable data is logged and reset to
    /// empty. Never fails.
    pub async fn load(&self) {
        let _guard = self.write_lock.lock().await;

        let loaded = match self.storage.load().await {
            Ok(Some(report)) => {
                info!(rows = report.rows.len(), "Loaded report cache");
                report
            }
            Ok(None) => {
                info!("No report cache on disk; starting empty");
                CachedReport::default()
            }
            Err(e) => {
                error!(error = %e, "Report cache unreadable; starting empty");
                CachedReport::default()
            }
        };

        *self.snapshot.write() = Arc::new(loaded);
    }

    /// Current committed state.
    pub fn snapshot(&self) -> Arc<CachedReport> {
        self.snapshot.read().clone()
    }

    pub fn get_rows(&self) -> Vec<VacancyFunnelRow> {
        self.snapshot().rows.clone()
    }

    pub fn get_coworkers(&self) -> Coworkers {
        self.snapshot().coworkers.clone()
    }

    pub fn get_last_updated(&self) -> Option<DateTime<Utc>> {
        self.snapshot().last_updated
    }

    /// Last update time shifted to the dashboard's display offset.
    pub fn get_last_updated_local(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(DISPLAY_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
        self.get_last_updated().map(|ts| ts.with_timezone(&offset))
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Run `fetch` and commit its report, carrying comments forward by
    /// vacancy name.
    ///
    /// When `fetch` yields nothing the cache is left untouched. A storage
    /// failure keeps the previous state and is returned.
    #[instrument(skip_all)]
    pub async fn refresh_from_source<F, Fut>(&self, fetch: F) -> Result<RefreshOutcome>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Option<Report>> + Send,
    {
        let _guard = self.write_lock.lock().await;

        let current = self.snapshot();
        let prior_comments: HashMap<&str, &str> = current
            .rows
            .iter()
            .filter(|row| !row.comment.is_empty())
            .map(|row| (row.vacancy_name.as_str(), row.comment.as_str()))
            .collect();

        let report = match fetch().await {
            Some(report) if !report.is_empty() => report,
            _ => {
                warn!("Refresh produced no data; keeping previous report");
                return Ok(RefreshOutcome::Skipped);
            }
        };

        let mut rows = report.rows;
        for row in &mut rows {
            row.comment = match prior_comments.get(row.vacancy_name.as_str()) {
                Some(comment) => (*comment).to_string(),
                None => self
                    .archive
                    .as_ref()
                    .and_then(|archive| archive.get(&row.vacancy_name))
                    .unwrap_or_default(),
            };
        }

        let next = CachedReport {
            rows,
            coworkers: report.coworkers,
            last_updated: Some(Utc::now()),
        };
        self.storage.save(&next).await?;

        let count = next.rows.len();
        *self.snapshot.write() = Arc::new(next);
        info!(rows = count, "Report cache updated");
        Ok(RefreshOutcome::Updated { rows: count })
    }

    /// Set the comment of the row named `vacancy_name`.
    ///
    /// Returns `Ok(false)` without writing anything when no row has that
    /// exact name.
    #[instrument(skip(self, comment))]
    pub async fn update_comment(&self, vacancy_name: &str, comment: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let current = self.snapshot();
        let Some(index) = current
            .rows
            .iter()
            .position(|row| row.vacancy_name == vacancy_name)
        else {
            debug!("No row for comment update");
            return Ok(false);
        };

        let mut next = CachedReport::clone(&current);
        next.rows[index].comment = comment.to_string();
        next.last_updated = Some(Utc::now());
        self.storage.save(&next).await?;
        *self.snapshot.write() = Arc::new(next);

        if let Some(archive) = &self.archive
            && let Err(e) = archive.record(vacancy_name, comment).await
        {
            warn!(error = %e, "Comment saved but archiving it failed");
        }

        info!("Comment updated");
        Ok(true)
    }
}
