//! Builds one [`Report`] from the remote API.
//!
//! Per vacancy the fetcher collects two numbers for every funnel stage:
//!
//! - **total**: all-time number of applicants that ever held the mapped
//!   status, read from the search endpoint's `total_items`.
//! - **current**: applicants that factually reached the stage within the
//!   trailing window. A status change counts only when the log entry right
//!   after it is a recruiter comment. Reaching a stage credits every earlier
//!   stage too, once per applicant.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use tracing::{debug, error, info, instrument, warn};

use super::model::{Coworkers, FunnelStage, Report, StageCount, VacancyFunnelRow};
use crate::config::FetchConfig;
use crate::huntflow::RecruitingApi;
use crate::huntflow::models::{ApplicantLog, LogType, Vacancy, VacancyStatus};
use crate::{Error, Result};

/// Remote status ids resolved for the tracked stages of one account.
#[derive(Debug, Clone, Default)]
struct StageStatuses {
    by_stage: [Option<u64>; FunnelStage::COUNT],
    by_id: HashMap<u64, FunnelStage>,
}

impl StageStatuses {
    fn resolve(statuses: &[VacancyStatus], config: &FetchConfig) -> Self {
        let mut resolved = Self::default();
        for status in statuses {
            if let Some(stage) = config.stage_mapping.stage_for(&status.name) {
                resolved.by_stage[stage.index()] = Some(status.id);
                resolved.by_id.insert(status.id, stage);
            }
        }

        for stage in FunnelStage::ALL {
            if resolved.by_stage[stage.index()].is_none() {
                warn!(
                    stage = %stage,
                    status = config.stage_mapping.status_name(stage),
                    "Remote account has no status for funnel stage; counts stay 0"
                );
            }
        }
        resolved
    }

    fn status_id(&self, stage: FunnelStage) -> Option<u64> {
        self.by_stage[stage.index()]
    }

    fn stage(&self, status_id: u64) -> Option<FunnelStage> {
        self.by_id.get(&status_id).copied()
    }
}

/// Stages an applicant factually reached inside `[now - window, now]`.
///
/// `logs` must be in chronological order.
fn weekly_stages(
    logs: &[ApplicantLog],
    statuses: &StageStatuses,
    now: DateTime<Utc>,
    window: chrono::Duration,
) -> BTreeSet<FunnelStage> {
    let since = now - window;
    let mut reached = BTreeSet::new();

    for (i, entry) in logs.iter().enumerate() {
        if entry.log_type != LogType::Status {
            continue;
        }
        let Some(stage) = entry.status.and_then(|id| statuses.stage(id)) else {
            continue;
        };
        let Some(created) = entry.created.as_deref().and_then(parse_timestamp) else {
            continue;
        };
        if created < since || created > now {
            continue;
        }
        let confirmed = logs
            .get(i + 1)
            .is_some_and(|next| next.log_type == LogType::Comment);
        if confirmed {
            reached.extend(stage.up_to().iter().copied());
        }
    }

    reached
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Funnel data fetcher over any [`RecruitingApi`].
pub struct FunnelFetcher {
    api: Arc<dyn RecruitingApi>,
    config: FetchConfig,
}

impl FunnelFetcher {
    pub fn new(api: Arc<dyn RecruitingApi>, config: FetchConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Run one cycle against the current time.
    ///
    /// Returns `None` when the cycle fails as a whole; the error is logged.
    pub async fn fetch_report(&self) -> Option<Report> {
        self.fetch_report_at(Utc::now()).await
    }

    /// Same as [`fetch_report`](Self::fetch_report) with an explicit "now".
    pub async fn fetch_report_at(&self, now: DateTime<Utc>) -> Option<Report> {
        match self.try_fetch(now).await {
            Ok(report) => {
                info!(rows = report.rows.len(), "Funnel report fetched");
                Some(report)
            }
            Err(e) if e.requires_relogin() => {
                error!(error = %e, "Funnel fetch cycle failed; remote credential needs to be reissued");
                None
            }
            Err(e) if e.is_transient() => {
                warn!(error = %e, "Funnel fetch cycle failed; retrying on the next cycle");
                None
            }
            Err(e) => {
                error!(error = %e, "Funnel fetch cycle failed; no data produced");
                None
            }
        }
    }

    /// One full cycle; any error aborts it without a partial report.
    #[instrument(skip(self), level = "debug")]
    pub async fn try_fetch(&self, now: DateTime<Utc>) -> Result<Report> {
        let account = self
            .api
            .accounts()
            .await?
            .into_iter()
            .next()
            .ok_or(Error::NoAccounts)?;
        debug!(account_id = account.id, name = ?account.name, "Using account");

        let statuses = self.api.vacancy_statuses(account.id).await?;
        let statuses = StageStatuses::resolve(&statuses, &self.config);

        let vacancies: Vec<Vacancy> = self
            .open_vacancies(account.id)
            .await?
            .into_iter()
            .filter(|v| self.config.in_scope(v.title()))
            .collect();
        info!(vacancies = vacancies.len(), "Building funnel rows");

        let account_id = account.id;
        let statuses = &statuses;
        let rows: Vec<VacancyFunnelRow> = stream::iter(vacancies)
            .map(|vacancy| async move { self.build_row(account_id, &vacancy, statuses, now).await })
            .buffered(self.config.vacancy_concurrency.max(1))
            .collect()
            .await;

        let coworkers = self.coworkers(account.id).await;

        let mut report = Report::new(rows, coworkers);
        report.generated_at = now;
        Ok(report)
    }

    async fn open_vacancies(&self, account_id: u64) -> Result<Vec<Vacancy>> {
        let mut vacancies = Vec::new();
        let mut page = 1;
        loop {
            let batch = self.api.open_vacancies_page(account_id, page).await?;
            let last = batch.is_last(page);
            vacancies.extend(batch.items);
            if last {
                break;
            }
            page += 1;
        }
        Ok(vacancies)
    }

    async fn build_row(
        &self,
        account_id: u64,
        vacancy: &Vacancy,
        statuses: &StageStatuses,
        now: DateTime<Utc>,
    ) -> VacancyFunnelRow {
        let name = vacancy.title();
        let mut row = VacancyFunnelRow::new(name, self.config.is_priority(name));

        let totals = self.historical_totals(account_id, vacancy.id, statuses).await;
        let current = self
            .weekly_counts(account_id, vacancy.id, statuses, now)
            .await;

        for stage in FunnelStage::ALL {
            *row.stage_counts.get_mut(stage) = StageCount {
                total: totals[stage.index()],
                current: current[stage.index()],
            };
        }
        row.members = self.vacancy_members(account_id, vacancy.id).await;

        debug!(vacancy = name, "Row built");
        row
    }

    async fn historical_totals(
        &self,
        account_id: u64,
        vacancy_id: u64,
        statuses: &StageStatuses,
    ) -> [u64; FunnelStage::COUNT] {
        let lookups = FunnelStage::ALL.map(|stage| async move {
            let Some(status_id) = statuses.status_id(stage) else {
                return 0;
            };
            match self
                .api
                .applicant_total(account_id, vacancy_id, status_id)
                .await
            {
                Ok(total) => total,
                Err(e) => {
                    warn!(vacancy_id, stage = %stage, error = %e, "Total lookup failed; counting 0");
                    0
                }
            }
        });

        let totals = futures::future::join_all(lookups).await;
        let mut out = [0; FunnelStage::COUNT];
        for (slot, total) in out.iter_mut().zip(totals) {
            *slot = total;
        }
        out
    }

    async fn weekly_counts(
        &self,
        account_id: u64,
        vacancy_id: u64,
        statuses: &StageStatuses,
        now: DateTime<Utc>,
    ) -> [u64; FunnelStage::COUNT] {
        let applicants = match self.applicant_ids(account_id, vacancy_id).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(vacancy_id, error = %e, "Applicant search failed; weekly counts stay 0");
                return [0; FunnelStage::COUNT];
            }
        };

        let per_applicant: Vec<BTreeSet<FunnelStage>> = stream::iter(applicants)
            .map(|applicant_id| async move {
                match self.applicant_log(account_id, applicant_id, vacancy_id).await {
                    Ok(logs) => weekly_stages(&logs, statuses, now, self.config.weekly_window),
                    Err(e) => {
                        debug!(applicant_id, vacancy_id, error = %e, "Skipping applicant log");
                        BTreeSet::new()
                    }
                }
            })
            .buffer_unordered(self.config.applicant_concurrency.max(1))
            .collect()
            .await;

        let mut counts = [0; FunnelStage::COUNT];
        for stage in per_applicant.into_iter().flatten() {
            counts[stage.index()] += 1;
        }
        counts
    }

    async fn applicant_ids(&self, account_id: u64, vacancy_id: u64) -> Result<Vec<u64>> {
        let mut ids = Vec::new();
        let mut page = 1;
        loop {
            let batch = self
                .api
                .applicants_page(account_id, vacancy_id, page)
                .await?;
            let last = batch.is_last(page);
            ids.extend(batch.items.into_iter().map(|a| a.id));
            if last {
                break;
            }
            page += 1;
        }
        Ok(ids)
    }

    /// Full log in chronological order (the API pages newest first).
    async fn applicant_log(
        &self,
        account_id: u64,
        applicant_id: u64,
        vacancy_id: u64,
    ) -> Result<Vec<ApplicantLog>> {
        let mut logs = Vec::new();
        let mut page = 1;
        loop {
            let batch = self
                .api
                .applicant_logs_page(account_id, applicant_id, vacancy_id, page)
                .await?;
            let last = batch.is_last(page);
            logs.extend(batch.items);
            if last {
                break;
            }
            page += 1;
        }
        logs.reverse();
        Ok(logs)
    }

    async fn vacancy_members(&self, account_id: u64, vacancy_id: u64) -> Vec<u64> {
        let mut members = Vec::new();
        let mut page = 1;
        loop {
            match self
                .api
                .vacancy_members_page(account_id, vacancy_id, page)
                .await
            {
                Ok(batch) => {
                    let last = batch.is_last(page);
                    members.extend(batch.items.into_iter().map(|c| c.id));
                    if last {
                        break;
                    }
                    page += 1;
                }
                Err(e) => {
                    debug!(vacancy_id, error = %e, "Member lookup failed; row has no recruiters");
                    return Vec::new();
                }
            }
        }
        members.sort_unstable();
        members.dedup();
        members
    }

    async fn coworkers(&self, account_id: u64) -> Coworkers {
        let mut coworkers = Coworkers::new();
        let mut page = 1;
        loop {
            match self.api.coworkers_page(account_id, page).await {
                Ok(batch) => {
                    let last = batch.is_last(page);
                    coworkers.extend(
                        batch
                            .items
                            .into_iter()
                            .filter_map(|c| c.name.map(|name| (c.id, name))),
                    );
                    if last {
                        break;
                    }
                    page += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Coworker lookup failed; report carries no coworker names");
                    return Coworkers::new();
                }
            }
        }
        coworkers
    }
}
