//! End-to-end report flow: fetch, comment, refresh, restart.

use std::sync::Arc;

use async_trait::async_trait;
use hiring_funnel::config::{AppConfig, ReportScope};
use hiring_funnel::credentials::{
    CredentialError, CredentialPair, CredentialStore, FileCredentialPersistence, TokenRefresher,
};
use hiring_funnel::huntflow::RecruitingApi;
use hiring_funnel::huntflow::models::{
    Account, ApplicantLog, ApplicantRef, Coworker, Page, Vacancy, VacancyStatus,
};
use hiring_funnel::report::{CommentArchive, JsonFileReportStorage, RefreshOutcome};
use hiring_funnel::services::ServiceContainer;
use parking_lot::Mutex;
use tempfile::TempDir;

/// Account with a mutable list of open vacancies and no applicants.
struct VacancyBoard {
    open: Mutex<Vec<&'static str>>,
}

impl VacancyBoard {
    fn new(open: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            open: Mutex::new(open.to_vec()),
        })
    }

    fn set_open(&self, open: &[&'static str]) {
        *self.open.lock() = open.to_vec();
    }
}

fn single_page<T>(items: Vec<T>) -> Page<T> {
    let total = items.len() as u64;
    Page {
        items,
        page: Some(1),
        total_pages: Some(1),
        total_items: Some(total),
    }
}

#[async_trait]
impl RecruitingApi for VacancyBoard {
    async fn accounts(&self) -> hiring_funnel::Result<Vec<Account>> {
        Ok(vec![Account { id: 1, name: None }])
    }

    async fn vacancy_statuses(&self, _account_id: u64) -> hiring_funnel::Result<Vec<VacancyStatus>> {
        Ok(vec![VacancyStatus {
            id: 1,
            name: "Contact".to_string(),
        }])
    }

    async fn open_vacancies_page(
        &self,
        _account_id: u64,
        _page: u32,
    ) -> hiring_funnel::Result<Page<Vacancy>> {
        let vacancies = self
            .open
            .lock()
            .iter()
            .zip(1u64..)
            .map(|(name, id)| Vacancy {
                id,
                position: Some(name.to_string()),
            })
            .collect();
        Ok(single_page(vacancies))
    }

    async fn applicant_total(&self, _: u64, vacancy_id: u64, _: u64) -> hiring_funnel::Result<u64> {
        Ok(vacancy_id * 10)
    }

    async fn applicants_page(&self, _: u64, _: u64, _: u32) -> hiring_funnel::Result<Page<ApplicantRef>> {
        Ok(single_page(Vec::new()))
    }

    async fn applicant_logs_page(
        &self,
        _: u64,
        _: u64,
        _: u64,
        _: u32,
    ) -> hiring_funnel::Result<Page<ApplicantLog>> {
        Ok(single_page(Vec::new()))
    }

    async fn coworkers_page(&self, _: u64, _: u32) -> hiring_funnel::Result<Page<Coworker>> {
        Ok(single_page(vec![Coworker {
            id: 3,
            name: Some("Recruiter".to_string()),
        }]))
    }

    async fn vacancy_members_page(&self, _: u64, _: u64, _: u32) -> hiring_funnel::Result<Page<Coworker>> {
        Ok(single_page(vec![Coworker { id: 3, name: None }]))
    }
}

struct UnusedRefresher;

#[async_trait]
impl TokenRefresher for UnusedRefresher {
    async fn exchange(&self, _refresh_token: &str) -> Result<CredentialPair, CredentialError> {
        Err(CredentialError::Auth("refresh not expected".to_string()))
    }
}

async fn start(dir: &TempDir, board: Arc<VacancyBoard>) -> ServiceContainer {
    let mut config = AppConfig::default();
    config.fetch.scope = ReportScope::All;
    config.fetch.priority_vacancies.insert("Head of Sales".to_string());
    config.cache_file = dir.path().join("report_cache.json");
    config.comments_file = Some(dir.path().join("comments.json"));

    let credentials = Arc::new(
        CredentialStore::load(
            Arc::new(FileCredentialPersistence::new(dir.path().join("tokens.json"))),
            Arc::new(UnusedRefresher),
            CredentialPair::new("access", "refresh"),
        )
        .await,
    );
    let archive = match &config.comments_file {
        Some(path) => Some(Arc::new(CommentArchive::open(path).await)),
        None => None,
    };
    let storage = Arc::new(JsonFileReportStorage::new(&config.cache_file));

    let services = ServiceContainer::with_components(config, credentials, board, storage, archive);
    services.initialize().await.unwrap();
    services
}

#[tokio::test]
async fn comments_survive_refreshes_and_restarts() {
    let dir = TempDir::new().unwrap();
    let board = VacancyBoard::new(&["Designer", "Head of Sales"]);

    let services = start(&dir, board.clone()).await;
    let rows = services.cache.get_rows();
    let names: Vec<_> = rows.iter().map(|r| r.vacancy_name.as_str()).collect();
    assert_eq!(names, ["Head of Sales", "Designer"]);
    assert_eq!(services.cache.get_coworkers().get(&3).map(String::as_str), Some("Recruiter"));

    assert!(services.cache.update_comment("Designer", "final round Friday").await.unwrap());
    assert!(!services.cache.update_comment("Unknown", "x").await.unwrap());

    // New vacancy appears; the existing comment is carried forward.
    board.set_open(&["Designer", "Head of Sales", "QA"]);
    let outcome = services.refresh_job.run_now().await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Updated { rows: 3 });
    let designer = services
        .cache
        .get_rows()
        .into_iter()
        .find(|r| r.vacancy_name == "Designer")
        .unwrap();
    assert_eq!(designer.comment, "final round Friday");

    // Vacancy drops out, then returns: the archive restores its comment.
    board.set_open(&["Head of Sales", "QA"]);
    services.refresh_job.run_now().await.unwrap();
    board.set_open(&["Head of Sales", "QA", "Designer"]);
    services.refresh_job.run_now().await.unwrap();
    let before_restart = services.cache.snapshot();
    services.shutdown().await;

    // Restart against the same files: identical rows before any refresh lands.
    let storage = JsonFileReportStorage::new(dir.path().join("report_cache.json"));
    let reloaded = hiring_funnel::report::ReportCache::new(Arc::new(storage));
    reloaded.load().await;
    assert_eq!(*reloaded.snapshot(), *before_restart);
    let designer = reloaded
        .get_rows()
        .into_iter()
        .find(|r| r.vacancy_name == "Designer")
        .unwrap();
    assert_eq!(designer.comment, "final round Friday");
}

#[tokio::test]
async fn failed_cycle_keeps_last_good_report() {
    let dir = TempDir::new().unwrap();
    let board = VacancyBoard::new(&["Designer"]);
    let services = start(&dir, board.clone()).await;
    let before = services.cache.snapshot();

    board.set_open(&[]);
    let outcome = services.refresh_job.run_now().await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Skipped);
    assert_eq!(*services.cache.snapshot(), *before);
    assert_eq!(services.refresh_job.stats().consecutive_failures, 1);

    services.shutdown().await;
}
