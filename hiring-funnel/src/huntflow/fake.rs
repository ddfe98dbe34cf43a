//! In-memory [`RecruitingApi`] used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::api::{PAGE_SIZE, RecruitingApi};
use super::models::{
    Account, ApplicantLog, ApplicantRef, Coworker, LogType, Page, Vacancy, VacancyStatus,
};
use crate::{Error, Result};

#[derive(Default)]
pub struct FakeApi {
    pub accounts: Vec<Account>,
    pub statuses: Vec<VacancyStatus>,
    pub vacancies: Vec<Vacancy>,
    /// (vacancy, status) -> all-time total
    pub totals: HashMap<(u64, u64), u64>,
    pub failing_totals: HashSet<(u64, u64)>,
    /// vacancy -> applicant ids
    pub applicants: HashMap<u64, Vec<u64>>,
    /// applicant -> log, newest first
    pub logs: HashMap<u64, Vec<ApplicantLog>>,
    pub failing_applicants: HashSet<u64>,
    /// vacancies whose applicant search fails
    pub failing_searches: HashSet<u64>,
    pub coworkers: Vec<Coworker>,
    pub coworkers_fail: bool,
    /// vacancy -> member coworker ids
    pub members: HashMap<u64, Vec<u64>>,
    pub vacancies_fail: bool,
    pub vacancy_page_calls: AtomicUsize,
}

impl FakeApi {
    /// One account and the default status names with ids 1..=6.
    pub fn with_defaults() -> Self {
        let names = [
            "Contact",
            "HR interview",
            "Client interview",
            "Final interview",
            "Offer",
            "Hired",
        ];
        Self {
            accounts: vec![Account {
                id: 1,
                name: Some("Acme".to_string()),
            }],
            statuses: names
                .iter()
                .zip(1u64..)
                .map(|(name, id)| VacancyStatus {
                    id,
                    name: name.to_string(),
                })
                .chain(std::iter::once(VacancyStatus {
                    id: 99,
                    name: "Rejected".to_string(),
                }))
                .collect(),
            ..Self::default()
        }
    }

    pub fn vacancy(mut self, id: u64, position: &str) -> Self {
        self.vacancies.push(Vacancy {
            id,
            position: Some(position.to_string()),
        });
        self
    }
}

pub fn status_log(status: u64, created: &str) -> ApplicantLog {
    ApplicantLog {
        log_type: LogType::Status,
        status: Some(status),
        created: Some(created.to_string()),
    }
}

pub fn comment_log(created: &str) -> ApplicantLog {
    ApplicantLog {
        log_type: LogType::Comment,
        status: None,
        created: Some(created.to_string()),
    }
}

fn paginate<T: Clone>(all: &[T], page: u32) -> Page<T> {
    let size = PAGE_SIZE as usize;
    let total_pages = all.len().div_ceil(size).max(1) as u32;
    let start = (page.saturating_sub(1) as usize) * size;
    let items = all.iter().skip(start).take(size).cloned().collect();
    Page {
        items,
        page: Some(page),
        total_pages: Some(total_pages),
        total_items: Some(all.len() as u64),
    }
}

#[async_trait]
impl RecruitingApi for FakeApi {
    async fn accounts(&self) -> Result<Vec<Account>> {
        Ok(self.accounts.clone())
    }

    async fn vacancy_statuses(&self, _account_id: u64) -> Result<Vec<VacancyStatus>> {
        Ok(self.statuses.clone())
    }

    async fn open_vacancies_page(&self, _account_id: u64, page: u32) -> Result<Page<Vacancy>> {
        self.vacancy_page_calls.fetch_add(1, Ordering::SeqCst);
        if self.vacancies_fail {
            return Err(Error::api(503, "vacancies unavailable"));
        }
        Ok(paginate(&self.vacancies, page))
    }

    async fn applicant_total(
        &self,
        _account_id: u64,
        vacancy_id: u64,
        status_id: u64,
    ) -> Result<u64> {
        if self.failing_totals.contains(&(vacancy_id, status_id)) {
            return Err(Error::api(500, "search failed"));
        }
        Ok(self
            .totals
            .get(&(vacancy_id, status_id))
            .copied()
            .unwrap_or(0))
    }

    async fn applicants_page(
        &self,
        _account_id: u64,
        vacancy_id: u64,
        page: u32,
    ) -> Result<Page<ApplicantRef>> {
        if self.failing_searches.contains(&vacancy_id) {
            return Err(Error::api(502, "search unavailable"));
        }
        let ids: Vec<ApplicantRef> = self
            .applicants
            .get(&vacancy_id)
            .map(|ids| ids.iter().map(|id| ApplicantRef { id: *id }).collect())
            .unwrap_or_default();
        Ok(paginate(&ids, page))
    }

    async fn applicant_logs_page(
        &self,
        _account_id: u64,
        applicant_id: u64,
        _vacancy_id: u64,
        page: u32,
    ) -> Result<Page<ApplicantLog>> {
        if self.failing_applicants.contains(&applicant_id) {
            return Err(Error::api(500, "log unavailable"));
        }
        let logs = self.logs.get(&applicant_id).cloned().unwrap_or_default();
        Ok(paginate(&logs, page))
    }

    async fn coworkers_page(&self, _account_id: u64, page: u32) -> Result<Page<Coworker>> {
        if self.coworkers_fail {
            return Err(Error::api(403, "forbidden"));
        }
        Ok(paginate(&self.coworkers, page))
    }

    async fn vacancy_members_page(
        &self,
        _account_id: u64,
        vacancy_id: u64,
        page: u32,
    ) -> Result<Page<Coworker>> {
        if self.coworkers_fail {
            return Err(Error::api(403, "forbidden"));
        }
        let members: Vec<Coworker> = self
            .members
            .get(&vacancy_id)
            .map(|ids| ids.iter().map(|id| Coworker { id: *id, name: None }).collect())
            .unwrap_or_default();
        Ok(paginate(&members, page))
    }
}
