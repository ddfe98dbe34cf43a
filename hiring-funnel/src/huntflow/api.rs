//! The slice of the recruiting API the report depends on.

use async_trait::async_trait;

use super::models::{Account, ApplicantLog, ApplicantRef, Coworker, Page, Vacancy, VacancyStatus};
use crate::Result;

/// Page size used for every paginated endpoint.
pub const PAGE_SIZE: u32 = 100;

#[async_trait]
pub trait RecruitingApi: Send + Sync {
    /// `GET /accounts`
    async fn accounts(&self) -> Result<Vec<Account>>;

    /// `GET /accounts/{id}/vacancies/statuses`
    async fn vacancy_statuses(&self, account_id: u64) -> Result<Vec<VacancyStatus>>;

    /// `GET /accounts/{id}/vacancies?opened=true&page=&count=`
    async fn open_vacancies_page(&self, account_id: u64, page: u32) -> Result<Page<Vacancy>>;

    /// All-time number of applicants that ever held `status_id` on the vacancy.
    ///
    /// `GET /accounts/{id}/applicants/search?vacancy=&status=&count=1&only_current_status=false`
    async fn applicant_total(&self, account_id: u64, vacancy_id: u64, status_id: u64)
    -> Result<u64>;

    /// `GET /accounts/{id}/applicants/search?vacancy=&page=&count=&only_current_status=false`
    async fn applicants_page(
        &self,
        account_id: u64,
        vacancy_id: u64,
        page: u32,
    ) -> Result<Page<ApplicantRef>>;

    /// `GET /accounts/{id}/applicants/{id}/logs?vacancy=&page=` (newest first)
    async fn applicant_logs_page(
        &self,
        account_id: u64,
        applicant_id: u64,
        vacancy_id: u64,
        page: u32,
    ) -> Result<Page<ApplicantLog>>;

    /// `GET /accounts/{id}/coworkers?page=&count=`
    async fn coworkers_page(&self, account_id: u64, page: u32) -> Result<Page<Coworker>>;

    /// Coworkers with access to one vacancy.
    ///
    /// `GET /accounts/{id}/coworkers?vacancy_id=&page=&count=`
    async fn vacancy_members_page(
        &self,
        account_id: u64,
        vacancy_id: u64,
        page: u32,
    ) -> Result<Page<Coworker>>;
}
