//! reqwest-backed [`RecruitingApi`] implementation.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::api::{PAGE_SIZE, RecruitingApi};
use super::models::{Account, ApplicantLog, ApplicantRef, Coworker, Page, Vacancy, VacancyStatus};
use crate::credentials::{AuthHeader, CredentialError, CredentialStore};
use crate::{Error, Result};

type Query = Vec<(&'static str, String)>;

/// Huntflow v2 REST client authenticating through the [`CredentialStore`].
///
/// A 401 triggers one credential recovery followed by a single re-issue of
/// the request with the new token; nothing else is retried here.
pub struct HuntflowClient {
    http: Client,
    api_root: String,
    credentials: Arc<CredentialStore>,
}

impl HuntflowClient {
    pub fn new(http: Client, base_url: &str, credentials: Arc<CredentialStore>) -> Self {
        Self {
            http,
            api_root: format!("{}/v2", base_url.trim_end_matches('/')),
            credentials,
        }
    }

    async fn send(&self, url: &str, query: &Query, auth: &AuthHeader) -> Result<Response> {
        let response = self
            .http
            .get(url)
            .query(query)
            .header(AuthHeader::NAME, auth.value())
            .send()
            .await?;
        Ok(response)
    }

    #[instrument(skip(self, query), level = "debug")]
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: Query) -> Result<T> {
        if !self.credentials.is_configured() {
            return Err(CredentialError::NotConfigured.into());
        }

        let url = format!("{}{}", self.api_root, path);
        let auth = self.credentials.get_auth_header();
        let mut response = self.send(&url, &query, &auth).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(path, "Access token rejected by remote API");
            self.credentials
                .recover_from_unauthorized(auth.access_token())
                .await?;

            let auth = self.credentials.get_auth_header();
            response = self.send(&url, &query, &auth).await?;
            if response.status() == StatusCode::UNAUTHORIZED {
                return Err(CredentialError::Auth(format!(
                    "{path} rejected the refreshed access token"
                ))
                .into());
            }
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), body));
        }

        let body = response.json::<T>().await?;
        debug!(path, "Remote call succeeded");
        Ok(body)
    }
}

fn page_query(page: u32) -> Query {
    vec![("page", page.to_string()), ("count", PAGE_SIZE.to_string())]
}

#[async_trait]
impl RecruitingApi for HuntflowClient {
    async fn accounts(&self) -> Result<Vec<Account>> {
        let page: Page<Account> = self.get_json("/accounts", Vec::new()).await?;
        Ok(page.items)
    }

    async fn vacancy_statuses(&self, account_id: u64) -> Result<Vec<VacancyStatus>> {
        let page: Page<VacancyStatus> = self
            .get_json(
                &format!("/accounts/{account_id}/vacancies/statuses"),
                Vec::new(),
            )
            .await?;
        Ok(page.items)
    }

    async fn open_vacancies_page(&self, account_id: u64, page: u32) -> Result<Page<Vacancy>> {
        let mut query = page_query(page);
        query.push(("opened", "true".to_string()));
        self.get_json(&format!("/accounts/{account_id}/vacancies"), query)
            .await
    }

    async fn applicant_total(
        &self,
        account_id: u64,
        vacancy_id: u64,
        status_id: u64,
    ) -> Result<u64> {
        let query = vec![
            ("vacancy", vacancy_id.to_string()),
            ("status", status_id.to_string()),
            ("count", "1".to_string()),
            ("only_current_status", "false".to_string()),
        ];
        let page: Page<ApplicantRef> = self
            .get_json(&format!("/accounts/{account_id}/applicants/search"), query)
            .await?;
        Ok(page.total_items.unwrap_or(0))
    }

    async fn applicants_page(
        &self,
        account_id: u64,
        vacancy_id: u64,
        page: u32,
    ) -> Result<Page<ApplicantRef>> {
        let mut query = page_query(page);
        query.push(("vacancy", vacancy_id.to_string()));
        query.push(("only_current_status", "false".to_string()));
        self.get_json(&format!("/accounts/{account_id}/applicants/search"), query)
            .await
    }

    async fn applicant_logs_page(
        &self,
        account_id: u64,
        applicant_id: u64,
        vacancy_id: u64,
        page: u32,
    ) -> Result<Page<ApplicantLog>> {
        let mut query = page_query(page);
        query.push(("vacancy", vacancy_id.to_string()));
        self.get_json(
            &format!("/accounts/{account_id}/applicants/{applicant_id}/logs"),
            query,
        )
        .await
    }

    async fn coworkers_page(&self, account_id: u64, page: u32) -> Result<Page<Coworker>> {
        self.get_json(&format!("/accounts/{account_id}/coworkers"), page_query(page))
            .await
    }

    async fn vacancy_members_page(
        &self,
        account_id: u64,
        vacancy_id: u64,
        page: u32,
    ) -> Result<Page<Coworker>> {
        let mut query = page_query(page);
        query.push(("vacancy_id", vacancy_id.to_string()));
        self.get_json(&format!("/accounts/{account_id}/coworkers"), query)
            .await
    }
}
