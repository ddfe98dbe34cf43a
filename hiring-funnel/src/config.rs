//! Application configuration.
//!
//! Everything comes from environment variables (a `.env` file is loaded
//! first by `main`). Every value has a default so the service starts with an
//! empty environment; it just has nothing to fetch without tokens.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::credentials::CredentialPair;
use crate::report::FunnelStage;
use crate::{Error, Result};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_BASE_URL: &str = "https://api.huntflow.ru";
const DEFAULT_TOKEN_FILE: &str = "cache/tokens.json";
const DEFAULT_CACHE_FILE: &str = "cache/report_cache.json";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 3600;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_VACANCY_CONCURRENCY: usize = 4;
const DEFAULT_APPLICANT_CONCURRENCY: usize = 8;

/// Remote status names for each stage, in funnel order.
const DEFAULT_STATUS_NAMES: [&str; FunnelStage::COUNT] = [
    "Contact",
    "HR interview",
    "Client interview",
    "Final interview",
    "Offer",
    "Hired",
];

/// Which vacancies get a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportScope {
    /// Every open vacancy.
    All,
    /// Only vacancies named in the priority set.
    #[default]
    PriorityOnly,
}

impl FromStr for ReportScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "priority" | "priority_only" => Ok(Self::PriorityOnly),
            other => Err(Error::config(format!("unknown REPORT_SCOPE '{other}'"))),
        }
    }
}

/// Maps remote recruitment status names onto the fixed funnel stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageMapping {
    status_names: [String; FunnelStage::COUNT],
}

impl StageMapping {
    /// Parse a `;`-separated list with exactly one name per stage.
    pub fn parse(raw: &str) -> Result<Self> {
        let names: Vec<String> = raw
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let status_names: [String; FunnelStage::COUNT] = names.try_into().map_err(|names: Vec<String>| {
            Error::config(format!(
                "FUNNEL_STATUS_NAMES needs {} names, got {}",
                FunnelStage::COUNT,
                names.len()
            ))
        })?;
        Ok(Self { status_names })
    }

    /// Remote status name tracked for `stage`.
    pub fn status_name(&self, stage: FunnelStage) -> &str {
        &self.status_names[stage.index()]
    }

    /// Stage tracked by the remote status called `name`, if any.
    pub fn stage_for(&self, name: &str) -> Option<FunnelStage> {
        FunnelStage::ALL
            .into_iter()
            .find(|stage| self.status_name(*stage) == name)
    }
}

impl Default for StageMapping {
    fn default() -> Self {
        Self {
            status_names: DEFAULT_STATUS_NAMES.map(String::from),
        }
    }
}

/// Settings for one fetch cycle.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub scope: ReportScope,
    pub priority_vacancies: BTreeSet<String>,
    pub stage_mapping: StageMapping,
    pub vacancy_concurrency: usize,
    pub applicant_concurrency: usize,
    /// Trailing window for "current" counts.
    pub weekly_window: chrono::Duration,
}

impl FetchConfig {
    pub fn is_priority(&self, vacancy_name: &str) -> bool {
        self.priority_vacancies.contains(vacancy_name)
    }

    pub fn in_scope(&self, vacancy_name: &str) -> bool {
        match self.scope {
            ReportScope::All => true,
            ReportScope::PriorityOnly => self.is_priority(vacancy_name),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            scope: ReportScope::default(),
            priority_vacancies: BTreeSet::new(),
            stage_mapping: StageMapping::default(),
            vacancy_concurrency: DEFAULT_VACANCY_CONCURRENCY,
            applicant_concurrency: DEFAULT_APPLICANT_CONCURRENCY,
            weekly_window: chrono::Duration::days(7),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub port: u16,
    pub huntflow_base_url: String,
    /// Used when the token file is missing or unusable.
    pub bootstrap_credentials: CredentialPair,
    pub token_file: PathBuf,
    pub cache_file: PathBuf,
    pub comments_file: Option<PathBuf>,
    pub update_interval: Duration,
    pub request_timeout: Duration,
    pub log_dir: String,
    pub fetch: FetchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            huntflow_base_url: DEFAULT_BASE_URL.to_string(),
            bootstrap_credentials: CredentialPair::default(),
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            cache_file: PathBuf::from(DEFAULT_CACHE_FILE),
            comments_file: None,
            update_interval: Duration::from_secs(DEFAULT_UPDATE_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            log_dir: DEFAULT_LOG_DIR.to_string(),
            fetch: FetchConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(bind_address) = get("API_BIND_ADDRESS") {
            config.bind_address = bind_address;
        }
        config.port = parse_or_default("API_PORT", get("API_PORT"), DEFAULT_PORT);

        if let Some(base_url) = get("HUNTFLOW_BASE_URL") {
            config.huntflow_base_url = base_url;
        }
        config.bootstrap_credentials = CredentialPair::new(
            get("HUNTFLOW_API_TOKEN").unwrap_or_default(),
            get("HUNTFLOW_REFRESH_TOKEN").unwrap_or_default(),
        );

        if let Some(path) = get("TOKEN_FILE_PATH") {
            config.token_file = PathBuf::from(path);
        }
        if let Some(path) = get("CACHE_FILE_PATH") {
            config.cache_file = PathBuf::from(path);
        }
        config.comments_file = get("COMMENTS_FILE_PATH").map(PathBuf::from);
        if let Some(dir) = get("LOG_DIR") {
            config.log_dir = dir;
        }

        config.update_interval = Duration::from_secs(
            parse_or_default(
                "UPDATE_INTERVAL_SECONDS",
                get("UPDATE_INTERVAL_SECONDS"),
                DEFAULT_UPDATE_INTERVAL_SECS,
            )
            .max(1),
        );
        config.request_timeout = Duration::from_secs(parse_or_default(
            "REQUEST_TIMEOUT_SECONDS",
            get("REQUEST_TIMEOUT_SECONDS"),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        ));

        if let Some(scope) = get("REPORT_SCOPE") {
            config.fetch.scope = scope.parse()?;
        }
        if let Some(names) = get("PRIORITY_VACANCIES") {
            config.fetch.priority_vacancies = names
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(raw) = get("FUNNEL_STATUS_NAMES") {
            config.fetch.stage_mapping = StageMapping::parse(&raw)?;
        }
        config.fetch.vacancy_concurrency = parse_or_default(
            "VACANCY_CONCURRENCY",
            get("VACANCY_CONCURRENCY"),
            DEFAULT_VACANCY_CONCURRENCY,
        )
        .max(1);
        config.fetch.applicant_concurrency = parse_or_default(
            "APPLICANT_CONCURRENCY",
            get("APPLICANT_CONCURRENCY"),
            DEFAULT_APPLICANT_CONCURRENCY,
        )
        .max(1);

        if config.fetch.scope == ReportScope::PriorityOnly
            && config.fetch.priority_vacancies.is_empty()
        {
            warn!("REPORT_SCOPE is 'priority' but PRIORITY_VACANCIES is empty; reports will be empty");
        }

        Ok(config)
    }
}

fn parse_or_default<T: FromStr + Copy>(key: &str, raw: Option<String>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(key, value = %raw, "Invalid numeric setting; using default");
            default
        }
    }
}
