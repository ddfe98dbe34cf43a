//! Response models for the Huntflow v2 API (only the fields the report reads).

use serde::Deserialize;

/// Generic paginated envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total_items: Option<u64>,
}

impl<T> Page<T> {
    /// Whether `page` (1-based) is the last one declared by the server.
    pub fn is_last(&self, page: u32) -> bool {
        self.items.is_empty() || self.total_pages.is_some_and(|total| page >= total)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

/// A recruitment status as configured in the account.
#[derive(Debug, Clone, Deserialize)]
pub struct VacancyStatus {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Vacancy {
    pub id: u64,
    #[serde(default)]
    pub position: Option<String>,
}

impl Vacancy {
    pub const UNTITLED: &'static str = "Untitled vacancy";

    pub fn title(&self) -> &str {
        self.position.as_deref().unwrap_or(Self::UNTITLED)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicantRef {
    pub id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogType {
    Status,
    Comment,
    #[serde(other)]
    Other,
}

/// One entry of an applicant's activity log for a vacancy.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicantLog {
    #[serde(rename = "type")]
    pub log_type: LogType,
    #[serde(default)]
    pub status: Option<u64>,
    /// ISO-8601 timestamp with offset.
    #[serde(default)]
    pub created: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Coworker {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}
