//! Funnel report: model, fetch pipeline and cache.

pub mod cache;
pub mod comments;
pub mod fetcher;
pub mod model;

pub use cache::{CachedReport, JsonFileReportStorage, RefreshOutcome, ReportCache, ReportStorage};
pub use comments::CommentArchive;
pub use fetcher::FunnelFetcher;
pub use model::{
    Coworkers, FunnelStage, Report, StageCount, StageCounts, VacancyFunnelRow, sort_priority_first,
};
