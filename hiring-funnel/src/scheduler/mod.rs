//! Periodic report refresh.
//!
//! [`ReportRefreshJob`] runs at most one fetch cycle at a time. The timer
//! path skips a tick when a cycle is still running; manual refreshes wait.

mod job;

pub use job::{JobStats, ReportRefreshJob};
