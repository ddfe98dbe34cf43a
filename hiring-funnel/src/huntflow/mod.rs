//! Huntflow API access.
//!
//! [`RecruitingApi`] is the seam the fetcher depends on; [`HuntflowClient`]
//! is the production implementation.

mod api;
mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod models;

pub use api::{PAGE_SIZE, RecruitingApi};
pub use client::HuntflowClient;
