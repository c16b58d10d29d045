//! GitHub REST API access.
//!
//! [`GitHubClient`] issues authenticated requests gated by the shared
//! [`RateBudget`](crate::budget::RateBudget), retrying secondary rate limits
//! and transient failures locally. [`Paginator`] walks a collection endpoint
//! one page at a time.

mod client;
pub mod models;
mod paginate;

pub use client::{GitHubClient, RetryPolicy};
pub use paginate::Paginator;
