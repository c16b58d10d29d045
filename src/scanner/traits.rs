//! Category scanner abstraction.
//!
//! Every audit category implements [`CategoryScanner`]. A scanner owns the
//! endpoint knowledge for its category: which collection defines the units,
//! what per-unit requests are made, and how raw payloads become records.
//! Event ordering and bounded concurrency are shared and live in
//! [`drive_units`](super::drive_units).

use crate::budget::RateBudget;
use crate::config::{AppSettings, Credentials};
use crate::error::{ApiResult, ScanResult};
use crate::github::GitHubClient;
use crate::orchestrator::EventEmitter;
use crate::types::Category;
use async_trait::async_trait;
use std::sync::Arc;

/// Default number of units audited concurrently.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Everything a scanner needs to reach one organization.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub client: Arc<GitHubClient>,
    pub organization: String,
    /// Upper bound on units in flight.
    pub concurrency: usize,
}

impl ScanContext {
    pub fn new(client: Arc<GitHubClient>, organization: impl Into<String>) -> Self {
        Self {
            client,
            organization: organization.into(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Build a client for `credentials` gated by `budget`.
    pub fn connect(
        credentials: &Credentials,
        settings: &AppSettings,
        budget: Arc<RateBudget>,
    ) -> ApiResult<Self> {
        let client = GitHubClient::new(&credentials.token, settings, budget)?;
        Ok(Self::new(Arc::new(client), credentials.organization.clone())
            .with_concurrency(settings.concurrency))
    }

    /// Set the worker pool size. Zero is raised to one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// What a finished scan did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Units announced in `start`.
    pub units: u64,
    /// Records emitted across all `data` events.
    pub records: u64,
    /// Units skipped after a non-fatal failure.
    pub skipped: Vec<String>,
}

/// Trait for category scanner implementations.
///
/// ```ignore
/// use orgscan::scanner::{scanner_for, ScanContext};
///
/// let scanner = scanner_for(Category::Branches);
/// let summary = scanner.scan(&ctx, &mut emitter).await?;
/// ```
#[async_trait]
pub trait CategoryScanner: Send + Sync {
    /// Category this scanner audits.
    fn category(&self) -> Category;

    /// Audit every unit of the category, emitting `start`, `progress` and
    /// `data` through `emitter`.
    ///
    /// Terminal events are not emitted here; the orchestrator sends `done`
    /// or `error` from the returned result.
    async fn scan(&self, ctx: &ScanContext, emitter: &mut EventEmitter) -> ScanResult<ScanSummary>;
}

/// Type alias for boxed scanner trait objects.
pub type BoxedScanner = Box<dyn CategoryScanner>;
