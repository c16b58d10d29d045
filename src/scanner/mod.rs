//! Scanner module - audits one category of an organization.
//!
//! Each category has its own [`CategoryScanner`]. They share one execution
//! shape: list the units up front to learn the total, then audit every unit
//! on a bounded worker pool and emit results in completion order.

pub mod access;
pub mod branches;
pub mod members;
pub mod repos;
pub mod stats;
pub mod teams;
pub mod traits;

use crate::error::{ApiError, ApiResult, ScanError, ScanResult};
use crate::github::Paginator;
use crate::orchestrator::EventEmitter;
use crate::types::{Category, RecordBatch};
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use std::future::Future;
use tracing::{debug, warn};

pub use access::AccessScanner;
pub use branches::BranchScanner;
pub use members::MemberScanner;
pub use repos::RepositoryScanner;
pub use stats::basic_stats;
pub use teams::TeamScanner;
pub use traits::{BoxedScanner, CategoryScanner, ScanContext, ScanSummary, DEFAULT_CONCURRENCY};

/// Scanner implementation for `category`.
pub fn scanner_for(category: Category) -> BoxedScanner {
    match category {
        Category::Repositories => Box::new(RepositoryScanner),
        Category::Branches => Box::new(BranchScanner),
        Category::Access => Box::new(AccessScanner),
        Category::Members => Box::new(MemberScanner),
        Category::Teams => Box::new(TeamScanner),
    }
}

/// Result of auditing one unit.
pub(crate) struct UnitOutcome {
    /// Unit name reported in `progress.current` and `done.skipped`.
    pub name: String,
    /// `None` when the unit produced nothing worth emitting.
    pub result: ApiResult<Option<RecordBatch>>,
}

impl UnitOutcome {
    pub(crate) fn new(name: impl Into<String>, result: ApiResult<Option<RecordBatch>>) -> Self {
        Self {
            name: name.into(),
            result,
        }
    }
}

/// Gather the full unit list of an organization collection.
///
/// A 404 here means the organization itself is missing or invisible.
pub(crate) async fn list_units<T: DeserializeOwned>(
    ctx: &ScanContext,
    path: String,
) -> ScanResult<Vec<T>> {
    Paginator::new(&ctx.client, path)
        .collect_all()
        .await
        .map_err(|e| match e {
            ApiError::NotFound(_) => ScanError::OrganizationNotFound(ctx.organization.clone()),
            other => other.into(),
        })
}

/// Generic unit executor with bounded concurrency.
///
/// Emits `start{units.len()}`, then for each unit in completion order a
/// `progress` followed by its `data` when non-empty. A non-fatal unit error
/// is logged and recorded as skipped; a fatal one aborts the scan, dropping
/// the units still in flight.
pub(crate) async fn drive_units<U, F, Fut>(
    category: Category,
    concurrency: usize,
    emitter: &mut EventEmitter,
    units: Vec<U>,
    audit: F,
) -> ScanResult<ScanSummary>
where
    F: FnMut(U) -> Fut,
    Fut: Future<Output = UnitOutcome>,
{
    let total = units.len() as u64;
    emitter.start(total).await?;

    let mut summary = ScanSummary {
        units: total,
        ..ScanSummary::default()
    };

    let mut outcomes = stream::iter(units)
        .map(audit)
        .buffer_unordered(concurrency.max(1));

    while let Some(UnitOutcome { name, result }) = outcomes.next().await {
        match result {
            Ok(batch) => {
                emitter.progress(&name).await?;
                if let Some(batch) = batch.filter(|b| !b.is_empty()) {
                    summary.records += batch.len() as u64;
                    emitter.data(batch).await?;
                }
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(%category, unit = %name, error = %e, "skipping unit");
                emitter.progress(&name).await?;
                summary.skipped.push(name);
            }
        }
    }

    debug!(
        %category,
        units = summary.units,
        records = summary.records,
        skipped = summary.skipped.len(),
        "all units audited"
    );
    Ok(summary)
}
