//! Per-category accumulator of a scan stream.

use crate::protocol::ScanEvent;
use crate::types::{Category, ResultSet, ScanId};
use tracing::{debug, warn};

/// Detail recorded when a stream ends without a terminal event.
pub const CONNECTION_LOST: &str = "connection lost";

/// What applying an event did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Started,
    Progressed,
    /// Records appended to the result list.
    Appended(usize),
    Finished,
    Failed,
    /// The event was rejected or arrived outside an active session.
    Ignored,
}

/// Consumer-side state of one category.
///
/// Only [`apply`](Self::apply) and the lifecycle methods mutate it; readers
/// take a [`ProgressSnapshot`] or borrow the results.
#[derive(Debug, Clone)]
pub struct ScanSession {
    category: Category,
    scan_id: Option<ScanId>,
    scanning: bool,
    total: Option<u64>,
    processed: u64,
    current: Option<String>,
    error: Option<String>,
    results: ResultSet,
}

impl ScanSession {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            scan_id: None,
            scanning: false,
            total: None,
            processed: 0,
            current: None,
            error: None,
            results: ResultSet::empty(category),
        }
    }

    /// A session holding previously stored results, not scanning.
    pub fn restored(results: ResultSet) -> Self {
        let mut session = Self::new(results.category());
        session.results = results;
        session
    }

    /// Reset for a new scan: results are cleared before any new data.
    pub fn begin(&mut self, scan_id: ScanId) {
        *self = Self::new(self.category);
        self.scan_id = Some(scan_id);
        self.scanning = true;
    }

    pub fn apply(&mut self, event: ScanEvent) -> Applied {
        if !self.scanning {
            debug!(category = %self.category, kind = event.kind(), "event outside active scan");
            return Applied::Ignored;
        }

        match event {
            ScanEvent::Start { total } => {
                if self.total.is_some() {
                    warn!(category = %self.category, "duplicate start event");
                    return Applied::Ignored;
                }
                self.total = Some(total.max(self.processed));
                Applied::Started
            }
            ScanEvent::Progress { processed, current } => {
                self.processed = self.processed.max(processed);
                if let Some(total) = self.total.as_mut() {
                    *total = (*total).max(self.processed);
                }
                self.current = Some(current);
                Applied::Progressed
            }
            ScanEvent::Data { data } => match self.results.append(data) {
                Ok(appended) => Applied::Appended(appended),
                Err(rejected) => {
                    warn!(
                        category = %self.category,
                        got = %rejected.category(),
                        "dropping data for another category"
                    );
                    Applied::Ignored
                }
            },
            ScanEvent::Done { skipped } => {
                if !skipped.is_empty() {
                    warn!(category = %self.category, ?skipped, "scan completed with skipped units");
                }
                self.scanning = false;
                self.current = None;
                Applied::Finished
            }
            ScanEvent::Error { detail } => {
                self.fail(detail);
                Applied::Failed
            }
        }
    }

    /// The channel ended without a terminal event.
    pub fn connection_lost(&mut self) {
        if self.scanning {
            self.fail(CONNECTION_LOST.to_string());
        }
    }

    /// Stop locally. Results so far are kept and no error is recorded.
    pub fn cancel(&mut self) {
        self.scanning = false;
        self.current = None;
    }

    /// Record a failure that ends the scan.
    pub fn fail(&mut self, detail: String) {
        self.error = Some(detail);
        self.scanning = false;
        self.current = None;
    }

    /// Drop results and any error, leaving an idle session.
    pub fn reset(&mut self) {
        *self = Self::new(self.category);
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn scan_id(&self) -> Option<ScanId> {
        self.scan_id
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            category: self.category,
            scanning: self.scanning,
            total: self.total,
            processed: self.processed,
            current: self.current.clone(),
            error: self.error.clone(),
            records: self.results.len(),
        }
    }
}

/// Point-in-time view of a session, without the records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub category: Category,
    pub scanning: bool,
    pub total: Option<u64>,
    pub processed: u64,
    pub current: Option<String>,
    pub error: Option<String>,
    pub records: usize,
}

impl ProgressSnapshot {
    /// Completed fraction in `0.0..=1.0`, once the total is known.
    pub fn ratio(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some(self.processed as f64 / total as f64),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccessRecord, BranchRecord, Permission, RecordBatch};

    fn branches(repo: &str, n: usize) -> ScanEvent {
        ScanEvent::Data {
            data: RecordBatch::Branches(
                (0..n)
                    .map(|i| BranchRecord {
                        repository: repo.to_string(),
                        branch_name: format!("b{i}"),
                        last_commit_date: None,
                        age_days: None,
                        protected: false,
                    })
                    .collect(),
            ),
        }
    }

    fn progress(processed: u64, current: &str) -> ScanEvent {
        ScanEvent::Progress {
            processed,
            current: current.to_string(),
        }
    }

    fn started() -> ScanSession {
        let mut session = ScanSession::new(Category::Branches);
        session.begin(ScanId::new());
        session
    }

    #[test]
    fn test_full_stream() {
        let mut session = started();
        assert_eq!(session.apply(ScanEvent::Start { total: 3 }), Applied::Started);
        for (i, repo) in ["a", "b", "c"].iter().enumerate() {
            session.apply(progress(i as u64 + 1, repo));
            assert_eq!(session.apply(branches(repo, 2)), Applied::Appended(2));
        }
        assert_eq!(
            session.apply(ScanEvent::Done { skipped: vec![] }),
            Applied::Finished
        );

        assert!(!session.is_scanning());
        assert_eq!(session.results().len(), 6);
        assert_eq!(session.processed(), 3);
        assert_eq!(session.current(), None);
        assert_eq!(session.error(), None);
    }

    #[test]
    fn test_processed_never_decreases() {
        let mut session = started();
        session.apply(ScanEvent::Start { total: 5 });
        session.apply(progress(3, "c"));
        session.apply(progress(2, "b"));
        assert_eq!(session.processed(), 3);
        assert_eq!(session.current(), Some("b"));
    }

    #[test]
    fn test_total_raised_when_exceeded() {
        let mut session = started();
        session.apply(ScanEvent::Start { total: 1 });
        session.apply(progress(2, "b"));
        assert_eq!(session.total(), Some(2));
    }

    #[test]
    fn test_error_keeps_results() {
        let mut session = started();
        session.apply(ScanEvent::Start { total: 2 });
        session.apply(branches("a", 2));
        session.apply(ScanEvent::Error {
            detail: "authentication failed".into(),
        });

        assert!(!session.is_scanning());
        assert_eq!(session.error(), Some("authentication failed"));
        assert_eq!(session.results().len(), 2);
    }

    #[test]
    fn test_connection_lost() {
        let mut session = started();
        session.apply(ScanEvent::Start { total: 5 });
        session.apply(branches("a", 1));
        session.connection_lost();
        assert_eq!(session.error(), Some(CONNECTION_LOST));
        assert_eq!(session.results().len(), 1);
    }

    #[test]
    fn test_connection_lost_after_done_is_noop() {
        let mut session = started();
        session.apply(ScanEvent::Start { total: 0 });
        session.apply(ScanEvent::Done { skipped: vec![] });
        session.connection_lost();
        assert_eq!(session.error(), None);
    }

    #[test]
    fn test_wrong_category_rejected() {
        let mut session = started();
        session.apply(ScanEvent::Start { total: 1 });
        let access = ScanEvent::Data {
            data: RecordBatch::Access(vec![AccessRecord {
                repository: "a".into(),
                username: "octocat".into(),
                permission: Permission::Read,
            }]),
        };
        assert_eq!(session.apply(access), Applied::Ignored);
        assert!(session.results().is_empty());
    }

    #[test]
    fn test_begin_clears_previous_results() {
        let mut session = started();
        session.apply(ScanEvent::Start { total: 1 });
        session.apply(branches("a", 2));
        session.connection_lost();

        session.begin(ScanId::new());
        assert!(session.results().is_empty());
        assert_eq!(session.error(), None);
        assert!(session.is_scanning());
    }

    #[test]
    fn test_events_after_cancel_ignored() {
        let mut session = started();
        session.apply(ScanEvent::Start { total: 2 });
        session.cancel();
        assert_eq!(session.apply(branches("a", 1)), Applied::Ignored);
        assert!(session.results().is_empty());
        assert_eq!(session.error(), None);
    }

    #[test]
    fn test_snapshot_ratio() {
        let mut session = started();
        assert_eq!(session.snapshot().ratio(), None);
        session.apply(ScanEvent::Start { total: 4 });
        session.apply(progress(1, "a"));
        assert_eq!(session.snapshot().ratio(), Some(0.25));
    }
}
