//! Tag for one run of a category scan.

use std::fmt;
use uuid::Uuid;

/// Random identifier of a scan run, so restarts of a category can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanId(Uuid);

impl ScanId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for log lines.
    pub fn short(&self) -> String {
        let mut digits = self.0.simple().to_string();
        digits.truncate(8);
        digits
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_get_distinct_ids() {
        let first = ScanId::new();
        let second = ScanId::new();
        assert_ne!(first, second);
        assert!(first.to_string().starts_with(&first.short()));
        assert_eq!(first.short().len(), 8);
    }
}
