//! Collaborator access audit.

use super::branches::active_repositories;
use super::{drive_units, CategoryScanner, ScanContext, ScanSummary, UnitOutcome};
use crate::error::{ApiResult, ScanResult};
use crate::github::models::{Collaborator, PermissionFlags};
use crate::github::Paginator;
use crate::orchestrator::EventEmitter;
use crate::types::{AccessRecord, Category, Permission, RecordBatch};
use async_trait::async_trait;

/// Lists every collaborator's effective permission on each non-archived repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessScanner;

#[async_trait]
impl CategoryScanner for AccessScanner {
    fn category(&self) -> Category {
        Category::Access
    }

    async fn scan(&self, ctx: &ScanContext, emitter: &mut EventEmitter) -> ScanResult<ScanSummary> {
        let repos = active_repositories(ctx).await?;

        drive_units(self.category(), ctx.concurrency, emitter, repos, |repo| async move {
            let result = repository_access(ctx, &repo.name)
                .await
                .map(|records| Some(RecordBatch::Access(records)));
            UnitOutcome::new(repo.name, result)
        })
        .await
    }
}

async fn repository_access(ctx: &ScanContext, repository: &str) -> ApiResult<Vec<AccessRecord>> {
    let path = format!("/repos/{}/{repository}/collaborators", ctx.organization);
    let collaborators = Paginator::<Collaborator>::new(&ctx.client, path)
        .lenient()
        .collect_all()
        .await?;

    Ok(collaborators
        .into_iter()
        .map(|c| AccessRecord {
            repository: repository.to_string(),
            permission: permission_level(c.permissions.unwrap_or_default()),
            username: c.login,
        })
        .collect())
}

/// Highest flag set wins; anything below push reads.
fn permission_level(flags: PermissionFlags) -> Permission {
    if flags.admin {
        Permission::Admin
    } else if flags.maintain {
        Permission::Maintain
    } else if flags.push {
        Permission::Write
    } else {
        Permission::Read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(json: &str) -> PermissionFlags {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_highest_flag_wins() {
        assert_eq!(
            permission_level(flags(r#"{"admin": true, "maintain": true, "push": true, "pull": true}"#)),
            Permission::Admin
        );
        assert_eq!(
            permission_level(flags(r#"{"maintain": true, "push": true, "pull": true}"#)),
            Permission::Maintain
        );
        assert_eq!(
            permission_level(flags(r#"{"push": true, "triage": true, "pull": true}"#)),
            Permission::Write
        );
    }

    #[test]
    fn test_triage_and_pull_read() {
        assert_eq!(permission_level(flags(r#"{"triage": true, "pull": true}"#)), Permission::Read);
        assert_eq!(permission_level(PermissionFlags::default()), Permission::Read);
    }
}
