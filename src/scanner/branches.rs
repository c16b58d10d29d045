//! Branch staleness audit.

use super::{drive_units, list_units, CategoryScanner, ScanContext, ScanSummary, UnitOutcome};
use crate::error::{ApiResult, ScanResult};
use crate::github::models::{Branch, Commit, Repository};
use crate::github::{GitHubClient, Paginator};
use crate::orchestrator::EventEmitter;
use crate::types::{BranchRecord, Category, RecordBatch};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Lists every branch of each non-archived repository with its last commit date.
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchScanner;

#[async_trait]
impl CategoryScanner for BranchScanner {
    fn category(&self) -> Category {
        Category::Branches
    }

    async fn scan(&self, ctx: &ScanContext, emitter: &mut EventEmitter) -> ScanResult<ScanSummary> {
        let repos = active_repositories(ctx).await?;

        drive_units(self.category(), ctx.concurrency, emitter, repos, |repo| async move {
            let result = repository_branches(ctx, &repo.name)
                .await
                .map(|records| Some(RecordBatch::Branches(records)));
            UnitOutcome::new(repo.name, result)
        })
        .await
    }
}

/// Non-archived repositories of the organization.
pub(crate) async fn active_repositories(ctx: &ScanContext) -> ScanResult<Vec<Repository>> {
    let repos: Vec<Repository> =
        list_units(ctx, format!("/orgs/{}/repos", ctx.organization)).await?;
    Ok(repos.into_iter().filter(|r| !r.archived).collect())
}

async fn repository_branches(ctx: &ScanContext, repository: &str) -> ApiResult<Vec<BranchRecord>> {
    let client: &GitHubClient = &ctx.client;
    let base = format!("/repos/{}/{repository}", ctx.organization);
    let now = Utc::now();

    let mut pages = Paginator::<Branch>::new(client, format!("{base}/branches")).lenient();
    let mut records = Vec::new();
    while let Some(page) = pages.next_page().await? {
        for branch in page {
            let last_commit = match branch.commit.as_ref().and_then(|c| c.sha.as_deref()) {
                Some(sha) => commit_date(client, &base, sha).await?,
                None => None,
            };
            records.push(branch_record(repository, branch, last_commit, now));
        }
    }
    Ok(records)
}

async fn commit_date(
    client: &GitHubClient,
    base: &str,
    sha: &str,
) -> ApiResult<Option<DateTime<Utc>>> {
    let commit: Option<Commit> = client
        .get_lenient(&format!("{base}/commits/{sha}"), &[])
        .await?;
    Ok(commit
        .and_then(|c| c.commit)
        .and_then(|c| c.committer)
        .and_then(|s| s.date))
}

fn branch_record(
    repository: &str,
    branch: Branch,
    last_commit_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> BranchRecord {
    BranchRecord {
        repository: repository.to_string(),
        branch_name: branch.name,
        last_commit_date,
        age_days: last_commit_date.map(|date| (now - date).num_days()),
        protected: branch.protected,
    }
}
