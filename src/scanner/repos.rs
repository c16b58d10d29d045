//! Repository governance audit.
//!
//! One record per repository: metadata from the listing plus four
//! concurrent checks against the repository itself.

use super::{drive_units, list_units, CategoryScanner, ScanContext, ScanSummary, UnitOutcome};
use crate::error::{ApiResult, ScanResult};
use crate::github::models::{Branch, BranchRule, Collaborator, Repository};
use crate::github::{GitHubClient, Paginator};
use crate::orchestrator::EventEmitter;
use crate::types::{Category, RecordBatch, RepositoryAuditRecord, Visibility};
use async_trait::async_trait;
use futures::future::try_join_all;

/// Locations GitHub honours for a CODEOWNERS file.
const CODEOWNERS_PATHS: [&str; 3] = ["CODEOWNERS", "docs/CODEOWNERS", ".github/CODEOWNERS"];

/// Branch assumed when the listing does not name one.
const FALLBACK_BRANCH: &str = "main";

const PULL_REQUEST_RULE: &str = "pull_request";

/// Audits every repository of the organization, archived ones included.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepositoryScanner;

#[async_trait]
impl CategoryScanner for RepositoryScanner {
    fn category(&self) -> Category {
        Category::Repositories
    }

    async fn scan(&self, ctx: &ScanContext, emitter: &mut EventEmitter) -> ScanResult<ScanSummary> {
        let repos: Vec<Repository> =
            list_units(ctx, format!("/orgs/{}/repos", ctx.organization)).await?;

        drive_units(self.category(), ctx.concurrency, emitter, repos, |repo| {
            audit_unit(ctx, repo)
        })
        .await
    }
}

async fn audit_unit(ctx: &ScanContext, repo: Repository) -> UnitOutcome {
    let name = repo.name.clone();
    let result = audit_repository(ctx, repo)
        .await
        .map(|record| Some(RecordBatch::Repositories(record)));
    UnitOutcome::new(name, result)
}

async fn audit_repository(ctx: &ScanContext, repo: Repository) -> ApiResult<RepositoryAuditRecord> {
    let client: &GitHubClient = &ctx.client;
    let base = format!("/repos/{}/{}", ctx.organization, repo.name);
    let default_branch = repo
        .default_branch
        .clone()
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| FALLBACK_BRANCH.to_string());
    let rules_path = format!("{base}/rules/branches/{default_branch}");

    let admins = Paginator::<Collaborator>::new(client, format!("{base}/collaborators"))
        .param("permission", "admin")
        .lenient()
        .collect_all();
    let branch_count = Paginator::<Branch>::new(client, format!("{base}/branches"))
        .lenient()
        .count();

    let (has_codeowners, rules, admins, branch_count) = tokio::try_join!(
        has_codeowners(client, &base),
        client.get_lenient::<Vec<BranchRule>>(&rules_path, &[]),
        admins,
        branch_count,
    )?;

    let checks = GovernanceChecks {
        has_codeowners,
        rules: evaluate_rules(rules.as_deref().unwrap_or_default()),
        admin_names: admins.into_iter().map(|a| a.login).collect(),
        branch_count,
    };
    Ok(build_record(&ctx.organization, repo, default_branch, checks))
}

async fn has_codeowners(client: &GitHubClient, base: &str) -> ApiResult<bool> {
    let lookups = CODEOWNERS_PATHS
        .iter()
        .map(|path| format!("{base}/contents/{path}"))
        .collect::<Vec<_>>();
    let found = try_join_all(lookups.iter().map(|path| client.exists(path))).await?;
    Ok(found.into_iter().any(|exists| exists))
}

/// Protection derived from the default branch's rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RuleSummary {
    allows_direct_push: bool,
    has_required_reviewers: bool,
}

/// A `pull_request` rule blocks direct pushes; reviewers are required when
/// that rule asks for at least one approval.
fn evaluate_rules(rules: &[BranchRule]) -> RuleSummary {
    let mut summary = RuleSummary {
        allows_direct_push: true,
        has_required_reviewers: false,
    };
    for rule in rules.iter().filter(|r| r.rule_type == PULL_REQUEST_RULE) {
        summary.allows_direct_push = false;
        let approvals = rule
            .parameters
            .as_ref()
            .map_or(0, |p| p.required_approving_review_count);
        if approvals > 0 {
            summary.has_required_reviewers = true;
        }
    }
    summary
}

struct GovernanceChecks {
    has_codeowners: bool,
    rules: RuleSummary,
    admin_names: Vec<String>,
    branch_count: u64,
}

fn visibility_of(repo: &Repository) -> Visibility {
    match repo.visibility.as_deref() {
        Some("public") => Visibility::Public,
        Some("private") => Visibility::Private,
        Some("internal") => Visibility::Internal,
        _ if repo.private => Visibility::Private,
        _ => Visibility::Public,
    }
}

fn build_record(
    organization: &str,
    repo: Repository,
    default_branch: String,
    checks: GovernanceChecks,
) -> RepositoryAuditRecord {
    let visibility = visibility_of(&repo);
    let full_name = if repo.full_name.is_empty() {
        format!("{organization}/{}", repo.name)
    } else {
        repo.full_name
    };

    RepositoryAuditRecord {
        repository: repo.name,
        full_name,
        owner: organization.to_string(),
        description: repo.description,
        topics: repo.topics,
        visibility,
        archived: repo.archived,
        default_branch,
        language: repo.language,
        stars: repo.stargazers_count,
        forks: repo.forks_count,
        admin_count: checks.admin_names.len(),
        admin_names: checks.admin_names,
        has_codeowners: checks.has_codeowners,
        has_required_reviewers: checks.rules.has_required_reviewers,
        allows_direct_push: checks.rules.allows_direct_push,
        branch_count: checks.branch_count,
        url: repo.html_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(json: &str) -> Vec<BranchRule> {
        serde_json::from_str(json).unwrap()
    }

    fn repo(json: &str) -> Repository {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_no_rules_allows_direct_push() {
        let summary = evaluate_rules(&[]);
        assert!(summary.allows_direct_push);
        assert!(!summary.has_required_reviewers);
    }

    #[test]
    fn test_pull_request_rule_without_approvals() {
        let summary = evaluate_rules(&rules(
            r#"[{"type": "deletion"}, {"type": "pull_request", "parameters": {"required_approving_review_count": 0}}]"#,
        ));
        assert!(!summary.allows_direct_push);
        assert!(!summary.has_required_reviewers);
    }

    #[test]
    fn test_pull_request_rule_with_approvals() {
        let summary = evaluate_rules(&rules(
            r#"[{"type": "pull_request", "parameters": {"required_approving_review_count": 2}}]"#,
        ));
        assert!(!summary.allows_direct_push);
        assert!(summary.has_required_reviewers);
    }

    #[test]
    fn test_other_rules_leave_push_open() {
        let summary = evaluate_rules(&rules(r#"[{"type": "non_fast_forward"}]"#));
        assert!(summary.allows_direct_push);
    }

    #[test]
    fn test_visibility_prefers_explicit_field() {
        assert_eq!(
            visibility_of(&repo(r#"{"name": "a", "private": true, "visibility": "internal"}"#)),
            Visibility::Internal
        );
        assert_eq!(
            visibility_of(&repo(r#"{"name": "a", "private": true}"#)),
            Visibility::Private
        );
        assert_eq!(visibility_of(&repo(r#"{"name": "a"}"#)), Visibility::Public);
    }

    #[test]
    fn test_build_record() {
        let repo = repo(
            r#"{"name": "api", "description": "Public API", "topics": ["rust"],
                "archived": true, "stargazers_count": 7, "forks_count": 2,
                "html_url": "https://github.com/acme/api"}"#,
        );
        let checks = GovernanceChecks {
            has_codeowners: true,
            rules: RuleSummary {
                allows_direct_push: false,
                has_required_reviewers: true,
            },
            admin_names: vec!["alice".into(), "bob".into()],
            branch_count: 4,
        };

        let record = build_record("acme", repo, "main".into(), checks);
        assert_eq!(record.full_name, "acme/api");
        assert_eq!(record.owner, "acme");
        assert_eq!(record.admin_count, 2);
        assert_eq!(record.branch_count, 4);
        assert!(record.archived);
        assert!(record.has_codeowners);
        assert!(!record.allows_direct_push);
        assert_eq!(record.topics, vec!["rust".to_string()]);
    }
}
