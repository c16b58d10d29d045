//! Raw response shapes of the GitHub endpoints the scanners read.
//!
//! Only the fields the audit needs are declared; everything else in the
//! payload is ignored. Missing optional fields fall back to defaults.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub owner: Account,
    pub description: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub private: bool,
    pub visibility: Option<String>,
    #[serde(default)]
    pub archived: bool,
    pub default_branch: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub html_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Branch {
    pub name: String,
    #[serde(default)]
    pub protected: bool,
    pub commit: Option<CommitRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRef {
    pub sha: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    pub commit: Option<CommitDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    pub committer: Option<Signature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Signature {
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchRule {
    #[serde(rename = "type")]
    pub rule_type: String,
    #[serde(default)]
    pub parameters: Option<RuleParameters>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleParameters {
    #[serde(default)]
    pub required_approving_review_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Collaborator {
    pub login: String,
    #[serde(default)]
    pub permissions: Option<PermissionFlags>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PermissionFlags {
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub maintain: bool,
    #[serde(default)]
    pub push: bool,
    #[serde(default)]
    pub triage: bool,
    #[serde(default)]
    pub pull: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Membership {
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Team {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    pub description: Option<String>,
    pub privacy: Option<String>,
    #[serde(default)]
    pub members_count: u64,
    #[serde(default)]
    pub repos_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_tolerates_sparse_payload() {
        let repo: Repository = serde_json::from_str(r#"{"name": "api"}"#).unwrap();
        assert_eq!(repo.name, "api");
        assert!(!repo.archived);
        assert!(repo.default_branch.is_none());
    }

    #[test]
    fn test_commit_date_parses() {
        let commit: Commit = serde_json::from_str(
            r#"{"commit": {"committer": {"date": "2024-03-01T12:00:00Z"}}}"#,
        )
        .unwrap();
        let date = commit.commit.unwrap().committer.unwrap().date.unwrap();
        assert_eq!(date.to_rfc3339(), "2024-03-01T12:00:00+00:00");
    }

    #[test]
    fn test_rule_type_field() {
        let rules: Vec<BranchRule> = serde_json::from_str(
            r#"[{"type": "pull_request", "parameters": {"required_approving_review_count": 2}}]"#,
        )
        .unwrap();
        assert_eq!(rules[0].rule_type, "pull_request");
        assert_eq!(
            rules[0].parameters.as_ref().unwrap().required_approving_review_count,
            2
        );
    }
}
