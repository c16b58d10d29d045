//! Organization member audit.

use super::{drive_units, list_units, CategoryScanner, ScanContext, ScanSummary, UnitOutcome};
use crate::error::{ApiResult, ScanResult};
use crate::github::models::{Account, Event, Membership, UserProfile};
use crate::github::GitHubClient;
use crate::orchestrator::EventEmitter;
use crate::types::{Category, MemberRecord, RecordBatch, UNKNOWN_EMAIL};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

const DEFAULT_ROLE: &str = "member";

/// Reports role, public email and last public activity of each member.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemberScanner;

#[async_trait]
impl CategoryScanner for MemberScanner {
    fn category(&self) -> Category {
        Category::Members
    }

    async fn scan(&self, ctx: &ScanContext, emitter: &mut EventEmitter) -> ScanResult<ScanSummary> {
        let members: Vec<Account> =
            list_units(ctx, format!("/orgs/{}/members", ctx.organization)).await?;

        drive_units(self.category(), ctx.concurrency, emitter, members, |member| async move {
            let result = audit_member(ctx, &member.login)
                .await
                .map(|record| Some(RecordBatch::Members(record)));
            UnitOutcome::new(member.login, result)
        })
        .await
    }
}

async fn audit_member(ctx: &ScanContext, username: &str) -> ApiResult<MemberRecord> {
    let client: &GitHubClient = &ctx.client;
    let membership_path = format!("/orgs/{}/memberships/{username}", ctx.organization);
    let profile_path = format!("/users/{username}");
    let events_path = format!("/users/{username}/events");
    let latest_only = [("per_page", "1".to_string())];

    let (membership, profile, events) = tokio::try_join!(
        client.get_lenient::<Membership>(&membership_path, &[]),
        client.get_lenient::<UserProfile>(&profile_path, &[]),
        client.get_lenient::<Vec<Event>>(&events_path, &latest_only),
    )?;

    let last_activity = events
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|e| e.created_at);

    Ok(member_record(
        username,
        membership.and_then(|m| m.role),
        profile.and_then(|p| p.email),
        last_activity,
        Utc::now(),
    ))
}

fn member_record(
    username: &str,
    role: Option<String>,
    email: Option<String>,
    last_activity: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> MemberRecord {
    MemberRecord {
        username: username.to_string(),
        role: role
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_ROLE.to_string()),
        email: email
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| UNKNOWN_EMAIL.to_string()),
        last_activity,
        days_inactive: last_activity.map(|at| (now - at).num_days()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_defaults_for_missing_details() {
        let record = member_record("octocat", None, None, None, Utc::now());
        assert_eq!(record.role, DEFAULT_ROLE);
        assert_eq!(record.email, UNKNOWN_EMAIL);
        assert_eq!(record.last_activity, None);
        assert_eq!(record.days_inactive, None);
    }

    #[test]
    fn test_empty_email_is_unknown() {
        let record = member_record("octocat", Some("admin".into()), Some(String::new()), None, Utc::now());
        assert_eq!(record.role, "admin");
        assert_eq!(record.email, UNKNOWN_EMAIL);
    }

    #[test]
    fn test_days_inactive_from_latest_event() {
        let now = Utc::now();
        let record = member_record(
            "octocat",
            Some("member".into()),
            Some("octo@example.com".into()),
            Some(now - Duration::days(42)),
            now,
        );
        assert_eq!(record.days_inactive, Some(42));
        assert_eq!(record.email, "octo@example.com");
    }
}
