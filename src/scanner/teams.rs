//! Team audit.

use super::{drive_units, list_units, CategoryScanner, ScanContext, ScanSummary, UnitOutcome};
use crate::error::{ApiResult, ScanResult};
use crate::github::models::Team;
use crate::orchestrator::EventEmitter;
use crate::types::{Category, RecordBatch, TeamPrivacy, TeamRecord};
use async_trait::async_trait;

/// Reports each team's privacy and size.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeamScanner;

#[async_trait]
impl CategoryScanner for TeamScanner {
    fn category(&self) -> Category {
        Category::Teams
    }

    async fn scan(&self, ctx: &ScanContext, emitter: &mut EventEmitter) -> ScanResult<ScanSummary> {
        let teams: Vec<Team> =
            list_units(ctx, format!("/orgs/{}/teams", ctx.organization)).await?;

        drive_units(self.category(), ctx.concurrency, emitter, teams, |team| async move {
            let name = team.name.clone();
            let result = audit_team(ctx, team)
                .await
                .map(|record| Some(RecordBatch::Teams(record)));
            UnitOutcome::new(name, result)
        })
        .await
    }
}

/// The list endpoint usually omits counts; fetch the detail when both are zero.
async fn audit_team(ctx: &ScanContext, team: Team) -> ApiResult<TeamRecord> {
    if team.members_count > 0 || team.repos_count > 0 || team.slug.is_empty() {
        return Ok(team_record(team, None));
    }
    let path = format!("/orgs/{}/teams/{}", ctx.organization, team.slug);
    let detail: Option<Team> = ctx.client.get_lenient(&path, &[]).await?;
    Ok(team_record(team, detail))
}

fn team_record(team: Team, detail: Option<Team>) -> TeamRecord {
    let (members_count, repos_count) = detail
        .map(|d| (d.members_count, d.repos_count))
        .unwrap_or((team.members_count, team.repos_count));
    let privacy = match team.privacy.as_deref() {
        Some("secret") => TeamPrivacy::Secret,
        _ => TeamPrivacy::Closed,
    };

    TeamRecord {
        name: team.name,
        slug: team.slug,
        description: team.description.filter(|d| !d.is_empty()),
        privacy,
        members_count,
        repos_count,
    }
}
