//! Organization summary counts.

use crate::error::{ApiError, ScanError, ScanResult};
use crate::github::models::Repository;
use crate::github::{GitHubClient, Paginator};
use crate::storage::OrgSummary;
use tracing::debug;

/// Count the organization's repositories by state, one page at a time.
pub async fn basic_stats(client: &GitHubClient, organization: &str) -> ScanResult<OrgSummary> {
    let mut pages = Paginator::<Repository>::new(client, format!("/orgs/{organization}/repos"));
    let mut summary = OrgSummary::default();

    loop {
        let page = match pages.next_page().await {
            Ok(Some(page)) => page,
            Ok(None) => break,
            Err(ApiError::NotFound(_)) => {
                return Err(ScanError::OrganizationNotFound(organization.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        for repo in &page {
            tally(&mut summary, repo);
        }
    }

    debug!(organization, total = summary.total_repositories, "basic stats collected");
    Ok(summary)
}

fn tally(summary: &mut OrgSummary, repo: &Repository) {
    summary.total_repositories += 1;
    if repo.archived {
        summary.archived_repositories += 1;
    } else {
        summary.active_repositories += 1;
    }
    if repo.private {
        summary.private_repositories += 1;
    } else {
        summary.public_repositories += 1;
    }
}
