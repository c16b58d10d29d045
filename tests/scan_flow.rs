//! Scans driven directly through the orchestrator against a fake API.

mod common;

use axum::http::StatusCode;
use common::{FakeGitHub, Scripted, ORG};
use orgscan::budget::RateBudget;
use orgscan::orchestrator::{spawn_scan, ScanOutcome, ScanState, ScanTask};
use orgscan::scanner::ScanContext;
use orgscan::types::{Category, RecordBatch};
use orgscan::{AppSettings, ScanEvent};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn connect(base_url: &str, organization: &str) -> ScanContext {
    connect_with(&common::settings(base_url), organization)
}

fn connect_with(settings: &AppSettings, organization: &str) -> ScanContext {
    let credentials = orgscan::Credentials::new(organization, common::TOKEN);
    tokio_test::assert_ok!(ScanContext::connect(
        &credentials,
        settings,
        Arc::new(RateBudget::new(settings.quota_floor))
    ))
}

fn context(base_url: &str, organization: &str) -> Arc<ScanContext> {
    Arc::new(connect(base_url, organization))
}

async fn collect(task: &mut ScanTask) -> Vec<ScanEvent> {
    let mut events = Vec::new();
    while let Some(event) = task.next_event().await {
        events.push(event);
    }
    events
}

fn assert_well_formed(events: &[ScanEvent], units: u64) {
    assert_eq!(events.first(), Some(&ScanEvent::Start { total: units }));
    assert!(events.last().is_some_and(ScanEvent::is_terminal));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);

    let processed: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Progress { processed, .. } => Some(*processed),
            _ => None,
        })
        .collect();
    assert_eq!(processed, (1..=units).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_repository_scan_emits_one_record_per_repository() {
    let (fake, base) = FakeGitHub::start().await;
    fake.seed_repositories(3, 2);
    fake.route(
        format!("/repos/{ORG}/repo-0/contents/.github/CODEOWNERS"),
        json!({ "name": "CODEOWNERS" }),
    );
    fake.route(
        format!("/repos/{ORG}/repo-1/rules/branches/main"),
        json!([{ "type": "pull_request", "parameters": { "required_approving_review_count": 2 } }]),
    );

    let mut task = spawn_scan(Category::Repositories, context(&base, ORG));
    let events = collect(&mut task).await;
    assert_well_formed(&events, 3);

    let mut records: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Data {
                data: RecordBatch::Repositories(record),
            } => Some(record.clone()),
            _ => None,
        })
        .collect();
    records.sort_by(|a, b| a.repository.cmp(&b.repository));
    assert_eq!(records.len(), 3);

    assert!(records[0].has_codeowners);
    assert!(records[0].allows_direct_push);
    assert!(!records[1].has_codeowners);
    assert!(records[1].has_required_reviewers);
    assert!(!records[1].allows_direct_push);
    assert!(records.iter().all(|r| r.branch_count == 2));
    assert!(records.iter().all(|r| r.owner == ORG));

    assert_eq!(events.last(), Some(&ScanEvent::Done { skipped: vec![] }));
    assert!(matches!(task.finish().await, ScanOutcome::Completed(s) if s.records == 3));
}

#[tokio::test]
async fn test_progress_precedes_its_data() {
    let (fake, base) = FakeGitHub::start().await;
    fake.seed_repositories(3, 2);

    let mut task = spawn_scan(Category::Branches, context(&base, ORG));
    let events = collect(&mut task).await;
    assert_well_formed(&events, 3);

    for (i, event) in events.iter().enumerate() {
        if let ScanEvent::Data {
            data: RecordBatch::Branches(branches),
        } = event
        {
            let Some(ScanEvent::Progress { current, .. }) = events.get(i - 1) else {
                panic!("data without preceding progress at {i}");
            };
            assert_eq!(branches.len(), 2);
            assert!(branches.iter().all(|b| &b.repository == current));
            assert!(branches.iter().all(|b| b.age_days.is_some_and(|d| d > 0)));
        }
    }
}

#[tokio::test]
async fn test_rejected_token_fails_without_data() {
    let (fake, base) = FakeGitHub::start().await;
    fake.seed_repositories(3, 2);
    fake.fail_all(StatusCode::UNAUTHORIZED);

    let mut task = spawn_scan(Category::Repositories, context(&base, ORG));
    let events = collect(&mut task).await;

    assert_eq!(
        events,
        vec![ScanEvent::Error {
            detail: "authentication failed".to_string()
        }]
    );
    assert_eq!(task.finish().await.state(), ScanState::Failed);
}

#[tokio::test]
async fn test_unknown_organization() {
    let (_fake, base) = FakeGitHub::start().await;

    let mut task = spawn_scan(Category::Teams, context(&base, "ghost"));
    let events = collect(&mut task).await;

    assert_eq!(
        events,
        vec![ScanEvent::Error {
            detail: "Organization 'ghost' not found.".to_string()
        }]
    );
}

#[tokio::test]
async fn test_failing_unit_is_skipped() {
    let (fake, base) = FakeGitHub::start().await;
    fake.seed_repositories(3, 2);
    fake.route_status(
        format!("/repos/{ORG}/repo-1/branches"),
        StatusCode::BAD_GATEWAY,
        json!({ "message": "upstream" }),
    );

    let mut task = spawn_scan(Category::Branches, context(&base, ORG));
    let events = collect(&mut task).await;
    assert_well_formed(&events, 3);

    let data = events
        .iter()
        .filter(|e| matches!(e, ScanEvent::Data { .. }))
        .count();
    assert_eq!(data, 2);
    assert_eq!(
        events.last(),
        Some(&ScanEvent::Done {
            skipped: vec!["repo-1".to_string()]
        })
    );
}

#[tokio::test]
async fn test_empty_organization_completes() {
    let (fake, base) = FakeGitHub::start().await;
    fake.route(format!("/orgs/{ORG}/members"), json!([]));

    let mut task = spawn_scan(Category::Members, context(&base, ORG));
    let events = collect(&mut task).await;
    assert_eq!(
        events,
        vec![
            ScanEvent::Start { total: 0 },
            ScanEvent::Done { skipped: vec![] }
        ]
    );
}

#[tokio::test]
async fn test_cancel_stops_without_terminal_event() {
    let (fake, base) = FakeGitHub::start().await;
    fake.seed_repositories(10, 1);
    fake.delay_units(Duration::from_millis(300));

    let ctx = connect(&base, ORG).with_concurrency(1);
    let mut task = spawn_scan(Category::Repositories, Arc::new(ctx));
    assert_eq!(task.next_event().await, Some(ScanEvent::Start { total: 10 }));

    task.cancel();
    let rest = collect(&mut task).await;
    assert!(rest.iter().all(|e| !e.is_terminal()));
    assert_eq!(task.finish().await, ScanOutcome::Cancelled);

    let seen = fake.request_count();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(fake.request_count(), seen);
}

fn branch_batches(events: &[ScanEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Data {
                data: RecordBatch::Branches(branches),
            } => Some(branches.len()),
            _ => None,
        })
        .collect()
}

async fn retrying_scan(base: &str, max_retries: u32) -> Vec<ScanEvent> {
    let settings = common::retrying_settings(base, max_retries);
    let mut task = spawn_scan(Category::Branches, Arc::new(connect_with(&settings, ORG)));
    collect(&mut task).await
}

#[tokio::test]
async fn test_secondary_limit_forbidden_is_retried() {
    let (fake, base) = FakeGitHub::start().await;
    fake.seed_repositories(1, 2);
    let branches = format!("/repos/{ORG}/repo-0/branches");
    fake.script(&branches, [Scripted::secondary_limit()]);

    let events = retrying_scan(&base, 3).await;
    assert_well_formed(&events, 1);

    assert_eq!(fake.hits(&branches), 2);
    assert_eq!(branch_batches(&events), vec![2]);
    assert_eq!(events.last(), Some(&ScanEvent::Done { skipped: vec![] }));
}

#[tokio::test]
async fn test_transient_server_error_recovers() {
    let (fake, base) = FakeGitHub::start().await;
    fake.seed_repositories(1, 2);
    let branches = format!("/repos/{ORG}/repo-0/branches");
    fake.script(
        &branches,
        [Scripted::new(StatusCode::BAD_GATEWAY, json!({ "message": "upstream" }))],
    );

    let events = retrying_scan(&base, 2).await;
    assert_well_formed(&events, 1);

    assert_eq!(fake.hits(&branches), 2);
    assert_eq!(branch_batches(&events), vec![2]);
    assert_eq!(events.last(), Some(&ScanEvent::Done { skipped: vec![] }));
}

#[tokio::test]
async fn test_exhausted_quota_waits_for_reset() {
    let (fake, base) = FakeGitHub::start().await;
    fake.seed_repositories(1, 1);
    let listing = format!("/orgs/{ORG}/repos");
    fake.script(&listing, [Scripted::quota_exhausted(2)]);

    let started = Instant::now();
    let events = retrying_scan(&base, 1).await;

    assert!(started.elapsed() >= Duration::from_millis(900));
    assert_eq!(fake.hits(&listing), 2);
    assert_well_formed(&events, 1);
    assert_eq!(events.last(), Some(&ScanEvent::Done { skipped: vec![] }));
}

#[tokio::test]
async fn test_secondary_limit_honours_retry_after() {
    let (fake, base) = FakeGitHub::start().await;
    fake.seed_repositories(1, 2);
    let branches = format!("/repos/{ORG}/repo-0/branches");
    fake.script(
        &branches,
        [Scripted::new(
            StatusCode::TOO_MANY_REQUESTS,
            json!({ "message": "slow down" }),
        )
        .header("retry-after", 1)],
    );

    let started = Instant::now();
    let events = retrying_scan(&base, 2).await;

    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(fake.hits(&branches), 2);
    assert_eq!(branch_batches(&events), vec![2]);
    assert_eq!(events.last(), Some(&ScanEvent::Done { skipped: vec![] }));
}

#[tokio::test]
async fn test_persistent_rate_limit_fails_once() {
    let (fake, base) = FakeGitHub::start().await;
    fake.seed_repositories(1, 2);
    let branches = format!("/repos/{ORG}/repo-0/branches");
    fake.script(&branches, (0..5).map(|_| Scripted::secondary_limit()));

    let events = retrying_scan(&base, 1).await;

    assert_eq!(fake.hits(&branches), 2);
    assert_eq!(events.first(), Some(&ScanEvent::Start { total: 1 }));
    assert!(branch_batches(&events).is_empty());
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert_eq!(
        events.last(),
        Some(&ScanEvent::Error {
            detail: "rate limit still exceeded after 2 attempts".to_string()
        })
    );
}
