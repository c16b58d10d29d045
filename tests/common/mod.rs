//! In-process stand-in for the GitHub REST API.

#![allow(dead_code)]

use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use orgscan::config::{AppSettings, Credentials};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const ORG: &str = "acme";
pub const TOKEN: &str = "ghp_test";

/// One queued response, served before the path's regular route.
#[derive(Debug, Clone)]
pub struct Scripted {
    status: StatusCode,
    body: Value,
    headers: Vec<(&'static str, String)>,
}

impl Scripted {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body,
            headers: Vec::new(),
        }
    }

    /// Replace a default header or add a new one.
    pub fn header(mut self, name: &'static str, value: impl ToString) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }

    /// A 403 carrying GitHub's secondary rate limit message, quota left.
    pub fn secondary_limit() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            json!({ "message": "You have exceeded a secondary rate limit. Please wait a few minutes before you try again." }),
        )
    }

    /// A 403 reporting an exhausted quota that resets `reset_in_secs` from now.
    pub fn quota_exhausted(reset_in_secs: i64) -> Self {
        let reset = chrono::Utc::now().timestamp() + reset_in_secs;
        Self::new(
            StatusCode::FORBIDDEN,
            json!({ "message": "API rate limit exceeded for user." }),
        )
        .header("x-ratelimit-remaining", 0)
        .header("x-ratelimit-reset", reset)
    }
}

/// Canned responses keyed by path. Unknown paths answer 404.
#[derive(Default)]
pub struct FakeGitHub {
    routes: Mutex<HashMap<String, (StatusCode, Value)>>,
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    hits: Mutex<HashMap<String, usize>>,
    status_override: Mutex<Option<StatusCode>>,
    unit_delay: Mutex<Option<Duration>>,
    requests: AtomicUsize,
}

impl FakeGitHub {
    /// Serve on an ephemeral port; returns the API base URL.
    pub async fn start() -> (Arc<Self>, String) {
        let fake = Arc::new(Self::default());
        let app = Router::new()
            .fallback(respond)
            .with_state(Arc::clone(&fake));
        let addr = spawn_router(app).await;
        (fake, format!("http://{addr}"))
    }

    pub fn route(&self, path: impl Into<String>, body: Value) {
        self.route_status(path, StatusCode::OK, body);
    }

    pub fn route_status(&self, path: impl Into<String>, status: StatusCode, body: Value) {
        self.routes.lock().unwrap().insert(path.into(), (status, body));
    }

    /// Serve `responses` in order on `path`, then fall back to its route.
    pub fn script(&self, path: impl Into<String>, responses: impl IntoIterator<Item = Scripted>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(path.into())
            .or_default()
            .extend(responses);
    }

    /// Requests received on `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    /// Answer every request with `status`.
    pub fn fail_all(&self, status: StatusCode) {
        *self.status_override.lock().unwrap() = Some(status);
    }

    /// Slow down every per-repository request.
    pub fn delay_units(&self, delay: Duration) {
        *self.unit_delay.lock().unwrap() = Some(delay);
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// `count` repositories of [`ORG`], each with `branches` dated branches.
    pub fn seed_repositories(&self, count: usize, branches: usize) {
        let repos: Vec<Value> = (0..count)
            .map(|i| {
                json!({
                    "name": format!("repo-{i}"),
                    "full_name": format!("{ORG}/repo-{i}"),
                    "owner": { "login": ORG },
                    "private": i % 2 == 0,
                    "visibility": if i % 2 == 0 { "private" } else { "public" },
                    "default_branch": "main",
                    "html_url": format!("https://github.com/{ORG}/repo-{i}"),
                })
            })
            .collect();
        self.route(format!("/orgs/{ORG}/repos"), Value::Array(repos));

        for i in 0..count {
            let list: Vec<Value> = (0..branches)
                .map(|j| {
                    json!({
                        "name": if j == 0 { "main".to_string() } else { format!("feature-{j}") },
                        "protected": j == 0,
                        "commit": { "sha": format!("sha-{i}-{j}") },
                    })
                })
                .collect();
            self.route(format!("/repos/{ORG}/repo-{i}/branches"), Value::Array(list));
            for j in 0..branches {
                self.route(
                    format!("/repos/{ORG}/repo-{i}/commits/sha-{i}-{j}"),
                    json!({ "commit": { "committer": { "date": "2024-01-01T00:00:00Z" } } }),
                );
            }
        }
    }
}

async fn respond(State(fake): State<Arc<FakeGitHub>>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    fake.requests.fetch_add(1, Ordering::SeqCst);
    *fake.hits.lock().unwrap().entry(path.clone()).or_default() += 1;

    let delay = *fake.unit_delay.lock().unwrap();
    if let Some(delay) = delay {
        if path.starts_with("/repos/") {
            tokio::time::sleep(delay).await;
        }
    }

    let forced = *fake.status_override.lock().unwrap();
    let scripted = fake
        .scripts
        .lock()
        .unwrap()
        .get_mut(&path)
        .and_then(VecDeque::pop_front);
    let route = fake.routes.lock().unwrap().get(&path).cloned();

    let reply = match (forced, scripted, route) {
        (Some(status), _, _) => Scripted::new(status, json!({ "message": "Bad credentials" })),
        (None, Some(scripted), _) => scripted,
        (None, None, Some((status, body))) => Scripted::new(status, body),
        (None, None, None) => Scripted::new(StatusCode::NOT_FOUND, json!({ "message": "Not Found" })),
    };
    reply.into_response()
}

impl IntoResponse for Scripted {
    fn into_response(self) -> Response {
        let reset = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp();
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("4999"));
        headers.insert("x-ratelimit-reset", HeaderValue::from(reset));
        for (name, value) in self.headers {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_str(&value).unwrap(),
            );
        }
        (self.status, headers, Json(self.body)).into_response()
    }
}

/// Serve `app` on an ephemeral local port.
pub async fn spawn_router(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Settings pointing at the fake API, with no retries.
pub fn settings(api_base_url: &str) -> AppSettings {
    retrying_settings(api_base_url, 0)
}

/// Settings allowing `max_retries` retries with 1 ms transient backoff.
pub fn retrying_settings(api_base_url: &str, max_retries: u32) -> AppSettings {
    AppSettings {
        api_base_url: api_base_url.to_string(),
        max_retries,
        backoff_base_ms: 1,
        backoff_max_ms: 1,
        request_timeout_ms: 5_000,
        ..AppSettings::default()
    }
}

pub fn credentials() -> Credentials {
    Credentials::new(ORG, TOKEN)
}
