//! Authenticated, rate-budgeted HTTP access to the GitHub REST API.

use crate::budget::RateBudget;
use crate::config::AppSettings;
use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

const SECONDARY_BACKOFF_BASE: Duration = Duration::from_secs(1);
const SECONDARY_BACKOFF_MAX: Duration = Duration::from_secs(60);

/// Bounded, capped exponential retry schedule.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.backoff_base_ms),
            max_delay: Duration::from_millis(settings.backoff_max_ms),
        }
    }

    /// Delay before retry number `attempt` (0-based) of a transient failure.
    pub fn backoff(&self, attempt: u32) -> Duration {
        capped_exponential(self.base_delay, self.max_delay, attempt)
    }
}

fn capped_exponential(base: Duration, max: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.min(16));
    base.saturating_mul(factor).min(max)
}

/// Why a single attempt did not produce a usable response.
enum Failure {
    RateLimited { retry_after: Option<Duration> },
    Transient(String),
}

/// Outcome of inspecting a 403/429 response.
#[derive(Debug, PartialEq)]
enum LimitKind {
    Limited { retry_after: Option<Duration> },
    /// A plain permission failure, with the platform's message.
    Denied(String),
}

/// GitHub REST client bound to one credential.
///
/// Cheap to share behind an `Arc`; every clone of the budget gates the same
/// quota.
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    budget: Arc<RateBudget>,
    retry: RetryPolicy,
    per_page: u32,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("per_page", &self.per_page)
            .finish()
    }
}

impl GitHubClient {
    /// Build a client for `token` using the given settings and shared budget.
    pub fn new(token: &str, settings: &AppSettings, budget: Arc<RateBudget>) -> ApiResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("orgscan/", env!("CARGO_PKG_VERSION"))),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            http,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            budget,
            retry: RetryPolicy::from_settings(settings),
            per_page: settings.per_page,
        })
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn budget(&self) -> &Arc<RateBudget> {
        &self.budget
    }

    /// Issue a GET, retrying rate limits and transient failures.
    ///
    /// A 401 is [`ApiError::Auth`] and a 403 that is not a rate limit is
    /// [`ApiError::Forbidden`]. Any other response that is not a rate limit
    /// or a 5xx is returned; the caller decides what its status means.
    pub async fn send(&self, path: &str, query: &[(&str, String)]) -> ApiResult<Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt: u32 = 0;

        loop {
            self.budget.wait_if_needed().await;

            let failure = match self
                .http
                .get(&url)
                .query(query)
                .bearer_auth(&self.token)
                .send()
                .await
            {
                Ok(response) => {
                    self.observe_budget(response.headers());
                    let status = response.status();

                    if status == StatusCode::UNAUTHORIZED {
                        return Err(ApiError::Auth);
                    }

                    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS
                    {
                        match classify_limit(response).await {
                            LimitKind::Limited { retry_after } => {
                                Failure::RateLimited { retry_after }
                            }
                            LimitKind::Denied(message) => {
                                debug!(path, attempt, "permission denied");
                                return Err(ApiError::Forbidden(message));
                            }
                        }
                    } else if status.is_server_error() {
                        Failure::Transient(format!("HTTP {}", status.as_u16()))
                    } else {
                        debug!(path, status = status.as_u16(), attempt, "GET");
                        return Ok(response);
                    }
                }
                Err(e) if e.is_builder() => return Err(ApiError::InvalidRequest(e.to_string())),
                Err(e) => Failure::Transient(e.to_string()),
            };

            if attempt >= self.retry.max_retries {
                return Err(match failure {
                    Failure::RateLimited { .. } => ApiError::RateLimited {
                        attempts: attempt + 1,
                    },
                    Failure::Transient(reason) => ApiError::Transient {
                        path: path.to_string(),
                        attempts: attempt + 1,
                        reason,
                    },
                });
            }

            let delay = match failure {
                Failure::RateLimited { retry_after } => {
                    if self.budget.can_proceed() {
                        // Secondary limit: the quota is fine, the burst was not.
                        let backoff =
                            capped_exponential(SECONDARY_BACKOFF_BASE, SECONDARY_BACKOFF_MAX, attempt);
                        let delay = retry_after.map_or(backoff, |after| after.max(backoff));
                        warn!(path, attempt, delay_ms = delay.as_millis() as u64, "secondary rate limit");
                        delay
                    } else {
                        // Primary exhaustion: the budget already holds the reset deadline.
                        Duration::ZERO
                    }
                }
                Failure::Transient(reason) => {
                    let delay = self.retry.backoff(attempt);
                    warn!(path, attempt, %reason, delay_ms = delay.as_millis() as u64, "transient failure, retrying");
                    delay
                }
            };

            sleep(delay).await;
            attempt += 1;
        }
    }

    /// GET a JSON resource; any non-success status is an error.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        let response = self.send(path, query).await?;
        if !response.status().is_success() {
            return Err(error_for_status(path, response).await);
        }
        decode(path, response).await
    }

    /// GET a JSON resource, treating client errors as absence.
    ///
    /// Used for per-unit detail endpoints where a missing resource or a
    /// permission gap means "use the default", not "fail the scan".
    pub async fn get_lenient<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<Option<T>> {
        let response = match self.send(path, query).await {
            Ok(response) => response,
            Err(ApiError::Forbidden(message)) => {
                debug!(path, %message, "detail forbidden, using default");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let status = response.status();
        if status.is_success() {
            return decode(path, response).await.map(Some);
        }
        if status.is_client_error() {
            debug!(path, status = status.as_u16(), "detail unavailable, using default");
            return Ok(None);
        }
        Err(error_for_status(path, response).await)
    }

    /// Whether a resource exists.
    pub async fn exists(&self, path: &str) -> ApiResult<bool> {
        match self.send(path, &[]).await {
            Ok(response) => Ok(response.status().is_success()),
            Err(ApiError::Forbidden(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn observe_budget(&self, headers: &HeaderMap) {
        if let Some((remaining, reset_at)) = parse_budget(headers) {
            self.budget.record_response(remaining, reset_at);
        }
    }
}

/// Read the quota headers attached to every response.
fn parse_budget(headers: &HeaderMap) -> Option<(u32, DateTime<Utc>)> {
    let remaining = header_str(headers, REMAINING_HEADER)?.parse::<u32>().ok()?;
    let reset = header_str(headers, RESET_HEADER)?.parse::<i64>().ok()?;
    Some((remaining, DateTime::from_timestamp(reset, 0)?))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

async fn classify_limit(response: Response) -> LimitKind {
    let headers = response.headers();
    if header_str(headers, REMAINING_HEADER) == Some("0") {
        return LimitKind::Limited { retry_after: None };
    }
    let retry_after = header_str(headers, RETRY_AFTER.as_str())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs);
    if retry_after.is_some() || response.status() == StatusCode::TOO_MANY_REQUESTS {
        return LimitKind::Limited { retry_after };
    }
    limit_from_message(response_message(response).await)
}

/// A 403 with quota left is a secondary limit only when its message says so.
fn limit_from_message(message: String) -> LimitKind {
    if message.to_lowercase().contains("rate limit") {
        LimitKind::Limited { retry_after: None }
    } else {
        LimitKind::Denied(message)
    }
}

/// Map a non-success response onto the error taxonomy.
pub(crate) async fn error_for_status(path: &str, response: Response) -> ApiError {
    let status = response.status();
    let message = response_message(response).await;
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Auth,
        StatusCode::FORBIDDEN => ApiError::Forbidden(message),
        StatusCode::NOT_FOUND => ApiError::NotFound(path.to_string()),
        _ => ApiError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

async fn response_message(response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(body)
}

pub(crate) async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> ApiResult<T> {
    let body = response.bytes().await.map_err(|e| ApiError::Transient {
        path: path.to_string(),
        attempts: 1,
        reason: e.to_string(),
    })?;
    serde_json::from_slice(&body).map_err(|e| ApiError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })
}
