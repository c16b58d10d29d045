use super::AppState;
use crate::config::Credentials;
use crate::error::{ApiError, ScanError};
use crate::orchestrator::spawn_scan;
use crate::protocol::ScanEvent;
use crate::scanner::basic_stats;
use crate::storage::OrgSummary;
use crate::types::Category;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive};
use axum::response::{IntoResponse, Json, Sse};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing::{info, warn};

const ORG_HEADER: &str = "gh-org";
const TOKEN_HEADER: &str = "gh-token";

/// Error response with a JSON `{"detail": ...}` body.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    detail: String,
}

impl HttpError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub(super) fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ScanError> for HttpError {
    fn from(error: ScanError) -> Self {
        let status = match &error {
            ScanError::OrganizationNotFound(_) | ScanError::Api(ApiError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ScanError::Api(ApiError::Auth) => StatusCode::UNAUTHORIZED,
            ScanError::Api(ApiError::Forbidden(_)) => StatusCode::FORBIDDEN,
            ScanError::Api(ApiError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, error.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(ErrorBody {
            detail: self.detail,
        });
        (self.status, body).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    pub gh_org: Option<String>,
    pub gh_token: Option<String>,
}

impl StreamQuery {
    fn credentials(self) -> Credentials {
        Credentials::new(
            self.gh_org.unwrap_or_default(),
            self.gh_token.unwrap_or_default(),
        )
    }
}

pub async fn audit_stream_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<StreamQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, HttpError> {
    let category: Category = category
        .parse()
        .map_err(|e: crate::error::ProtocolError| HttpError::new(StatusCode::NOT_FOUND, e.to_string()))?;
    let credentials = query.credentials();
    credentials
        .validate()
        .map_err(|e| HttpError::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    let ctx = state.scan_context(&credentials)?;
    let task = spawn_scan(category, ctx);
    info!(%category, id = %task.id().short(), "streaming scan");

    let stream = task
        .into_stream()
        .filter_map(|event| encode_event(&event).map(|data| Ok(Event::default().data(data))));

    Ok(Sse::new(stream).keep_alive(default_keep_alive()))
}

pub async fn basic_stats_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<OrgSummary>, HttpError> {
    let credentials = Credentials::new(
        header_value(&headers, ORG_HEADER),
        header_value(&headers, TOKEN_HEADER),
    );
    credentials
        .validate()
        .map_err(|e| HttpError::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    let ctx = state.scan_context(&credentials)?;
    let summary = basic_stats(&ctx.client, &ctx.organization).await?;
    Ok(Json(summary))
}

fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn encode_event(event: &ScanEvent) -> Option<String> {
    event
        .to_json()
        .map_err(|err| {
            warn!(kind = event.kind(), "failed to encode scan event: {err}");
            err
        })
        .ok()
}

fn default_keep_alive() -> KeepAlive {
    KeepAlive::new()
        .interval(Duration::from_secs(15))
        .text("keep-alive")
}
