//! HTTP surface: the SSE event channel endpoint and the stats endpoint.
//!
//! Each request to `/api/audit/{category}/stream` spawns its own scan task
//! and streams its events. The stream carries a drop guard, so a client
//! disconnect cancels the scan. Scans sharing a token share one rate budget
//! through the [`BudgetRegistry`].

mod handlers;

pub use handlers::HttpError;

use crate::budget::BudgetRegistry;
use crate::config::{AppSettings, Credentials};
use crate::scanner::ScanContext;
use axum::body::Body;
use axum::http::{HeaderValue, Method, Request};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span};

/// Origin of the bundled dashboard during development.
const DASHBOARD_ORIGIN: &str = "http://localhost:3000";

/// Shared server state.
#[derive(Debug, Clone)]
pub struct AppState {
    settings: Arc<AppSettings>,
    budgets: Arc<BudgetRegistry>,
}

impl AppState {
    pub fn new(settings: AppSettings) -> Self {
        let budgets = Arc::new(BudgetRegistry::new(&settings));
        Self {
            settings: Arc::new(settings),
            budgets,
        }
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Scan context for `credentials`, sharing the credential's budget.
    fn scan_context(&self, credentials: &Credentials) -> Result<Arc<ScanContext>, HttpError> {
        let budget = self.budgets.for_token(&credentials.token);
        ScanContext::connect(credentials, &self.settings, budget)
            .map(Arc::new)
            .map_err(|e| HttpError::internal(e.to_string()))
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static(DASHBOARD_ORIGIN))
        .allow_methods([Method::GET])
        .allow_headers(Any);

    // Spans carry the path only; the query holds the token.
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        info_span!("http", method = %request.method(), path = %request.uri().path())
    });

    Router::new()
        .route(
            "/api/audit/{category}/stream",
            get(handlers::audit_stream_handler),
        )
        .route("/api/stats/basic", get(handlers::basic_stats_handler))
        .with_state(state)
        .layer(cors)
        .layer(trace)
}

/// Serve on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "orgscan server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
