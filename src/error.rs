//! Error types for orgscan.
//!
//! Uses `thiserror` for ergonomic error definitions. The taxonomy mirrors how
//! failures are handled: configuration problems are rejected before any
//! request, API failures are classified by whether a scan can survive them,
//! and storage/CLI errors wrap the rest.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while talking to the GitHub REST API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The credential was rejected (HTTP 401).
    #[error("authentication failed")]
    Auth,

    /// The credential lacks the scope for this resource (HTTP 403, not a rate limit).
    #[error("insufficient permissions: {0}")]
    Forbidden(String),

    /// The resource does not exist or is hidden from this credential.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate-limit waits and backoffs did not recover within the retry bound.
    #[error("rate limit still exceeded after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// Network failure, timeout, or 5xx that persisted across every retry.
    #[error("request to {path} failed after {attempts} attempts: {reason}")]
    Transient {
        path: String,
        attempts: u32,
        reason: String,
    },

    /// Any other non-success status.
    #[error("GitHub API error ({status}): {message}")]
    Status { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("failed to decode response from {path}: {reason}")]
    Decode { path: String, reason: String },

    /// The request could not be built (bad base URL, invalid header value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Whether this error must abort the whole scan rather than a single unit.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Auth | Self::Forbidden(_) | Self::RateLimited { .. } | Self::InvalidRequest(_)
        )
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Scan-level failures, surfaced to consumers as a terminal `error` event.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Organization '{0}' not found.")]
    OrganizationNotFound(String),

    /// The event receiver went away; the scan stops as if cancelled.
    #[error("event channel closed by consumer")]
    ChannelClosed,

    #[error("protocol violation: {0}")]
    Protocol(String),
}

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Configuration and credential errors. Raised synchronously, before any
/// request is issued or event channel opened.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("organization must not be empty")]
    MissingOrganization,

    #[error("access token must not be empty")]
    MissingToken,

    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("invalid settings format: {0}")]
    InvalidFormat(String),

    #[error("invalid setting: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors from the durable result store and the session store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to create storage directory: {0}")]
    DirectoryError(String),

    #[error("failed to save {key}: {reason}")]
    SaveFailed { key: String, reason: String },

    #[error("failed to load {key}: {reason}")]
    LoadFailed { key: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors at the event-channel boundary.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed event frame: {0}")]
    Malformed(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),
}

/// Errors surfaced by an event channel to the consumer.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The channel could not be opened; no event was received.
    #[error("{0}")]
    Open(String),

    /// The transport failed mid-stream.
    #[error("transport error: {0}")]
    Transport(String),

    /// A frame arrived but did not decode to an event.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Errors from the CLI layer.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
