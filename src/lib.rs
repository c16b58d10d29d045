//! # orgscan - Streamed security audits of GitHub organizations
//!
//! orgscan walks a GitHub organization and reports, category by category,
//! the facts a security review asks about: repository protection and
//! ownership, stale branches, collaborator permissions, member activity and
//! team structure.
//!
//! ## Features
//!
//! - **Incremental results**: every scan is an event stream; records arrive
//!   as each repository, member or team is audited
//! - **Rate-limit aware**: a shared budget suspends requests before the
//!   platform quota runs out and resumes after the reported reset
//! - **Partial failure tolerance**: a unit that keeps failing is skipped and
//!   reported instead of aborting the scan
//! - **Local or remote**: the same consumer drives in-process scans or a
//!   Server-Sent Events endpoint served by `orgscan serve`
//! - **Result persistence**: the last result list per category survives
//!   restarts
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use orgscan::config::{AppSettings, Credentials};
//! use orgscan::consumer::{AuditClient, LocalChannel};
//! use orgscan::types::Category;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let channel = Arc::new(LocalChannel::new(AppSettings::default()));
//!     let mut client = AuditClient::new(channel, Credentials::new("acme", "ghp_..."))?;
//!
//!     client.start_scan(Category::Repositories)?;
//!     client.wait(Category::Repositories).await;
//!
//!     println!("{} repositories audited", client.results(Category::Repositories).len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`github`] - REST client with retries, pagination and quota reporting
//! - [`budget`] - Shared rate budget and local request pacing
//! - [`scanner`] - One scanner per audit category
//! - [`orchestrator`] - Runs a scanner as a cancellable task behind an event channel
//! - [`protocol`] - Event types and their Server-Sent Event framing
//! - [`consumer`] - Client side: opens channels and accumulates results
//! - [`server`] - HTTP endpoints streaming scans to remote consumers
//! - [`storage`] - Result and session persistence
//! - [`config`] - Settings, paths and credentials
//! - [`error`] - Error taxonomy

pub mod budget;
pub mod cli;
pub mod config;
pub mod consumer;
pub mod error;
pub mod github;
pub mod orchestrator;
pub mod output;
pub mod protocol;
pub mod scanner;
pub mod server;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::{AppSettings, Credentials};
pub use consumer::{AuditClient, EventChannel, LocalChannel, SseChannel};
pub use error::{ApiError, CliError, ScanError};
pub use orchestrator::{spawn_scan, ScanTask};
pub use protocol::ScanEvent;
pub use scanner::{CategoryScanner, ScanContext};
pub use types::{Category, RecordBatch, ResultSet, ScanId};
