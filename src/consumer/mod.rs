//! Stream consumer: turns event channels into per-category result lists.
//!
//! [`AuditClient`] is the entry point. It opens one channel per started
//! category through an [`EventChannel`], either [`LocalChannel`] for scans
//! in this process or [`SseChannel`] for a remote `orgscan serve`, and
//! applies every event to that category's [`ScanSession`].

mod channel;
mod client;
mod session;

pub use channel::{decode_events, EventChannel, EventStream, LocalChannel, SseChannel};
pub use client::{AuditClient, ScanHandle};
pub use session::{Applied, ProgressSnapshot, ScanSession, CONNECTION_LOST};
