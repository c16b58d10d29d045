//! Persistence.
//!
//! The durable result store keeps the five accumulated result lists across
//! restarts; the session store holds the ephemeral credential and cached
//! summary and is wiped on disconnect.

mod results;
mod session;

pub use results::ResultStore;
pub use session::{OrgSummary, SessionState, SessionStore};
