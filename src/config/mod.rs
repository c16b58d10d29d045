//! Configuration management for orgscan.
//!
//! Provides XDG-compliant paths, tunable engine settings, and the
//! organization/credential pair every scan is parameterized by.

mod credentials;
mod settings;

pub use credentials::Credentials;
pub use settings::{AppSettings, Paths};
