//! Organization identifier and access credential.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The organization to audit and the token used to audit it.
///
/// Supplied once per process and reused for every category.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub organization: String,
    pub token: String,
}

impl Credentials {
    /// Build credentials, trimming surrounding whitespace.
    pub fn new(organization: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            organization: organization.into().trim().to_string(),
            token: token.into().trim().to_string(),
        }
    }

    /// Reject empty values before any request is made.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.organization.is_empty() {
            return Err(ConfigError::MissingOrganization);
        }
        if self.token.is_empty() {
            return Err(ConfigError::MissingToken);
        }
        Ok(())
    }
}

// The token never appears in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("organization", &self.organization)
            .field("token", &"<redacted>")
            .finish()
    }
}
