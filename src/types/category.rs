//! The five audit categories.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the five audit dimensions of an organization.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Repository settings and governance.
    #[value(alias = "repos")]
    Repositories,
    /// Branches of every non-archived repository.
    Branches,
    /// Collaborator permission grants per repository.
    Access,
    /// Organization members.
    Members,
    /// Organization teams.
    Teams,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 5] = [
        Self::Repositories,
        Self::Branches,
        Self::Access,
        Self::Members,
        Self::Teams,
    ];

    /// Stable name used for storage keys and endpoint paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Repositories => "repositories",
            Self::Branches => "branches",
            Self::Access => "access",
            Self::Members => "members",
            Self::Teams => "teams",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "repositories" | "repos" => Ok(Self::Repositories),
            "branches" => Ok(Self::Branches),
            "access" => Ok(Self::Access),
            "members" => Ok(Self::Members),
            "teams" => Ok(Self::Teams),
            _ => Err(ProtocolError::UnknownCategory(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_str() {
        assert_eq!("repos".parse::<Category>().unwrap(), Category::Repositories);
        assert_eq!("Teams".parse::<Category>().unwrap(), Category::Teams);
        assert!("forks".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_names_round_trip() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn test_category_serde_name() {
        let json = serde_json::to_string(&Category::Access).unwrap();
        assert_eq!(json, "\"access\"");
    }
}
