//! Normalized audit records.
//!
//! Each record kind is immutable once created and keyed by its natural
//! identity. [`RecordBatch`] is the wire payload of a `data` event and
//! [`ResultSet`] is the accumulated, append-only list a consumer builds from
//! those payloads.

use super::Category;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Email value reported when a member has no public email.
pub const UNKNOWN_EMAIL: &str = "unknown";

/// Repository visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Internal,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Private => write!(f, "private"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Effective permission of a collaborator on a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
    Maintain,
    Admin,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Maintain => write!(f, "maintain"),
            Self::Write => write!(f, "write"),
            Self::Read => write!(f, "read"),
        }
    }
}

/// Team privacy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamPrivacy {
    Secret,
    Closed,
}

impl fmt::Display for TeamPrivacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secret => write!(f, "secret"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Governance snapshot of one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryAuditRecord {
    /// Short repository name.
    pub repository: String,
    /// `owner/name`, the record identity.
    pub full_name: String,
    pub owner: String,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub visibility: Visibility,
    pub archived: bool,
    pub default_branch: String,
    pub language: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub admin_count: usize,
    pub admin_names: Vec<String>,
    /// A CODEOWNERS file exists in one of the recognized locations.
    pub has_codeowners: bool,
    /// The default branch requires at least one approving review.
    pub has_required_reviewers: bool,
    /// No pull-request rule guards the default branch.
    pub allows_direct_push: bool,
    pub branch_count: u64,
    pub url: String,
}

/// One branch of a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchRecord {
    pub repository: String,
    pub branch_name: String,
    pub last_commit_date: Option<DateTime<Utc>>,
    /// Whole days since the last commit, when known.
    pub age_days: Option<i64>,
    pub protected: bool,
}

/// A collaborator's grant on a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRecord {
    pub repository: String,
    pub username: String,
    pub permission: Permission,
}

/// An organization member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub username: String,
    pub role: String,
    /// Public email, or [`UNKNOWN_EMAIL`].
    pub email: String,
    pub last_activity: Option<DateTime<Utc>>,
    /// Whole days since the last public event; `None` when there is none.
    pub days_inactive: Option<i64>,
}

/// An organization team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub privacy: TeamPrivacy,
    pub members_count: u64,
    pub repos_count: u64,
}

/// Payload of a `data` event: one concrete shape per category.
///
/// Repositories, members and teams are emitted one record at a time; branches
/// and access grants are naturally grouped per repository and travel as
/// batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", content = "payload", rename_all = "lowercase")]
pub enum RecordBatch {
    Repositories(RepositoryAuditRecord),
    Branches(Vec<BranchRecord>),
    Access(Vec<AccessRecord>),
    Members(MemberRecord),
    Teams(TeamRecord),
}

impl RecordBatch {
    /// Category this payload belongs to.
    pub fn category(&self) -> Category {
        match self {
            Self::Repositories(_) => Category::Repositories,
            Self::Branches(_) => Category::Branches,
            Self::Access(_) => Category::Access,
            Self::Members(_) => Category::Members,
            Self::Teams(_) => Category::Teams,
        }
    }

    /// Number of records carried.
    pub fn len(&self) -> usize {
        match self {
            Self::Branches(records) => records.len(),
            Self::Access(records) => records.len(),
            Self::Repositories(_) | Self::Members(_) | Self::Teams(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Append-only accumulated results of one category.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultSet {
    Repositories(Vec<RepositoryAuditRecord>),
    Branches(Vec<BranchRecord>),
    Access(Vec<AccessRecord>),
    Members(Vec<MemberRecord>),
    Teams(Vec<TeamRecord>),
}

impl ResultSet {
    /// An empty result list for `category`.
    pub fn empty(category: Category) -> Self {
        match category {
            Category::Repositories => Self::Repositories(Vec::new()),
            Category::Branches => Self::Branches(Vec::new()),
            Category::Access => Self::Access(Vec::new()),
            Category::Members => Self::Members(Vec::new()),
            Category::Teams => Self::Teams(Vec::new()),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::Repositories(_) => Category::Repositories,
            Self::Branches(_) => Category::Branches,
            Self::Access(_) => Category::Access,
            Self::Members(_) => Category::Members,
            Self::Teams(_) => Category::Teams,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Repositories(v) => v.len(),
            Self::Branches(v) => v.len(),
            Self::Access(v) => v.len(),
            Self::Members(v) => v.len(),
            Self::Teams(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a batch in arrival order.
    ///
    /// Returns the number of records appended, or hands the batch back when it
    /// belongs to a different category.
    pub fn append(&mut self, batch: RecordBatch) -> Result<usize, RecordBatch> {
        match (self, batch) {
            (Self::Repositories(v), RecordBatch::Repositories(r)) => {
                v.push(r);
                Ok(1)
            }
            (Self::Branches(v), RecordBatch::Branches(rs)) => {
                let n = rs.len();
                v.extend(rs);
                Ok(n)
            }
            (Self::Access(v), RecordBatch::Access(rs)) => {
                let n = rs.len();
                v.extend(rs);
                Ok(n)
            }
            (Self::Members(v), RecordBatch::Members(r)) => {
                v.push(r);
                Ok(1)
            }
            (Self::Teams(v), RecordBatch::Teams(r)) => {
                v.push(r);
                Ok(1)
            }
            (_, batch) => Err(batch),
        }
    }

    /// Serialize the records as a plain JSON array.
    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            Self::Repositories(v) => serde_json::to_string_pretty(v),
            Self::Branches(v) => serde_json::to_string_pretty(v),
            Self::Access(v) => serde_json::to_string_pretty(v),
            Self::Members(v) => serde_json::to_string_pretty(v),
            Self::Teams(v) => serde_json::to_string_pretty(v),
        }
    }

    /// Parse a JSON array of `category` records.
    pub fn from_json(category: Category, json: &str) -> serde_json::Result<Self> {
        Ok(match category {
            Category::Repositories => Self::Repositories(serde_json::from_str(json)?),
            Category::Branches => Self::Branches(serde_json::from_str(json)?),
            Category::Access => Self::Access(serde_json::from_str(json)?),
            Category::Members => Self::Members(serde_json::from_str(json)?),
            Category::Teams => Self::Teams(serde_json::from_str(json)?),
        })
    }
}
