//! Core type definitions shared by the producer and consumer sides.
//!
//! Records are the normalized shapes emitted by the category scanners; the
//! newtypes and enums keep category names and permission levels out of
//! stringly-typed code.

mod category;
mod records;
mod scan_id;

pub use category::Category;
pub use records::{
    AccessRecord, BranchRecord, MemberRecord, Permission, RecordBatch, RepositoryAuditRecord,
    ResultSet, TeamPrivacy, TeamRecord, Visibility, UNKNOWN_EMAIL,
};
pub use scan_id::ScanId;
