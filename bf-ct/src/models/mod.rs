//! Continuity data model
//!
//! Every entity belongs to exactly one book, and every book to exactly one
//! owner. Enumerations are stored in the database as their snake_case
//! string form (`as_str` / `parse`).

pub mod book;
pub mod fact;
pub mod issue;
pub mod scan;
pub mod timeline;

pub use book::{Book, Chapter};
pub use fact::{FactConfidence, FactImportance, FactRevision, FactSource, NewFact, StoryFact};
pub use issue::{
    ConsistencyIssue, IssueCandidate, IssueSeverity, IssueStatus, IssueType, Resolution,
    ResolutionMethod,
};
pub use scan::ScanStatus;
pub use timeline::TimelineEvent;
