//! Consistency issues and their lifecycle
//!
//! `open` is the only non-terminal status. Issues leave it through the
//! resolution workflow (see [`crate::resolution`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The five kinds of problem the checker may flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    /// New text states something incompatible with a stored fact
    Contradiction,
    /// Events in an impossible order
    TimelineConflict,
    /// A character knows something they could not know yet
    CharacterKnowledge,
    /// A character is somewhere they cannot be
    LocationImpossible,
    /// A character acts against an established trait
    TraitInconsistency,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Contradiction => "contradiction",
            IssueType::TimelineConflict => "timeline_conflict",
            IssueType::CharacterKnowledge => "character_knowledge",
            IssueType::LocationImpossible => "location_impossible",
            IssueType::TraitInconsistency => "trait_inconsistency",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "contradiction" => Some(IssueType::Contradiction),
            "timeline_conflict" => Some(IssueType::TimelineConflict),
            "character_knowledge" => Some(IssueType::CharacterKnowledge),
            "location_impossible" => Some(IssueType::LocationImpossible),
            "trait_inconsistency" => Some(IssueType::TraitInconsistency),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Critical,
    Warning,
}

impl IssueSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueSeverity::Critical => "critical",
            IssueSeverity::Warning => "warning",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(IssueSeverity::Critical),
            "warning" => Some(IssueSeverity::Warning),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    Resolved,
    Acknowledged,
    Dismissed,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Open => "open",
            IssueStatus::Resolved => "resolved",
            IssueStatus::Acknowledged => "acknowledged",
            IssueStatus::Dismissed => "dismissed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(IssueStatus::Open),
            "resolved" => Some(IssueStatus::Resolved),
            "acknowledged" => Some(IssueStatus::Acknowledged),
            "dismissed" => Some(IssueStatus::Dismissed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, IssueStatus::Open)
    }
}

/// User action that closes an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// The manuscript was corrected
    Fixed,
    /// The inconsistency is deliberate
    Intentional,
    /// Known, will not be addressed
    WontFix,
}

impl ResolutionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionMethod::Fixed => "fixed",
            ResolutionMethod::Intentional => "intentional",
            ResolutionMethod::WontFix => "wont_fix",
        }
    }

    /// Strict parse; unknown methods are `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fixed" => Some(ResolutionMethod::Fixed),
            "intentional" => Some(ResolutionMethod::Intentional),
            "wont_fix" => Some(ResolutionMethod::WontFix),
            _ => None,
        }
    }

    /// Status an issue moves to under this method
    pub fn target_status(&self) -> IssueStatus {
        match self {
            ResolutionMethod::Fixed => IssueStatus::Resolved,
            ResolutionMethod::Intentional => IssueStatus::Acknowledged,
            ResolutionMethod::WontFix => IssueStatus::Dismissed,
        }
    }
}

/// Latest resolution record; a later resolve overwrites it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Method exactly as the caller sent it
    pub method: String,
    pub notes: String,
    pub resolved_at: DateTime<Utc>,
}

/// An issue proposed by the checker, not yet stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCandidate {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: IssueSeverity,
    pub title: String,
    pub description: String,
    pub excerpt: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyIssue {
    pub id: Uuid,
    pub book_id: Uuid,
    pub chapter_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: IssueSeverity,
    pub title: String,
    pub description: String,
    pub excerpt: String,
    pub suggestion: String,
    pub status: IssueStatus,
    pub resolution: Option<Resolution>,
    pub detected_at: DateTime<Utc>,
}

impl ConsistencyIssue {
    /// Open a new issue from a checker candidate
    pub fn from_candidate(
        book_id: Uuid,
        chapter_id: Option<Uuid>,
        candidate: IssueCandidate,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            book_id,
            chapter_id,
            issue_type: candidate.issue_type,
            severity: candidate.severity,
            title: candidate.title,
            description: candidate.description,
            excerpt: candidate.excerpt,
            suggestion: candidate.suggestion,
            status: IssueStatus::Open,
            resolution: None,
            detected_at,
        }
    }
}
