//! Story facts
//!
//! A fact is one attributed claim about a story element: `subject` has
//! `attribute` = `current_value`. When the value changes the previous value
//! moves onto `history`. Nothing enforces a single current value per
//! (subject, attribute).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How directly the manuscript states the fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FactConfidence {
    /// Stated outright in the text
    #[default]
    Explicit,
    /// Strongly implied
    Implicit,
    /// Deduced by the reader or the model
    Inferred,
}

impl FactConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactConfidence::Explicit => "explicit",
            FactConfidence::Implicit => "implicit",
            FactConfidence::Inferred => "inferred",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "explicit" => Some(FactConfidence::Explicit),
            "implicit" => Some(FactConfidence::Implicit),
            "inferred" => Some(FactConfidence::Inferred),
            _ => None,
        }
    }
}

/// How much a contradiction of this fact would matter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FactImportance {
    Critical,
    #[default]
    Significant,
    Minor,
}

impl FactImportance {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactImportance::Critical => "critical",
            FactImportance::Significant => "significant",
            FactImportance::Minor => "minor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(FactImportance::Critical),
            "significant" => Some(FactImportance::Significant),
            "minor" => Some(FactImportance::Minor),
            _ => None,
        }
    }

    /// Sort key, most important first
    pub fn rank(&self) -> u8 {
        match self {
            FactImportance::Critical => 0,
            FactImportance::Significant => 1,
            FactImportance::Minor => 2,
        }
    }
}

/// Who recorded the fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FactSource {
    #[default]
    User,
    Ai,
    Import,
}

impl FactSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactSource::User => "user",
            FactSource::Ai => "ai",
            FactSource::Import => "import",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(FactSource::User),
            "ai" => Some(FactSource::Ai),
            "import" => Some(FactSource::Import),
            _ => None,
        }
    }
}

/// A value the fact held before it was revised
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactRevision {
    pub value: String,
    pub replaced_at: DateTime<Utc>,
    /// Chapter in which the replacing value was established
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_in: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryFact {
    pub id: Uuid,
    pub book_id: Uuid,
    pub category: String,
    pub subject: String,
    pub attribute: String,
    /// Value as first recorded
    pub value: String,
    pub current_value: String,
    /// Chapter that established the fact
    pub established_in: Option<Uuid>,
    pub confidence: FactConfidence,
    pub importance: FactImportance,
    pub source: FactSource,
    pub history: Vec<FactRevision>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for fact creation
#[derive(Debug, Clone)]
pub struct NewFact {
    pub category: String,
    pub subject: String,
    pub attribute: String,
    pub value: String,
    pub current_value: Option<String>,
    pub established_in: Option<Uuid>,
    pub confidence: FactConfidence,
    pub importance: FactImportance,
    pub source: FactSource,
}

impl StoryFact {
    /// Build a new fact for `book_id` with fresh id and timestamps
    pub fn create(book_id: Uuid, new: NewFact, now: DateTime<Utc>) -> Self {
        let current_value = new.current_value.unwrap_or_else(|| new.value.clone());
        Self {
            id: Uuid::new_v4(),
            book_id,
            category: new.category,
            subject: new.subject,
            attribute: new.attribute,
            value: new.value,
            current_value,
            established_in: new.established_in,
            confidence: new.confidence,
            importance: new.importance,
            source: new.source,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the current value, pushing the old one onto history
    ///
    /// Returns `false` (and records nothing) when the value is unchanged.
    pub fn revise(&mut self, new_value: &str, chapter: Option<Uuid>, now: DateTime<Utc>) -> bool {
        if self.current_value == new_value {
            return false;
        }

        let previous = std::mem::replace(&mut self.current_value, new_value.to_string());
        self.history.push(FactRevision {
            value: previous,
            replaced_at: now,
            replaced_in: chapter,
        });
        self.updated_at = now;
        true
    }
}
