//! Timeline events

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A story event, ordered within its book by `position`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: Uuid,
    pub book_id: Uuid,
    pub position: i64,
    pub description: String,
    /// In-story date, free text ("Spring 1812", "Day 3")
    pub date: Option<String>,
    pub chapter_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
