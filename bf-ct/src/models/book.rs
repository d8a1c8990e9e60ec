//! Books and chapters

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A manuscript owned by one user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    /// Identity assigned by the auth provider
    pub owner_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// A chapter; facts reference the chapter that established them
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: Uuid,
    pub book_id: Uuid,
    pub position: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}
