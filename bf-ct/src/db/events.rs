//! Timeline event database operations

use bf_common::{time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{get_optional_uuid, get_timestamp, get_uuid, next_position};
use crate::models::TimelineEvent;

/// Fields supplied by the caller when recording an event
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub description: String,
    pub date: Option<String>,
    pub chapter_id: Option<Uuid>,
    /// Defaults to one past the book's last event
    pub position: Option<i64>,
}

fn row_to_event(row: &SqliteRow) -> Result<TimelineEvent> {
    Ok(TimelineEvent {
        id: get_uuid(row, "id")?,
        book_id: get_uuid(row, "book_id")?,
        position: row.get("position"),
        description: row.get("description"),
        date: row.get("date"),
        chapter_id: get_optional_uuid(row, "chapter_id")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

pub async fn insert_event(pool: &SqlitePool, book_id: Uuid, new: NewEvent) -> Result<TimelineEvent> {
    let position = match new.position {
        Some(p) => p,
        None => {
            let max: Option<i64> =
                sqlx::query_scalar("SELECT MAX(position) FROM timeline_events WHERE book_id = ?")
                    .bind(book_id.to_string())
                    .fetch_one(pool)
                    .await?;
            next_position(max, 0)?
        }
    };

    let event = TimelineEvent {
        id: Uuid::new_v4(),
        book_id,
        position,
        description: new.description,
        date: new.date,
        chapter_id: new.chapter_id,
        created_at: time::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO timeline_events (id, book_id, position, description, date, chapter_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(event.id.to_string())
    .bind(event.book_id.to_string())
    .bind(event.position)
    .bind(&event.description)
    .bind(&event.date)
    .bind(event.chapter_id.map(|id| id.to_string()))
    .bind(time::to_db(&event.created_at))
    .execute(pool)
    .await?;

    Ok(event)
}

/// Events in story order
pub async fn list_events(pool: &SqlitePool, book_id: Uuid) -> Result<Vec<TimelineEvent>> {
    let rows = sqlx::query(
        r#"
        SELECT id, book_id, position, description, date, chapter_id, created_at
        FROM timeline_events
        WHERE book_id = ?
        ORDER BY position ASC, created_at ASC
        "#,
    )
    .bind(book_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_event).collect()
}

pub async fn count_events(pool: &SqlitePool, book_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM timeline_events WHERE book_id = ?")
        .bind(book_id.to_string())
        .fetch_one(pool)
        .await?;

    Ok(count)
}
