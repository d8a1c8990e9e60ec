//! Continuity database operations
//!
//! Every query is scoped by book id. Ownership of the book itself is checked
//! once per request through [`books::find_owned_book`].

pub mod books;
pub mod events;
pub mod facts;
pub mod issues;
pub mod scan;

use bf_common::{time, uuid_utils, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

fn get_uuid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let value: String = row.get(column);
    uuid_utils::parse_stored(column, &value)
}

fn get_optional_uuid(row: &SqliteRow, column: &str) -> Result<Option<Uuid>> {
    let value: Option<String> = row.get(column);
    value
        .map(|s| uuid_utils::parse_stored(column, &s))
        .transpose()
}

fn get_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let value: String = row.get(column);
    time::from_db(column, &value)
}

/// Position after `max`, or `first` when nothing is stored yet
fn next_position(max: Option<i64>, first: i64) -> Result<i64> {
    match max {
        None => Ok(first),
        Some(m) => m
            .checked_add(1)
            .ok_or(bf_common::Error::PositionExhausted { after: m }),
    }
}

fn corrupt(column: &str, detail: &str) -> bf_common::Error {
    bf_common::Error::CorruptRow {
        column: column.to_string(),
        detail: detail.to_string(),
    }
}
