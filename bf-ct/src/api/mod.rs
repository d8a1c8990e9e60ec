//! HTTP API handlers for bf-ct
//!
//! Every book-scoped route first resolves the path's book against the
//! caller. Malformed ids and books owned by someone else are both 404.

pub mod analysis;
pub mod auth;
pub mod books;
pub mod check;
pub mod events;
pub mod facts;
pub mod health;
pub mod issues;
pub mod scan;

pub use analysis::analysis_routes;
pub use auth::require_caller;
pub use books::book_routes;
pub use check::check_routes;
pub use events::event_routes;
pub use facts::fact_routes;
pub use health::health_routes;
pub use issues::issue_routes;
pub use scan::scan_routes;

use bf_common::api::CallerIdentity;
use bf_common::uuid_utils;
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult, FieldError};
use crate::models::Book;
use crate::AppState;

/// Parse an id taken from the URL path
pub(crate) fn parse_path_id(kind: &str, raw: &str) -> ApiResult<Uuid> {
    uuid_utils::parse(raw).map_err(|_| ApiError::NotFound(format!("{} {} not found", kind, raw)))
}

/// The book named by `raw_id`, if the caller owns it
pub(crate) async fn owned_book(
    state: &AppState,
    caller: &CallerIdentity,
    raw_id: &str,
) -> ApiResult<Book> {
    let book_id = parse_path_id("Book", raw_id)?;
    db::books::find_owned_book(&state.db, book_id, &caller.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Book {} not found", raw_id)))
}

/// Collects field errors across a request body
#[derive(Debug, Default)]
pub(crate) struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Trimmed non-empty string, or an error on `field`
    pub fn required(&mut self, field: &str, value: Option<String>) -> String {
        match value.map(|v| v.trim().to_string()) {
            Some(v) if !v.is_empty() => v,
            _ => {
                self.reject(field, "is required");
                String::new()
            }
        }
    }

    /// Parse an optional enum field; `None` when absent or invalid
    pub fn choice<T>(
        &mut self,
        field: &str,
        value: Option<&str>,
        parse: fn(&str) -> Option<T>,
        allowed: &str,
    ) -> Option<T> {
        let raw = value?;
        let parsed = parse(raw);
        if parsed.is_none() {
            self.reject(field, format!("must be one of {}", allowed));
        }
        parsed
    }

    /// Parse an optional UUID field
    pub fn uuid(&mut self, field: &str, value: Option<&str>) -> Option<Uuid> {
        let raw = value?;
        match uuid_utils::parse(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                self.reject(field, "must be a UUID");
                None
            }
        }
    }

    pub fn finish(self) -> ApiResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

/// Reject a chapter reference that is not part of `book_id`
pub(crate) async fn check_chapter(
    state: &AppState,
    book_id: Uuid,
    field: &str,
    chapter_id: Option<Uuid>,
) -> ApiResult<()> {
    if let Some(chapter_id) = chapter_id {
        if !db::books::chapter_in_book(&state.db, book_id, chapter_id).await? {
            return Err(ApiError::Validation(vec![FieldError::new(
                field,
                "is not a chapter of this book",
            )]));
        }
    }
    Ok(())
}
