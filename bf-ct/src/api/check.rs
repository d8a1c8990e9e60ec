//! Consistency check endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Extension, Json, Router,
};
use bf_common::api::CallerIdentity;
use bf_common::time;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{check_chapter, Validator};
use crate::checker::{CheckOutcome, ConsistencyChecker};
use crate::db::{books, facts, issues};
use crate::error::{ApiError, ApiResult, FieldError};
use crate::models::{ConsistencyIssue, IssueCandidate};
use crate::AppState;

/// Reported when the book has no facts yet
pub const NO_FACTS_MESSAGE: &str = "No facts established yet. Add story facts to enable checking.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub content: Option<String>,
    pub book_id: Option<String>,
    pub chapter_id: Option<String>,
    /// Store every candidate as an open issue
    #[serde(default)]
    pub persist: bool,
}

/// Candidates as returned by the model, or the rows they were stored as
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CheckIssues {
    Candidates(Vec<IssueCandidate>),
    Stored(Vec<ConsistencyIssue>),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub issues: CheckIssues,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facts_checked: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Why the model reply could not be used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

/// POST /continuity/check
pub async fn check_consistency(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    payload: Result<Json<CheckRequest>, JsonRejection>,
) -> ApiResult<Json<CheckResponse>> {
    let Json(request) = payload?;

    let mut v = Validator::new();
    let book_id = v.uuid("bookId", request.book_id.as_deref());
    if request.book_id.is_none() {
        v.reject("bookId", "is required");
    }
    let chapter_id = v.uuid("chapterId", request.chapter_id.as_deref());
    v.finish()?;

    let book_id: Uuid = book_id.ok_or_else(|| ApiError::BadRequest("bookId is required".into()))?;
    let book = books::find_owned_book(&state.db, book_id, &caller.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Book {} not found", book_id)))?;
    check_chapter(&state, book.id, "chapterId", chapter_id).await?;

    let context = facts::list_context_facts(&state.db, book.id).await?;

    // A book without facts answers the same way whatever the content
    let content = request.content.unwrap_or_default();
    if !context.is_empty() && content.trim().is_empty() {
        return Err(ApiError::Validation(vec![FieldError::new(
            "content",
            "is required",
        )]));
    }

    let checker = ConsistencyChecker::new(state.llm.as_ref(), state.settings.max_tokens);

    let response = match checker.check(&context, &content).await? {
        CheckOutcome::NoFacts => CheckResponse {
            issues: CheckIssues::Candidates(Vec::new()),
            facts_checked: None,
            message: Some(NO_FACTS_MESSAGE.to_string()),
            degraded: None,
        },
        CheckOutcome::Checked {
            issues: candidates,
            facts_checked,
        } => {
            info!(
                book_id = %book.id,
                facts_checked,
                found = candidates.len(),
                persist = request.persist,
                "Consistency check complete"
            );

            let issues = if request.persist {
                let detected_at = time::now();
                let stored: Vec<ConsistencyIssue> = candidates
                    .into_iter()
                    .map(|c| ConsistencyIssue::from_candidate(book.id, chapter_id, c, detected_at))
                    .collect();
                issues::insert_issues(&state.db, &stored).await?;
                CheckIssues::Stored(stored)
            } else {
                CheckIssues::Candidates(candidates)
            };

            CheckResponse {
                issues,
                facts_checked: Some(facts_checked),
                message: None,
                degraded: None,
            }
        }
        CheckOutcome::Degraded {
            reason,
            facts_checked,
        } => CheckResponse {
            issues: CheckIssues::Candidates(Vec::new()),
            facts_checked: Some(facts_checked),
            message: None,
            degraded: Some(reason),
        },
    };

    Ok(Json(response))
}

pub fn check_routes() -> Router<AppState> {
    Router::new().route("/continuity/check", post(check_consistency))
}
