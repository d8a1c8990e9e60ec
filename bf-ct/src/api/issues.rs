//! Consistency issue endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use bf_common::api::CallerIdentity;
use bf_common::time;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{check_chapter, owned_book, parse_path_id, Validator};
use crate::db::issues;
use crate::error::{ApiError, ApiResult};
use crate::models::{ConsistencyIssue, IssueCandidate, IssueSeverity, IssueType};
use crate::resolution::apply_resolution;
use crate::AppState;

const TYPE_VALUES: &str =
    "contradiction, timeline_conflict, character_knowledge, location_impossible, trait_inconsistency";
const SEVERITY_VALUES: &str = "critical, warning";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssueRequest {
    #[serde(rename = "type")]
    pub issue_type: Option<String>,
    pub severity: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub excerpt: Option<String>,
    pub suggestion: Option<String>,
    pub chapter_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveIssueRequest {
    pub method: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IssueList {
    pub issues: Vec<ConsistencyIssue>,
}

#[derive(Debug, Serialize)]
pub struct IssueEnvelope {
    pub issue: ConsistencyIssue,
}

/// GET /continuity/:book_id/issues
pub async fn list_issues(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(book_id): Path<String>,
) -> ApiResult<Json<IssueList>> {
    let book = owned_book(&state, &caller, &book_id).await?;
    let issues = issues::list_issues(&state.db, book.id).await?;
    Ok(Json(IssueList { issues }))
}

/// POST /continuity/:book_id/issues
///
/// Stores an issue as `open`, e.g. a candidate returned by an unpersisted
/// check that the author wants to keep.
pub async fn create_issue(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(book_id): Path<String>,
    payload: Result<Json<CreateIssueRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<IssueEnvelope>)> {
    let book = owned_book(&state, &caller, &book_id).await?;
    let Json(request) = payload?;

    let mut v = Validator::new();
    let issue_type = v.choice("type", request.issue_type.as_deref(), IssueType::parse, TYPE_VALUES);
    if request.issue_type.is_none() {
        v.reject("type", "is required");
    }
    let severity = v.choice(
        "severity",
        request.severity.as_deref(),
        IssueSeverity::parse,
        SEVERITY_VALUES,
    );
    let title = v.required("title", request.title);
    let chapter_id = v.uuid("chapterId", request.chapter_id.as_deref());
    v.finish()?;

    check_chapter(&state, book.id, "chapterId", chapter_id).await?;

    let issue_type = issue_type.ok_or_else(|| ApiError::BadRequest("type is required".into()))?;
    let issue = ConsistencyIssue::from_candidate(
        book.id,
        chapter_id,
        IssueCandidate {
            issue_type,
            severity: severity.unwrap_or(IssueSeverity::Warning),
            title,
            description: request.description.unwrap_or_default(),
            excerpt: request.excerpt.unwrap_or_default(),
            suggestion: request.suggestion.unwrap_or_default(),
        },
        time::now(),
    );
    issues::insert_issue(&state.db, &issue).await?;

    info!(book_id = %book.id, issue_id = %issue.id, issue_type = issue.issue_type.as_str(), "Recorded issue");
    Ok((StatusCode::CREATED, Json(IssueEnvelope { issue })))
}

/// POST /continuity/:book_id/issues/:issue_id/resolve
pub async fn resolve_issue(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((book_id, issue_id)): Path<(String, String)>,
    payload: Result<Json<ResolveIssueRequest>, JsonRejection>,
) -> ApiResult<Json<IssueEnvelope>> {
    let book = owned_book(&state, &caller, &book_id).await?;
    let issue_uuid = parse_path_id("Issue", &issue_id)?;
    let mut issue = issues::get_issue(&state.db, book.id, issue_uuid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Issue {} not found", issue_id)))?;
    let Json(request) = payload?;

    let mut v = Validator::new();
    let method = v.required("method", request.method);
    v.finish()?;

    apply_resolution(
        &mut issue,
        &method,
        request.notes,
        state.settings.unknown_method,
        time::now(),
    )?;
    issues::save_resolution(&state.db, &issue).await?;

    info!(
        issue_id = %issue.id,
        method = %method,
        status = issue.status.as_str(),
        "Issue resolved"
    );
    Ok(Json(IssueEnvelope { issue }))
}

pub fn issue_routes() -> Router<AppState> {
    Router::new()
        .route("/continuity/:book_id/issues", get(list_issues).post(create_issue))
        .route(
            "/continuity/:book_id/issues/:issue_id/resolve",
            post(resolve_issue),
        )
}
