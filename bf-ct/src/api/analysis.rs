//! Continuity analysis endpoint

use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use bf_common::api::CallerIdentity;

use super::owned_book;
use crate::analysis::ContinuityAnalysis;
use crate::db::issues;
use crate::error::ApiResult;
use crate::AppState;

/// GET /continuity/:book_id/analysis
pub async fn get_analysis(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(book_id): Path<String>,
) -> ApiResult<Json<ContinuityAnalysis>> {
    let book = owned_book(&state, &caller, &book_id).await?;
    let counts = issues::continuity_counts(&state.db, book.id).await?;
    Ok(Json(ContinuityAnalysis::from_counts(counts)))
}

pub fn analysis_routes() -> Router<AppState> {
    Router::new().route("/continuity/:book_id/analysis", get(get_analysis))
}
