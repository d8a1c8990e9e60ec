//! Scan status endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Extension, Json, Router,
};
use bf_common::api::CallerIdentity;
use serde::Deserialize;
use tracing::debug;

use super::{owned_book, Validator};
use crate::db::scan;
use crate::error::ApiResult;
use crate::models::ScanStatus;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScanRequest {
    pub phase: Option<String>,
    /// Clamped to 0..=100
    pub progress: Option<i64>,
}

/// GET /continuity/:book_id/scan/status
pub async fn get_scan_status(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(book_id): Path<String>,
) -> ApiResult<Json<ScanStatus>> {
    let book = owned_book(&state, &caller, &book_id).await?;
    Ok(Json(scan::get_scan_status(&state.db, book.id).await?))
}

/// PUT /continuity/:book_id/scan/status
pub async fn put_scan_status(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(book_id): Path<String>,
    payload: Result<Json<UpdateScanRequest>, JsonRejection>,
) -> ApiResult<Json<ScanStatus>> {
    let book = owned_book(&state, &caller, &book_id).await?;
    let Json(request) = payload?;

    let mut v = Validator::new();
    let phase = v.required("phase", request.phase);
    if request.progress.is_none() {
        v.reject("progress", "is required");
    }
    v.finish()?;

    let status = ScanStatus::new(phase, request.progress.unwrap_or_default());
    scan::set_scan_status(&state.db, book.id, &status).await?;

    debug!(book_id = %book.id, phase = %status.phase, progress = status.progress, "Scan status updated");
    Ok(Json(status))
}

pub fn scan_routes() -> Router<AppState> {
    Router::new().route(
        "/continuity/:book_id/scan/status",
        get(get_scan_status).put(put_scan_status),
    )
}
