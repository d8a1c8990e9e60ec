//! Timeline event endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use bf_common::api::CallerIdentity;
use serde::{Deserialize, Serialize};

use super::{check_chapter, owned_book, Validator};
use crate::db::events::{self, NewEvent};
use crate::error::ApiResult;
use crate::models::TimelineEvent;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub description: Option<String>,
    pub date: Option<String>,
    pub chapter_id: Option<String>,
    pub position: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct EventList {
    pub events: Vec<TimelineEvent>,
}

#[derive(Debug, Serialize)]
pub struct EventEnvelope {
    pub event: TimelineEvent,
}

/// GET /continuity/:book_id/events
pub async fn list_events(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(book_id): Path<String>,
) -> ApiResult<Json<EventList>> {
    let book = owned_book(&state, &caller, &book_id).await?;
    let events = events::list_events(&state.db, book.id).await?;
    Ok(Json(EventList { events }))
}

/// POST /continuity/:book_id/events
pub async fn create_event(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(book_id): Path<String>,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<EventEnvelope>)> {
    let book = owned_book(&state, &caller, &book_id).await?;
    let Json(request) = payload?;

    let mut v = Validator::new();
    let description = v.required("description", request.description);
    let chapter_id = v.uuid("chapterId", request.chapter_id.as_deref());
    v.finish()?;

    check_chapter(&state, book.id, "chapterId", chapter_id).await?;

    let event = events::insert_event(
        &state.db,
        book.id,
        NewEvent {
            description,
            date: request.date.filter(|d| !d.trim().is_empty()),
            chapter_id,
            position: request.position,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(EventEnvelope { event })))
}

pub fn event_routes() -> Router<AppState> {
    Router::new().route("/continuity/:book_id/events", get(list_events).post(create_event))
}
