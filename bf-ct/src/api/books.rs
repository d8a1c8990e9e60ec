//! Book and chapter endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use bf_common::api::CallerIdentity;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{owned_book, Validator};
use crate::db::books;
use crate::error::ApiResult;
use crate::models::{Book, Chapter};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChapterRequest {
    pub title: Option<String>,
    pub position: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct BookList {
    pub books: Vec<Book>,
}

#[derive(Debug, Serialize)]
pub struct ChapterList {
    pub chapters: Vec<Chapter>,
}

/// POST /books
pub async fn create_book(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    payload: Result<Json<CreateBookRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Book>)> {
    let Json(request) = payload?;

    let mut v = Validator::new();
    let title = v.required("title", request.title);
    v.finish()?;

    let book = books::create_book(&state.db, &caller.user_id, &title).await?;
    info!(book_id = %book.id, owner = %caller.user_id, "Created book");

    Ok((StatusCode::CREATED, Json(book)))
}

/// GET /books
pub async fn list_books(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> ApiResult<Json<BookList>> {
    let books = books::list_books_for_owner(&state.db, &caller.user_id).await?;
    Ok(Json(BookList { books }))
}

/// POST /books/:book_id/chapters
pub async fn create_chapter(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(book_id): Path<String>,
    payload: Result<Json<CreateChapterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Chapter>)> {
    let book = owned_book(&state, &caller, &book_id).await?;
    let Json(request) = payload?;

    let mut v = Validator::new();
    let title = v.required("title", request.title);
    v.finish()?;

    let chapter = books::create_chapter(&state.db, book.id, &title, request.position).await?;
    Ok((StatusCode::CREATED, Json(chapter)))
}

/// GET /books/:book_id/chapters
pub async fn list_chapters(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(book_id): Path<String>,
) -> ApiResult<Json<ChapterList>> {
    let book = owned_book(&state, &caller, &book_id).await?;
    let chapters = books::list_chapters(&state.db, book.id).await?;
    Ok(Json(ChapterList { chapters }))
}

pub fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route("/books/:book_id/chapters", get(list_chapters).post(create_chapter))
}
