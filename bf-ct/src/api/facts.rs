//! Story fact endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Extension, Json, Router,
};
use bf_common::api::CallerIdentity;
use bf_common::time;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{check_chapter, owned_book, parse_path_id, Validator};
use crate::db::facts::{self, FactFilter};
use crate::error::{ApiError, ApiResult};
use crate::models::{FactConfidence, FactImportance, FactSource, NewFact, StoryFact};
use crate::AppState;

const CONFIDENCE_VALUES: &str = "explicit, implicit, inferred";
const IMPORTANCE_VALUES: &str = "critical, significant, minor";
const SOURCE_VALUES: &str = "user, ai, import";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactQuery {
    pub category: Option<String>,
    pub subject: Option<String>,
    pub attribute: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFactRequest {
    pub category: Option<String>,
    pub subject: Option<String>,
    pub attribute: Option<String>,
    pub value: Option<String>,
    pub current_value: Option<String>,
    pub established_in: Option<String>,
    pub confidence: Option<String>,
    pub importance: Option<String>,
    pub source: Option<String>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFactRequest {
    pub current_value: Option<String>,
    /// Chapter in which the new value is established
    pub chapter_id: Option<String>,
    pub confidence: Option<String>,
    pub importance: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FactList {
    pub facts: Vec<StoryFact>,
}

#[derive(Debug, Serialize)]
pub struct FactEnvelope {
    pub fact: StoryFact,
}

/// GET /continuity/:book_id/facts
pub async fn list_facts(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(book_id): Path<String>,
    Query(query): Query<FactQuery>,
) -> ApiResult<Json<FactList>> {
    let book = owned_book(&state, &caller, &book_id).await?;
    let filter = FactFilter {
        category: query.category,
        subject: query.subject,
        attribute: query.attribute,
    };

    let facts = facts::list_facts(&state.db, book.id, &filter).await?;
    Ok(Json(FactList { facts }))
}

/// POST /continuity/:book_id/facts
pub async fn create_fact(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(book_id): Path<String>,
    payload: Result<Json<CreateFactRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<FactEnvelope>)> {
    let book = owned_book(&state, &caller, &book_id).await?;
    let Json(request) = payload?;

    let mut v = Validator::new();
    let category = v.required("category", request.category);
    let subject = v.required("subject", request.subject);
    let attribute = v.required("attribute", request.attribute);
    let value = v.required("value", request.value);
    let established_in = v.uuid("establishedIn", request.established_in.as_deref());
    let confidence = v.choice(
        "confidence",
        request.confidence.as_deref(),
        FactConfidence::parse,
        CONFIDENCE_VALUES,
    );
    let importance = v.choice(
        "importance",
        request.importance.as_deref(),
        FactImportance::parse,
        IMPORTANCE_VALUES,
    );
    let source = v.choice("source", request.source.as_deref(), FactSource::parse, SOURCE_VALUES);
    v.finish()?;

    check_chapter(&state, book.id, "establishedIn", established_in).await?;

    let fact = StoryFact::create(
        book.id,
        NewFact {
            category,
            subject,
            attribute,
            value,
            current_value: request.current_value,
            established_in,
            confidence: confidence.unwrap_or_default(),
            importance: importance.unwrap_or_default(),
            source: source.unwrap_or_default(),
        },
        time::now(),
    );
    facts::insert_fact(&state.db, &fact).await?;

    info!(book_id = %book.id, fact_id = %fact.id, subject = %fact.subject, "Recorded fact");
    Ok((StatusCode::CREATED, Json(FactEnvelope { fact })))
}

/// PATCH /continuity/:book_id/facts/:fact_id
pub async fn update_fact(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((book_id, fact_id)): Path<(String, String)>,
    payload: Result<Json<UpdateFactRequest>, JsonRejection>,
) -> ApiResult<Json<FactEnvelope>> {
    let book = owned_book(&state, &caller, &book_id).await?;
    let fact_uuid = parse_path_id("Fact", &fact_id)?;
    let mut fact = facts::get_fact(&state.db, book.id, fact_uuid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Fact {} not found", fact_id)))?;
    let Json(request) = payload?;

    let mut v = Validator::new();
    let chapter_id = v.uuid("chapterId", request.chapter_id.as_deref());
    let confidence = v.choice(
        "confidence",
        request.confidence.as_deref(),
        FactConfidence::parse,
        CONFIDENCE_VALUES,
    );
    let importance = v.choice(
        "importance",
        request.importance.as_deref(),
        FactImportance::parse,
        IMPORTANCE_VALUES,
    );
    if matches!(request.current_value.as_deref(), Some(s) if s.trim().is_empty()) {
        v.reject("currentValue", "must not be empty");
    }
    v.finish()?;

    check_chapter(&state, book.id, "chapterId", chapter_id).await?;

    let now = time::now();
    if let Some(new_value) = request.current_value.as_deref() {
        if fact.revise(new_value, chapter_id, now) {
            info!(fact_id = %fact.id, history = fact.history.len(), "Fact value revised");
        }
    }
    if let Some(confidence) = confidence {
        fact.confidence = confidence;
        fact.updated_at = now;
    }
    if let Some(importance) = importance {
        fact.importance = importance;
        fact.updated_at = now;
    }

    facts::update_fact(&state.db, &fact).await?;
    Ok(Json(FactEnvelope { fact }))
}

/// DELETE /continuity/:book_id/facts/:fact_id
pub async fn delete_fact(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((book_id, fact_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let book = owned_book(&state, &caller, &book_id).await?;
    let fact_uuid = parse_path_id("Fact", &fact_id)?;

    if !facts::delete_fact(&state.db, book.id, fact_uuid).await? {
        return Err(ApiError::NotFound(format!("Fact {} not found", fact_id)));
    }

    info!(book_id = %book.id, fact_id = %fact_uuid, "Deleted fact");
    Ok(StatusCode::NO_CONTENT)
}

pub fn fact_routes() -> Router<AppState> {
    Router::new()
        .route("/continuity/:book_id/facts", get(list_facts).post(create_fact))
        .route(
            "/continuity/:book_id/facts/:fact_id",
            patch(update_fact).delete(delete_fact),
        )
}
