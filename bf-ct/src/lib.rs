//! bf-ct library - Continuity Tracker
//!
//! Tracks story facts, timeline events and consistency issues per book, and
//! checks newly written text against the stored facts with a language model.

use std::sync::Arc;

use axum::Router;
use bf_common::config::UnknownMethodPolicy;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod analysis;
pub mod api;
pub mod checker;
pub mod db;
pub mod error;
pub mod llm;
pub mod models;
pub mod resolution;

pub use error::{ApiError, ApiResult};

use llm::LanguageModel;

/// Request-independent behavior switches
#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    /// Token budget for each consistency check
    pub max_tokens: u32,
    /// What resolving an issue with an unrecognized method does
    pub unknown_method: UnknownMethodPolicy,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            unknown_method: UnknownMethodPolicy::default(),
        }
    }
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Session token signing secret
    pub session_secret: i64,
    /// Model used by consistency checks
    pub llm: Arc<dyn LanguageModel>,
    pub settings: ServiceSettings,
    /// Server startup time, for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        session_secret: i64,
        llm: Arc<dyn LanguageModel>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            db,
            session_secret,
            llm,
            settings,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// Everything except `/health` requires a bearer session token.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    let protected = Router::new()
        .merge(api::book_routes())
        .merge(api::fact_routes())
        .merge(api::event_routes())
        .merge(api::issue_routes())
        .merge(api::analysis_routes())
        .merge(api::scan_routes())
        .merge(api::check_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_caller,
        ));

    let public = Router::new().merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
