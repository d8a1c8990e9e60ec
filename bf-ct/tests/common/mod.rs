//! Shared helpers for bf-ct integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use bf_common::api::issue_session_token;
use bf_common::config::UnknownMethodPolicy;
use bf_common::time;
use bf_ct::llm::{CompletionRequest, LanguageModel, LlmError};
use bf_ct::{build_router, AppState, ServiceSettings};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::util::ServiceExt;

pub const SECRET: i64 = 424_242;
pub const ALICE: &str = "user_alice";
pub const BOB: &str = "user_bob";

/// Language model that replays a fixed reply and records every request
#[derive(Clone, Default)]
pub struct ScriptedModel {
    reply: Arc<Mutex<Option<Result<String, u16>>>>,
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedModel {
    pub fn replying(reply: &str) -> Self {
        let model = Self::default();
        *model.reply.lock().unwrap() = Some(Ok(reply.to_string()));
        model
    }

    /// Every call fails with an API error of `status`
    pub fn failing(status: u16) -> Self {
        let model = Self::default();
        *model.reply.lock().unwrap() = Some(Err(status));
        model
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request);
        match self.reply.lock().unwrap().clone() {
            Some(Ok(text)) => Ok(text),
            Some(Err(status)) => Err(LlmError::Api {
                status,
                message: "scripted failure".to_string(),
            }),
            None => Ok("[]".to_string()),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    pub model: ScriptedModel,
}

impl TestApp {
    pub async fn new(model: ScriptedModel) -> Self {
        Self::with_policy(model, UnknownMethodPolicy::Resolve).await
    }

    pub async fn with_policy(model: ScriptedModel, unknown_method: UnknownMethodPolicy) -> Self {
        let db = bf_common::db::init_memory_database().await.unwrap();
        let settings = ServiceSettings {
            max_tokens: 2000,
            unknown_method,
        };
        let state = AppState::new(db.clone(), SECRET, Arc::new(model.clone()), settings);

        Self {
            router: build_router(state),
            db,
            model,
        }
    }

    /// Send a request as `user` (or anonymously) and decode the JSON reply
    pub async fn send(
        &self,
        user: Option<&str>,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token_for(user)));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        decode(response).await
    }

    pub async fn create_book(&self, user: &str, title: &str) -> String {
        let (status, body) = self
            .send(Some(user), "POST", "/books", Some(serde_json::json!({ "title": title })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }
}

pub fn token_for(user: &str) -> String {
    issue_session_token(user, time::now_millis() + 3_600_000, SECRET)
}

async fn decode(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
