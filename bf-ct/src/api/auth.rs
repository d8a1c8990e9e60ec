//! Session authentication middleware
//!
//! Resolves `Authorization: Bearer <token>` into a [`CallerIdentity`] and
//! attaches it to the request as an extension. Handlers take
//! `Extension<CallerIdentity>`.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use bf_common::api::{bearer_token, verify_session_token, ApiAuthError, CallerIdentity};
use bf_common::time;
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

/// Authentication middleware; applied to every route except `/health`
pub async fn require_caller(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = authenticate(&request, state.session_secret).map_err(|e| {
        debug!(error = %e, path = %request.uri().path(), "Rejected request");
        ApiError::Unauthorized(e.to_string())
    })?;

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

fn authenticate(request: &Request, secret: i64) -> Result<CallerIdentity, ApiAuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(ApiAuthError::MissingToken)?
        .to_str()
        .map_err(|_| ApiAuthError::MalformedToken("non-ASCII header".to_string()))?;

    let token = bearer_token(header)?;
    verify_session_token(token, secret, time::now_millis())
}
