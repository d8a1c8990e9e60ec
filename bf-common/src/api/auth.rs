//! Session token authentication
//!
//! Callers present `Authorization: Bearer <token>` where the token has the
//! form `<user_id>.<expires_at_ms>.<signature>`:
//! - `user_id` is the identity assigned by the hosted auth provider
//! - `expires_at_ms` is Unix epoch milliseconds
//! - `signature` is SHA-256 (64 hex chars) over
//!   `"<user_id>:<expires_at_ms>:<secret>"`
//!
//! The signing secret is a random non-zero i64 stored in the `settings`
//! table and generated on first run.
//!
//! # Pure Functions
//!
//! Token handling here has no HTTP framework dependencies. The axum
//! middleware lives in the service crate.

use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

/// Settings key holding the session signing secret
pub const SESSION_SECRET_KEY: &str = "session_signing_secret";

// ========================================
// Error Types
// ========================================

/// Authentication error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiAuthError {
    /// No bearer token on the request
    MissingToken,

    /// Token does not have the `<user>.<expiry>.<signature>` shape
    MalformedToken(String),

    /// Token expiry is in the past
    Expired { expires_at: i64, now: i64 },

    /// Signature does not match calculated value
    InvalidSignature,

    /// Database error loading the signing secret
    DatabaseError(String),
}

impl std::fmt::Display for ApiAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiAuthError::MissingToken => write!(f, "Missing bearer token"),
            ApiAuthError::MalformedToken(reason) => write!(f, "Malformed token: {}", reason),
            ApiAuthError::Expired { expires_at, now } => {
                write!(f, "Token expired {}ms ago", now - expires_at)
            }
            ApiAuthError::InvalidSignature => write!(f, "Invalid token signature"),
            ApiAuthError::DatabaseError(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for ApiAuthError {}

/// Authenticated caller, attached to each request by the auth middleware
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerIdentity {
    pub user_id: String,
}

// ========================================
// Secret Management
// ========================================

/// Load the session signing secret, generating one if absent
pub async fn load_session_secret(db: &SqlitePool) -> Result<i64, ApiAuthError> {
    let stored = crate::db::get_setting(db, SESSION_SECRET_KEY)
        .await
        .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    match stored {
        Some(value) => value
            .parse::<i64>()
            .map_err(|e| ApiAuthError::DatabaseError(format!("Invalid i64: {}", e))),
        None => initialize_session_secret(db).await,
    }
}

/// Generate and store a new crypto-random non-zero secret
pub async fn initialize_session_secret(db: &SqlitePool) -> Result<i64, ApiAuthError> {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    let secret: i64 = loop {
        let val = rng.gen::<i64>();
        if val != 0 {
            break val;
        }
    };

    crate::db::set_setting(db, SESSION_SECRET_KEY, &secret.to_string())
        .await
        .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    Ok(secret)
}

// ========================================
// Token Issue and Validation
// ========================================

/// Calculate the token signature
///
/// # Examples
///
/// ```
/// use bf_common::api::auth::calculate_signature;
///
/// let sig = calculate_signature("user_1", 1730000000000, 42);
/// assert_eq!(sig.len(), 64);
/// ```
pub fn calculate_signature(user_id: &str, expires_at_ms: i64, secret: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}:{}", user_id, expires_at_ms, secret).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Issue a token for `user_id` that expires at `expires_at_ms`
pub fn issue_session_token(user_id: &str, expires_at_ms: i64, secret: i64) -> String {
    format!(
        "{}.{}.{}",
        user_id,
        expires_at_ms,
        calculate_signature(user_id, expires_at_ms, secret)
    )
}

/// Validate a token and return the caller it identifies
///
/// The user id may itself contain dots, so the token is split from the
/// right.
pub fn verify_session_token(
    token: &str,
    secret: i64,
    now_ms: i64,
) -> Result<CallerIdentity, ApiAuthError> {
    let mut parts = token.trim().rsplitn(3, '.');
    let signature = parts.next().unwrap_or_default();
    let expires = parts
        .next()
        .ok_or_else(|| ApiAuthError::MalformedToken("missing expiry".to_string()))?;
    let user_id = parts
        .next()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiAuthError::MalformedToken("missing user id".to_string()))?;

    let expires_at: i64 = expires
        .parse()
        .map_err(|_| ApiAuthError::MalformedToken("expiry is not an integer".to_string()))?;

    if calculate_signature(user_id, expires_at, secret) != signature.to_ascii_lowercase() {
        return Err(ApiAuthError::InvalidSignature);
    }

    if expires_at <= now_ms {
        return Err(ApiAuthError::Expired {
            expires_at,
            now: now_ms,
        });
    }

    Ok(CallerIdentity {
        user_id: user_id.to_string(),
    })
}

/// Extract the token from an `Authorization` header value
pub fn bearer_token(header_value: &str) -> Result<&str, ApiAuthError> {
    let (scheme, token) = header_value
        .trim()
        .split_once(' ')
        .ok_or_else(|| ApiAuthError::MalformedToken("expected 'Bearer <token>'".to_string()))?;

    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(ApiAuthError::MalformedToken(
            "expected 'Bearer <token>'".to_string(),
        ));
    }

    Ok(token.trim())
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;

    const SECRET: i64 = 987_654_321;
    const NOW: i64 = 1_730_000_000_000;

    #[test]
    fn test_issued_token_verifies() {
        let token = issue_session_token("user_abc", NOW + 60_000, SECRET);
        let caller = verify_session_token(&token, SECRET, NOW).unwrap();
        assert_eq!(caller.user_id, "user_abc");
    }

    #[test]
    fn test_user_id_with_dots() {
        let token = issue_session_token("org.team.alice", NOW + 1, SECRET);
        let caller = verify_session_token(&token, SECRET, NOW).unwrap();
        assert_eq!(caller.user_id, "org.team.alice");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_session_token("user_abc", NOW + 60_000, SECRET);
        assert_eq!(
            verify_session_token(&token, SECRET + 1, NOW),
            Err(ApiAuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_tampered_user_rejected() {
        let token = issue_session_token("user_abc", NOW + 60_000, SECRET);
        let forged = token.replacen("user_abc", "user_xyz", 1);
        assert_eq!(
            verify_session_token(&forged, SECRET, NOW),
            Err(ApiAuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_session_token("user_abc", NOW - 5, SECRET);
        assert!(matches!(
            verify_session_token(&token, SECRET, NOW),
            Err(ApiAuthError::Expired { .. })
        ));
    }

    #[test]
    fn test_malformed_tokens() {
        for token in ["", "abc", "user.notanumber.sig", ".123.sig"] {
            assert!(
                matches!(
                    verify_session_token(token, SECRET, NOW),
                    Err(ApiAuthError::MalformedToken(_))
                ),
                "token {:?} should be malformed",
                token
            );
        }
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.1.def").unwrap(), "abc.1.def");
        assert_eq!(bearer_token("bearer   tok ").unwrap(), "tok");
        assert!(bearer_token("Basic abc").is_err());
        assert!(bearer_token("Bearer").is_err());
    }

    #[tokio::test]
    async fn test_secret_generated_once() {
        let pool = init_memory_database().await.unwrap();
        let first = load_session_secret(&pool).await.unwrap();
        let second = load_session_secret(&pool).await.unwrap();
        assert_ne!(first, 0);
        assert_eq!(first, second);
    }
}
