//! Shared HTTP API functionality
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Database operations (via sqlx)
//! - Shared types
//!
//! Each service wraps these with framework-specific middleware (axum).

pub mod auth;

pub use auth::{
    bearer_token, calculate_signature, issue_session_token, load_session_secret,
    verify_session_token, ApiAuthError, CallerIdentity,
};
