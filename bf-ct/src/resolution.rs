//! Issue resolution workflow
//!
//! Maps a caller's resolution method to a terminal status and records the
//! resolution. Method strings are parsed strictly; what happens to an
//! unrecognized one is decided by [`UnknownMethodPolicy`].

use bf_common::config::UnknownMethodPolicy;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::warn;

use crate::models::{ConsistencyIssue, IssueStatus, Resolution, ResolutionMethod};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Unknown resolution method '{0}' (expected fixed, intentional or wont_fix)")]
    UnknownMethod(String),
}

/// Status for `method` under `policy`
pub fn status_for_method(
    method: &str,
    policy: UnknownMethodPolicy,
) -> Result<IssueStatus, ResolutionError> {
    match (ResolutionMethod::parse(method), policy) {
        (Some(known), _) => Ok(known.target_status()),
        (None, UnknownMethodPolicy::Resolve) => {
            warn!(method = %method, "Unknown resolution method, treating as fixed");
            Ok(IssueStatus::Resolved)
        }
        (None, UnknownMethodPolicy::Reject) => {
            Err(ResolutionError::UnknownMethod(method.to_string()))
        }
    }
}

/// Transition `issue` and overwrite its resolution record
///
/// Re-resolving an already closed issue is allowed and replaces the earlier
/// record; no resolution history is kept.
pub fn apply_resolution(
    issue: &mut ConsistencyIssue,
    method: &str,
    notes: Option<String>,
    policy: UnknownMethodPolicy,
    now: DateTime<Utc>,
) -> Result<(), ResolutionError> {
    let status = status_for_method(method, policy)?;

    issue.status = status;
    issue.resolution = Some(Resolution {
        method: method.to_string(),
        notes: notes.unwrap_or_default(),
        resolved_at: now,
    });

    Ok(())
}
