//! Continuity analysis aggregation
//!
//! The score starts at 100 and loses 15 points per open critical issue and
//! 5 per other open issue, clamped to 0..=100. The four category scores are
//! not derived separately; each equals the aggregate.

use serde::Serialize;

pub const CRITICAL_PENALTY: i64 = 15;
pub const WARNING_PENALTY: i64 = 5;

/// Raw per-book counts read from the stores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContinuityCounts {
    pub facts: i64,
    pub events: i64,
    pub issues: i64,
    pub open_issues: i64,
    /// Open issues with severity `critical`
    pub open_critical: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub character: u32,
    pub timeline: u32,
    pub plot: u32,
    pub world: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuityAnalysis {
    pub fact_count: i64,
    pub event_count: i64,
    pub issue_count: i64,
    pub open_issues: i64,
    pub critical_issues: i64,
    pub score: u32,
    pub breakdown: ScoreBreakdown,
}

/// `clamp(100 - 15*critical_open - 5*other_open, 0, 100)`
pub fn continuity_score(critical_open: i64, other_open: i64) -> u32 {
    let raw = 100i64
        .saturating_sub(critical_open.saturating_mul(CRITICAL_PENALTY))
        .saturating_sub(other_open.saturating_mul(WARNING_PENALTY));
    raw.clamp(0, 100) as u32
}

impl ContinuityAnalysis {
    pub fn from_counts(counts: ContinuityCounts) -> Self {
        let other_open = (counts.open_issues - counts.open_critical).max(0);
        let score = continuity_score(counts.open_critical, other_open);

        Self {
            fact_count: counts.facts,
            event_count: counts.events,
            issue_count: counts.issues,
            open_issues: counts.open_issues,
            critical_issues: counts.open_critical,
            score,
            breakdown: ScoreBreakdown {
                character: score,
                timeline: score,
                plot: score,
                world: score,
            },
        }
    }
}
