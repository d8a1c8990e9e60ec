//! Book-wide scan progress

use serde::{Deserialize, Serialize};

/// Phase reported for a book that has never been scanned
pub const NOT_STARTED_PHASE: &str = "Not started";

/// Progress marker for a book-wide scan
///
/// One row per book, overwritten in place. Concurrent scans of the same
/// book overwrite each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatus {
    pub phase: String,
    /// Percentage, 0..=100
    pub progress: i64,
}

impl ScanStatus {
    pub fn new(phase: impl Into<String>, progress: i64) -> Self {
        Self {
            phase: phase.into(),
            progress: progress.clamp(0, 100),
        }
    }
}

impl Default for ScanStatus {
    fn default() -> Self {
        Self::new(NOT_STARTED_PHASE, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_not_started() {
        let status = ScanStatus::default();
        assert_eq!(status.phase, "Not started");
        assert_eq!(status.progress, 0);
    }

    #[test]
    fn test_progress_clamped() {
        assert_eq!(ScanStatus::new("Extracting", 140).progress, 100);
        assert_eq!(ScanStatus::new("Extracting", -3).progress, 0);
    }
}
