//! Usage records, summaries and delivery outcomes.

use serde::{Deserialize, Serialize};

/// Maximum number of applications reported in a summary
pub const TOP_N: usize = 10;

/// Foreground time of one application over one host-reported interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub application_id: String,
    pub foreground_seconds: u64,
}

impl UsageRecord {
    #[must_use]
    pub fn new(application_id: impl Into<String>, foreground_seconds: u64) -> Self {
        Self {
            application_id: application_id.into(),
            foreground_seconds,
        }
    }
}

/// One ranked application in a usage summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEntry {
    pub application_id: String,
    /// Human-readable name, or the application id when it could not be resolved
    pub display_name: String,
    pub foreground_seconds: u64,
}

/// Ranked top-N usage plus the grand total over every application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub total_foreground_seconds: u64,
    pub top_entries: Vec<UsageEntry>,
}

impl UsageSummary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_foreground_seconds == 0 && self.top_entries.is_empty()
    }
}

/// Result of a single delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The collector answered with a 2xx status
    Success { status: u16, body: String },
    /// Worth retrying later: the network failed or the collector rejected the request
    TransientFailure { reason: String },
    /// Retrying cannot help
    FatalFailure { reason: String },
}

impl DeliveryOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Short label used in logs and CLI output
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "delivered",
            Self::TransientFailure { .. } => "transient failure",
            Self::FatalFailure { .. } => "fatal failure",
        }
    }
}

/// Render seconds as `1h 3m 20s`, omitting leading zero units
#[must_use]
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(3800), "1h 3m 20s");
        assert_eq!(format_duration(7200), "2h 0m 0s");
    }

    #[test]
    fn test_outcome_labels() {
        let ok = DeliveryOutcome::Success {
            status: 200,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert_eq!(ok.label(), "delivered");

        let retry = DeliveryOutcome::TransientFailure {
            reason: "timeout".to_string(),
        };
        assert!(!retry.is_success());
        assert_eq!(retry.label(), "transient failure");
    }

    #[test]
    fn test_empty_summary() {
        assert!(UsageSummary::default().is_empty());
    }
}
