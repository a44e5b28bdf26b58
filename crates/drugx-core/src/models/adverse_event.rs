//! Adverse-event co-occurrence summary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Reason attached when no reports were found after the synonym search.
pub const NO_REPORTS_REASON: &str = "No reports found after synonym search";

/// Co-occurrence statistics for a set of drugs.
///
/// `total_reports` is the authoritative count from the source; the other
/// counters describe only the inspected sample, so `serious_reports` is
/// bounded by `sample_size`, never by `total_reports`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdverseEventSummary {
    /// Names used in the query that produced this summary
    pub drugs: Vec<String>,
    pub total_reports: u64,
    pub serious_reports: u64,
    /// Up to five distinct reaction terms, in first-seen order
    pub top_reactions: Vec<String>,
    pub last_report_date: Option<NaiveDate>,
    pub sample_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AdverseEventSummary {
    /// Zeroed summary; used when fewer than two drugs are given.
    pub fn empty(drugs: Vec<String>) -> Self {
        Self {
            drugs,
            total_reports: 0,
            serious_reports: 0,
            top_reactions: Vec::new(),
            last_report_date: None,
            sample_size: 0,
            reason: None,
            error: None,
        }
    }

    /// Zeroed summary after the synonym search came up empty.
    pub fn not_found(drugs: Vec<String>) -> Self {
        Self {
            reason: Some(NO_REPORTS_REASON.to_string()),
            ..Self::empty(drugs)
        }
    }

    /// Zeroed summary after the source failed outright.
    pub fn failed(drugs: Vec<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(drugs)
        }
    }

    pub fn has_reports(&self) -> bool {
        self.total_reports > 0
    }
}
