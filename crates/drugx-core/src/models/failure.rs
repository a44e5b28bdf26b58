//! Failed lookup records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which component exhausted its fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureSource {
    /// Normalizer ran every strategy through the synonym fallback
    NormalizationExhausted,
    /// Batch normalization dropped a name (candidates only, or source error)
    NormalizationFailed,
    /// No interaction on record after the synonym cross product
    NoInteraction,
    /// No adverse-event reports after the synonym combinations
    NoAdverseReports,
    /// Adverse-event source failed outright
    AdverseEventError,
}

impl FailureSource {
    /// Stable tag persisted with the record.
    pub fn tag(&self) -> &'static str {
        match self {
            FailureSource::NormalizationExhausted => "rxnorm_pubchem",
            FailureSource::NormalizationFailed => "normalization_failed",
            FailureSource::NoInteraction => "ddinter_no_interaction",
            FailureSource::NoAdverseReports => "openfda_no_reports",
            FailureSource::AdverseEventError => "openfda_error",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        [
            FailureSource::NormalizationExhausted,
            FailureSource::NormalizationFailed,
            FailureSource::NoInteraction,
            FailureSource::NoAdverseReports,
            FailureSource::AdverseEventError,
        ]
        .into_iter()
        .find(|s| s.tag() == tag)
    }
}

impl fmt::Display for FailureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// An append-only record of an exhausted lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedLookup {
    pub id: String,
    pub drugs: Vec<String>,
    /// Stored as the raw tag so unknown tags survive a round trip
    pub source: String,
    pub failed_at: DateTime<Utc>,
}

impl FailedLookup {
    /// Create a record stamped with the current time.
    pub fn new(drugs: Vec<String>, source: FailureSource) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            drugs,
            source: source.tag().to_string(),
            failed_at: Utc::now(),
        }
    }

    pub fn failure_source(&self) -> Option<FailureSource> {
        FailureSource::from_tag(&self.source)
    }
}
