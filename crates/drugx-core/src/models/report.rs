//! Consolidated per-request report.

use serde::{Deserialize, Serialize};

use super::{AdverseEventSummary, CanonicalDrug, InteractionOutcome, NameOutcome};

/// Everything found (and not found) for one request.
///
/// This is the sole input handed to narrative generation, so every field is
/// always present even when nothing was resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionReport {
    /// One entry per input name, in input order
    pub normalization: Vec<NameOutcome>,
    /// Deduplicated resolved drugs, first occurrence wins
    pub drugs: Vec<CanonicalDrug>,
    /// One entry per unordered pair of `drugs`, in (i, j) order with i < j
    pub interactions: Vec<InteractionOutcome>,
    pub adverse_events: AdverseEventSummary,
}

impl InteractionReport {
    /// Ingredient names of the resolved drugs.
    pub fn ingredients(&self) -> Vec<String> {
        self.drugs.iter().map(|d| d.ingredient.clone()).collect()
    }

    /// Names that did not resolve.
    pub fn unresolved(&self) -> Vec<&str> {
        self.normalization
            .iter()
            .filter(|n| !n.outcome.is_resolved())
            .map(|n| n.input.as_str())
            .collect()
    }
}
