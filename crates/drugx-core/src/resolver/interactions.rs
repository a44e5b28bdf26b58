//! Pairwise interaction resolver.

use std::sync::Arc;

use crate::db::Database;
use crate::failures::FailureRecorder;
use crate::models::{FailureSource, InteractionOutcome, NoInteractionNote};

use super::{InteractionResult, SynonymExpander};

/// Every unordered index pair `(i, j)` with `i < j`, in row-major order.
pub fn unordered_pairs(n: usize) -> Vec<(usize, usize)> {
    (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .collect()
}

/// Looks up interactions in the store, falling back to synonym pairs.
pub struct InteractionResolver {
    synonyms: SynonymExpander,
    failures: Arc<FailureRecorder>,
}

impl InteractionResolver {
    pub fn new(synonyms: SynonymExpander, failures: Arc<FailureRecorder>) -> Self {
        Self { synonyms, failures }
    }

    /// Resolve one pair. The lookup is symmetric in `drug_a` and `drug_b`.
    ///
    /// The connection is borrowed exclusively for the whole lookup,
    /// synonym fallback included.
    pub async fn resolve(&self, db: &mut Database, drug_a: &str, drug_b: &str) -> InteractionResult<InteractionOutcome> {
        if let Some(record) = db.find_interaction(drug_a, drug_b)? {
            tracing::debug!(drug_a = %drug_a, drug_b = %drug_b, severity = %record.severity, "Found interaction");
            return Ok(InteractionOutcome::found(record));
        }

        tracing::info!(drug_a = %drug_a, drug_b = %drug_b, "No direct interaction, trying synonyms");
        let synonyms_a = self.synonyms.expand(drug_a).await;
        let synonyms_b = self.synonyms.expand(drug_b).await;

        for synonym_a in &synonyms_a {
            for synonym_b in &synonyms_b {
                if let Some(record) = db.find_interaction(synonym_a, synonym_b)? {
                    tracing::info!(
                        drug_a = %drug_a,
                        drug_b = %drug_b,
                        synonym_a = %synonym_a,
                        synonym_b = %synonym_b,
                        "Found interaction via synonyms"
                    );
                    return Ok(InteractionOutcome::found(record));
                }
            }
        }

        self.failures.record(&[drug_a, drug_b], FailureSource::NoInteraction).await;
        Ok(InteractionOutcome::NotFound(NoInteractionNote::new(drug_a, drug_b)))
    }

    /// Resolve every unordered pair of `drugs`, in `(i, j)` order with `i < j`.
    pub async fn resolve_all<S>(&self, db: &mut Database, drugs: &[S]) -> InteractionResult<Vec<InteractionOutcome>>
    where
        S: AsRef<str> + Sync,
    {
        let pairs = unordered_pairs(drugs.len());
        let mut outcomes = Vec::with_capacity(pairs.len());
        for (i, j) in pairs {
            outcomes.push(self.resolve(db, drugs[i].as_ref(), drugs[j].as_ref()).await?);
        }
        Ok(outcomes)
    }
}
