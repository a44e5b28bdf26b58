//! Drug name normalizer.
//!
//! Resolves a free-text name to an RxCUI by trying, in order:
//! - Exact search
//! - Approximate search (accepting the top candidate when it carries an id)
//! - Exact re-query of up to three approximate candidate names
//! - Exact re-query of up to three spelling suggestions
//! - Exact re-query of each synonym from the compound service
//!
//! A resolved id is then expanded into its ingredient name and class tags.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::failures::FailureRecorder;
use crate::models::{CanonicalDrug, ClassType, DrugClasses, FailureSource, NameOutcome, NormalizationOutcome};
use crate::sources::rxnorm::ClassByRxcuiResponse;
use crate::sources::RxNormApi;

use super::{NormalizerError, NormalizerResult, SynonymExpander};

/// Candidates requested from approximate search.
pub const APPROXIMATE_MAX_ENTRIES: u32 = 5;
/// Approximate candidate names re-queried by exact search.
pub const MAX_CANDIDATE_REQUERIES: usize = 3;
/// Spelling suggestions re-queried by exact search.
pub const MAX_SPELLING_SUGGESTIONS: usize = 3;

/// Salt and formulation suffixes stripped when deriving an ingredient from a
/// display name.
pub const SALT_SUFFIXES: &[&str] = &[
    "sodium",
    "hydrochloride",
    "sulfate",
    "tartrate",
    "citrate",
    "phosphate",
    "acetate",
    "chloride",
    "maleate",
    "succinate",
    "fumarate",
    "lactate",
    "hcl",
    "er",
    "sr",
    "xl",
    "cr",
];

/// Class relation sources accepted for the ATC bucket.
pub const ACCEPTED_ATC_SOURCES: &[&str] = &["ATC", "ATCPROD"];

/// Lookup strategy that produced an RxCUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Exact,
    Approximate,
    Candidate,
    SpellingSuggestion,
    Synonym,
}

/// Outcome of the id search chain.
enum RxcuiSearch {
    Found { rxcui: String, strategy: Strategy },
    Exhausted { candidates: Vec<String> },
}

/// Per-name outcomes plus the deduplicated resolved drugs.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    /// One entry per input name, in input order
    pub outcomes: Vec<NameOutcome>,
    /// Resolved drugs, unique by ingredient, first occurrence wins
    pub drugs: Vec<CanonicalDrug>,
}

/// Name normalizer over the normalization service.
pub struct Normalizer {
    rxnorm: Arc<dyn RxNormApi>,
    synonyms: SynonymExpander,
    failures: Arc<FailureRecorder>,
}

impl Normalizer {
    pub fn new(rxnorm: Arc<dyn RxNormApi>, synonyms: SynonymExpander, failures: Arc<FailureRecorder>) -> Self {
        Self {
            rxnorm,
            synonyms,
            failures,
        }
    }

    /// Resolve one name.
    ///
    /// "Not found" is an outcome, not an error. Errors are source failures on
    /// the primary lookups and an id whose ingredient cannot be established.
    pub async fn resolve(&self, name: &str) -> NormalizerResult<NormalizationOutcome> {
        let name = name.trim();

        match self.search_rxcui(name).await? {
            RxcuiSearch::Found { rxcui, strategy } => {
                tracing::debug!(drug = %name, rxcui = %rxcui, strategy = ?strategy, "Resolved RxCUI");
                let drug = self.drug_info(&rxcui).await?;
                Ok(NormalizationOutcome::Resolved { drug })
            }
            RxcuiSearch::Exhausted { candidates } => {
                self.failures.record(&[name], FailureSource::NormalizationExhausted).await;
                Ok(NormalizationOutcome::Failed {
                    reason: format!("Drug '{}' not found", name),
                    candidates,
                })
            }
        }
    }

    /// Resolve each name in order and deduplicate the resolved drugs by
    /// ingredient.
    ///
    /// A name whose lookup errored is recorded as a failure here and becomes
    /// a `Failed` outcome. Exhausted names were already recorded by `resolve`.
    pub async fn resolve_batch<S: AsRef<str> + Sync>(&self, names: &[S]) -> NormalizedBatch {
        let mut batch = NormalizedBatch::default();
        let mut seen = HashSet::new();

        for input in names {
            let input = input.as_ref();
            tracing::info!(drug = %input, "Normalizing");

            let outcome = match self.resolve(input).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(drug = %input, error = %e, "Normalization failed");
                    self.failures.record(&[input], FailureSource::NormalizationFailed).await;
                    NormalizationOutcome::failed(e.to_string())
                }
            };

            match &outcome {
                NormalizationOutcome::Resolved { drug } => {
                    if seen.insert(drug.ingredient.clone()) {
                        tracing::info!(drug = %input, ingredient = %drug.ingredient, "Added");
                        batch.drugs.push(drug.clone());
                    } else {
                        tracing::info!(drug = %input, ingredient = %drug.ingredient, "Duplicate ingredient, skipped");
                    }
                }
                NormalizationOutcome::Candidates { candidates }
                | NormalizationOutcome::Failed { candidates, .. } => {
                    if !candidates.is_empty() {
                        tracing::warn!(drug = %input, candidates = ?candidates, "Unresolved, candidates offered");
                    }
                }
            }

            batch.outcomes.push(NameOutcome {
                input: input.to_string(),
                outcome,
            });
        }

        tracing::info!(ingredients = ?batch.drugs.iter().map(|d| d.ingredient.as_str()).collect::<Vec<_>>(), "Deduplicated drugs");
        batch
    }

    async fn search_rxcui(&self, name: &str) -> NormalizerResult<RxcuiSearch> {
        if let Some(rxcui) = self.rxnorm.find_rxcui(name).await?.first_rxcui() {
            return Ok(found(rxcui, Strategy::Exact));
        }

        tracing::info!(drug = %name, "No exact match, trying approximate search");
        let mut approximate = self
            .rxnorm
            .approximate_term(name, APPROXIMATE_MAX_ENTRIES)
            .await?
            .approximate_group
            .candidate;
        approximate.sort_by(|a, b| b.score().total_cmp(&a.score()).then(a.rank().cmp(&b.rank())));

        if let Some(best) = approximate.first() {
            if let (Some(rxcui), Some(matched)) = (best.usable_rxcui(), best.usable_name()) {
                tracing::warn!(drug = %name, matched = %matched, rxcui = %rxcui, "Using approximate match");
                return Ok(found(rxcui, Strategy::Approximate));
            }
        }

        let mut candidates: Vec<String> = Vec::new();
        for candidate in &approximate {
            if let Some(candidate_name) = candidate.usable_name() {
                if !candidates.iter().any(|c| c == candidate_name) {
                    candidates.push(candidate_name.to_string());
                }
            }
        }

        for candidate in candidates.iter().take(MAX_CANDIDATE_REQUERIES) {
            if let Some(rxcui) = self.requery_exact(candidate).await {
                tracing::info!(drug = %name, candidate = %candidate, rxcui = %rxcui, "Found RxCUI via candidate");
                return Ok(found(&rxcui, Strategy::Candidate));
            }
        }

        tracing::info!(drug = %name, "Trying spelling suggestions");
        let suggestions = self.rxnorm.spelling_suggestions(name).await?;
        for suggestion in suggestions.suggestions().iter().take(MAX_SPELLING_SUGGESTIONS) {
            if let Some(rxcui) = self.requery_exact(suggestion).await {
                tracing::info!(drug = %name, suggestion = %suggestion, rxcui = %rxcui, "Found RxCUI via spelling suggestion");
                return Ok(found(&rxcui, Strategy::SpellingSuggestion));
            }
        }

        tracing::info!(drug = %name, "Trying synonyms");
        for synonym in self.synonyms.expand(name).await {
            if let Some(rxcui) = self.requery_exact(&synonym).await {
                tracing::info!(drug = %name, synonym = %synonym, rxcui = %rxcui, "Found RxCUI via synonym");
                return Ok(found(&rxcui, Strategy::Synonym));
            }
        }

        Ok(RxcuiSearch::Exhausted { candidates })
    }

    /// Exact search for a fallback name; errors only skip this name.
    async fn requery_exact(&self, name: &str) -> Option<String> {
        match self.rxnorm.find_rxcui(name).await {
            Ok(response) => response.first_rxcui().map(str::to_string),
            Err(e) => {
                tracing::debug!(query = %name, error = %e, "Fallback exact search failed");
                None
            }
        }
    }

    /// Fetch ingredient and classes for a resolved id.
    async fn drug_info(&self, rxcui: &str) -> NormalizerResult<CanonicalDrug> {
        let related = self.rxnorm.related_ingredients(rxcui).await?;
        let ingredient = match related.ingredient_name() {
            Some(name) => Some(name.to_string()),
            None => {
                tracing::info!(rxcui = %rxcui, "No ingredient relation, deriving from display name");
                self.ingredient_from_concept(rxcui).await?
            }
        };

        let classes = match self.rxnorm.classes_by_rxcui(rxcui).await {
            Ok(response) => partition_classes(&response),
            Err(e) => {
                tracing::debug!(rxcui = %rxcui, error = %e, "Class lookup failed");
                DrugClasses::default()
            }
        };

        ingredient
            .and_then(|ingredient| CanonicalDrug::new(rxcui, ingredient, classes))
            .ok_or_else(|| NormalizerError::MissingIngredient {
                rxcui: rxcui.to_string(),
            })
    }

    async fn ingredient_from_concept(&self, rxcui: &str) -> NormalizerResult<Option<String>> {
        let concept = self.rxnorm.concept(rxcui).await?;
        if concept.first_rxcui().is_none() {
            return Ok(None);
        }

        let raw = concept.id_group.name.as_deref().unwrap_or_default().trim().to_lowercase();
        if raw.is_empty() {
            return Ok(None);
        }

        let cleaned = strip_salt_suffix(&raw);
        tracing::info!(raw = %raw, cleaned = %cleaned, "Cleaned ingredient name");
        Ok(Some(cleaned).filter(|c| !c.is_empty()))
    }
}

fn found(rxcui: &str, strategy: Strategy) -> RxcuiSearch {
    RxcuiSearch::Found {
        rxcui: rxcui.to_string(),
        strategy,
    }
}

/// Lowercase `name` and strip one trailing salt or formulation suffix that
/// follows a space or hyphen.
pub fn strip_salt_suffix(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    for suffix in SALT_SUFFIXES {
        if let Some(stem) = lower.strip_suffix(suffix) {
            if let Some(stem) = stem.strip_suffix(|c: char| c.is_whitespace() || c == '-') {
                return stem.trim().to_string();
            }
        }
    }
    lower
}

/// Sort class concepts into the four buckets.
///
/// ATC entries need an accepted relation source and are ordered by class
/// id; the other buckets are deduplicated and sorted by name.
pub fn partition_classes(response: &ClassByRxcuiResponse) -> DrugClasses {
    let mut epc = BTreeSet::new();
    let mut moa = BTreeSet::new();
    let mut pe = BTreeSet::new();
    let mut atc = BTreeSet::new();

    for info in &response.rxclass_drug_info_list.rxclass_drug_info {
        let concept = &info.rxclass_min_concept_item;
        let class_name = concept.class_name.trim();
        if class_name.is_empty() {
            continue;
        }

        match ClassType::from_code(&concept.class_type) {
            Some(ClassType::Epc) => {
                epc.insert(class_name.to_string());
            }
            Some(ClassType::Moa) => {
                moa.insert(class_name.to_string());
            }
            Some(ClassType::Pe) => {
                pe.insert(class_name.to_string());
            }
            Some(ClassType::Atc) => {
                if ACCEPTED_ATC_SOURCES.contains(&info.rela_source.as_str()) {
                    atc.insert((concept.class_id.clone(), class_name.to_string()));
                }
            }
            None => {}
        }
    }

    DrugClasses::from_parts(epc, moa, pe, atc.into_iter().map(|(_, name)| name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_salt_suffix() {
        assert_eq!(strip_salt_suffix("Naproxen Sodium"), "naproxen");
        assert_eq!(strip_salt_suffix("metformin-er"), "metformin");
        assert_eq!(strip_salt_suffix("diltiazem hydrochloride"), "diltiazem");
        assert_eq!(strip_salt_suffix("nifedipine XL"), "nifedipine");
        // Suffix must follow a separator
        assert_eq!(strip_salt_suffix("lavender"), "lavender");
        assert_eq!(strip_salt_suffix("warfarin"), "warfarin");
        // Only one suffix is stripped
        assert_eq!(strip_salt_suffix("drug sodium er"), "drug sodium");
    }

    #[test]
    fn test_partition_classes() {
        let response: ClassByRxcuiResponse = serde_json::from_value(json!({
            "rxclassDrugInfoList": {
                "rxclassDrugInfo": [
                    {"rxclassMinConceptItem": {"classId": "N0000175722", "className": "Platelet Aggregation Inhibitor", "classType": "EPC"}, "relaSource": "DAILYMED"},
                    {"rxclassMinConceptItem": {"classId": "N0000175721", "className": "Cyclooxygenase Inhibitors", "classType": "MOA"}, "relaSource": "DAILYMED"},
                    {"rxclassMinConceptItem": {"classId": "N0000175722", "className": "Platelet Aggregation Inhibitor", "classType": "EPC"}, "relaSource": "FDASPL"},
                    {"rxclassMinConceptItem": {"classId": "N02BA", "className": "Salicylic acid and derivatives", "classType": "ATC1-4"}, "relaSource": "ATC"},
                    {"rxclassMinConceptItem": {"classId": "B01AC", "className": "Platelet aggregation inhibitors excl. heparin", "classType": "ATC1-4"}, "relaSource": "ATCPROD"},
                    {"rxclassMinConceptItem": {"classId": "A01AD", "className": "Other agents for local oral treatment", "classType": "ATC1-4"}, "relaSource": "MESH"},
                    {"rxclassMinConceptItem": {"classId": "D001", "className": "Pain", "classType": "DISEASE"}, "relaSource": "MEDRT"}
                ]
            }
        }))
        .unwrap();

        let classes = partition_classes(&response);
        assert_eq!(classes.epc, vec!["Platelet Aggregation Inhibitor"]);
        assert_eq!(classes.moa, vec!["Cyclooxygenase Inhibitors"]);
        assert!(classes.pe.is_empty());
        // Ordered by class id, unaccepted provenance dropped
        assert_eq!(
            classes.atc,
            vec!["Platelet aggregation inhibitors excl. heparin", "Salicylic acid and derivatives"]
        );
    }

    #[test]
    fn test_partition_empty_response() {
        let classes = partition_classes(&ClassByRxcuiResponse::default());
        assert!(classes.is_empty());
    }
}
