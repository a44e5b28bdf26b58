//! Synonym expansion, the last-resort fallback for every lookup.

use std::sync::Arc;

use crate::sources::PubChemApi;

/// Most synonyms returned per name.
pub const MAX_SYNONYMS: usize = 3;

/// Expands a free-text name into alternate names from the compound service.
///
/// Never fails: a missing compound, a fault answer or an exhausted retry
/// budget all produce an empty list.
#[derive(Clone)]
pub struct SynonymExpander {
    source: Arc<dyn PubChemApi>,
}

impl SynonymExpander {
    pub fn new(source: Arc<dyn PubChemApi>) -> Self {
        Self { source }
    }

    /// Up to three cleaned synonyms for `name`, in source order.
    pub async fn expand(&self, name: &str) -> Vec<String> {
        let response = match self.source.synonyms(name).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(drug = %name, error = %e, "Synonym lookup failed");
                return Vec::new();
            }
        };

        if let Some(fault) = &response.fault {
            tracing::info!(drug = %name, code = %fault.code, message = %fault.message, "No compound found for synonyms");
            return Vec::new();
        }

        let synonyms = clean_synonyms(response.raw_synonyms());
        tracing::info!(
            drug = %name,
            total = response.raw_synonyms().len(),
            kept = synonyms.len(),
            synonyms = ?synonyms,
            "Expanded synonyms"
        );
        synonyms
    }
}

/// Clean the first [`MAX_SYNONYMS`] raw synonyms, dropping any left empty.
pub fn clean_synonyms<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .take(MAX_SYNONYMS)
        .map(|s| clean_drug_name(s.as_ref()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Keep only ASCII letters and whitespace, then trim.
pub fn clean_drug_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clean_drug_name() {
        assert_eq!(clean_drug_name("2-Acetoxybenzoic acid"), "Acetoxybenzoic acid");
        assert_eq!(clean_drug_name("50-78-2"), "");
        assert_eq!(clean_drug_name("  Aspirin®  "), "Aspirin");
    }

    #[test]
    fn test_only_first_three_considered() {
        // The numeric third entry is dropped, not replaced by the fourth
        let cleaned = clean_synonyms(&["aspirin", "ACETYLSALICYLIC ACID", "50-78-2", "Ecotrin"]);
        assert_eq!(cleaned, vec!["aspirin", "ACETYLSALICYLIC ACID"]);
    }

    proptest! {
        #[test]
        fn prop_alphabetic_lists_keep_three_in_order(raw in prop::collection::vec("[a-zA-Z]{1,12}", 4..20)) {
            let cleaned = clean_synonyms(&raw);
            prop_assert_eq!(cleaned.len(), 3);
            prop_assert_eq!(&cleaned[..], &raw[..3]);
        }

        #[test]
        fn prop_cleaned_entries_are_letters_and_spaces(raw in prop::collection::vec(".{0,20}", 0..10)) {
            let cleaned = clean_synonyms(&raw);
            prop_assert!(cleaned.len() <= MAX_SYNONYMS);
            for entry in &cleaned {
                prop_assert!(!entry.is_empty());
                prop_assert!(entry.chars().all(|c| c.is_ascii_alphabetic() || c.is_whitespace()));
                prop_assert_eq!(entry.trim(), entry.as_str());
            }
        }
    }
}
