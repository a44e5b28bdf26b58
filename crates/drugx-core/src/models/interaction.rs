//! Pairwise interaction models.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Therapeutic category letters with their explanations.
pub const ATC_CATEGORIES: &[(char, &str)] = &[
    ('A', "Alimentary tract and metabolism"),
    ('B', "Blood and blood-forming organs"),
    ('D', "Dermatologicals"),
    ('H', "Systemic hormonal preparations (excluding sex hormones and insulins)"),
    ('L', "Antineoplastic and immunomodulating agents"),
    ('P', "Antiparasitic products, insecticides and repellents"),
    ('R', "Respiratory system"),
    ('V', "Various"),
];

/// Note attached when the store has no record for a pair.
pub const NO_INTERACTION_NOTE: &str = "No known clinically significant interaction is on record for these drugs. \
This does not guarantee safety, only that no interaction has been established in current data.";

/// Look up the explanation for a category letter.
pub fn category_explanation(code: char) -> Option<&'static str> {
    ATC_CATEGORIES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, text)| *text)
}

/// Interaction severity as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Minor,
    Moderate,
    Major,
    Unknown,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "Minor",
            Severity::Moderate => "Moderate",
            Severity::Major => "Major",
            Severity::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minor" => Ok(Severity::Minor),
            "moderate" => Ok(Severity::Moderate),
            "major" => Ok(Severity::Major),
            "unknown" => Ok(Severity::Unknown),
            other => Err(format!("unknown severity level: {other}")),
        }
    }
}

/// A stored interaction between two drugs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub severity: Severity,
    /// Source-system identifiers, in stored order
    pub source_ids: (String, String),
    /// Drug names as stored, in stored order
    pub drugs: (String, String),
    /// Single-letter therapeutic category codes (never empty)
    pub categories: BTreeSet<char>,
}

impl InteractionRecord {
    /// Parse a comma-joined category string; `None` when no letter survives.
    pub fn parse_categories(raw: &str) -> Option<BTreeSet<char>> {
        let categories: BTreeSet<char> = raw
            .split(',')
            .filter_map(|c| {
                let mut chars = c.trim().chars();
                match (chars.next(), chars.next()) {
                    (Some(letter), None) if letter.is_ascii_alphabetic() => Some(letter.to_ascii_uppercase()),
                    _ => None,
                }
            })
            .collect();
        (!categories.is_empty()).then_some(categories)
    }

    /// Explanations for categories found in the closed ATC map.
    pub fn category_explanations(&self) -> BTreeMap<char, &'static str> {
        self.categories
            .iter()
            .filter_map(|c| category_explanation(*c).map(|text| (*c, text)))
            .collect()
    }
}

/// Explicit "nothing on record" result for a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoInteractionNote {
    /// The two names that were looked up
    pub drugs: (String, String),
    pub note: String,
}

impl NoInteractionNote {
    pub fn new(a: &str, b: &str) -> Self {
        Self {
            drugs: (a.to_string(), b.to_string()),
            note: NO_INTERACTION_NOTE.to_string(),
        }
    }
}

/// Outcome of one pairwise lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InteractionOutcome {
    Found {
        #[serde(flatten)]
        record: InteractionRecord,
        /// Category explanations for the narrative step
        category_explanations: BTreeMap<char, String>,
    },
    NotFound(NoInteractionNote),
}

impl InteractionOutcome {
    pub fn found(record: InteractionRecord) -> Self {
        let category_explanations = record
            .category_explanations()
            .into_iter()
            .map(|(c, text)| (c, text.to_string()))
            .collect();
        InteractionOutcome::Found {
            record,
            category_explanations,
        }
    }

    pub fn record(&self) -> Option<&InteractionRecord> {
        match self {
            InteractionOutcome::Found { record, .. } => Some(record),
            InteractionOutcome::NotFound(_) => None,
        }
    }

    pub fn severity(&self) -> Option<Severity> {
        self.record().map(|r| r.severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_severity() {
        assert_eq!("Major".parse::<Severity>(), Ok(Severity::Major));
        assert_eq!("minor".parse::<Severity>(), Ok(Severity::Minor));
        assert!("Severe".parse::<Severity>().is_err());
    }

    #[test]
    fn test_parse_categories() {
        let cats = InteractionRecord::parse_categories("B,A, L").unwrap();
        assert_eq!(cats.into_iter().collect::<Vec<_>>(), vec!['A', 'B', 'L']);

        assert!(InteractionRecord::parse_categories("").is_none());
        assert!(InteractionRecord::parse_categories(" , ,").is_none());
        // Multi-letter tokens are not category codes
        assert!(InteractionRecord::parse_categories("AB").is_none());
    }

    #[test]
    fn test_category_explanations_skip_unknown_letters() {
        let record = InteractionRecord {
            severity: Severity::Moderate,
            source_ids: ("DDInter14".into(), "DDInter1951".into()),
            drugs: ("Acetaminophen".into(), "Warfarin".into()),
            categories: ['B', 'Z'].into_iter().collect(),
        };
        let explanations = record.category_explanations();
        assert_eq!(explanations.len(), 1);
        assert_eq!(explanations[&'B'], "Blood and blood-forming organs");
    }

    #[test]
    fn test_outcome_json_shape() {
        let note = InteractionOutcome::NotFound(NoInteractionNote::new("aspirin", "zinc"));
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["status"], "not_found");
        assert_eq!(json["drugs"][0], "aspirin");
        assert!(json["note"].as_str().unwrap().contains("does not guarantee safety"));
    }
}
