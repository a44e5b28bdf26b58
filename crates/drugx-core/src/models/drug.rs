//! Normalized drug identity models.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Classification families returned by the class lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassType {
    /// Established pharmacologic class (EPC)
    Epc,
    /// Mechanism of action (MOA)
    Moa,
    /// Physiologic effect (PE)
    Pe,
    /// Anatomical therapeutic chemical classification (ATC1-4)
    Atc,
}

impl ClassType {
    pub const ALL: [ClassType; 4] = [ClassType::Epc, ClassType::Moa, ClassType::Pe, ClassType::Atc];

    /// Map an upstream class type code onto a bucket.
    ///
    /// Any `ATC*` level collapses into the single ATC bucket.
    pub fn from_code(code: &str) -> Option<Self> {
        let upper = code.trim().to_uppercase();
        match upper.as_str() {
            "EPC" => Some(ClassType::Epc),
            "MOA" => Some(ClassType::Moa),
            "PE" => Some(ClassType::Pe),
            _ if upper.starts_with("ATC") => Some(ClassType::Atc),
            _ => None,
        }
    }
}

/// Class tags for a drug, one ordered bucket per [`ClassType`].
///
/// All four buckets are always present (possibly empty) when serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugClasses {
    pub epc: Vec<String>,
    pub moa: Vec<String>,
    pub pe: Vec<String>,
    pub atc: Vec<String>,
}

impl DrugClasses {
    /// Get the bucket for a class type.
    pub fn get(&self, class_type: ClassType) -> &[String] {
        match class_type {
            ClassType::Epc => &self.epc,
            ClassType::Moa => &self.moa,
            ClassType::Pe => &self.pe,
            ClassType::Atc => &self.atc,
        }
    }

    /// True when no bucket holds a class name.
    pub fn is_empty(&self) -> bool {
        ClassType::ALL.iter().all(|t| self.get(*t).is_empty())
    }

    /// Build from sorted sets; ATC names arrive already ordered by class id.
    pub(crate) fn from_parts(
        epc: BTreeSet<String>,
        moa: BTreeSet<String>,
        pe: BTreeSet<String>,
        atc: Vec<String>,
    ) -> Self {
        Self {
            epc: epc.into_iter().collect(),
            moa: moa.into_iter().collect(),
            pe: pe.into_iter().collect(),
            atc,
        }
    }
}

/// A drug name resolved to its normalization identifier and ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalDrug {
    /// Opaque identifier from the normalization service (RxCUI)
    pub rxcui: String,
    /// Canonical lowercase ingredient name
    pub ingredient: String,
    /// Classification tags
    pub classes: DrugClasses,
}

impl CanonicalDrug {
    /// Construct a canonical drug, enforcing that both identifier and
    /// ingredient are non-empty.
    pub fn new(rxcui: impl Into<String>, ingredient: impl Into<String>, classes: DrugClasses) -> Option<Self> {
        let rxcui = rxcui.into().trim().to_string();
        let ingredient = ingredient.into().trim().to_lowercase();
        if rxcui.is_empty() || ingredient.is_empty() {
            return None;
        }
        Some(Self {
            rxcui,
            ingredient,
            classes,
        })
    }
}

/// Result of resolving one free-text name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NormalizationOutcome {
    /// Name resolved to a canonical drug
    Resolved { drug: CanonicalDrug },
    /// Nothing resolved, but approximate search offered these names
    Candidates { candidates: Vec<String> },
    /// Nothing resolved; `candidates` holds any names approximate search offered
    Failed {
        reason: String,
        #[serde(default)]
        candidates: Vec<String>,
    },
}

impl NormalizationOutcome {
    /// The canonical drug if resolved.
    pub fn drug(&self) -> Option<&CanonicalDrug> {
        match self {
            NormalizationOutcome::Resolved { drug } => Some(drug),
            _ => None,
        }
    }

    /// A failed outcome with no candidate names.
    pub fn failed(reason: impl Into<String>) -> Self {
        NormalizationOutcome::Failed {
            reason: reason.into(),
            candidates: Vec::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, NormalizationOutcome::Resolved { .. })
    }
}

/// The outcome for a single input name, kept in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameOutcome {
    /// The name as supplied by the user
    pub input: String,
    #[serde(flatten)]
    pub outcome: NormalizationOutcome,
}
