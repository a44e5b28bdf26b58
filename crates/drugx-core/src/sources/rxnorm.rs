//! Normalization service (RxNorm / RxClass) client and response schemas.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{HttpSource, RetryPolicy, SourceResult};

pub const SERVICE: &str = "rxnorm";
pub const DEFAULT_BASE_URL: &str = "https://rxnav.nlm.nih.gov/REST";

/// Normalization and classification endpoints.
#[async_trait]
pub trait RxNormApi: Send + Sync {
    /// Exact-match identifier search for a name.
    async fn find_rxcui(&self, name: &str) -> SourceResult<IdGroupResponse>;

    /// Approximate-match search returning up to `max_entries` candidates.
    async fn approximate_term(&self, term: &str, max_entries: u32) -> SourceResult<ApproximateTermResponse>;

    async fn spelling_suggestions(&self, name: &str) -> SourceResult<SpellingSuggestionsResponse>;

    /// Concepts related to `rxcui` with the ingredient term type.
    async fn related_ingredients(&self, rxcui: &str) -> SourceResult<RelatedResponse>;

    /// The concept's own properties (display name).
    async fn concept(&self, rxcui: &str) -> SourceResult<IdGroupResponse>;

    async fn classes_by_rxcui(&self, rxcui: &str) -> SourceResult<ClassByRxcuiResponse>;
}

// ============================================================================
// Response schemas
// ============================================================================

/// Response of `rxcui.json` and `rxcui/{id}.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdGroupResponse {
    #[serde(default)]
    pub id_group: IdGroup,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdGroup {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rxnorm_id: Vec<String>,
}

impl IdGroupResponse {
    /// First non-empty identifier, if any.
    pub fn first_rxcui(&self) -> Option<&str> {
        self.id_group
            .rxnorm_id
            .iter()
            .map(|id| id.trim())
            .find(|id| !id.is_empty())
    }
}

/// Response of `approximateTerm.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproximateTermResponse {
    #[serde(default)]
    pub approximate_group: ApproximateGroup,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApproximateGroup {
    #[serde(default)]
    pub candidate: Vec<ApproximateCandidate>,
}

/// One approximate-match candidate. Score and rank arrive as strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApproximateCandidate {
    #[serde(default)]
    pub rxcui: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub score: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
}

impl ApproximateCandidate {
    /// Match score; unparseable or missing scores count as 0.
    pub fn score(&self) -> f64 {
        self.score
            .as_deref()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0.0)
    }

    /// Rank; unparseable or missing ranks count as 1.
    pub fn rank(&self) -> i64 {
        self.rank
            .as_deref()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1)
    }

    /// Matched name, unless absent or a null sentinel.
    pub fn usable_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty() && !is_null_sentinel(n))
    }

    pub fn usable_rxcui(&self) -> Option<&str> {
        self.rxcui.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }
}

fn is_null_sentinel(name: &str) -> bool {
    name.eq_ignore_ascii_case("none") || name.eq_ignore_ascii_case("null")
}

/// Response of `spellingsuggestions.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellingSuggestionsResponse {
    #[serde(default)]
    pub suggestion_group: SuggestionGroup,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionGroup {
    /// Null when the service has no suggestions
    #[serde(default)]
    pub suggestion_list: Option<SuggestionList>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestionList {
    #[serde(default)]
    pub suggestion: Vec<String>,
}

impl SpellingSuggestionsResponse {
    pub fn suggestions(&self) -> &[String] {
        self.suggestion_group
            .suggestion_list
            .as_ref()
            .map(|l| l.suggestion.as_slice())
            .unwrap_or_default()
    }
}

/// Response of `rxcui/{id}/related.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedResponse {
    #[serde(default)]
    pub related_group: RelatedGroup,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedGroup {
    #[serde(default)]
    pub concept_group: Vec<ConceptGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptGroup {
    #[serde(default)]
    pub tty: String,
    #[serde(default)]
    pub concept_properties: Vec<ConceptProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConceptProperties {
    #[serde(default)]
    pub rxcui: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl RelatedResponse {
    /// Name of the first concept in the first ingredient (`IN`) group.
    pub fn ingredient_name(&self) -> Option<&str> {
        self.related_group
            .concept_group
            .iter()
            .find(|g| g.tty == "IN")
            .and_then(|g| g.concept_properties.first())
            .and_then(|p| p.name.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

/// Response of `rxclass/class/byRxcui.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassByRxcuiResponse {
    #[serde(default)]
    pub rxclass_drug_info_list: RxClassDrugInfoList,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxClassDrugInfoList {
    #[serde(default)]
    pub rxclass_drug_info: Vec<RxClassDrugInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxClassDrugInfo {
    #[serde(default)]
    pub rxclass_min_concept_item: RxClassConcept,
    /// Provenance of the class relation
    #[serde(default)]
    pub rela_source: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxClassConcept {
    #[serde(default)]
    pub class_id: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub class_type: String,
}

// ============================================================================
// HTTP client
// ============================================================================

/// Normalization service over HTTP.
pub struct HttpRxNorm {
    http: HttpSource,
}

impl HttpRxNorm {
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str, retry: RetryPolicy) -> SourceResult<Self> {
        Ok(Self {
            http: HttpSource::new(SERVICE, base_url, timeout, user_agent, retry)?,
        })
    }
}

#[async_trait]
impl RxNormApi for HttpRxNorm {
    async fn find_rxcui(&self, name: &str) -> SourceResult<IdGroupResponse> {
        self.http.get_json("rxcui.json", &[("name", name), ("search", "2")]).await
    }

    async fn approximate_term(&self, term: &str, max_entries: u32) -> SourceResult<ApproximateTermResponse> {
        let max_entries = max_entries.to_string();
        self.http
            .get_json("approximateTerm.json", &[("term", term), ("maxEntries", max_entries.as_str())])
            .await
    }

    async fn spelling_suggestions(&self, name: &str) -> SourceResult<SpellingSuggestionsResponse> {
        self.http.get_json("spellingsuggestions.json", &[("name", name)]).await
    }

    async fn related_ingredients(&self, rxcui: &str) -> SourceResult<RelatedResponse> {
        self.http
            .get_json(&format!("rxcui/{}/related.json", rxcui), &[("tty", "IN")])
            .await
    }

    async fn concept(&self, rxcui: &str) -> SourceResult<IdGroupResponse> {
        self.http.get_json(&format!("rxcui/{}.json", rxcui), &[]).await
    }

    async fn classes_by_rxcui(&self, rxcui: &str) -> SourceResult<ClassByRxcuiResponse> {
        self.http
            .get_json("rxclass/class/byRxcui.json", &[("rxcui", rxcui)])
            .await
    }
}
