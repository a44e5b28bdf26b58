//! Shared in-memory sources and fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use drugx_core::db::{Database, DatabasePool};
use drugx_core::models::{InteractionRecord, Severity};
use drugx_core::sources::openfda::{build_search_query, SERVICE as OPENFDA};
use drugx_core::sources::pubchem::SERVICE as PUBCHEM;
use drugx_core::sources::rxnorm::{
    ApproximateTermResponse, ClassByRxcuiResponse, IdGroupResponse, RelatedResponse, SpellingSuggestionsResponse,
    SERVICE as RXNORM,
};
use drugx_core::sources::{
    EventSearchResponse, OpenFdaApi, PubChemApi, RxNormApi, SourceError, SourceResult, SynonymsResponse,
};
use drugx_core::{DrugChecker, FailureRecorder, Sources};

pub const ASPIRIN_RXCUI: &str = "1191";
pub const WARFARIN_RXCUI: &str = "11289";

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).expect("fixture must decode")
}

// ============================================================================
// Normalization service
// ============================================================================

#[derive(Default)]
pub struct MockRxNorm {
    exact: HashMap<String, String>,
    approximate: HashMap<String, Value>,
    spelling: HashMap<String, Vec<String>>,
    ingredients: HashMap<String, String>,
    concepts: HashMap<String, String>,
    classes: HashMap<String, Value>,
    unavailable: bool,
    calls: Mutex<Vec<String>>,
}

impl MockRxNorm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact search for `name` (case-insensitive) returns `rxcui`.
    pub fn with_exact(mut self, name: &str, rxcui: &str) -> Self {
        self.exact.insert(name.to_lowercase(), rxcui.to_string());
        self
    }

    /// Approximate search for `name` returns these candidate objects.
    pub fn with_approximate(mut self, name: &str, candidates: Value) -> Self {
        self.approximate.insert(name.to_lowercase(), candidates);
        self
    }

    pub fn with_spelling(mut self, name: &str, suggestions: &[&str]) -> Self {
        self.spelling
            .insert(name.to_lowercase(), suggestions.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_ingredient(mut self, rxcui: &str, ingredient: &str) -> Self {
        self.ingredients.insert(rxcui.to_string(), ingredient.to_string());
        self
    }

    pub fn with_concept(mut self, rxcui: &str, display_name: &str) -> Self {
        self.concepts.insert(rxcui.to_string(), display_name.to_string());
        self
    }

    pub fn with_classes(mut self, rxcui: &str, classes: Value) -> Self {
        self.classes.insert(rxcui.to_string(), classes);
        self
    }

    /// Every exact search fails with a transport error.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of calls to one endpoint, e.g. `"find_rxcui"`.
    pub fn count(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.split(':').next() == Some(endpoint))
            .count()
    }

    fn log(&self, endpoint: &str, arg: &str) {
        self.calls.lock().push(format!("{}:{}", endpoint, arg));
    }
}

#[async_trait]
impl RxNormApi for MockRxNorm {
    async fn find_rxcui(&self, name: &str) -> SourceResult<IdGroupResponse> {
        self.log("find_rxcui", name);
        if self.unavailable {
            return Err(SourceError::transport(RXNORM, "connection refused"));
        }
        Ok(match self.exact.get(&name.trim().to_lowercase()) {
            Some(rxcui) => decode(json!({"idGroup": {"name": name, "rxnormId": [rxcui]}})),
            None => decode(json!({"idGroup": {"name": name}})),
        })
    }

    async fn approximate_term(&self, term: &str, _max_entries: u32) -> SourceResult<ApproximateTermResponse> {
        self.log("approximate_term", term);
        let candidates = self.approximate.get(&term.to_lowercase()).cloned().unwrap_or(json!([]));
        Ok(decode(json!({"approximateGroup": {"inputTerm": term, "candidate": candidates}})))
    }

    async fn spelling_suggestions(&self, name: &str) -> SourceResult<SpellingSuggestionsResponse> {
        self.log("spelling_suggestions", name);
        Ok(match self.spelling.get(&name.to_lowercase()) {
            Some(suggestions) => decode(json!({"suggestionGroup": {"suggestionList": {"suggestion": suggestions}}})),
            None => decode(json!({"suggestionGroup": {"name": name, "suggestionList": null}})),
        })
    }

    async fn related_ingredients(&self, rxcui: &str) -> SourceResult<RelatedResponse> {
        self.log("related_ingredients", rxcui);
        Ok(match self.ingredients.get(rxcui) {
            Some(name) => decode(json!({
                "relatedGroup": {"conceptGroup": [
                    {"tty": "IN", "conceptProperties": [{"rxcui": rxcui, "name": name, "tty": "IN"}]}
                ]}
            })),
            None => decode(json!({"relatedGroup": {"conceptGroup": [{"tty": "IN"}]}})),
        })
    }

    async fn concept(&self, rxcui: &str) -> SourceResult<IdGroupResponse> {
        self.log("concept", rxcui);
        Ok(match self.concepts.get(rxcui) {
            Some(name) => decode(json!({"idGroup": {"name": name, "rxnormId": [rxcui]}})),
            None => IdGroupResponse::default(),
        })
    }

    async fn classes_by_rxcui(&self, rxcui: &str) -> SourceResult<ClassByRxcuiResponse> {
        self.log("classes_by_rxcui", rxcui);
        Ok(match self.classes.get(rxcui) {
            Some(classes) => decode(classes.clone()),
            None => ClassByRxcuiResponse::default(),
        })
    }
}

// ============================================================================
// Compound-synonym service
// ============================================================================

#[derive(Default)]
pub struct MockPubChem {
    synonyms: HashMap<String, Vec<String>>,
    unavailable: bool,
    calls: Mutex<Vec<String>>,
}

impl MockPubChem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_synonyms(mut self, name: &str, synonyms: &[&str]) -> Self {
        self.synonyms
            .insert(name.to_lowercase(), synonyms.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl PubChemApi for MockPubChem {
    async fn synonyms(&self, name: &str) -> SourceResult<SynonymsResponse> {
        self.calls.lock().push(name.to_string());
        if self.unavailable {
            return Err(SourceError::transport(PUBCHEM, "timed out"));
        }
        Ok(match self.synonyms.get(&name.to_lowercase()) {
            Some(synonyms) => decode(json!({
                "InformationList": {"Information": [{"CID": 2244, "Synonym": synonyms}]}
            })),
            None => decode(json!({
                "Fault": {"Code": "PUGREST.NotFound", "Message": "No CID found"}
            })),
        })
    }
}

// ============================================================================
// Adverse-event service
// ============================================================================

#[derive(Default)]
pub struct MockOpenFda {
    responses: HashMap<String, Value>,
    failing: bool,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockOpenFda {
    pub fn new() -> Self {
        Self::default()
    }

    /// The AND query over exactly these names returns `response`.
    pub fn with_response(mut self, drugs: &[&str], response: Value) -> Self {
        self.responses.insert(build_search_query(drugs), response);
        self
    }

    /// Every query fails with a server error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl OpenFdaApi for MockOpenFda {
    async fn search_events(&self, search: &str, _limit: u32) -> SourceResult<EventSearchResponse> {
        self.calls.lock().push(search.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(SourceError::Status {
                service: OPENFDA,
                status: 500,
                body: "internal error".into(),
            });
        }
        match self.responses.get(search) {
            Some(response) => Ok(decode(response.clone())),
            None => Err(SourceError::NotFound {
                service: OPENFDA,
                body: json!({"error": {"code": "NOT_FOUND", "message": "No matches found!"}}).to_string(),
            }),
        }
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Normalization service that knows aspirin and warfarin by exact name.
pub fn aspirin_warfarin_rxnorm() -> MockRxNorm {
    MockRxNorm::new()
        .with_exact("aspirin", ASPIRIN_RXCUI)
        .with_exact("warfarin", WARFARIN_RXCUI)
        .with_ingredient(ASPIRIN_RXCUI, "aspirin")
        .with_ingredient(WARFARIN_RXCUI, "warfarin")
        .with_classes(ASPIRIN_RXCUI, aspirin_classes())
        .with_classes(
            WARFARIN_RXCUI,
            json!({"rxclassDrugInfoList": {"rxclassDrugInfo": [
                {"rxclassMinConceptItem": {"classId": "N0000175596", "className": "Vitamin K Antagonist", "classType": "EPC"}, "relaSource": "DAILYMED"},
                {"rxclassMinConceptItem": {"classId": "B01AA", "className": "Vitamin K antagonists", "classType": "ATC1-4"}, "relaSource": "ATC"}
            ]}}),
        )
}

pub fn aspirin_classes() -> Value {
    json!({"rxclassDrugInfoList": {"rxclassDrugInfo": [
        {"rxclassMinConceptItem": {"classId": "N0000175722", "className": "Platelet Aggregation Inhibitor", "classType": "EPC"}, "relaSource": "DAILYMED"},
        {"rxclassMinConceptItem": {"classId": "N0000000160", "className": "Cyclooxygenase Inhibitors", "classType": "MOA"}, "relaSource": "DAILYMED"},
        {"rxclassMinConceptItem": {"classId": "N0000008836", "className": "Decreased Platelet Aggregation", "classType": "PE"}, "relaSource": "DAILYMED"},
        {"rxclassMinConceptItem": {"classId": "B01AC", "className": "Platelet aggregation inhibitors excl. heparin", "classType": "ATC1-4"}, "relaSource": "ATC"}
    ]}})
}

/// Two-report sample with a total of 15691.
pub fn adverse_event_fixture() -> Value {
    json!({
        "meta": {"results": {"skip": 0, "limit": 100, "total": 15691}},
        "results": [
            {
                "serious": "1",
                "receivedate": "20140411",
                "patient": {"reaction": [
                    {"reactionmeddrapt": "Diarrhoea"},
                    {"reactionmeddrapt": "Gastrointestinal haemorrhage"}
                ]}
            },
            {
                "serious": "2",
                "receivedate": "20140312",
                "patient": {"reaction": [
                    {"reactionmeddrapt": "International normalised ratio increased"},
                    {"reactionmeddrapt": "Diarrhoea"}
                ]}
            }
        ]
    })
}

pub fn zero_reports() -> Value {
    json!({"meta": {"results": {"total": 0}}, "results": []})
}

pub fn interaction(id_a: &str, drug_a: &str, id_b: &str, drug_b: &str, severity: Severity, categories: &str) -> InteractionRecord {
    InteractionRecord {
        severity,
        source_ids: (id_a.to_string(), id_b.to_string()),
        drugs: (drug_a.to_string(), drug_b.to_string()),
        categories: InteractionRecord::parse_categories(categories).expect("fixture categories"),
    }
}

pub fn sample_interactions() -> Vec<InteractionRecord> {
    vec![
        interaction("DDInter1", "Aspirin", "DDInter1951", "Warfarin", Severity::Major, "B"),
        interaction("DDInter14", "Acetaminophen", "DDInter1951", "Warfarin", Severity::Moderate, "B"),
        interaction("DDInter20", "Acetylsalicylic acid", "DDInter900", "Ibuprofen", Severity::Minor, "M"),
    ]
}

pub fn database_with(records: &[InteractionRecord]) -> Database {
    let mut db = Database::open_in_memory().expect("in-memory database");
    db.replace_interactions(records).expect("load fixture interactions");
    db
}

/// Single-connection pool over an in-memory store.
pub fn pool_with(records: &[InteractionRecord]) -> Arc<DatabasePool> {
    DatabasePool::from_databases(vec![database_with(records)])
}

pub struct Harness {
    pub rxnorm: Arc<MockRxNorm>,
    pub pubchem: Arc<MockPubChem>,
    pub openfda: Arc<MockOpenFda>,
    pub failures: Arc<FailureRecorder>,
    pub pool: Arc<DatabasePool>,
}

impl Harness {
    pub fn new(rxnorm: MockRxNorm, pubchem: MockPubChem, openfda: MockOpenFda, pool: Arc<DatabasePool>) -> Self {
        Self {
            rxnorm: Arc::new(rxnorm),
            pubchem: Arc::new(pubchem),
            openfda: Arc::new(openfda),
            failures: Arc::new(FailureRecorder::in_memory()),
            pool,
        }
    }

    pub fn sources(&self) -> Sources {
        Sources {
            rxnorm: self.rxnorm.clone(),
            pubchem: self.pubchem.clone(),
            openfda: self.openfda.clone(),
        }
    }

    pub fn checker(&self) -> DrugChecker {
        DrugChecker::new(self.sources(), self.pool.clone(), self.failures.clone())
    }

    /// Source tags of everything recorded so far, oldest first.
    pub async fn failure_tags(&self) -> Vec<String> {
        self.failures
            .list_failures()
            .await
            .expect("list failures")
            .into_iter()
            .map(|f| f.source)
            .collect()
    }
}
