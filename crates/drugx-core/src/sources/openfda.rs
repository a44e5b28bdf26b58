//! Adverse-event reporting service (openFDA FAERS) client and response schema.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{HttpSource, RetryPolicy, SourceResult};

pub const SERVICE: &str = "openfda";
pub const DEFAULT_BASE_URL: &str = "https://api.fda.gov";

/// Maximum number of reports inspected per query.
pub const SAMPLE_LIMIT: u32 = 100;

/// Adverse-event report search.
#[async_trait]
pub trait OpenFdaApi: Send + Sync {
    /// Run a prebuilt search expression (see [`build_search_query`]).
    async fn search_events(&self, search: &str, limit: u32) -> SourceResult<EventSearchResponse>;
}

/// Conjunctive query requiring every drug to appear in the same report.
///
/// The result is already in wire form: names are percent-encoded and the
/// terms are joined with a literal `+AND+`.
pub fn build_search_query<S: AsRef<str>>(drugs: &[S]) -> String {
    drugs
        .iter()
        .map(|d| format!("patient.drug.medicinalproduct:\"{}\"", urlencoding::encode(d.as_ref())))
        .collect::<Vec<_>>()
        .join("+AND+")
}

/// Response of `drug/event.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventSearchResponse {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub results: Vec<EventReport>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub results: MetaResults,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaResults {
    /// Authoritative number of matching reports
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventReport {
    #[serde(default)]
    pub serious: Option<SeriousFlag>,
    /// `YYYYMMDD`
    #[serde(default)]
    pub receivedate: Option<String>,
    #[serde(default)]
    pub patient: Patient,
}

/// The serious flag arrives as either a string or a number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SeriousFlag {
    Number(i64),
    Text(String),
    Other(serde_json::Value),
}

impl SeriousFlag {
    pub fn is_serious(&self) -> bool {
        match self {
            SeriousFlag::Number(n) => *n == 1,
            SeriousFlag::Text(s) => s.trim() == "1",
            SeriousFlag::Other(_) => false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Patient {
    #[serde(default)]
    pub reaction: Vec<Reaction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reaction {
    /// MedDRA preferred term
    #[serde(default)]
    pub reactionmeddrapt: Option<String>,
}

impl EventSearchResponse {
    pub fn total(&self) -> u64 {
        self.meta.results.total
    }
}

impl EventReport {
    pub fn is_serious(&self) -> bool {
        self.serious.as_ref().is_some_and(SeriousFlag::is_serious)
    }
}

/// Adverse-event service over HTTP.
pub struct HttpOpenFda {
    http: HttpSource,
}

impl HttpOpenFda {
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str, retry: RetryPolicy) -> SourceResult<Self> {
        Ok(Self {
            http: HttpSource::new(SERVICE, base_url, timeout, user_agent, retry)?,
        })
    }
}

#[async_trait]
impl OpenFdaApi for HttpOpenFda {
    async fn search_events(&self, search: &str, limit: u32) -> SourceResult<EventSearchResponse> {
        // `+AND+` must reach the service unescaped, so `search` is written
        // into the path rather than form-encoded
        let endpoint = format!("drug/event.json?search={}", search);
        let limit = limit.to_string();
        self.http.get_json(&endpoint, &[("limit", limit.as_str())]).await
    }
}
