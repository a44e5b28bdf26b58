//! Compound-synonym service (PubChem PUG REST) client and response schema.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{HttpSource, RetryPolicy, SourceError, SourceResult};

pub const SERVICE: &str = "pubchem";
pub const DEFAULT_BASE_URL: &str = "https://pubchem.ncbi.nlm.nih.gov/rest/pug";

/// Synonym lookup by compound name.
#[async_trait]
pub trait PubChemApi: Send + Sync {
    /// Synonyms for an exact compound name. A not-found answer comes back as
    /// a response carrying a [`Fault`], not as an error.
    async fn synonyms(&self, name: &str) -> SourceResult<SynonymsResponse>;
}

/// Response of `compound/name/{name}/synonyms/JSON`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SynonymsResponse {
    #[serde(rename = "Fault", default)]
    pub fault: Option<Fault>,
    #[serde(rename = "InformationList", default)]
    pub information_list: InformationList,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fault {
    #[serde(rename = "Code", default)]
    pub code: String,
    #[serde(rename = "Message", default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InformationList {
    #[serde(rename = "Information", default)]
    pub information: Vec<Information>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Information {
    #[serde(rename = "CID", default)]
    pub cid: Option<u64>,
    #[serde(rename = "Synonym", default)]
    pub synonym: Vec<String>,
}

impl SynonymsResponse {
    /// Raw synonyms of the first matched compound, in source order.
    pub fn raw_synonyms(&self) -> &[String] {
        self.information_list
            .information
            .first()
            .map(|i| i.synonym.as_slice())
            .unwrap_or_default()
    }
}

/// Path of the synonym lookup; the name is one percent-encoded segment.
pub fn synonyms_endpoint(name: &str) -> String {
    format!("compound/name/{}/synonyms/JSON", urlencoding::encode(name))
}

/// Compound-synonym service over HTTP.
pub struct HttpPubChem {
    http: HttpSource,
}

impl HttpPubChem {
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str, retry: RetryPolicy) -> SourceResult<Self> {
        Ok(Self {
            http: HttpSource::new(SERVICE, base_url, timeout, user_agent, retry)?,
        })
    }
}

#[async_trait]
impl PubChemApi for HttpPubChem {
    async fn synonyms(&self, name: &str) -> SourceResult<SynonymsResponse> {
        let endpoint = synonyms_endpoint(name);
        match self.http.get_json::<SynonymsResponse>(&endpoint, &[]).await {
            Err(SourceError::NotFound { body, .. }) => {
                // The 404 body is itself a Fault document
                let fault = serde_json::from_str::<SynonymsResponse>(&body)
                    .ok()
                    .and_then(|r| r.fault)
                    .unwrap_or_else(|| Fault {
                        code: "PUGREST.NotFound".to_string(),
                        message: format!("No compound named {name:?}"),
                    });
                Ok(SynonymsResponse {
                    fault: Some(fault),
                    ..SynonymsResponse::default()
                })
            }
            other => other,
        }
    }
}
