//! Shared JSON-over-HTTP plumbing for the upstream clients.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::{RetryPolicy, SourceError, SourceResult};

/// A JSON GET client bound to one upstream service.
pub struct HttpSource {
    service: &'static str,
    base_url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpSource {
    pub fn new(
        service: &'static str,
        base_url: &str,
        timeout: Duration,
        user_agent: &str,
        retry: RetryPolicy,
    ) -> SourceResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .build()
            .map_err(|e| SourceError::Http(e.to_string()))?;

        Ok(Self {
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retry,
        })
    }

    /// GET `{base_url}/{endpoint}` and decode the JSON body, retrying
    /// transient failures per the service's budget.
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, &str)]) -> SourceResult<T> {
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        self.retry.run(self.service, || self.get_once(&url, query)).await
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> SourceResult<T> {
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }

        tracing::debug!(service = self.service, url, "Upstream request");
        let response = request.send().await.map_err(|e| self.map_error(e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::NotFound {
                service: self.service,
                body,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(service = self.service, status = status.as_u16(), "Upstream request failed");
            return Err(SourceError::Status {
                service: self.service,
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.map_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| SourceError::Decode {
            service: self.service,
            message: e.to_string(),
        })
    }

    fn map_error(&self, e: reqwest::Error) -> SourceError {
        if e.is_connect() || e.is_timeout() || e.is_request() || e.is_body() {
            SourceError::transport(self.service, e.to_string())
        } else if e.is_decode() {
            SourceError::Decode {
                service: self.service,
                message: e.to_string(),
            }
        } else {
            SourceError::Http(e.to_string())
        }
    }
}
