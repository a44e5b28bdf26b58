//! Out-of-band alert delivery for failed lookups.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::AlertCredentials;
use crate::models::FailedLookup;

pub const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

/// Alert delivery errors.
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Alert rejected: {0}")]
    Rejected(String),
}

pub type AlertResult<T> = Result<T, AlertError>;

/// Destination for failed-lookup alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, lookup: &FailedLookup) -> AlertResult<()>;
}

pub fn alert_title(lookup: &FailedLookup) -> String {
    format!("DrugX Alert: lookup failed ({})", lookup.source)
}

pub fn alert_message(lookup: &FailedLookup) -> String {
    format!(
        "Drugs: {}\nSource: {}\nTime: {}",
        lookup.drugs.join(", "),
        lookup.source,
        lookup.failed_at.to_rfc3339()
    )
}

/// Push-notification alerts (Pushover).
pub struct PushoverAlerter {
    client: reqwest::Client,
    endpoint: String,
    credentials: AlertCredentials,
}

#[derive(Deserialize)]
struct PushoverResponse {
    #[serde(default)]
    status: i64,
}

impl PushoverAlerter {
    pub fn new(credentials: AlertCredentials, timeout: Duration) -> AlertResult<Self> {
        Self::with_endpoint(credentials, timeout, PUSHOVER_API_URL)
    }

    pub fn with_endpoint(credentials: AlertCredentials, timeout: Duration, endpoint: &str) -> AlertResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            credentials,
        })
    }
}

#[async_trait]
impl AlertSink for PushoverAlerter {
    async fn send(&self, lookup: &FailedLookup) -> AlertResult<()> {
        let title = alert_title(lookup);
        let message = alert_message(lookup);
        let form = [
            ("token", self.credentials.app_token.as_str()),
            ("user", self.credentials.user_key.as_str()),
            ("title", title.as_str()),
            ("message", message.as_str()),
        ];

        let response = self.client.post(&self.endpoint).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let accepted = status.is_success()
            && serde_json::from_str::<PushoverResponse>(&body)
                .map(|r| r.status == 1)
                .unwrap_or(false);
        if !accepted {
            return Err(AlertError::Rejected(body));
        }

        tracing::info!(drugs = ?lookup.drugs, source = %lookup.source, "Failure alert sent");
        Ok(())
    }
}
