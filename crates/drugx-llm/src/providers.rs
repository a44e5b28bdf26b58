//! Narrative providers: chat-completions and messages-API clients.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const OPENAI_MODEL: &str = "gpt-4o-mini";
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

pub const ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

pub const MAX_TOKENS: u32 = 2000;
/// Low temperature for consistent, factual output
pub const TEMPERATURE: f32 = 0.1;
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Provider call errors.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider} connection failed: {message}")]
    Connection { provider: &'static str, message: String },

    #[error("{provider} request timed out")]
    Timeout { provider: &'static str },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} response could not be decoded: {message}")]
    Decode { provider: &'static str, message: String },

    #[error("{provider} returned no text")]
    EmptyResponse { provider: &'static str },

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl ProviderError {
    /// Connection failures, timeouts, rate limits and server errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Connection { .. } | ProviderError::Timeout { .. } => true,
            ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    fn from_reqwest(provider: &'static str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout { provider }
        } else if e.is_connect() || e.is_request() {
            ProviderError::Connection {
                provider,
                message: e.to_string(),
            }
        } else if e.is_decode() {
            ProviderError::Decode {
                provider,
                message: e.to_string(),
            }
        } else {
            ProviderError::Client(e.to_string())
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// A text-generation backend.
#[async_trait]
pub trait NarrativeProvider: Send + Sync {
    /// Short provider name reported with the narrative.
    fn name(&self) -> &'static str;

    async fn complete(&self, system: &str, prompt: &str) -> ProviderResult<String>;
}

fn build_client(timeout: Duration) -> ProviderResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(format!("drugx/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ProviderError::Client(e.to_string()))
}

async fn post_json<B, R>(
    provider: &'static str,
    request: reqwest::RequestBuilder,
    body: &B,
) -> ProviderResult<R>
where
    B: Serialize + ?Sized,
    R: for<'de> Deserialize<'de>,
{
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!(provider, status = status.as_u16(), "Provider returned error status");
        return Err(ProviderError::Status {
            provider,
            status: status.as_u16(),
            body,
        });
    }

    response.json().await.map_err(|e| ProviderError::from_reqwest(provider, e))
}

// ============================================================================
// Chat completions
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Content of the first choice, if non-blank.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

/// Chat-completions provider (primary).
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAiProvider {
    pub const NAME: &'static str = "openai";

    pub fn new(api_key: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        Self::with_endpoint(api_key, timeout, OPENAI_API_URL)
    }

    pub fn with_endpoint(api_key: impl Into<String>, timeout: Duration, endpoint: &str) -> ProviderResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key: api_key.into(),
            endpoint: endpoint.to_string(),
            model: OPENAI_MODEL.to_string(),
        })
    }
}

#[async_trait]
impl NarrativeProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn complete(&self, system: &str, prompt: &str) -> ProviderResult<String> {
        tracing::info!(provider = Self::NAME, model = %self.model, "Requesting narrative");
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let request = self.client.post(&self.endpoint).bearer_auth(&self.api_key);
        let response: ChatResponse = post_json(Self::NAME, request, &body).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(ProviderError::EmptyResponse { provider: Self::NAME })
    }
}

// ============================================================================
// Messages API
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Default, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl MessagesResponse {
    /// Text of the first text block, if non-blank.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .filter(|b| b.kind == "text")
            .find_map(|b| b.text.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

/// Messages-API provider (fallback).
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl AnthropicProvider {
    pub const NAME: &'static str = "anthropic";

    pub fn new(api_key: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        Self::with_endpoint(api_key, timeout, ANTHROPIC_API_URL)
    }

    pub fn with_endpoint(api_key: impl Into<String>, timeout: Duration, endpoint: &str) -> ProviderResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key: api_key.into(),
            endpoint: endpoint.to_string(),
            model: ANTHROPIC_MODEL.to_string(),
        })
    }
}

#[async_trait]
impl NarrativeProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn complete(&self, system: &str, prompt: &str) -> ProviderResult<String> {
        tracing::info!(provider = Self::NAME, model = %self.model, "Requesting narrative");
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let request = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        let response: MessagesResponse = post_json(Self::NAME, request, &body).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(ProviderError::EmptyResponse { provider: Self::NAME })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_body() {
        let body = ChatRequest {
            model: OPENAI_MODEL,
            messages: [
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "hello",
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hello");
        assert_eq!(value["max_tokens"], 2000);
    }

    #[test]
    fn test_messages_request_body() {
        let body = MessagesRequest {
            model: ANTHROPIC_MODEL,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system: "sys",
            messages: [ChatMessage {
                role: "user",
                content: "hello",
            }],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["system"], "sys");
        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
        assert_eq!(value["model"], "claude-3-5-sonnet-20241022");
    }

    #[test]
    fn test_chat_response_text() {
        let response: ChatResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "## BOTTOM LINE"}}]
        }))
        .unwrap();
        assert_eq!(response.text(), Some("## BOTTOM LINE"));

        let empty: ChatResponse = serde_json::from_value(json!({"choices": [{"message": {"content": null}}]})).unwrap();
        assert_eq!(empty.text(), None);
        assert_eq!(ChatResponse::default().text(), None);
    }

    #[test]
    fn test_messages_response_text() {
        let response: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "Risk Level: HIGH RISK"}
            ]
        }))
        .unwrap();
        assert_eq!(response.text(), Some("Risk Level: HIGH RISK"));

        let blank: MessagesResponse = serde_json::from_value(json!({"content": [{"type": "text", "text": "  "}]})).unwrap();
        assert_eq!(blank.text(), None);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(ProviderError::Timeout { provider: "openai" }.is_retryable());
        assert!(ProviderError::Connection {
            provider: "openai",
            message: "refused".into()
        }
        .is_retryable());
        assert!(ProviderError::Status {
            provider: "openai",
            status: 429,
            body: String::new()
        }
        .is_retryable());
        assert!(ProviderError::Status {
            provider: "anthropic",
            status: 529,
            body: String::new()
        }
        .is_retryable());
        assert!(!ProviderError::Status {
            provider: "openai",
            status: 401,
            body: String::new()
        }
        .is_retryable());
        assert!(!ProviderError::EmptyResponse { provider: "openai" }.is_retryable());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_retryable() {
        let provider =
            OpenAiProvider::with_endpoint("sk-test", Duration::from_secs(2), "http://127.0.0.1:9/v1/chat").unwrap();
        let err = provider.complete("sys", "prompt").await.unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err}");
    }
}
