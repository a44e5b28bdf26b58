//! Ordered provider failover with a small per-provider retry.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prompts::{build_analysis_prompt, SYSTEM_PROMPT};
use crate::providers::{AnthropicProvider, NarrativeProvider, OpenAiProvider, ProviderError, PROVIDER_TIMEOUT};

/// Narrative errors.
#[derive(Error, Debug)]
pub enum NarrativeError {
    #[error("No narrative provider configured (set OPENAI_API_KEY or ANTHROPIC_API_KEY)")]
    NoProviders,

    #[error("Provider setup failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Prompt serialization failed: {0}")]
    Prompt(#[from] serde_json::Error),

    #[error("All narrative providers failed: {0}")]
    AllProvidersFailed(String),
}

pub type NarrativeResult<T> = Result<T, NarrativeError>;

/// Generated narrative and the provider that wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrative {
    pub text: String,
    pub provider: String,
}

/// Attempts per provider and the exponential backoff window between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl RetryBudget {
    pub const DEFAULT: RetryBudget = RetryBudget {
        max_attempts: 2,
        min_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(10),
    };

    /// Wait before retry number `attempt` (1-based): `clamp(2^(attempt-1) s, min, max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = Duration::from_secs(1u64 << attempt.saturating_sub(1).min(16));
        exp.clamp(self.min_delay, self.max_delay)
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Tries each provider in order until one returns text.
pub struct NarrativeSynthesizer {
    providers: Vec<Arc<dyn NarrativeProvider>>,
    retry: RetryBudget,
}

impl NarrativeSynthesizer {
    pub fn new(providers: Vec<Arc<dyn NarrativeProvider>>) -> Self {
        Self {
            providers,
            retry: RetryBudget::DEFAULT,
        }
    }

    /// Providers from `OPENAI_API_KEY` and `ANTHROPIC_API_KEY`.
    pub fn from_env() -> NarrativeResult<Self> {
        Self::from_keys(read_key("OPENAI_API_KEY"), read_key("ANTHROPIC_API_KEY"))
    }

    /// Chat-completions first, messages API second. A missing key skips that
    /// provider; both missing is an error.
    pub fn from_keys(openai_key: Option<String>, anthropic_key: Option<String>) -> NarrativeResult<Self> {
        let mut providers: Vec<Arc<dyn NarrativeProvider>> = Vec::new();

        match openai_key {
            Some(key) => providers.push(Arc::new(OpenAiProvider::new(key, PROVIDER_TIMEOUT)?)),
            None => tracing::warn!("OPENAI_API_KEY not set, primary narrative provider disabled"),
        }
        match anthropic_key {
            Some(key) => providers.push(Arc::new(AnthropicProvider::new(key, PROVIDER_TIMEOUT)?)),
            None => tracing::warn!("ANTHROPIC_API_KEY not set, fallback narrative provider disabled"),
        }

        if providers.is_empty() {
            return Err(NarrativeError::NoProviders);
        }
        Ok(Self::new(providers))
    }

    pub fn with_retry(mut self, retry: RetryBudget) -> Self {
        self.retry = retry;
        self
    }

    /// Names of the configured providers, in failover order.
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Build the analysis prompt from the three report sections and synthesize.
    pub async fn narrate<N, I, A>(&self, normalization: &N, interactions: &I, adverse_events: &A) -> NarrativeResult<Narrative>
    where
        N: Serialize + ?Sized,
        I: Serialize + ?Sized,
        A: Serialize + ?Sized,
    {
        let prompt = build_analysis_prompt(normalization, interactions, adverse_events)?;
        self.synthesize(&prompt).await
    }

    /// Run `prompt` against each provider in order.
    pub async fn synthesize(&self, prompt: &str) -> NarrativeResult<Narrative> {
        if self.providers.is_empty() {
            return Err(NarrativeError::NoProviders);
        }

        let mut failures = Vec::new();
        for provider in &self.providers {
            match self.call_with_retry(provider.as_ref(), prompt).await {
                Ok(text) => {
                    tracing::info!(provider = provider.name(), chars = text.len(), "Narrative generated");
                    return Ok(Narrative {
                        text,
                        provider: provider.name().to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "Narrative provider failed, trying next");
                    failures.push(e.to_string());
                }
            }
        }

        tracing::error!("All narrative providers failed");
        Err(NarrativeError::AllProvidersFailed(failures.join("; ")))
    }

    async fn call_with_retry(&self, provider: &dyn NarrativeProvider, prompt: &str) -> Result<String, ProviderError> {
        let mut attempt = 1;
        loop {
            match provider.complete(SYSTEM_PROMPT, prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        provider = provider.name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Narrative call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn read_key(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
