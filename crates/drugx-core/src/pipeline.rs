//! Request pipeline: the single entry point of the core.
//!
//! One request runs Normalization → Pairwise Interactions → Adverse Events
//! strictly in sequence. The interaction store connection is acquired once
//! at the start and released by its guard on every exit path.

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;
use uuid::Uuid;

use crate::config::{DrugxConfig, DEFAULT_REQUEST_TIMEOUT};
use crate::db::DatabasePool;
use crate::failures::{FailureRecorder, PushoverAlerter};
use crate::models::{AdverseEventSummary, FailureSource, InteractionReport};
use crate::resolver::{AdverseEventAggregator, InteractionResolver, Normalizer, SynonymExpander};
use crate::sources::{HttpOpenFda, HttpPubChem, HttpRxNorm, OpenFdaApi, PubChemApi, RetryPolicy, RxNormApi};
use crate::{DrugxError, DrugxResult};

pub const MIN_DRUGS: usize = 2;
pub const MAX_DRUGS: usize = 5;

/// The three upstream services.
#[derive(Clone)]
pub struct Sources {
    pub rxnorm: Arc<dyn RxNormApi>,
    pub pubchem: Arc<dyn PubChemApi>,
    pub openfda: Arc<dyn OpenFdaApi>,
}

impl Sources {
    /// HTTP clients for the configured base URLs, each with its own retry budget.
    pub fn from_config(config: &DrugxConfig) -> DrugxResult<Self> {
        let timeout = config.http_timeout;
        let ua = config.user_agent.as_str();
        Ok(Self {
            rxnorm: Arc::new(HttpRxNorm::new(&config.rxnorm_url, timeout, ua, RetryPolicy::RXNORM)?),
            pubchem: Arc::new(HttpPubChem::new(&config.pubchem_url, timeout, ua, RetryPolicy::PUBCHEM)?),
            openfda: Arc::new(HttpOpenFda::new(&config.openfda_url, timeout, ua, RetryPolicy::OPENFDA)?),
        })
    }
}

/// Multi-drug interaction checker.
pub struct DrugChecker {
    normalizer: Normalizer,
    interactions: InteractionResolver,
    adverse_events: AdverseEventAggregator,
    pool: Arc<DatabasePool>,
    failures: Arc<FailureRecorder>,
    request_timeout: Duration,
}

impl DrugChecker {
    pub fn new(sources: Sources, pool: Arc<DatabasePool>, failures: Arc<FailureRecorder>) -> Self {
        let synonyms = SynonymExpander::new(sources.pubchem);
        Self {
            normalizer: Normalizer::new(sources.rxnorm, synonyms.clone(), failures.clone()),
            interactions: InteractionResolver::new(synonyms.clone(), failures.clone()),
            adverse_events: AdverseEventAggregator::new(sources.openfda, synonyms, failures.clone()),
            pool,
            failures,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Wire up HTTP sources, the connection pool and the failure recorder.
    ///
    /// Failed lookups go to the same database file as the interaction store.
    pub fn from_config(config: &DrugxConfig) -> DrugxResult<Self> {
        let sources = Sources::from_config(config)?;
        let pool = DatabasePool::open(&config.database_path, config.pool_size)?;

        let mut failures = FailureRecorder::new(&config.database_path);
        if let Some(credentials) = &config.alerts {
            let alerter = PushoverAlerter::new(credentials.clone(), config.http_timeout)?;
            failures = failures.with_alerts(Arc::new(alerter));
        }

        tracing::info!(
            database = %config.database_path.display(),
            pool_size = config.pool_size,
            alerts = config.alerts.is_some(),
            "Drug checker ready"
        );

        Ok(Self::new(sources, pool, Arc::new(failures)).with_request_timeout(config.request_timeout))
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn failures(&self) -> &Arc<FailureRecorder> {
        &self.failures
    }

    pub fn pool(&self) -> &Arc<DatabasePool> {
        &self.pool
    }

    /// Check 2 to 5 free-text drug names.
    ///
    /// Expected negatives (unresolved names, unknown pairs, no reports) are
    /// carried in the report. Errors are invalid input, an unavailable store,
    /// and source failures during normalization that are not recoverable.
    pub async fn check<S>(&self, names: &[S]) -> DrugxResult<InteractionReport>
    where
        S: AsRef<str> + Sync,
    {
        validate_names(names)?;

        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("check", request_id = %request_id, drugs = names.len());
        self.run(names).instrument(span).await
    }

    /// [`check`](Self::check) bounded by the request timeout.
    pub async fn check_with_timeout<S>(&self, names: &[S]) -> DrugxResult<InteractionReport>
    where
        S: AsRef<str> + Sync,
    {
        match tokio::time::timeout(self.request_timeout, self.check(names)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(timeout_secs = self.request_timeout.as_secs(), "Request timed out");
                Err(DrugxError::Timeout(self.request_timeout))
            }
        }
    }

    async fn run<S>(&self, names: &[S]) -> DrugxResult<InteractionReport>
    where
        S: AsRef<str> + Sync,
    {
        let mut db = self.pool.acquire().await?;

        let batch = self.normalizer.resolve_batch(names).await;
        let ingredients: Vec<String> = batch.drugs.iter().map(|d| d.ingredient.clone()).collect();
        tracing::info!(resolved = ingredients.len(), requested = names.len(), "Normalization complete");

        let interactions = self.interactions.resolve_all(&mut db, &ingredients).await?;
        tracing::info!(pairs = interactions.len(), "Interaction lookup complete");

        let adverse_events = match self.adverse_events.resolve(&ingredients).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(drugs = ?ingredients, error = %e, "Adverse-event lookup failed");
                self.failures.record(&ingredients, FailureSource::AdverseEventError).await;
                AdverseEventSummary::failed(ingredients.clone(), format!("OpenFDA failed: {}", e))
            }
        };

        Ok(InteractionReport {
            normalization: batch.outcomes,
            drugs: batch.drugs,
            interactions,
            adverse_events,
        })
    }
}

/// Between [`MIN_DRUGS`] and [`MAX_DRUGS`] names, none blank.
pub fn validate_names<S: AsRef<str>>(names: &[S]) -> DrugxResult<()> {
    if !(MIN_DRUGS..=MAX_DRUGS).contains(&names.len()) {
        return Err(DrugxError::InvalidInput(format!(
            "expected {} to {} drug names, got {}",
            MIN_DRUGS,
            MAX_DRUGS,
            names.len()
        )));
    }
    if let Some(position) = names.iter().position(|n| n.as_ref().trim().is_empty()) {
        return Err(DrugxError::InvalidInput(format!("drug name {} is empty", position + 1)));
    }
    Ok(())
}
