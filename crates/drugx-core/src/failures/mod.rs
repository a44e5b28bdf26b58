//! Failure recorder.
//!
//! Every exhausted fallback chain ends here: the lookup is logged, appended
//! to the failed lookup table and pushed to the alert sink. Recording is
//! best-effort. Storage and alert errors are logged independently and never
//! reach the caller.

mod alert;

pub use alert::*;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex as AsyncMutex, OnceCell};

use crate::db::{Database, DbResult};
use crate::models::{FailedLookup, FailureSource};

enum StoreTarget {
    File(PathBuf),
    Memory,
}

/// Best-effort recorder for failed lookups.
pub struct FailureRecorder {
    target: Option<StoreTarget>,
    /// Opened (and schema applied) on first use
    db: OnceCell<AsyncMutex<Database>>,
    alerts: Option<Arc<dyn AlertSink>>,
}

impl FailureRecorder {
    /// Persist to the database file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_target(Some(StoreTarget::File(path.into())))
    }

    /// Persist to a private in-memory database (for testing).
    pub fn in_memory() -> Self {
        Self::with_target(Some(StoreTarget::Memory))
    }

    /// Log only; nothing is persisted.
    pub fn log_only() -> Self {
        Self::with_target(None)
    }

    fn with_target(target: Option<StoreTarget>) -> Self {
        Self {
            target,
            db: OnceCell::new(),
            alerts: None,
        }
    }

    pub fn with_alerts(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.alerts = Some(sink);
        self
    }

    /// Record a failed lookup. Never fails.
    pub async fn record<S>(&self, drugs: &[S], source: FailureSource)
    where
        S: AsRef<str> + Sync,
    {
        let lookup = FailedLookup::new(drugs.iter().map(|d| d.as_ref().to_string()).collect(), source);
        tracing::error!(
            drugs = ?lookup.drugs,
            source = %lookup.source,
            failed_at = %lookup.failed_at.to_rfc3339(),
            "Drug lookup failed"
        );

        if let Err(e) = self.persist(&lookup).await {
            tracing::warn!(source = %lookup.source, error = %e, "Failed to persist failed lookup");
        }

        match &self.alerts {
            Some(sink) => {
                if let Err(e) = sink.send(&lookup).await {
                    tracing::warn!(source = %lookup.source, error = %e, "Failed to deliver failure alert");
                }
            }
            None => tracing::debug!("No alert sink configured, skipping alert"),
        }
    }

    /// Everything recorded so far, oldest first.
    pub async fn list_failures(&self) -> DbResult<Vec<FailedLookup>> {
        match self.store().await? {
            Some(db) => db.lock().await.list_failed_lookups(),
            None => Ok(Vec::new()),
        }
    }

    async fn persist(&self, lookup: &FailedLookup) -> DbResult<()> {
        if let Some(db) = self.store().await? {
            db.lock().await.insert_failed_lookup(lookup)?;
            tracing::debug!(id = %lookup.id, "Persisted failed lookup");
        }
        Ok(())
    }

    /// Open the store on first use. A failed open is retried on the next call.
    async fn store(&self) -> DbResult<Option<&AsyncMutex<Database>>> {
        let Some(target) = &self.target else {
            return Ok(None);
        };
        let db = self
            .db
            .get_or_try_init(|| async {
                let db = match target {
                    StoreTarget::File(path) => Database::open(path)?,
                    StoreTarget::Memory => Database::open_in_memory()?,
                };
                Ok::<_, crate::db::DbError>(AsyncMutex::new(db))
            })
            .await?;
        Ok(Some(db))
    }
}
