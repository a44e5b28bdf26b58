//! DrugX Core Library
//!
//! Multi-source drug identity resolution and interaction aggregation.
//!
//! # Architecture
//!
//! ```text
//! Drug names (2-5)
//!       │
//!       ▼
//! Normalization ── exact → approximate → candidates → spelling → synonyms
//!       │                                                          │
//!       │                                             [Synonym Expander]
//!       ▼                                                          │
//! Pairwise Interactions ── store lookup → synonym cross product ───┤
//!       │                                                          │
//!       ▼                                                          │
//! Adverse Events ── AND query → synonym combinations (≤27) ────────┘
//!       │
//!       ▼
//! InteractionReport ──► narrative generation
//!
//! Every exhausted chain ──► Failure Recorder (table + alert)
//! ```
//!
//! # Core Principle
//!
//! **"Not found" is a value, never an error.** A request always yields a
//! complete report; absent fields say what could not be found.
//!
//! # Modules
//!
//! - [`config`]: Environment-driven configuration
//! - [`db`]: SQLite interaction store, failed lookup log and connection pool
//! - [`failures`]: Best-effort failure recorder with alert delivery
//! - [`ingest`]: Bulk loader for the interaction store
//! - [`models`]: Domain types (CanonicalDrug, InteractionRecord, etc.)
//! - [`pipeline`]: The request entry point
//! - [`resolver`]: Normalizer, interaction resolver, adverse-event aggregator
//! - [`sources`]: Upstream HTTP clients with retry

pub mod config;
pub mod db;
pub mod failures;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod resolver;
pub mod sources;

use std::time::Duration;

use thiserror::Error;

// Re-export commonly used types
pub use config::DrugxConfig;
pub use db::{Database, DatabasePool};
pub use failures::FailureRecorder;
pub use models::{
    AdverseEventSummary, CanonicalDrug, FailedLookup, FailureSource, InteractionOutcome, InteractionRecord,
    InteractionReport, NormalizationOutcome, Severity,
};
pub use pipeline::{DrugChecker, Sources};

/// Top-level error for a request.
#[derive(Error, Debug)]
pub enum DrugxError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] db::DbError),

    #[error("Source error: {0}")]
    Source(#[from] sources::SourceError),

    #[error("Interaction lookup error: {0}")]
    Interaction(#[from] resolver::InteractionError),

    #[error("Alert setup error: {0}")]
    Alert(#[from] failures::AlertError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] ingest::IngestError),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

pub type DrugxResult<T> = Result<T, DrugxError>;
