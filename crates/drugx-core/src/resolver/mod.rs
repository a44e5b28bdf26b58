//! Multi-source drug resolution.
//!
//! Pipeline: Normalization → Pairwise Interactions → Adverse Events
//!
//! Every stage falls back to the synonym expander on a primary miss and
//! records exhausted lookups through the failure recorder.

mod adverse_events;
mod interactions;
mod normalizer;
mod synonyms;

pub use adverse_events::*;
pub use interactions::*;
pub use normalizer::*;
pub use synonyms::*;

use thiserror::Error;

use crate::db::DbError;
use crate::sources::SourceError;

/// Normalizer errors.
#[derive(Error, Debug)]
pub enum NormalizerError {
    #[error("Normalization service error: {0}")]
    Source(#[from] SourceError),

    /// The id resolved but no ingredient name could be established for it.
    #[error("No ingredient name found for RxCUI {rxcui}")]
    MissingIngredient { rxcui: String },
}

pub type NormalizerResult<T> = Result<T, NormalizerError>;

/// Interaction resolver errors.
#[derive(Error, Debug)]
pub enum InteractionError {
    #[error("Interaction store error: {0}")]
    Database(#[from] DbError),
}

pub type InteractionResult<T> = Result<T, InteractionError>;

/// Adverse-event aggregator errors.
#[derive(Error, Debug)]
pub enum AdverseEventError {
    #[error("Adverse-event service error: {0}")]
    Source(#[from] SourceError),
}

pub type AdverseEventResult<T> = Result<T, AdverseEventError>;
