//! Upstream data sources.
//!
//! Each service sits behind a trait so the resolvers can run against the
//! HTTP clients in production and in-memory fakes in tests. Responses are
//! decoded into typed schemas at the boundary; missing optional fields
//! default to empty values there and nowhere else.

mod http;
pub mod openfda;
pub mod pubchem;
mod retry;
pub mod rxnorm;

pub use http::HttpSource;
pub use openfda::{EventSearchResponse, HttpOpenFda, OpenFdaApi};
pub use pubchem::{HttpPubChem, PubChemApi, SynonymsResponse};
pub use retry::RetryPolicy;
pub use rxnorm::{HttpRxNorm, RxNormApi};

use thiserror::Error;

/// Upstream call errors.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Connection or timeout failure; the only retried kind.
    #[error("{service} connection failed: {message}")]
    Transport { service: &'static str, message: String },

    #[error("{service} returned not found")]
    NotFound { service: &'static str, body: String },

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} response could not be decoded: {message}")]
    Decode { service: &'static str, message: String },

    #[error("HTTP client error: {0}")]
    Http(String),
}

impl SourceError {
    pub fn transport(service: &'static str, message: impl Into<String>) -> Self {
        SourceError::Transport {
            service,
            message: message.into(),
        }
    }

    /// Connection and timeout failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Transport { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound { .. })
    }
}

pub type SourceResult<T> = Result<T, SourceError>;
