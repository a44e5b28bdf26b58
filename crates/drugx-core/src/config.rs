//! Runtime configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::sources::{openfda, pubchem, rxnorm};

/// Per-call HTTP timeout for every upstream service.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POOL_SIZE: usize = 4;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration errors. Fatal at startup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Credentials for the push-notification alert service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertCredentials {
    pub app_token: String,
    pub user_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrugxConfig {
    /// Interaction store (and failed lookup log) database file
    pub database_path: PathBuf,
    pub pool_size: usize,
    pub rxnorm_url: String,
    pub pubchem_url: String,
    pub openfda_url: String,
    pub http_timeout: Duration,
    /// Upper bound for one whole multi-drug request
    pub request_timeout: Duration,
    /// Alerts are skipped when absent
    pub alerts: Option<AlertCredentials>,
    pub user_agent: String,
}

impl DrugxConfig {
    /// Defaults for everything except the database path.
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            pool_size: DEFAULT_POOL_SIZE,
            rxnorm_url: rxnorm::DEFAULT_BASE_URL.to_string(),
            pubchem_url: pubchem::DEFAULT_BASE_URL.to_string(),
            openfda_url: openfda::DEFAULT_BASE_URL.to_string(),
            http_timeout: HTTP_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            alerts: None,
            user_agent: default_user_agent(),
        }
    }

    /// Read from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_path = get("DRUGX_DATABASE_PATH").ok_or(ConfigError::Missing("DRUGX_DATABASE_PATH"))?;
        let mut config = Self::new(database_path);

        if let Some(raw) = get("DRUGX_POOL_SIZE") {
            config.pool_size = match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "DRUGX_POOL_SIZE",
                        value: raw,
                    })
                }
            };
        }
        if let Some(raw) = get("DRUGX_REQUEST_TIMEOUT_SECS") {
            let secs = raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "DRUGX_REQUEST_TIMEOUT_SECS",
                value: raw.clone(),
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(url) = get("DRUGX_RXNORM_URL") {
            config.rxnorm_url = url;
        }
        if let Some(url) = get("DRUGX_PUBCHEM_URL") {
            config.pubchem_url = url;
        }
        if let Some(url) = get("DRUGX_OPENFDA_URL") {
            config.openfda_url = url;
        }

        config.alerts = match (get("PUSHOVER_APP_TOKEN"), get("PUSHOVER_USER_KEY")) {
            (Some(app_token), Some(user_key)) => Some(AlertCredentials { app_token, user_key }),
            _ => {
                tracing::warn!("Alert credentials not configured, failure alerts disabled");
                None
            }
        };

        Ok(config)
    }
}

pub fn default_user_agent() -> String {
    format!("drugx/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_database_path_required() {
        let result = DrugxConfig::from_lookup(lookup(&[]));
        assert_eq!(result, Err(ConfigError::Missing("DRUGX_DATABASE_PATH")));

        let result = DrugxConfig::from_lookup(lookup(&[("DRUGX_DATABASE_PATH", "  ")]));
        assert_eq!(result, Err(ConfigError::Missing("DRUGX_DATABASE_PATH")));
    }

    #[test]
    fn test_defaults() {
        let config = DrugxConfig::from_lookup(lookup(&[("DRUGX_DATABASE_PATH", "/tmp/drugx.db")])).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/drugx.db"));
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert_eq!(config.rxnorm_url, "https://rxnav.nlm.nih.gov/REST");
        assert!(config.alerts.is_none());
        assert!(config.user_agent.starts_with("drugx/"));
    }

    #[test]
    fn test_overrides() {
        let config = DrugxConfig::from_lookup(lookup(&[
            ("DRUGX_DATABASE_PATH", "drugx.db"),
            ("DRUGX_POOL_SIZE", "8"),
            ("DRUGX_REQUEST_TIMEOUT_SECS", "45"),
            ("DRUGX_OPENFDA_URL", "http://localhost:9000"),
            ("PUSHOVER_APP_TOKEN", "app"),
            ("PUSHOVER_USER_KEY", "user"),
        ]))
        .unwrap();

        assert_eq!(config.pool_size, 8);
        assert_eq!(config.request_timeout, Duration::from_secs(45));
        assert_eq!(config.openfda_url, "http://localhost:9000");
        assert_eq!(
            config.alerts,
            Some(AlertCredentials {
                app_token: "app".into(),
                user_key: "user".into()
            })
        );
    }

    #[test]
    fn test_invalid_pool_size() {
        let result = DrugxConfig::from_lookup(lookup(&[("DRUGX_DATABASE_PATH", "drugx.db"), ("DRUGX_POOL_SIZE", "0")]));
        assert!(matches!(result, Err(ConfigError::Invalid { key: "DRUGX_POOL_SIZE", .. })));
    }
}
