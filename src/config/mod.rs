//! Typed configuration loaded from environment variables, with an optional
//! remote key-value augmentation pass before the final value is built.

pub mod credentials;
pub mod file;
pub mod remote;

use std::time::Duration;
use tracing::warn;

use crate::error::{EngineError, Result};
pub use credentials::{select_credential, validate_credential, Credential};
pub use remote::RemoteConfigSource;

/// Below this, a single phase's agent turns are unlikely to finish before
/// `messageTimeout` cancels the worker. No lease-renewal exists to cover
/// the gap, so this is a warning rather than a hard validation failure.
const CONSERVATIVE_SINGLE_PHASE_ESTIMATE: Duration = Duration::from_secs(5 * 60);

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| EngineError::config(format!("invalid value for {name}: '{raw}'"))),
        Err(_) => Ok(default),
    }
}

/// Settings consumed by the dispatcher, telemetry store, and credential
/// selection policy. Field names mirror the original `_envConfiguration`
/// surface.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_logging_enable: bool,
    pub app_logging_level: String,

    pub storage_queue_account: String,
    pub storage_account_process_queue: String,
    pub storage_queue_name: String,

    pub cosmos_db_account_url: Option<String>,
    pub cosmos_db_database_name: Option<String>,
    pub cosmos_db_container_name: Option<String>,

    pub visibility_timeout: Duration,
    pub max_retry_count: u32,
    pub poll_interval: Duration,
    pub message_timeout: Duration,
    pub max_concurrent_workers: usize,

    pub remote_config_endpoint: Option<String>,
}

impl Settings {
    /// Load settings from the environment, applying the documented
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            app_logging_enable: env_or("APP_LOGGING_ENABLE", "true") == "true",
            app_logging_level: env_or("APP_LOGGING_LEVEL", "info"),

            storage_queue_account: env_or("STORAGE_QUEUE_ACCOUNT", ""),
            storage_account_process_queue: env_or("STORAGE_ACCOUNT_PROCESS_QUEUE", ""),
            storage_queue_name: env_or("STORAGE_QUEUE_NAME", "migration-jobs"),

            cosmos_db_account_url: std::env::var("COSMOS_DB_ACCOUNT_URL").ok(),
            cosmos_db_database_name: std::env::var("COSMOS_DB_DATABASE_NAME").ok(),
            cosmos_db_container_name: std::env::var("COSMOS_DB_CONTAINER_NAME").ok(),

            visibility_timeout: Duration::from_secs(60 * env_parsed("VISIBILITY_TIMEOUT_MINUTES", 5)?),
            max_retry_count: env_parsed("MAX_RETRY_COUNT", 0)?,
            poll_interval: Duration::from_secs(env_parsed("POLL_INTERVAL_SECONDS", 5)?),
            message_timeout: Duration::from_secs(60 * env_parsed("MESSAGE_TIMEOUT_MINUTES", 25)?),
            max_concurrent_workers: env_parsed("MAX_CONCURRENT_WORKERS", 4usize)?,

            remote_config_endpoint: std::env::var("APP_CONFIGURATION_ENDPOINT").ok(),
        })
    }

    /// Fail fast on settings that are required once the engine actually
    /// starts dispatching (as opposed to, say, `validate-config` dry runs
    /// against a partially configured environment).
    pub fn validate_for_dispatch(&self) -> Result<()> {
        if self.storage_queue_name.trim().is_empty() {
            return Err(EngineError::config("STORAGE_QUEUE_NAME must not be empty"));
        }
        if self.cosmos_db_account_url.is_none() {
            return Err(EngineError::config("COSMOS_DB_ACCOUNT_URL is required to dispatch jobs"));
        }
        if let Some(endpoint) = &self.remote_config_endpoint {
            url::Url::parse(endpoint)
                .map_err(|err| EngineError::config(format!("APP_CONFIGURATION_ENDPOINT is not a valid URL: {err}")))?;
        }
        if self.message_timeout < CONSERVATIVE_SINGLE_PHASE_ESTIMATE {
            warn!(
                "MESSAGE_TIMEOUT_MINUTES ({:?}) is below a conservative single-phase estimate ({:?}); \
                 long-running phases may be cancelled mid-flight since no lease renewal covers the gap",
                self.message_timeout, CONSERVATIVE_SINGLE_PHASE_ESTIMATE
            );
        }
        Ok(())
    }

    pub fn dead_letter_queue_name(&self) -> String {
        format!("{}-dead-letter", self.storage_queue_name)
    }

    /// Merge in a set of key/value overrides pulled from a remote config
    /// store, without re-reading the environment.
    pub fn apply_overrides(mut self, overrides: &std::collections::HashMap<String, String>) -> Self {
        if let Some(v) = overrides.get("STORAGE_QUEUE_NAME") {
            self.storage_queue_name = v.clone();
        }
        if let Some(v) = overrides.get("MAX_RETRY_COUNT") {
            if let Ok(n) = v.parse() {
                self.max_retry_count = n;
            }
        }
        if let Some(v) = overrides.get("APP_LOGGING_LEVEL") {
            self.app_logging_level = v.clone();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_letter_name_follows_naming_convention() {
        let mut settings = Settings::from_env().unwrap();
        settings.storage_queue_name = "migration-jobs".to_string();
        assert_eq!(settings.dead_letter_queue_name(), "migration-jobs-dead-letter");
    }

    #[test]
    fn overrides_apply_only_known_keys() {
        let settings = Settings::from_env().unwrap();
        let mut overrides = std::collections::HashMap::new();
        overrides.insert("MAX_RETRY_COUNT".to_string(), "7".to_string());
        let settings = settings.apply_overrides(&overrides);
        assert_eq!(settings.max_retry_count, 7);
    }

    #[test]
    fn short_message_timeout_warns_but_still_passes_validation() {
        let mut settings = Settings::from_env().unwrap();
        settings.cosmos_db_account_url = Some("https://example.com".to_string());
        settings.message_timeout = Duration::from_secs(30);
        assert!(settings.validate_for_dispatch().is_ok());
    }

    #[test]
    fn malformed_remote_endpoint_fails_validation() {
        let mut settings = Settings::from_env().unwrap();
        settings.cosmos_db_account_url = Some("https://example.com".to_string());
        settings.remote_config_endpoint = Some("not a url".to_string());
        assert!(settings.validate_for_dispatch().is_err());
    }
}
