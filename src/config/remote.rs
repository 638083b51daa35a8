//! Optional remote key-value augmentation, mirroring an app-configuration
//! style helper: settings resolved from the environment can be overlaid
//! with values read from a remote store before the engine starts.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::{EngineError, ErrorCode, Result};

#[async_trait]
pub trait RemoteConfigSource: Send + Sync {
    async fn fetch_overrides(&self) -> Result<HashMap<String, String>>;
}

/// Reads key/value settings from an HTTP-exposed configuration endpoint.
pub struct HttpConfigSource {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpConfigSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl RemoteConfigSource for HttpConfigSource {
    async fn fetch_overrides(&self) -> Result<HashMap<String, String>> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|err| {
                EngineError::config_with_code(ErrorCode::CONFIG_REMOTE_UNAVAILABLE, err.to_string())
            })?;
        response
            .json::<HashMap<String, String>>()
            .await
            .map_err(|err| EngineError::config_with_code(ErrorCode::CONFIG_REMOTE_UNAVAILABLE, err.to_string()))
    }
}

/// No-op source used when no remote endpoint is configured.
pub struct NullConfigSource;

#[async_trait]
impl RemoteConfigSource for NullConfigSource {
    async fn fetch_overrides(&self) -> Result<HashMap<String, String>> {
        Ok(HashMap::new())
    }
}
