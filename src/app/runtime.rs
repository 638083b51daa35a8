//! Runtime initialization and setup.

use tracing::{debug, warn};

use crate::app::{config::AppConfig, logging::init_logging};
use crate::config::file::{load_local_overrides, LOCAL_CONFIG_FILENAME};
use crate::config::remote::{HttpConfigSource, NullConfigSource, RemoteConfigSource};
use crate::config::Settings;
use crate::error::Result;

/// Initialize logging, then load settings from the environment, layering
/// in a local `migration-engine.toml` (if present) and then a remote
/// augmentation pass, in that order.
pub async fn initialize_app(config: &AppConfig) -> Result<Settings> {
    init_logging(config);

    let settings = Settings::from_env()?;

    let local_overrides = load_local_overrides(std::path::Path::new(LOCAL_CONFIG_FILENAME))?;
    let settings = settings.apply_overrides(&local_overrides);

    let source: Box<dyn RemoteConfigSource> = match &settings.remote_config_endpoint {
        Some(endpoint) => Box::new(HttpConfigSource::new(endpoint.clone())),
        None => Box::new(NullConfigSource),
    };

    let settings = match source.fetch_overrides().await {
        Ok(overrides) => settings.apply_overrides(&overrides),
        Err(err) => {
            warn!("remote configuration fetch failed, continuing with environment-only settings: {err}");
            settings
        }
    };

    debug!("engine initialized with queue '{}'", settings.storage_queue_name);
    Ok(settings)
}
