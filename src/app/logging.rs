//! Logging configuration and initialization.

use crate::app::config::AppConfig;
use tracing::debug;

/// Initialize tracing for the application.
pub fn init_logging(config: &AppConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(config.log_level())
        .with_target(config.verbose >= 2)
        .with_line_number(config.verbose >= 3)
        .init();

    debug!("migration engine starting with verbosity level {}", config.verbose);
}
