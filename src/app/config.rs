//! Application configuration
//!
//! Thin verbosity/runtime wrapper around [`crate::config::Settings`]; the
//! CLI builds one of these before doing anything else.

/// Application configuration structure.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Verbosity level for logging (-v, -vv, -vvv).
    pub verbose: u8,
}

impl AppConfig {
    pub fn new(verbose: u8) -> Self {
        Self { verbose }
    }

    /// Get the log level string based on verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { verbose: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_expected_log_level() {
        assert_eq!(AppConfig::new(0).log_level(), "info");
        assert_eq!(AppConfig::new(1).log_level(), "debug");
        assert_eq!(AppConfig::new(5).log_level(), "trace");
    }
}
