//! Configuration types for replay execution

use crate::error::{MimosError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for one replay invocation.
///
/// Immutable for the duration of a replay. Construct directly, through the
/// builder methods, or via [`ReplayConfig::load`] for file/env layering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Maximum dispatch attempts per action, first try included (>= 1)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base backoff unit between retries, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Capture before/after screenshots for every action
    #[serde(default)]
    pub capture_screenshots: bool,

    /// Capture a screenshot when an action exhausts its retries
    #[serde(default = "default_true")]
    pub screenshot_on_error: bool,

    /// Scale applied inversely to recorded inter-action delays
    /// (>1 replays faster, <1 slower; must be > 0)
    #[serde(default = "default_speed_multiplier")]
    pub speed_multiplier: f64,

    /// Halt the replay at the first non-successful action
    #[serde(default)]
    pub stop_on_error: bool,

    /// Issue a best-effort screen-on before the first action
    #[serde(default = "default_true")]
    pub wait_for_screen_on: bool,
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_speed_multiplier() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            capture_screenshots: false,
            screenshot_on_error: true,
            speed_multiplier: default_speed_multiplier(),
            stop_on_error: false,
            wait_for_screen_on: true,
        }
    }
}

impl ReplayConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set maximum dispatch attempts per action
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Builder: set the base backoff unit in milliseconds
    pub fn with_retry_delay_ms(mut self, delay_ms: u64) -> Self {
        self.retry_delay_ms = delay_ms;
        self
    }

    /// Builder: enable/disable before/after screenshots
    pub fn with_capture_screenshots(mut self, capture: bool) -> Self {
        self.capture_screenshots = capture;
        self
    }

    /// Builder: enable/disable the on-error screenshot
    pub fn with_screenshot_on_error(mut self, capture: bool) -> Self {
        self.screenshot_on_error = capture;
        self
    }

    /// Builder: set the replay speed multiplier
    pub fn with_speed_multiplier(mut self, multiplier: f64) -> Self {
        self.speed_multiplier = multiplier;
        self
    }

    /// Builder: halt at the first non-successful action
    pub fn with_stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    /// Builder: enable/disable the pre-replay screen-on
    pub fn with_wait_for_screen_on(mut self, wait: bool) -> Self {
        self.wait_for_screen_on = wait;
        self
    }

    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. Configuration file (`mimos.toml` or path from `MIMOS_CONFIG_PATH`)
    /// 3. Environment variable overrides (`MIMOS_` prefix)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is invalid or the
    /// resulting values fail validation.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Toml},
        };

        let mut figment = Figment::new()
            .merge(Toml::file("mimos.toml"))
            .merge(Env::prefixed("MIMOS_"));

        if let Ok(path) = std::env::var("MIMOS_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: ReplayConfig = figment.extract().map_err(|e| {
            MimosError::Configuration(format!("Failed to load configuration: {e}"))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting values fail validation.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Toml},
        };

        let config: ReplayConfig = Figment::new()
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                MimosError::Configuration(format!("Failed to load configuration file: {e}"))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for `retry_attempts == 0` or a non-positive
    /// `speed_multiplier`.
    pub fn validate(&self) -> Result<()> {
        if self.retry_attempts == 0 {
            return Err(MimosError::Configuration(
                "retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.speed_multiplier <= 0.0 || !self.speed_multiplier.is_finite() {
            return Err(MimosError::Configuration(
                "speed_multiplier must be a positive number".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReplayConfig::default();
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_delay_ms, 500);
        assert!(!config.capture_screenshots);
        assert!(config.screenshot_on_error);
        assert_eq!(config.speed_multiplier, 1.0);
        assert!(!config.stop_on_error);
        assert!(config.wait_for_screen_on);
    }

    #[test]
    fn test_builder() {
        let config = ReplayConfig::new()
            .with_retry_attempts(5)
            .with_retry_delay_ms(100)
            .with_capture_screenshots(true)
            .with_speed_multiplier(2.0)
            .with_stop_on_error(true)
            .with_wait_for_screen_on(false);

        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.retry_delay_ms, 100);
        assert!(config.capture_screenshots);
        assert_eq!(config.speed_multiplier, 2.0);
        assert!(config.stop_on_error);
        assert!(!config.wait_for_screen_on);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = ReplayConfig::new().with_retry_attempts(0);
        assert!(matches!(
            config.validate(),
            Err(MimosError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_non_positive_multiplier() {
        assert!(
            ReplayConfig::new()
                .with_speed_multiplier(0.0)
                .validate()
                .is_err()
        );
        assert!(
            ReplayConfig::new()
                .with_speed_multiplier(-1.0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mimos.toml");
        std::fs::write(
            &path,
            "retry_attempts = 5\nspeed_multiplier = 2.5\nstop_on_error = true\n",
        )
        .unwrap();

        let config = ReplayConfig::from_file(&path).unwrap();
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.speed_multiplier, 2.5);
        assert!(config.stop_on_error);
        // Unspecified fields keep their defaults
        assert_eq!(config.retry_delay_ms, 500);
    }

    #[test]
    fn test_from_file_invalid_values() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mimos.toml");
        std::fs::write(&path, "retry_attempts = 0\n").unwrap();

        assert!(ReplayConfig::from_file(&path).is_err());
    }
}
