//! # Bridge Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file (or no file) is a valid configuration.
//!
//! ```toml
//! cooldown_ms = 500
//! log_every_n_frames = 60
//! auto_recover = true
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use vizlink_shared::{DEFAULT_COOLDOWN_MS, DEFAULT_LOG_EVERY_N_FRAMES};

/// Upper bound for the cooldown window.
const MAX_COOLDOWN_MS: u64 = 10_000;

/// Session controller and publisher settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Minimum time between releasing a provider and creating the next one.
    pub cooldown_ms: u64,
    /// Throttled log lines fire on the first call and every Nth call after.
    pub log_every_n_frames: u32,
    /// Recreate a dead provider during status checks.
    pub auto_recover: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            log_every_n_frames: DEFAULT_LOG_EVERY_N_FRAMES,
            auto_recover: true,
        }
    }
}

impl BridgeConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`Self::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_every_n_frames == 0 {
            return Err(ConfigError::Invalid("log_every_n_frames must be at least 1".into()));
        }
        if self.cooldown_ms > MAX_COOLDOWN_MS {
            return Err(ConfigError::Invalid(format!(
                "cooldown_ms must be at most {MAX_COOLDOWN_MS}, got {}",
                self.cooldown_ms
            )));
        }
        Ok(())
    }

    /// Cooldown window as a duration.
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Configuration with no cooldown, for hosts that own the transport
    /// end to end.
    #[must_use]
    pub fn without_cooldown() -> Self {
        Self {
            cooldown_ms: 0,
            ..Self::default()
        }
    }
}

/// Settings for [`crate::bus::LoopbackTransport`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopbackConfig {
    /// Bounded channel capacity; messages beyond it are dropped and counted.
    pub capacity: usize,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self { capacity: 4096 }
    }
}
