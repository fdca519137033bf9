//! Runtime configuration for scans and collectors.
//!
//! Configuration is supplied externally, not computed: construct a
//! [`RuntimeConfig`] directly, deserialize one, or read it from the
//! environment with [`RuntimeConfig::from_env`].

#![warn(missing_docs, clippy::pedantic)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

const REGION_VAR: &str = "WARDEN_REGION";
const PROFILE_VAR: &str = "WARDEN_PROFILE";
const MAX_RESOURCES_VAR: &str = "WARDEN_MAX_RESOURCES";
const TIMEOUT_VAR: &str = "WARDEN_TIMEOUT_SECS";
const DRY_RUN_VAR: &str = "WARDEN_DRY_RUN";

/// Errors surfaced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment value failed to parse.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// The offending environment variable.
        key: &'static str,
        /// Human-readable parse failure.
        reason: String,
    },
}

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Externally supplied runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    region: String,
    profile: String,
    max_resources: usize,
    timeout_secs: u64,
    default_dry_run: bool,
}

impl RuntimeConfig {
    /// Loads configuration from the process environment, falling back to
    /// defaults for unset keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a set variable fails to parse.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a present value fails to parse.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(region) = lookup(REGION_VAR) {
            config.region = region;
        }
        if let Some(profile) = lookup(PROFILE_VAR) {
            config.profile = profile;
        }
        if let Some(raw) = lookup(MAX_RESOURCES_VAR) {
            config.max_resources = raw.parse().map_err(|err| ConfigError::Invalid {
                key: MAX_RESOURCES_VAR,
                reason: format!("{err}"),
            })?;
        }
        if let Some(raw) = lookup(TIMEOUT_VAR) {
            config.timeout_secs = raw.parse().map_err(|err| ConfigError::Invalid {
                key: TIMEOUT_VAR,
                reason: format!("{err}"),
            })?;
        }
        if let Some(raw) = lookup(DRY_RUN_VAR) {
            config.default_dry_run = matches!(raw.as_str(), "1" | "true" | "TRUE" | "yes" | "YES");
        }
        Ok(config)
    }

    /// Sets the region and returns the updated configuration.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Sets the credential profile and returns the updated configuration.
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Sets the per-scan resource cap and returns the updated configuration.
    #[must_use]
    pub fn with_max_resources(mut self, max_resources: usize) -> Self {
        self.max_resources = max_resources;
        self
    }

    /// Returns the target region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Returns the credential profile name.
    #[must_use]
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Returns the maximum number of resources considered per scan.
    ///
    /// The cap bounds result size, not wall-clock time.
    #[must_use]
    pub const fn max_resources(&self) -> usize {
        self.max_resources
    }

    /// Returns the advisory collector timeout in seconds.
    ///
    /// The core imposes no timeout of its own; collector implementations may
    /// honour this value.
    #[must_use]
    pub const fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Returns the default dry-run setting for newly authored actions.
    #[must_use]
    pub const fn default_dry_run(&self) -> bool {
        self.default_dry_run
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_owned(),
            profile: "default".to_owned(),
            max_resources: 1000,
            timeout_secs: 30,
            default_dry_run: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_sensible() {
        let config = RuntimeConfig::default();
        assert_eq!(config.region(), "us-east-1");
        assert_eq!(config.profile(), "default");
        assert_eq!(config.max_resources(), 1000);
        assert_eq!(config.timeout_secs(), 30);
        assert!(config.default_dry_run());
    }

    #[test]
    fn lookup_overrides_defaults() {
        let vars = HashMap::from([
            (REGION_VAR, "eu-central-1"),
            (MAX_RESOURCES_VAR, "50"),
            (DRY_RUN_VAR, "no"),
        ]);
        let config = RuntimeConfig::from_lookup(|key| vars.get(key).map(ToString::to_string))
            .expect("config");

        assert_eq!(config.region(), "eu-central-1");
        assert_eq!(config.max_resources(), 50);
        assert!(!config.default_dry_run());
        assert_eq!(config.profile(), "default");
    }

    #[test]
    fn invalid_numbers_surface_the_key() {
        let vars = HashMap::from([(MAX_RESOURCES_VAR, "plenty")]);
        let err = RuntimeConfig::from_lookup(|key| vars.get(key).map(ToString::to_string))
            .expect_err("should fail");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: MAX_RESOURCES_VAR,
                ..
            }
        ));
    }

    #[test]
    fn with_helpers_replace_fields() {
        let config = RuntimeConfig::default()
            .with_region("ap-southeast-2")
            .with_profile("audit")
            .with_max_resources(5);
        assert_eq!(config.region(), "ap-southeast-2");
        assert_eq!(config.profile(), "audit");
        assert_eq!(config.max_resources(), 5);
    }
}
