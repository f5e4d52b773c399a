//! Configuration management for the config service.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support (`CONFIG_PATH`)
//! - Environment variable overrides (`DCONFIG__SECTION__FIELD`)
//! - Component-wise validation
mod cache;
mod long_poll;
mod message;
mod monitoring;
mod server;
pub use cache::*;
pub use long_poll::*;
pub use message::*;
pub use monitoring::*;
pub use server::*;

#[cfg(test)]
mod config_test;

use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Environment variable prefix for overrides, e.g. `DCONFIG__CACHE__EXPIRE_AFTER_ACCESS_IN_SECS`
pub(crate) const ENV_PREFIX: &str = "DCONFIG";

/// Main configuration container for the config service components
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct ServiceConfig {
    /// HTTP endpoint, seed data and log location
    #[serde(default)]
    pub server: ServerConfig,
    /// Release cache eviction
    #[serde(default)]
    pub cache: CacheConfig,
    /// Long-poll hold time and fan-out pacing
    #[serde(default)]
    pub long_poll: LongPollConfig,
    /// Release message scanning
    #[serde(default)]
    pub message: MessageScanConfig,
    /// Metrics and monitoring settings
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl Debug for ServiceConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("server", &self.server)
            .field("long_poll", &self.long_poll)
            .finish_non_exhaustive()
    }
}

impl ServiceConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `DCONFIG__` prefix (highest priority)
    ///
    /// # Note
    /// Validation is deferred so that `with_override_config()` can still be applied.
    /// Callers MUST call `validate()` before using the configuration.
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    pub fn validate(self) -> Result<Self> {
        self.server.validate()?;
        self.cache.validate()?;
        self.long_poll.validate()?;
        self.message.validate()?;
        self.monitoring.validate()?;
        self.monitoring.check_conflict(&self.server.listen_address)?;
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
