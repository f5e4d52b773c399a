use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Release cache eviction settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Entries not read for this long are evicted and reloaded on next access
    ///
    /// **Default**: 3600 (1 hour)
    #[serde(default = "default_expire_after_access_in_secs")]
    pub expire_after_access_in_secs: u64,

    /// Period of the background sweep removing idle entries
    ///
    /// Lazy eviction on access already guarantees freshness; the sweep only
    /// bounds memory held by abandoned coordinates.
    #[serde(default = "default_sweep_interval_in_secs")]
    pub sweep_interval_in_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expire_after_access_in_secs: default_expire_after_access_in_secs(),
            sweep_interval_in_secs: default_sweep_interval_in_secs(),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.expire_after_access_in_secs == 0 {
            return Err(Error::InvalidConfig(
                "expire_after_access_in_secs must be greater than 0".into(),
            ));
        }

        if self.sweep_interval_in_secs == 0 {
            return Err(Error::InvalidConfig(
                "sweep_interval_in_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    pub fn expire_after_access(&self) -> Duration {
        Duration::from_secs(self.expire_after_access_in_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_in_secs)
    }
}

fn default_expire_after_access_in_secs() -> u64 {
    60 * 60
}

fn default_sweep_interval_in_secs() -> u64 {
    60
}
