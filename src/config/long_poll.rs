use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Long-poll notification settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LongPollConfig {
    /// Maximum time a notification request is held before answering "not modified"
    ///
    /// Clients may ask for a shorter wait, never a longer one.
    ///
    /// **Default**: 60000 (60 seconds)
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,

    /// Holders completed per round when one release message wakes many requests
    ///
    /// Above this count the completion is paced so that thousands of clients do
    /// not come back for the new config in the same instant.
    #[serde(default = "default_notification_batch_size")]
    pub notification_batch_size: usize,

    /// Pause between two completion rounds (milliseconds)
    #[serde(default = "default_notification_batch_interval_ms")]
    pub notification_batch_interval_ms: u64,
}

impl Default for LongPollConfig {
    fn default() -> Self {
        Self {
            timeout_in_ms: default_timeout_in_ms(),
            notification_batch_size: default_notification_batch_size(),
            notification_batch_interval_ms: default_notification_batch_interval_ms(),
        }
    }
}

impl LongPollConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_in_ms == 0 {
            return Err(Error::InvalidConfig("timeout_in_ms must be greater than 0".into()));
        }

        if self.notification_batch_size == 0 {
            return Err(Error::InvalidConfig(
                "notification_batch_size must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_in_ms)
    }

    pub fn notification_batch_interval(&self) -> Duration {
        Duration::from_millis(self.notification_batch_interval_ms)
    }
}

fn default_timeout_in_ms() -> u64 {
    60_000
}

fn default_notification_batch_size() -> usize {
    100
}

fn default_notification_batch_interval_ms() -> u64 {
    100
}
