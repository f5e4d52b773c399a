use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Release message scanner settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MessageScanConfig {
    /// Delay between two scans of the release message store (milliseconds)
    #[serde(default = "default_scan_interval_in_ms")]
    pub scan_interval_in_ms: u64,

    /// Maximum messages fetched per store query
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: usize,
}

impl Default for MessageScanConfig {
    fn default() -> Self {
        Self {
            scan_interval_in_ms: default_scan_interval_in_ms(),
            scan_batch_size: default_scan_batch_size(),
        }
    }
}

impl MessageScanConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scan_interval_in_ms == 0 {
            return Err(Error::InvalidConfig(
                "scan_interval_in_ms must be greater than 0".into(),
            ));
        }
        if self.scan_batch_size == 0 {
            return Err(Error::InvalidConfig("scan_batch_size must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_in_ms)
    }
}

fn default_scan_interval_in_ms() -> u64 {
    1000
}

fn default_scan_batch_size() -> usize {
    500
}
