use std::net::SocketAddr;

use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::Error;
use crate::Result;

/// Prometheus exposition, served apart from the client-facing listener
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitoringConfig {
    #[serde(default = "default_prometheus_enabled")]
    pub prometheus_enabled: bool,

    /// Port of the `/metrics` listener
    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            prometheus_enabled: default_prometheus_enabled(),
            prometheus_port: default_prometheus_port(),
        }
    }
}

impl MonitoringConfig {
    /// # Errors
    /// `Error::InvalidConfig` if metrics are enabled on port 0 or on a
    /// privileged port.
    pub fn validate(&self) -> Result<()> {
        if !self.prometheus_enabled {
            if self.prometheus_port != default_prometheus_port() {
                warn!(
                    port = self.prometheus_port,
                    "prometheus_port is set but metrics are disabled"
                );
            }
            return Ok(());
        }

        match self.prometheus_port {
            0 => Err(Error::InvalidConfig("prometheus_port cannot be 0 when metrics are enabled".into())),
            port if port < 1024 => Err(Error::InvalidConfig(format!(
                "prometheus_port {port} is a privileged port"
            ))),
            _ => Ok(()),
        }
    }

    /// Metrics and client traffic cannot share a port
    pub(crate) fn check_conflict(
        &self,
        listen_address: &SocketAddr,
    ) -> Result<()> {
        if self.prometheus_enabled && listen_address.port() == self.prometheus_port {
            return Err(Error::InvalidConfig(format!(
                "prometheus_port {} collides with listen_address {listen_address}",
                self.prometheus_port
            )));
        }
        Ok(())
    }
}

fn default_prometheus_enabled() -> bool {
    false
}

fn default_prometheus_port() -> u16 {
    9090
}
