use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_address: SocketAddr,

    /// Optional JSON file of apps, namespaces and releases loaded into the
    /// in-memory store at startup
    #[serde(default)]
    pub seed_path: Option<PathBuf>,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_addr(),
            seed_path: None,
            log_dir: default_log_dir(),
        }
    }
}

impl ServerConfig {
    /// Validates server configuration
    /// # Errors
    /// Returns `Error::InvalidConfig` if the listen port is 0 or the seed file does not exist
    pub fn validate(&self) -> Result<()> {
        if self.listen_address.port() == 0 {
            return Err(Error::InvalidConfig("listen_address port cannot be 0".into()));
        }

        if let Some(seed) = &self.seed_path {
            if !seed.is_file() {
                return Err(Error::InvalidConfig(format!(
                    "seed_path {} is not a readable file",
                    seed.display()
                )));
            }
        }

        Ok(())
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}
