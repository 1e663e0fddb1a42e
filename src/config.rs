use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::registry::{ConfigError, FeedDescriptor, FeedRegistry};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address the web interface listens on
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Feed request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    pub feeds: Vec<FeedDescriptor>,
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Validate the configured feeds into the registry the loader serves from.
    pub fn registry(&self) -> Result<FeedRegistry, ConfigError> {
        FeedRegistry::new(self.feeds.clone())
    }
}
