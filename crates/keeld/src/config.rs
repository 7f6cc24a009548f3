//! TOML configuration for the keel daemon.

use std::path::Path;

use keel_ring::RingConfig;
use serde::Deserialize;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Hash ring shape and strategy.
    pub ring: RingConfig,
    /// HTTP front end.
    pub http: HttpSection,
    /// Initial membership.
    pub balancer: BalancerSection,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[http]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    /// Address the HTTP API listens on.
    pub listen_addr: String,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000".to_string(),
        }
    }
}

/// `[balancer]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BalancerSection {
    /// Servers spawned at startup.
    pub initial_servers: usize,
}

impl Default for BalancerSection {
    fn default() -> Self {
        Self { initial_servers: 3 }
    }
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or use defaults if no path given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                let config: CliConfig = toml::from_str(&content)?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string (used in tests).
    #[cfg(test)]
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }
}
