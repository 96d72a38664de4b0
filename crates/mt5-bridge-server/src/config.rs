/*
[INPUT]:  YAML configuration file (optional)
[OUTPUT]: Parsed bridge service configuration with defaults
[POS]:    Configuration layer - service setup
[UPDATE]: When adding new configuration options
*/

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use mt5_bridge_adapter::{ClientConfig, DEFAULT_GATEWAY_URL};
use serde::{Deserialize, Serialize};

use crate::runner::RunnerTiming;

/// Top-level configuration for the trading bridge
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub terminal: TerminalConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub strategy: StrategyTimingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allow any origin (the web dashboard runs on another origin)
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: true,
        }
    }
}

/// Terminal gateway connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TerminalConfig {
    #[serde(default = "default_gateway_url")]
    pub base_url: String,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            timeout_secs: default_http_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Limits applied to every broker call
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerConfig {
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

/// Auto-trading loop cadence
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyTimingConfig {
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

impl Default for StrategyTimingConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: default_cycle_interval_secs(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Directory for daily-rolling log files; stdout only when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_call_timeout_secs() -> u64 {
    10
}

fn default_cycle_interval_secs() -> u64 {
    5
}

fn default_backoff_secs() -> u64 {
    10
}

impl BridgeConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.broker.call_timeout_secs == 0 {
            anyhow::bail!("broker.call_timeout_secs must be positive");
        }
        if self.strategy.cycle_interval_secs == 0 || self.strategy.backoff_secs == 0 {
            anyhow::bail!("strategy intervals must be positive");
        }
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.server.host, self.server.port))
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.terminal.timeout_secs),
            connect_timeout: Duration::from_secs(self.terminal.connect_timeout_secs),
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.broker.call_timeout_secs)
    }

    pub fn runner_timing(&self) -> RunnerTiming {
        RunnerTiming {
            cycle_interval: Duration::from_secs(self.strategy.cycle_interval_secs),
            backoff: Duration::from_secs(self.strategy.backoff_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: BridgeConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.server.enable_cors);
        assert_eq!(config.call_timeout(), Duration::from_secs(10));
        assert_eq!(config.runner_timing(), RunnerTiming::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let raw = r#"
server:
  port: 9100
terminal:
  base_url: "http://10.0.0.5:8228"
strategy:
  backoff_secs: 30
"#;
        let config: BridgeConfig = serde_yaml::from_str(raw).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.terminal.base_url, "http://10.0.0.5:8228");
        assert_eq!(config.strategy.cycle_interval_secs, 5);
        assert_eq!(config.runner_timing().backoff, Duration::from_secs(30));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let config: BridgeConfig = serde_yaml::from_str("broker:\n  call_timeout_secs: 0\n").unwrap();
        assert!(config.validate().is_err());
    }
}
