use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: LogRotation,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// How often the log file rolls over
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Never,
    Hourly,
    Daily,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

/// Where accounts and transfer records live
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite URL, e.g. `sqlite://data/transfers.db` or `sqlite::memory:`
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            database_url: "sqlite::memory:".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    /// Longest wait for the account locks of one transfer
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Decimal places of amounts on the wire (2 = cents)
    #[serde(default = "default_amount_decimals")]
    pub amount_decimals: u32,
}

fn default_lock_timeout_ms() -> u64 {
    2000
}

fn default_amount_decimals() -> u32 {
    2
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            amount_decimals: default_amount_decimals(),
        }
    }
}

impl EngineConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl AppConfig {
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", config_path))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: AppConfig = serde_yaml::from_str(content)?;
        if config.engine.amount_decimals > 18 {
            anyhow::bail!(
                "engine.amount_decimals must be at most 18, got {}",
                config.engine.amount_decimals
            );
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
log_level: info
log_dir: ./logs
log_file: transfer.log
use_json: false
rotation: daily
gateway:
  host: 127.0.0.1
  port: 8080
"#;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.rotation, LogRotation::Daily);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.engine.lock_timeout(), Duration::from_millis(2000));
        assert_eq!(config.engine.amount_decimals, 2);
    }

    #[test]
    fn test_sqlite_storage() {
        let yaml = format!(
            "{MINIMAL}storage:\n  backend: sqlite\n  database_url: sqlite://data/t.db\n  max_connections: 4\nengine:\n  lock_timeout_ms: 250\n"
        );
        let config = AppConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.max_connections, 4);
        assert_eq!(config.engine.lock_timeout_ms, 250);
        assert_eq!(config.engine.amount_decimals, 2);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(AppConfig::from_yaml("log_level: [").is_err());
        let yaml = format!("{MINIMAL}engine:\n  amount_decimals: 30\n");
        assert!(AppConfig::from_yaml(&yaml).is_err());
        let yaml = MINIMAL.replace("rotation: daily", "rotation: weekly");
        assert!(AppConfig::from_yaml(&yaml).is_err());
        assert!(AppConfig::load("no-such-env").is_err());
    }
}
