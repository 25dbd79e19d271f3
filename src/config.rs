//! Configuration management for LKS Chain

use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub mempool: MempoolConfig,
    pub producer: ProducerConfig,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default = "default_health_interval")]
    pub health_interval_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            gas_limit: default_gas_limit(),
            health_interval_secs: default_health_interval(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MempoolConfig {
    #[serde(default = "default_max_transactions")]
    pub max_transactions: usize,
    #[serde(default = "default_expiry_secs")]
    pub expiry_secs: u64,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: default_max_transactions(),
            expiry_secs: default_expiry_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProducerConfig {
    #[serde(default = "default_producer_enabled")]
    pub enabled: bool,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_max_block_transactions")]
    pub max_block_transactions: usize,
    pub proposer_address: String,
    #[serde(default)]
    pub genesis_allocation: u128,
}

pub fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let config_str = fs::read_to_string(path).unwrap_or_default();
    let config: Config = if config_str.is_empty() {
        // Provide sane defaults when the config file is absent
        Config {
            database: DatabaseConfig { path: default_db_path() },
            node: NodeConfig::default(),
            mempool: MempoolConfig::default(),
            producer: ProducerConfig {
                enabled: default_producer_enabled(),
                interval_ms: default_interval_ms(),
                max_block_transactions: default_max_block_transactions(),
                proposer_address: "00".repeat(32),
                genesis_allocation: 0,
            },
        }
    } else {
        toml::from_str(&config_str)?
    };

    // Validate critical values
    if config.database.path.is_empty() {
        return Err("database.path must be set".into());
    }
    if config.producer.proposer_address.is_empty() {
        return Err("producer.proposer_address must be set".into());
    }
    if config.node.gas_limit == 0 {
        return Err("node.gas_limit must be positive".into());
    }
    if config.producer.interval_ms == 0 {
        return Err("producer.interval_ms must be positive".into());
    }

    Ok(config)
}

fn default_db_path() -> String {
    "./data/chain.db".to_string()
}

fn default_gas_limit() -> u64 {
    30_000_000
}

fn default_health_interval() -> u64 {
    10
}

fn default_max_transactions() -> usize {
    10_000
}

fn default_expiry_secs() -> u64 {
    3_600
}

fn default_producer_enabled() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    2_000
}

fn default_max_block_transactions() -> usize {
    500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.node.gas_limit, 30_000_000);
        assert_eq!(config.mempool.max_transactions, 10_000);
        assert!(config.producer.enabled);
    }

    #[test]
    fn test_parse_overrides() {
        let raw = r#"
            [database]
            path = "/tmp/test-chain.db"

            [producer]
            proposer_address = "0101010101010101010101010101010101010101010101010101010101010101"
            interval_ms = 500
            genesis_allocation = 1000000
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.database.path, "/tmp/test-chain.db");
        assert_eq!(config.producer.interval_ms, 500);
        assert_eq!(config.producer.genesis_allocation, 1_000_000);
        assert_eq!(config.node.gas_limit, 30_000_000);
    }
}
