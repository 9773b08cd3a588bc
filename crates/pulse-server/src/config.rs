use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use pulse_core::ProviderKind;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub indexer: IndexerConfig,
    pub subgraph: SubgraphConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Indexer REST API (wallet DeFi positions, ERC-20 and native balances)
#[derive(Debug, Deserialize, Clone)]
pub struct IndexerConfig {
    pub api_key: String,
    pub base_url: String,
    pub chain: String,
    pub timeout_seconds: u64,
}

/// Graph-query API serving a DEX subgraph
#[derive(Debug, Deserialize, Clone)]
pub struct SubgraphConfig {
    pub api_key: String,
    pub endpoint: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Provider queried for positions: "indexer" or "subgraph"
    pub primary: String,
    pub balances_enabled: bool,
    /// Reject invariant violations instead of clamping them
    pub strict_invariants: bool,
}

impl IndexerConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.base_url.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl SubgraphConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.endpoint.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl PipelineConfig {
    pub fn primary_kind(&self) -> Result<ProviderKind, ConfigError> {
        self.primary.parse::<ProviderKind>().map_err(|_| {
            ConfigError::Message(format!(
                "pipeline.primary must be \"indexer\" or \"subgraph\", got \"{}\"",
                self.primary
            ))
        })
    }
}

impl AppConfig {
    /// Built-in defaults, before any file or environment layer.
    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5678)?
            .set_default("indexer.api_key", "")?
            .set_default("indexer.base_url", "https://deep-index.moralis.io/api/v2.2")?
            .set_default("indexer.chain", "0x1")?
            .set_default("indexer.timeout_seconds", 10)?
            .set_default("subgraph.api_key", "")?
            .set_default("subgraph.endpoint", "")?
            .set_default("subgraph.timeout_seconds", 10)?
            .set_default("pipeline.primary", "indexer")?
            .set_default("pipeline.balances_enabled", true)?
            .set_default("pipeline.strict_invariants", false)
    }

    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::defaults()?
            // Load from config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (PULSE__INDEXER__API_KEY, etc.)
            // Double underscore separates nested keys that contain underscores
            .add_source(
                Environment::with_prefix("PULSE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        config.pipeline.primary_kind()?;
        Ok(config)
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
