// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Tracker configuration
//!
//! Settings are layered with the `config` crate, later sources overriding
//! earlier ones:
//!
//! 1. Built-in defaults
//! 2. `tracker.json` in the config directory
//! 3. `tracker.{environment}.json` in the config directory
//! 4. Environment variables prefixed with `TRACKER__`, using `__` as the
//!    nesting separator (`TRACKER__EXPLORER__RATE_LIMIT_MS=6000`)
//!
//! The environment name is read from `TRACKER__ENVIRONMENT` and defaults to
//! `mainnet`.

use std::{collections::HashMap, path::Path};

use config::{
    Config, ConfigBuilder, Environment as ConfigEnv, File, FileFormat, builder::DefaultState,
};
use explorer_api::{ApiKey, ChainConfigRegistry, ChainMetadata, ExplorerConfig};
use message_poller::PollerConfig;
use serde::{Deserialize, Serialize};
use shared_types::{ChainId, Environment};
use tracing::{debug, warn};
use url::Url;

use crate::error::{TrackerError, TrackerResult};

const ENV_PREFIX: &str = "TRACKER";
const ENV_SEPARATOR: &str = "__";
const ENVIRONMENT_VAR: &str = "TRACKER__ENVIRONMENT";

/// Chain entry as written in configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEntry {
    /// Chain name
    pub name: String,
    /// Numeric chain id
    pub chain_id: ChainId,
    /// Etherscan-compatible API endpoint
    #[serde(default)]
    pub explorer_api_url: Option<Url>,
}

impl From<ChainEntry> for ChainMetadata {
    fn from(entry: ChainEntry) -> Self {
        Self {
            name: entry.name,
            chain_id: entry.chain_id,
            explorer_api_url: entry.explorer_api_url,
        }
    }
}

/// Complete tracker configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Networks the tracker reads from
    pub environment: Environment,
    /// Explorer client settings
    pub explorer: ExplorerConfig,
    /// Chains with explorer endpoints
    pub chains: Vec<ChainEntry>,
    /// Explorer API keys by decimal chain id
    pub api_keys: HashMap<String, ApiKey>,
    /// Extra chain configs as a base64-encoded JSON array
    pub chain_configs_encoded: Option<String>,
    /// Status polling settings
    pub poller: PollerConfig,
}

impl TrackerConfig {
    /// Load configuration from the working directory and the environment
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Config` if configuration is invalid or cannot be loaded.
    pub fn from_env() -> TrackerResult<Self> {
        Self::load(Path::new("."))
    }

    /// Load configuration files from `dir`, then environment variables
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Config` if configuration is invalid or cannot be loaded.
    pub fn load(dir: &Path) -> TrackerResult<Self> {
        let environment =
            std::env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| Environment::Mainnet.to_string());

        let builder = Self::defaults()?
            .add_source(File::from(dir.join("tracker.json")).required(false))
            .add_source(
                File::from(dir.join(format!("tracker.{}.json", environment.to_lowercase())))
                    .required(false),
            )
            .add_source(
                ConfigEnv::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            );

        Self::build(builder)
    }

    /// Load configuration from a JSON document layered over the defaults
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Config` if the document is invalid.
    pub fn from_json(json: &str) -> TrackerResult<Self> {
        Self::build(Self::defaults()?.add_source(File::from_str(json, FileFormat::Json)))
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
        let explorer = ExplorerConfig::default();
        Config::builder()
            .set_default("environment", Environment::Mainnet.as_str())?
            .set_default("explorer.timeout_seconds", explorer.timeout_seconds)?
            .set_default("explorer.rate_limit_ms", explorer.rate_limit_ms)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> TrackerResult<Self> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        debug!(
            environment = %config.environment,
            chains = config.chains.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Check values the type system cannot
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Config` describing the first invalid value.
    pub fn validate(&self) -> TrackerResult<()> {
        if self.explorer.timeout_seconds == 0 {
            return Err(TrackerError::Config {
                message: "explorer.timeout_seconds must be greater than 0".to_string(),
            });
        }
        if let Some(chain_id) = self
            .api_keys
            .keys()
            .find(|chain_id| chain_id.parse::<ChainId>().is_err())
        {
            return Err(TrackerError::Config {
                message: format!("api_keys entry {chain_id:?} is not a chain id"),
            });
        }
        self.poller.validate()?;
        Ok(())
    }

    /// Build the chain registry from configured chains, keys and encoded configs
    ///
    /// An encoded payload that fails to decode is logged and skipped, leaving
    /// the configured chains in place.
    pub fn chain_registry(&self) -> ChainConfigRegistry {
        let mut registry = self
            .chains
            .iter()
            .cloned()
            .fold(ChainConfigRegistry::new(), |registry, entry| {
                registry.with_chain(entry.into())
            });

        for (chain_id, key) in &self.api_keys {
            if let Ok(chain_id) = chain_id.parse() {
                registry.set_api_key(chain_id, key.clone());
            }
        }

        if let Some(encoded) = &self.chain_configs_encoded
            && registry.merge_encoded(encoded).is_err()
        {
            warn!("ignoring chain_configs_encoded, keeping configured chains");
        }

        registry
    }
}
