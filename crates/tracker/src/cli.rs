// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Command line interface
//!
//! Every command prints a single JSON document. Explorer lookups go through
//! [`ExplorerClient`], so unauthenticated commands are spaced per explorer
//! host and every payload is validated before it is printed.

use std::{path::PathBuf, sync::Arc};

use alloy_primitives::{Address, TxHash};
use clap::{Args, Parser, Subcommand};
use explorer_api::{BlockTag, ChainConfigSource, ExplorerClient, ExplorerParams};
use message_poller::{is_valid_search_query, sanitize_search_input};
use serde_json::{Value, json};
use shared_types::ChainId;
use tracing::info;
use url::form_urlencoded;

use crate::{config::TrackerConfig, error::TrackerResult};

/// Look up cross-chain message transactions on block explorers
#[derive(Parser, Debug)]
#[command(name = "tracker", version, about)]
pub struct Cli {
    /// Send the chain's configured API key, skipping the per-host throttle
    #[arg(long, global = true, env = "TRACKER_USE_KEY")]
    pub use_key: bool,

    /// Directory holding tracker.json and tracker.{environment}.json
    #[arg(long, short = 'c', global = true, env = "TRACKER_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Extra chain configs as a base64-encoded JSON array
    #[arg(long, global = true, env = "TRACKER_CHAIN_CONFIGS")]
    pub chain_configs: Option<String>,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Tracker commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Look up a transaction by hash
    Tx {
        /// Chain the transaction was sent on
        #[arg(long)]
        chain: ChainId,
        /// Transaction hash
        hash: TxHash,
    },
    /// Look up a transaction receipt by transaction hash
    Receipt {
        /// Chain the transaction was sent on
        #[arg(long)]
        chain: ChainId,
        /// Transaction hash
        hash: TxHash,
    },
    /// Look up a block header
    Block {
        /// Chain to query
        #[arg(long)]
        chain: ChainId,
        /// `latest`, a decimal height or a hex height
        #[arg(default_value = "latest")]
        tag: BlockTag,
    },
    /// Look up event logs
    Logs(LogsArgs),
    /// Send a raw explorer query such as `module=account&action=balance&address=0x...`
    Query {
        /// Chain to query
        #[arg(long)]
        chain: ChainId,
        /// URL query string
        params: String,
    },
    /// Check whether a search input can be queried
    SearchInput {
        /// Transaction hash or address
        input: String,
    },
    /// Print the effective configuration, without API keys
    Config,
}

/// Log filter arguments
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct LogsArgs {
    /// Chain to query
    #[arg(long)]
    pub chain: ChainId,
    /// Emitting contract
    #[arg(long)]
    pub address: Option<Address>,
    /// First block of the range
    #[arg(long, default_value_t = 0)]
    pub from_block: u64,
    /// Last block of the range, defaults to the latest block
    #[arg(long)]
    pub to_block: Option<u64>,
    /// Topic filters in position order, starting with the event signature
    #[arg(long = "topic")]
    pub topics: Vec<String>,
    /// Print logs as the explorer returned them instead of normalizing them
    #[arg(long)]
    pub raw: bool,
}

impl LogsArgs {
    /// Explorer query string for this filter
    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("module", "logs")
            .append_pair("action", "getLogs")
            .append_pair("fromBlock", &self.from_block.to_string())
            .append_pair(
                "toBlock",
                &self
                    .to_block
                    .map_or_else(|| BlockTag::Latest.to_string(), |block| block.to_string()),
            );
        if let Some(address) = &self.address {
            query.append_pair("address", &address.to_string());
        }
        for (position, topic) in self.topics.iter().enumerate() {
            query.append_pair(&format!("topic{position}"), topic);
        }
        query.finish()
    }
}

impl Cli {
    /// Load configuration and run the command
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or the command fails.
    pub async fn run(&self) -> TrackerResult<Value> {
        let config = match &self.config_dir {
            Some(dir) => TrackerConfig::load(dir)?,
            None => TrackerConfig::from_env()?,
        };
        self.execute(&config).await
    }

    /// Run the command against an already loaded configuration
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Decode` if `--chain-configs` cannot be decoded,
    /// or the error of the explorer lookup.
    pub async fn execute(&self, config: &TrackerConfig) -> TrackerResult<Value> {
        let mut registry = config.chain_registry();
        if let Some(encoded) = &self.chain_configs {
            registry.merge_encoded(encoded)?;
        }

        let use_key = self.use_key;
        let output = match &self.command {
            Command::Config => {
                let mut chains: Vec<_> = registry.chains().collect();
                chains.sort_by_key(|chain| chain.chain_id);
                let chains: Vec<Value> = chains
                    .into_iter()
                    .map(|chain| {
                        json!({
                            "name": chain.name,
                            "chainId": chain.chain_id,
                            "explorerApiUrl": chain.explorer_api_url,
                            "hasApiKey": registry.explorer_api_key(chain.chain_id).is_some(),
                        })
                    })
                    .collect();
                json!({
                    "environment": config.environment,
                    "explorer": config.explorer,
                    "chains": chains,
                    "poller": config.poller,
                })
            }
            Command::SearchInput { input } => {
                let input = sanitize_search_input(input);
                let valid = input.is_empty()
                    || is_valid_search_query(&input, config.poller.allow_address_search);
                let limit = if input.is_empty() {
                    config.poller.latest_query_limit
                } else {
                    config.poller.search_query_limit
                };
                json!({ "input": input, "valid": valid, "limit": limit })
            }
            lookup => {
                let client = ExplorerClient::new(Arc::new(registry), config.explorer.clone())?;
                lookup.lookup(&client, use_key).await?
            }
        };

        Ok(output)
    }
}

impl Command {
    async fn lookup(&self, client: &ExplorerClient, use_key: bool) -> TrackerResult<Value> {
        info!(command = ?self, use_key, "running explorer lookup");

        let output = match self {
            Self::Tx { chain, hash } => {
                serde_json::to_value(client.query_tx(*chain, *hash, use_key).await?)?
            }
            Self::Receipt { chain, hash } => {
                serde_json::to_value(client.query_tx_receipt(*chain, *hash, use_key).await?)?
            }
            Self::Block { chain, tag } => {
                serde_json::to_value(client.query_block(*chain, *tag, use_key).await?)?
            }
            Self::Logs(args) if args.raw => serde_json::to_value(
                client
                    .query_logs(args.chain, &args.to_query(), use_key)
                    .await?,
            )?,
            Self::Logs(args) => serde_json::to_value(
                client
                    .query_normalized_logs(args.chain, &args.to_query(), use_key)
                    .await?,
            )?,
            Self::Query { chain, params } => {
                client
                    .query(*chain, &ExplorerParams::parse(params), use_key)
                    .await?
            }
            Self::SearchInput { .. } | Self::Config => Value::Null,
        };

        Ok(output)
    }
}
