// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Chain configuration lookup for explorer queries
//!
//! The explorer client does not own chain metadata. It asks a
//! [`ChainConfigSource`] for the explorer API URL and optional API key of a
//! chain, and resolves both into an [`ExplorerTarget`] once per query.
//! [`ChainConfigRegistry`] is the in-memory source built from configuration,
//! optionally extended with chain configs passed as an encoded payload.

use std::collections::HashMap;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use shared_types::ChainId;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
    api_key::ApiKey,
    error::{ExplorerError, ExplorerResult},
};

/// Source of per-chain explorer settings
#[cfg_attr(test, mockall::automock)]
pub trait ChainConfigSource: Send + Sync {
    /// Explorer API base URL for a chain, if one is configured
    fn explorer_api_url(&self, chain_id: ChainId) -> Option<Url>;

    /// Explorer API key for a chain, if one is configured
    fn explorer_api_key(&self, chain_id: ChainId) -> Option<ApiKey>;
}

/// Metadata describing one chain's explorer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainMetadata {
    /// Chain name, unique within a registry
    pub name: String,
    /// Numeric chain id
    pub chain_id: ChainId,
    /// Etherscan-compatible API endpoint
    #[serde(default)]
    pub explorer_api_url: Option<Url>,
}

impl ChainMetadata {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err(format!("chain {} has an empty name", self.chain_id));
        }
        if let Some(url) = &self.explorer_api_url
            && !matches!(url.scheme(), "http" | "https")
        {
            return Err(format!(
                "chain {} explorer URL must be http(s), got {}",
                self.chain_id,
                url.scheme()
            ));
        }
        Ok(())
    }
}

/// Errors from decoding an encoded chain config payload
#[derive(Debug, Error)]
pub enum ChainConfigDecodeError {
    /// Payload is not valid base64
    #[error("Unable to decode chain configs: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Payload is not a JSON list of chain metadata
    #[error("Invalid chain configs JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload decoded but describes an invalid chain
    #[error("Invalid chain configs: {0}")]
    Invalid(String),
}

/// In-memory chain configuration
#[derive(Debug, Clone, Default)]
pub struct ChainConfigRegistry {
    chains: HashMap<ChainId, ChainMetadata>,
    api_keys: HashMap<ChainId, ApiKey>,
}

impl ChainConfigRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chain, builder style
    #[must_use]
    pub fn with_chain(mut self, metadata: ChainMetadata) -> Self {
        self.insert_chain(metadata);
        self
    }

    /// Add an API key, builder style
    #[must_use]
    pub fn with_api_key(mut self, chain_id: ChainId, key: ApiKey) -> Self {
        self.set_api_key(chain_id, key);
        self
    }

    /// Insert or replace a chain, returning the previous entry
    pub fn insert_chain(&mut self, metadata: ChainMetadata) -> Option<ChainMetadata> {
        self.chains.insert(metadata.chain_id, metadata)
    }

    /// Set the API key used for a chain
    pub fn set_api_key(&mut self, chain_id: ChainId, key: ApiKey) {
        self.api_keys.insert(chain_id, key);
    }

    /// Metadata for a chain
    pub fn chain(&self, chain_id: ChainId) -> Option<&ChainMetadata> {
        self.chains.get(&chain_id)
    }

    /// Iterate over all configured chains
    pub fn chains(&self) -> impl Iterator<Item = &ChainMetadata> {
        self.chains.values()
    }

    /// Number of configured chains
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Whether no chains are configured
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Merge chain configs from a base64-encoded JSON array
    ///
    /// Chains already present in the registry are kept as they are; only new
    /// chains are added. On any decode or validation failure the registry is
    /// left untouched.
    ///
    /// # Returns
    ///
    /// The number of chains that were added
    pub fn merge_encoded(&mut self, encoded: &str) -> Result<usize, ChainConfigDecodeError> {
        let chains = Self::decode(encoded).inspect_err(|e| {
            error!(error = %e, "unable to decode chain configs");
        })?;

        let mut added = 0;
        for metadata in chains {
            if self.chains.contains_key(&metadata.chain_id) {
                debug!(chain_id = %metadata.chain_id, "chain already configured, keeping existing entry");
                continue;
            }
            self.chains.insert(metadata.chain_id, metadata);
            added += 1;
        }

        if added > 0 {
            info!(added, total = self.chains.len(), "merged encoded chain configs");
        }
        Ok(added)
    }

    fn decode(encoded: &str) -> Result<Vec<ChainMetadata>, ChainConfigDecodeError> {
        let bytes = STANDARD.decode(encoded.trim())?;
        let chains: Vec<ChainMetadata> = serde_json::from_slice(&bytes)?;
        chains
            .iter()
            .try_for_each(ChainMetadata::validate)
            .map_err(ChainConfigDecodeError::Invalid)?;
        Ok(chains)
    }
}

impl ChainConfigSource for ChainConfigRegistry {
    fn explorer_api_url(&self, chain_id: ChainId) -> Option<Url> {
        self.chains
            .get(&chain_id)
            .and_then(|chain| chain.explorer_api_url.clone())
    }

    fn explorer_api_key(&self, chain_id: ChainId) -> Option<ApiKey> {
        self.api_keys.get(&chain_id).cloned()
    }
}

/// Explorer endpoint resolved for a single query
#[derive(Debug, Clone)]
pub struct ExplorerTarget {
    /// Chain being queried
    pub chain_id: ChainId,
    /// Explorer API base URL, possibly carrying its own query string
    pub base_url: Url,
    /// Key to authenticate with, when the caller asked for one
    pub api_key: Option<ApiKey>,
}

impl ExplorerTarget {
    /// Resolve the explorer endpoint for `chain_id`
    ///
    /// # Errors
    ///
    /// Returns [`ExplorerError::Config`] if the chain has no explorer URL, or if
    /// `use_key` is set and the chain has no API key.
    pub fn resolve(
        source: &dyn ChainConfigSource,
        chain_id: ChainId,
        use_key: bool,
    ) -> ExplorerResult<Self> {
        let base_url = source.explorer_api_url(chain_id).ok_or_else(|| {
            ExplorerError::config(
                chain_id,
                format!("No valid URL found for explorer for chain {chain_id}"),
            )
        })?;

        let api_key = if use_key {
            Some(source.explorer_api_key(chain_id).ok_or_else(|| {
                ExplorerError::config(
                    chain_id,
                    format!("No API key for explorer for chain {chain_id}"),
                )
            })?)
        } else {
            None
        };

        Ok(Self {
            chain_id,
            base_url,
            api_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ethereum() -> ChainMetadata {
        ChainMetadata {
            name: "ethereum".to_string(),
            chain_id: ChainId::ETHEREUM,
            explorer_api_url: Some(Url::parse("https://api.etherscan.io/api").unwrap()),
        }
    }

    fn encode(value: &serde_json::Value) -> String {
        STANDARD.encode(serde_json::to_vec(value).unwrap())
    }

    #[test]
    fn resolve_without_key() {
        let registry = ChainConfigRegistry::new().with_chain(ethereum());

        let target = ExplorerTarget::resolve(&registry, ChainId::ETHEREUM, false).unwrap();
        assert_eq!(target.base_url.as_str(), "https://api.etherscan.io/api");
        assert!(target.api_key.is_none());
    }

    #[test]
    fn resolve_missing_url() {
        let registry = ChainConfigRegistry::new();

        let error = ExplorerTarget::resolve(&registry, ChainId::POLYGON, false).unwrap_err();
        assert!(matches!(error, ExplorerError::Config { .. }));
        assert!(error.to_string().contains("No valid URL found"));
    }

    #[test]
    fn resolve_missing_key_when_requested() {
        let registry = ChainConfigRegistry::new().with_chain(ethereum());

        let error = ExplorerTarget::resolve(&registry, ChainId::ETHEREUM, true).unwrap_err();
        assert!(error.to_string().contains("No API key"));

        let registry = registry.with_api_key(ChainId::ETHEREUM, ApiKey::new("KEY").unwrap());
        let target = ExplorerTarget::resolve(&registry, ChainId::ETHEREUM, true).unwrap();
        assert_eq!(target.api_key.map(|k| k.expose().to_string()), Some("KEY".to_string()));
    }

    #[test]
    fn resolve_uses_source_trait() {
        let mut source = MockChainConfigSource::new();
        source
            .expect_explorer_api_url()
            .returning(|_| Some(Url::parse("https://api.arbiscan.io/api").unwrap()));
        source.expect_explorer_api_key().never();

        let target = ExplorerTarget::resolve(&source, ChainId::ARBITRUM, false).unwrap();
        assert_eq!(target.chain_id, ChainId::ARBITRUM);
    }

    #[test]
    fn merge_encoded_adds_new_chains_only() {
        let mut registry = ChainConfigRegistry::new().with_chain(ethereum());

        let payload = encode(&json!([
            {
                "name": "ethereum-override",
                "chainId": 1,
                "explorerApiUrl": "https://example.com/api"
            },
            {
                "name": "polygon",
                "chainId": 137,
                "explorerApiUrl": "https://api.polygonscan.com/api"
            }
        ]));

        let added = registry.merge_encoded(&payload).unwrap();
        assert_eq!(added, 1);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.chain(ChainId::ETHEREUM).unwrap().name, "ethereum");
        assert_eq!(
            registry
                .explorer_api_url(ChainId::POLYGON)
                .map(|url| url.to_string()),
            Some("https://api.polygonscan.com/api".to_string())
        );

        // Nothing new the second time around
        assert_eq!(registry.merge_encoded(&payload).unwrap(), 0);
    }

    #[test]
    fn merge_encoded_rejects_bad_payloads() {
        let mut registry = ChainConfigRegistry::new().with_chain(ethereum());

        let error = registry.merge_encoded("not base64 !!").unwrap_err();
        assert!(matches!(error, ChainConfigDecodeError::Base64(_)));

        let error = registry
            .merge_encoded(&STANDARD.encode(b"{\"not\": \"a list\"}"))
            .unwrap_err();
        assert!(matches!(error, ChainConfigDecodeError::Json(_)));

        let error = registry
            .merge_encoded(&encode(&json!([{ "name": " ", "chainId": 10 }])))
            .unwrap_err();
        assert!(matches!(error, ChainConfigDecodeError::Invalid(_)));

        assert_eq!(registry.len(), 1);
    }
}
