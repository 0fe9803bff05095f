// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Etherscan-compatible explorer client
//!
//! [`ExplorerClient::query`] is the single path to the network: it resolves the
//! chain's explorer, merges parameters onto the base URL, applies the host
//! throttle when no API key is used, and unwraps the `{status, message, result}`
//! envelope. The typed lookups on top of it validate the payload before
//! returning it.

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use alloy_primitives::TxHash;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::ChainId;
use tokio::time::timeout;
use tracing::{debug, error, warn};
use url::Url;

use crate::{
    api_key::REDACTED,
    chain_config::{ChainConfigSource, ExplorerTarget},
    error::{ExplorerError, ExplorerResult},
    logs::{NormalizedLog, normalize_log},
    throttle::{BLOCK_EXPLORER_RATE_LIMIT, HostThrottle},
    validation::{
        ExplorerBlock, ExplorerLogEntry, ExplorerReceipt, ExplorerTransaction, validate_block,
        validate_logs, validate_receipt, validate_transaction,
    },
};

// Explorer client constants
const DEFAULT_EXPLORER_TIMEOUT_SECONDS: u64 = 10;
const API_KEY_PARAM: &str = "apikey";
const USER_AGENT: &str = concat!("message-tracker/", env!("CARGO_PKG_VERSION"));

/// Configuration for the explorer client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Minimum spacing between unauthenticated requests to one host, in milliseconds
    pub rate_limit_ms: u64,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_EXPLORER_TIMEOUT_SECONDS,
            #[allow(clippy::cast_possible_truncation)]
            rate_limit_ms: BLOCK_EXPLORER_RATE_LIMIT.as_millis() as u64,
        }
    }
}

impl ExplorerConfig {
    /// Throttle spacing as a duration
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }
}

/// Ordered query parameters for an explorer request
///
/// Setting a key that is already present replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplorerParams(Vec<(String, String)>);

impl ExplorerParams {
    /// Create an empty parameter list
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters for an action of the `proxy` module
    pub fn proxy(action: &str) -> Self {
        Self::new().with("module", "proxy").with("action", action)
    }

    /// Parse parameters from a `key=value&...` query string
    pub fn parse(query: &str) -> Self {
        let query = query.trim().trim_start_matches('?');
        let mut params = Self::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params.set(key, value);
        }
        params
    }

    /// Set a parameter, builder style
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a parameter, replacing any previous value for the key
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        set_pair(&mut self.0, key.into(), value.into());
    }

    /// Value of a parameter
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over the parameters in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Block selector for block lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockTag {
    /// Most recent block
    #[default]
    Latest,
    /// Specific block height
    Number(u64),
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Number(number) => write!(f, "{number:#x}"),
        }
    }
}

impl FromStr for BlockTag {
    type Err = String;

    /// Accepts `latest`, a decimal height or a `0x`-prefixed hex height
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }
        let number = match s.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => s.parse(),
        };
        number
            .map(Self::Number)
            .map_err(|_| format!("invalid block tag: {s:?}"))
    }
}

/// Response wrapper every explorer endpoint uses, regardless of HTTP status
#[derive(Debug, Clone, Deserialize)]
pub struct QueryEnvelope<R> {
    /// `"1"` on success, `"0"` on error; absent on JSON-RPC style proxy responses
    #[serde(default)]
    pub status: String,
    /// Human readable status, e.g. `OK` or `NOTOK`
    #[serde(default)]
    pub message: String,
    /// Untrusted payload
    #[serde(default)]
    pub result: R,
}

/// Explorer API client
pub struct ExplorerClient {
    http: Client,
    chains: Arc<dyn ChainConfigSource>,
    throttle: HostThrottle,
    config: ExplorerConfig,
}

impl fmt::Debug for ExplorerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplorerClient")
            .field("throttle", &self.throttle)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ExplorerClient {
    /// Create a new explorer client with its own host throttle
    ///
    /// # Arguments
    ///
    /// * `chains` - Source of explorer URLs and API keys
    /// * `config` - Timeout and rate limit settings
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created
    pub fn new(chains: Arc<dyn ChainConfigSource>, config: ExplorerConfig) -> ExplorerResult<Self> {
        let throttle = HostThrottle::with_spacing(config.rate_limit());
        Self::with_throttle(chains, config, throttle)
    }

    /// Create a new explorer client sharing an existing host throttle
    ///
    /// Clients that share a throttle also share its per-host request spacing.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created
    pub fn with_throttle(
        chains: Arc<dyn ChainConfigSource>,
        config: ExplorerConfig,
        throttle: HostThrottle,
    ) -> ExplorerResult<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            chains,
            throttle,
            config,
        })
    }

    /// Host throttle used for unauthenticated requests
    pub fn throttle(&self) -> &HostThrottle {
        &self.throttle
    }

    /// Query the explorer of `chain_id` and return the unwrapped `result`
    ///
    /// The result is returned as-is; callers validate its shape.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the chain has no explorer URL (or no
    /// API key when `use_key` is set), a transport error on timeout or non-2xx
    /// status, and [`ExplorerError::InvalidResult`] with the raw body if the
    /// envelope carries no result.
    pub async fn query(
        &self,
        chain_id: ChainId,
        params: &ExplorerParams,
        use_key: bool,
    ) -> ExplorerResult<Value> {
        let target = ExplorerTarget::resolve(self.chains.as_ref(), chain_id, use_key)?;
        let url = build_url(&target, params);

        debug!(
            chain_id = %chain_id,
            action = params.get("action").unwrap_or_default(),
            url = %redacted_url(&url),
            "querying explorer"
        );

        self.execute(url, target.api_key.is_some()).await
    }

    /// Query logs with raw log-filter parameters (`module=logs&action=getLogs&...`)
    ///
    /// # Errors
    ///
    /// Returns any [`query`](Self::query) error, or
    /// [`ExplorerError::MalformedLog`] if the result is not a valid log list.
    pub async fn query_logs(
        &self,
        chain_id: ChainId,
        params: &str,
        use_key: bool,
    ) -> ExplorerResult<Vec<ExplorerLogEntry>> {
        let params = ExplorerParams::parse(params);
        let result = self.query(chain_id, &params, use_key).await?;

        validate_logs(&result).inspect_err(|e| {
            error!(chain_id = %chain_id, error = %e, payload = %result, ?params, "invalid tx logs result");
        })
    }

    /// Query logs and convert them into the canonical numeric shape
    ///
    /// # Errors
    ///
    /// Returns any [`query_logs`](Self::query_logs) error, or a log error if a
    /// block number or timestamp cannot be parsed.
    pub async fn query_normalized_logs(
        &self,
        chain_id: ChainId,
        params: &str,
        use_key: bool,
    ) -> ExplorerResult<Vec<NormalizedLog>> {
        self.query_logs(chain_id, params, use_key)
            .await?
            .into_iter()
            .map(normalize_log)
            .collect()
    }

    /// Look up a transaction by hash
    ///
    /// # Errors
    ///
    /// Returns any [`query`](Self::query) error, or
    /// [`ExplorerError::MalformedTx`] if the explorer returned another transaction.
    pub async fn query_tx(
        &self,
        chain_id: ChainId,
        tx_hash: TxHash,
        use_key: bool,
    ) -> ExplorerResult<ExplorerTransaction> {
        let params =
            ExplorerParams::proxy("eth_getTransactionByHash").with("txhash", format!("{tx_hash:#x}"));
        let result = self.query(chain_id, &params, use_key).await?;

        validate_transaction(&result, &tx_hash).inspect_err(|e| {
            error!(chain_id = %chain_id, error = %e, payload = %result, "invalid tx result");
        })
    }

    /// Look up a transaction receipt by transaction hash
    ///
    /// # Errors
    ///
    /// Returns any [`query`](Self::query) error, or
    /// [`ExplorerError::MalformedReceipt`] if the receipt is for another transaction.
    pub async fn query_tx_receipt(
        &self,
        chain_id: ChainId,
        tx_hash: TxHash,
        use_key: bool,
    ) -> ExplorerResult<ExplorerReceipt> {
        let params = ExplorerParams::proxy("eth_getTransactionReceipt")
            .with("txhash", format!("{tx_hash:#x}"));
        let result = self.query(chain_id, &params, use_key).await?;

        validate_receipt(&result, &tx_hash).inspect_err(|e| {
            error!(chain_id = %chain_id, error = %e, payload = %result, "invalid tx receipt result");
        })
    }

    /// Look up a block header, without full transactions
    ///
    /// # Errors
    ///
    /// Returns any [`query`](Self::query) error, or
    /// [`ExplorerError::MalformedBlock`] if the block number is not positive.
    pub async fn query_block(
        &self,
        chain_id: ChainId,
        tag: BlockTag,
        use_key: bool,
    ) -> ExplorerResult<ExplorerBlock> {
        let params = ExplorerParams::proxy("eth_getBlockByNumber")
            .with("tag", tag.to_string())
            .with("boolean", "false");
        let result = self.query(chain_id, &params, use_key).await?;

        validate_block(&result).inspect_err(|e| {
            error!(chain_id = %chain_id, error = %e, payload = %result, "invalid block result");
        })
    }

    /// Run a request, throttling it per host when it is unauthenticated
    async fn execute(&self, url: Url, authenticated: bool) -> ExplorerResult<Value> {
        // Held until the request settles; dropping it records the host
        let _permit = if authenticated {
            None
        } else {
            let host = url.host_str().unwrap_or_default().to_owned();
            Some(self.throttle.wait_if_needed(&host).await)
        };

        self.fetch(url).await
    }

    /// Send the request, bounding the whole exchange by the configured timeout
    async fn fetch(&self, url: Url) -> ExplorerResult<Value> {
        let timeout_seconds = self.config.timeout_seconds;
        timeout(Duration::from_secs(timeout_seconds), self.send(url))
            .await
            .map_err(|_| ExplorerError::Timeout { timeout_seconds })?
    }

    async fn send(&self, url: Url) -> ExplorerResult<Value> {
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(status = status.as_u16(), body = %body, "explorer request failed");
            return Err(ExplorerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let Ok(envelope) = serde_json::from_str::<QueryEnvelope<Value>>(&body) else {
            return Err(ExplorerError::InvalidResult { body });
        };

        if is_falsy(&envelope.result) {
            debug!(
                status = %envelope.status,
                message = %envelope.message,
                "explorer returned an empty result"
            );
            return Err(ExplorerError::InvalidResult { body });
        }

        Ok(envelope.result)
    }
}

/// Merge `params` and the API key onto the base URL's own query string
fn build_url(target: &ExplorerTarget, params: &ExplorerParams) -> Url {
    let mut url = target.base_url.clone();
    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    for (key, value) in params.iter() {
        set_pair(&mut pairs, key.to_owned(), value.to_owned());
    }
    if let Some(key) = &target.api_key {
        set_pair(&mut pairs, API_KEY_PARAM.to_owned(), key.expose().to_owned());
    }

    url.query_pairs_mut().clear().extend_pairs(&pairs);
    url
}

fn set_pair(pairs: &mut Vec<(String, String)>, key: String, value: String) {
    pairs.retain(|(k, _)| *k != key);
    pairs.push((key, value));
}

/// URL safe to log: the `apikey` value is masked, whatever its encoding
fn redacted_url(url: &Url) -> String {
    if !url.query_pairs().any(|(key, _)| key == API_KEY_PARAM) {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .into_owned()
        .map(|(key, value)| {
            if key == API_KEY_PARAM {
                (key, REDACTED.to_owned())
            } else {
                (key, value)
            }
        })
        .collect();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(&pairs);
    redacted.to_string()
}

/// Whether a result counts as missing: absent, null, empty string, false or zero
fn is_falsy(result: &Value) -> bool {
    match result {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}
