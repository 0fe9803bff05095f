// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Typed decoding of explorer payloads
//!
//! A successful envelope says nothing about the payload inside it: explorers
//! return error strings, empty-but-truthy objects, or records for a different
//! transaction. Each function here turns an untrusted `result` value into a
//! typed record or a typed error, and nothing partially validated escapes.

use std::str::FromStr;

use alloy_primitives::{TxHash, U256};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ExplorerError, ExplorerResult};

/// Raw log record as returned by the explorer `logs` module
///
/// Every field is string-typed; numeric values arrive as decimal or hex strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExplorerLogEntry {
    /// Emitting contract
    #[serde(deserialize_with = "null_as_default")]
    pub address: String,
    /// Indexed topics, event signature first
    #[serde(deserialize_with = "null_as_default")]
    pub topics: Vec<String>,
    /// Non-indexed event data
    #[serde(deserialize_with = "null_as_default")]
    pub data: String,
    /// Block number
    #[serde(deserialize_with = "null_as_default")]
    pub block_number: String,
    /// Block timestamp in seconds
    #[serde(deserialize_with = "null_as_default")]
    pub time_stamp: String,
    /// Gas price of the emitting transaction
    #[serde(deserialize_with = "null_as_default")]
    pub gas_price: String,
    /// Gas used by the emitting transaction
    #[serde(deserialize_with = "null_as_default")]
    pub gas_used: String,
    /// Position of the log in the block
    #[serde(deserialize_with = "null_as_default")]
    pub log_index: String,
    /// Emitting transaction
    #[serde(deserialize_with = "null_as_default")]
    pub transaction_hash: String,
    /// Position of the transaction in the block
    #[serde(deserialize_with = "null_as_default")]
    pub transaction_index: String,
}

/// Transaction returned by `eth_getTransactionByHash`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ExplorerTransaction {
    pub hash: String,
    pub block_hash: Option<String>,
    pub block_number: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub value: Option<String>,
    pub gas: Option<String>,
    pub gas_price: Option<String>,
    pub input: Option<String>,
    pub nonce: Option<String>,
    pub transaction_index: Option<String>,
}

/// Receipt returned by `eth_getTransactionReceipt`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ExplorerReceipt {
    pub transaction_hash: String,
    pub block_hash: Option<String>,
    pub block_number: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub contract_address: Option<String>,
    pub gas_used: Option<String>,
    pub cumulative_gas_used: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub logs: Vec<Value>,
}

impl ExplorerReceipt {
    /// Whether the receipt reports successful execution (`status == 0x1`)
    pub fn succeeded(&self) -> Option<bool> {
        self.status
            .as_deref()
            .and_then(parse_quantity_str)
            .map(|status| status == U256::from(1))
    }
}

/// Block header returned by `eth_getBlockByNumber` with transaction hashes only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ExplorerBlock {
    #[serde(deserialize_with = "quantity")]
    pub number: U256,
    pub hash: Option<String>,
    pub parent_hash: Option<String>,
    pub timestamp: Option<String>,
    pub miner: Option<String>,
    pub gas_used: Option<String>,
    pub gas_limit: Option<String>,
    #[serde(default)]
    pub transactions: Vec<Value>,
}

impl ExplorerBlock {
    /// Block number, if it fits in a `u64`
    pub fn number_u64(&self) -> Option<u64> {
        u64::try_from(self.number).ok()
    }

    /// Block timestamp in seconds
    pub fn timestamp_seconds(&self) -> Option<u64> {
        self.timestamp
            .as_deref()
            .and_then(parse_quantity_str)
            .and_then(|ts| u64::try_from(ts).ok())
    }
}

/// Validate a log query result
///
/// # Errors
///
/// Returns [`ExplorerError::MalformedLog`] if the result is not a list, or if
/// any entry lacks a transaction hash, topics, data or a timestamp.
pub fn validate_logs(result: &Value) -> ExplorerResult<Vec<ExplorerLogEntry>> {
    let Value::Array(entries) = result else {
        return Err(ExplorerError::malformed_log(format!(
            "expected a list of logs, got {}",
            json_kind(result)
        )));
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| validate_log_entry(index, entry))
        .collect()
}

fn validate_log_entry(index: usize, entry: &Value) -> ExplorerResult<ExplorerLogEntry> {
    if !entry.is_object() {
        return Err(ExplorerError::malformed_log(format!(
            "log {index} is nullish"
        )));
    }

    let log = ExplorerLogEntry::deserialize(entry)
        .map_err(|e| ExplorerError::malformed_log(format!("log {index}: {e}")))?;

    let missing = if log.transaction_hash.is_empty() {
        Some("tx hash")
    } else if log.topics.is_empty() {
        Some("topics")
    } else if log.data.is_empty() {
        Some("data to parse")
    } else if log.time_stamp.is_empty() {
        Some("timestamp")
    } else {
        None
    };

    match missing {
        Some(field) => Err(ExplorerError::malformed_log(format!(
            "log {index} has no {field}"
        ))),
        None => Ok(log),
    }
}

/// Validate a transaction lookup result against the requested hash
///
/// # Errors
///
/// Returns [`ExplorerError::MalformedTx`] unless the result carries the
/// requested hash (compared case-insensitively).
pub fn validate_transaction(
    result: &Value,
    tx_hash: &TxHash,
) -> ExplorerResult<ExplorerTransaction> {
    let expected = format!("{tx_hash:#x}");
    let actual = string_field(result, "hash");
    let malformed = || ExplorerError::MalformedTx {
        expected: expected.clone(),
        actual: actual.clone(),
    };

    if !actual
        .as_deref()
        .is_some_and(|hash| hash.eq_ignore_ascii_case(&expected))
    {
        return Err(malformed());
    }
    ExplorerTransaction::deserialize(result).map_err(|_| malformed())
}

/// Validate a receipt lookup result against the requested hash
///
/// # Errors
///
/// Returns [`ExplorerError::MalformedReceipt`] unless the result's
/// `transactionHash` matches the requested hash (compared case-insensitively).
pub fn validate_receipt(result: &Value, tx_hash: &TxHash) -> ExplorerResult<ExplorerReceipt> {
    let expected = format!("{tx_hash:#x}");
    let actual = string_field(result, "transactionHash");
    let malformed = || ExplorerError::MalformedReceipt {
        expected: expected.clone(),
        actual: actual.clone(),
    };

    if !actual
        .as_deref()
        .is_some_and(|hash| hash.eq_ignore_ascii_case(&expected))
    {
        return Err(malformed());
    }
    ExplorerReceipt::deserialize(result).map_err(|_| malformed())
}

/// Validate a block lookup result
///
/// # Errors
///
/// Returns [`ExplorerError::MalformedBlock`] unless the block number parses to
/// a positive integer.
pub fn validate_block(result: &Value) -> ExplorerResult<ExplorerBlock> {
    if !result.is_object() {
        return Err(ExplorerError::malformed_block(format!(
            "expected a block object, got {}",
            json_kind(result)
        )));
    }

    let block = ExplorerBlock::deserialize(result)
        .map_err(|e| ExplorerError::malformed_block(e.to_string()))?;

    if block.number.is_zero() {
        return Err(ExplorerError::malformed_block("block number is not positive"));
    }
    Ok(block)
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_owned)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Parse a decimal or `0x`-prefixed hex quantity
fn parse_quantity_str(raw: &str) -> Option<U256> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    U256::from_str(raw).ok()
}

fn quantity<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::String(raw) => parse_quantity_str(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid quantity: {raw}"))),
        Value::Number(number) => number
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| D::Error::custom(format!("invalid quantity: {number}"))),
        other => Err(D::Error::custom(format!(
            "expected a quantity, got {}",
            json_kind(&other)
        ))),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
