// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Conversion of explorer logs into provider-style logs
//!
//! Explorer log records are string-typed and lack the block hash and removal
//! flag that node providers return. [`normalize_log`] produces the numeric
//! shape the rest of the tracker works with.
//!
//! `blockNumber` and `timeStamp` are required: a log without them cannot be
//! placed in time, so a parse failure rejects the log. `logIndex` and
//! `transactionIndex` are omitted by some explorers for some log kinds and
//! fall back to `0`.

use serde::{Deserialize, Serialize};

use crate::{
    error::{ExplorerError, ExplorerResult},
    validation::ExplorerLogEntry,
};

/// Log in the canonical numeric shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedLog {
    /// Emitting contract
    pub address: String,
    /// Indexed topics, event signature first
    pub topics: Vec<String>,
    /// Non-indexed event data
    pub data: String,
    /// Block number
    pub block_number: u64,
    /// Always empty, explorers do not report it
    pub block_hash: String,
    /// Block timestamp in milliseconds
    pub timestamp: u64,
    /// Gas price of the emitting transaction, as reported
    pub gas_price: String,
    /// Gas used by the emitting transaction, as reported
    pub gas_used: String,
    /// Position of the log in the block
    pub log_index: u64,
    /// Emitting transaction
    pub transaction_hash: String,
    /// Position of the transaction in the block
    pub transaction_index: u64,
    /// Always false, explorers only serve canonical logs
    pub removed: bool,
}

impl TryFrom<ExplorerLogEntry> for NormalizedLog {
    type Error = ExplorerError;

    fn try_from(entry: ExplorerLogEntry) -> Result<Self, Self::Error> {
        let block_number = to_decimal_number("blockNumber", &entry.block_number)?;
        let timestamp = to_decimal_number("timeStamp", &entry.time_stamp)?
            .checked_mul(1000)
            .ok_or_else(|| {
                ExplorerError::malformed_log(format!(
                    "timeStamp {} overflows milliseconds",
                    entry.time_stamp
                ))
            })?;

        Ok(Self {
            address: entry.address,
            topics: entry.topics,
            data: entry.data,
            block_number,
            block_hash: String::new(),
            timestamp,
            gas_price: entry.gas_price,
            gas_used: entry.gas_used,
            log_index: try_to_decimal_number(&entry.log_index).unwrap_or(0),
            transaction_hash: entry.transaction_hash,
            transaction_index: try_to_decimal_number(&entry.transaction_index).unwrap_or(0),
            removed: false,
        })
    }
}

/// Normalize a validated explorer log
///
/// # Errors
///
/// Returns [`ExplorerError::MalformedLog`] if the block number or timestamp
/// cannot be parsed.
pub fn normalize_log(entry: ExplorerLogEntry) -> ExplorerResult<NormalizedLog> {
    NormalizedLog::try_from(entry)
}

fn to_decimal_number(field: &str, raw: &str) -> ExplorerResult<u64> {
    try_to_decimal_number(raw)
        .ok_or_else(|| ExplorerError::malformed_log(format!("{field} is not a number: {raw:?}")))
}

/// Parse a decimal or `0x`-prefixed hex string
fn try_to_decimal_number(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some("") => None,
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> ExplorerLogEntry {
        ExplorerLogEntry {
            address: "0xd4c1905bb1d26bc93dac913e13cacc278cdcc80d".to_string(),
            topics: vec!["0x1".to_string()],
            data: "0x".to_string(),
            block_number: "100".to_string(),
            time_stamp: "1700000000".to_string(),
            gas_price: "0x2540be400".to_string(),
            gas_used: "0x1a2b".to_string(),
            log_index: "bad".to_string(),
            transaction_hash: "0xabc".to_string(),
            transaction_index: String::new(),
        }
    }

    #[test]
    fn lenient_fields_default_to_zero() {
        let log = normalize_log(entry()).unwrap();

        assert_eq!(log.log_index, 0);
        assert_eq!(log.transaction_index, 0);
        assert_eq!(log.timestamp, 1_700_000_000_000);
        assert_eq!(log.block_number, 100);
        assert_eq!(log.block_hash, "");
        assert!(!log.removed);
        assert_eq!(log.transaction_hash, "0xabc");
    }

    #[test]
    fn hex_fields_are_decoded() {
        let log = normalize_log(ExplorerLogEntry {
            block_number: "0x10d4f".to_string(),
            time_stamp: "0x6553f100".to_string(),
            log_index: "0x1f".to_string(),
            transaction_index: "0X2".to_string(),
            ..entry()
        })
        .unwrap();

        assert_eq!(log.block_number, 68943);
        assert_eq!(log.timestamp, 1_700_000_000_000);
        assert_eq!(log.log_index, 31);
        assert_eq!(log.transaction_index, 2);
    }

    #[test]
    fn timestamp_is_scaled_to_milliseconds() {
        for seconds in [0_u64, 1, 1_600_000_000, 4_102_444_800] {
            let log = normalize_log(ExplorerLogEntry {
                time_stamp: seconds.to_string(),
                ..entry()
            })
            .unwrap();
            assert_eq!(log.timestamp, seconds * 1000);
        }
    }

    #[test]
    fn required_fields_must_parse() {
        let error = normalize_log(ExplorerLogEntry {
            block_number: "0x".to_string(),
            ..entry()
        })
        .unwrap_err();
        assert!(error.to_string().contains("blockNumber"));

        let error = normalize_log(ExplorerLogEntry {
            time_stamp: "yesterday".to_string(),
            ..entry()
        })
        .unwrap_err();
        assert!(error.to_string().contains("timeStamp"));

        let error = normalize_log(ExplorerLogEntry {
            time_stamp: u64::MAX.to_string(),
            ..entry()
        })
        .unwrap_err();
        assert!(matches!(error, ExplorerError::MalformedLog { .. }));
    }
}
