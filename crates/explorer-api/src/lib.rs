// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Block explorer API integration
//!
//! This crate queries third-party block explorers (Etherscan-compatible APIs)
//! for raw transaction, receipt, block and log data. Explorer responses are
//! untrusted, so every payload goes through a schema check before it is handed
//! to callers.
//!
//! # Architecture
//!
//! - **Client**: [`client::ExplorerClient`] - URL building, API keys, timeouts and envelope unwrapping
//! - **Throttling**: [`throttle::HostThrottle`] - per-host spacing of unauthenticated requests
//! - **Validation**: [`validation`] - typed decode of log, transaction, receipt and block payloads
//! - **Normalization**: [`logs`] - conversion of string-typed explorer logs into numeric logs
//! - **Chain Config**: [`chain_config`] - explorer URL and API key lookup per chain
//!
//! # Features
//!
//! - **Shared Rate Limiting**: one throttle handle is shared by every client and caller
//! - **Guaranteed Bookkeeping**: a host is recorded as queried even when the request fails
//! - **Key Redaction**: API keys never appear in logs or debug output

pub mod api_key;
pub mod chain_config;
pub mod client;
pub mod error;
pub mod logs;
pub mod throttle;
pub mod validation;

pub use api_key::ApiKey;
pub use chain_config::{
    ChainConfigDecodeError, ChainConfigRegistry, ChainConfigSource, ChainMetadata,
    ExplorerTarget,
};
pub use client::{BlockTag, ExplorerClient, ExplorerConfig, ExplorerParams, QueryEnvelope};
pub use error::{ExplorerError, ExplorerResult};
pub use logs::{NormalizedLog, normalize_log};
pub use throttle::{BLOCK_EXPLORER_RATE_LIMIT, HostThrottle, ThrottlePermit};
pub use validation::{ExplorerBlock, ExplorerLogEntry, ExplorerReceipt, ExplorerTransaction};
