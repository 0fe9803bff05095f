// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Message tracker command line tool
//!
//! Looks up the raw chain data behind cross-chain messages on block
//! explorers, for when the message indexer is behind or a message needs a
//! closer look.
//!
//! # Module Structure
//!
//! - [`config`]: Layered configuration with the `config` crate (files, then environment)
//! - [`cli`]: Command definitions and their execution against the explorer client
//! - [`error`]: Error types shared by configuration loading and commands
//!
//! # Key Features
//!
//! - **Validated Output**: explorer payloads are schema-checked before they are printed
//! - **Polite by Default**: keyless lookups are spaced per explorer host
//! - **Runtime Chains**: extra chains can be passed as an encoded config payload

pub mod cli;
pub mod config;
pub mod error;

pub use cli::{Cli, Command, LogsArgs};
pub use config::{ChainEntry, TrackerConfig};
pub use error::{TrackerError, TrackerResult};
