// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for tracker commands

use explorer_api::{ChainConfigDecodeError, ExplorerError};
use message_poller::PollError;
use thiserror::Error;

/// Errors raised while loading configuration or running a command
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Explorer lookup failed
    #[error(transparent)]
    Explorer(#[from] ExplorerError),

    /// Chain configs passed on the command line could not be decoded
    #[error("Invalid chain configs: {0}")]
    Decode(#[from] ChainConfigDecodeError),

    /// Command output could not be serialized
    #[error("Output serialization failed: {0}")]
    Output(#[from] serde_json::Error),
}

impl From<config::ConfigError> for TrackerError {
    fn from(error: config::ConfigError) -> Self {
        Self::Config {
            message: format!("failed to load configuration: {error}"),
        }
    }
}

impl From<PollError> for TrackerError {
    fn from(error: PollError) -> Self {
        Self::Config {
            message: format!("invalid poller settings: {error}"),
        }
    }
}

/// Result type for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;
