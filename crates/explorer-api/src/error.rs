// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for explorer queries
//!
//! Every variant describes the failure of a single query attempt. None of them
//! are fatal to a caller that polls: the next attempt starts from scratch.

use shared_types::ChainId;
use thiserror::Error;

/// Result type alias for explorer operations
pub type ExplorerResult<T> = Result<T, ExplorerError>;

/// Errors returned by the explorer client
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ExplorerError {
    /// Chain has no explorer URL, or no API key when one was requested
    #[error("Configuration error for chain {chain_id}: {message}")]
    Config { chain_id: ChainId, message: String },

    /// Request could not be sent or the connection failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Explorer answered with a non-success HTTP status
    #[error("Fetch response not okay: {status}")]
    Status { status: u16, body: String },

    /// Explorer did not answer within the configured timeout
    #[error("Request timeout after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    /// Envelope was undecodable or carried an empty result
    #[error("Invalid result format: {body}")]
    InvalidResult { body: String },

    /// Log list payload failed validation
    #[error("Invalid tx logs result: {reason}")]
    MalformedLog { reason: String },

    /// Transaction payload does not describe the requested transaction
    #[error("Invalid tx result: expected {expected}, got {}", actual.as_deref().unwrap_or("nothing"))]
    MalformedTx {
        expected: String,
        actual: Option<String>,
    },

    /// Receipt payload does not describe the requested transaction
    #[error("Invalid tx receipt result: expected {expected}, got {}", actual.as_deref().unwrap_or("nothing"))]
    MalformedReceipt {
        expected: String,
        actual: Option<String>,
    },

    /// Block payload has no positive block number
    #[error("Invalid block result: {reason}")]
    MalformedBlock { reason: String },
}

impl ExplorerError {
    /// Create a configuration error
    pub fn config(chain_id: ChainId, message: impl Into<String>) -> Self {
        Self::Config {
            chain_id,
            message: message.into(),
        }
    }

    /// Create a log validation error
    pub fn malformed_log(reason: impl Into<String>) -> Self {
        Self::MalformedLog {
            reason: reason.into(),
        }
    }

    /// Create a block validation error
    pub fn malformed_block(reason: impl Into<String>) -> Self {
        Self::MalformedBlock {
            reason: reason.into(),
        }
    }

    /// Whether the request never reached a usable HTTP response
    ///
    /// Transport failures are usually transient, so a later attempt may succeed.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::Timeout { .. }
        )
    }

    /// Whether the explorer answered but its payload was rejected
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidResult { .. }
                | Self::MalformedLog { .. }
                | Self::MalformedTx { .. }
                | Self::MalformedReceipt { .. }
                | Self::MalformedBlock { .. }
        )
    }

    /// HTTP status code, when the explorer answered with one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(error) => error.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}
