// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for message status polling

use thiserror::Error;

/// Result type for polling operations
pub type PollResult<T> = Result<T, PollError>;

/// Errors from one status query attempt or from session control
#[derive(Debug, Error)]
pub enum PollError {
    /// HTTP request to the status service failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Status service answered with a non-success status
    #[error("Status service responded with {status}: {body}")]
    Status { status: u16, body: String },

    /// Status service did not answer in time
    #[error("Request timeout after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    /// Query was rejected or returned no data
    #[error("Query failed: {0}")]
    Query(String),

    /// Poller settings are unusable
    #[error("Invalid poller configuration: {0}")]
    Config(String),

    /// Session was started twice
    #[error("Polling session already started")]
    AlreadyStarted,
}

impl PollError {
    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Whether a later attempt may succeed without any change on the caller's side
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::Timeout { .. }
        )
    }
}
