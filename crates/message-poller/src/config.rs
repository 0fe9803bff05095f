// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Poller configuration
//!
//! Refresh intervals and query limits for the message and search sessions.
//! Defaults match what the explorer UI uses; all values can be overridden from
//! the tracker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PollError, PollResult};

/// Refresh interval of a single-message session
pub const MSG_AUTO_REFRESH_DELAY: Duration = Duration::from_millis(10_000);

/// Refresh interval of a search or latest-messages session
pub const SEARCH_AUTO_REFRESH_DELAY: Duration = Duration::from_millis(15_000);

/// Row limit of the unfiltered latest-messages view
pub const LATEST_QUERY_LIMIT: u32 = 12;

/// Row limit of a search or filter view
pub const SEARCH_QUERY_LIMIT: u32 = 50;

/// Settings shared by all polling sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Single-message refresh interval in milliseconds
    pub message_interval_ms: u64,
    /// Search refresh interval in milliseconds
    pub search_interval_ms: u64,
    /// Row limit when no search input is given
    pub latest_query_limit: u32,
    /// Row limit when searching or filtering
    pub search_query_limit: u32,
    /// Whether an address counts as valid search input
    pub allow_address_search: bool,
}

impl Default for PollerConfig {
    #[allow(clippy::cast_possible_truncation)]
    fn default() -> Self {
        Self {
            message_interval_ms: MSG_AUTO_REFRESH_DELAY.as_millis() as u64,
            search_interval_ms: SEARCH_AUTO_REFRESH_DELAY.as_millis() as u64,
            latest_query_limit: LATEST_QUERY_LIMIT,
            search_query_limit: SEARCH_QUERY_LIMIT,
            allow_address_search: true,
        }
    }
}

impl PollerConfig {
    /// Check that intervals and limits are usable
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Config`] if an interval or a limit is zero
    pub fn validate(&self) -> PollResult<()> {
        let zero = [
            ("message_interval_ms", self.message_interval_ms == 0),
            ("search_interval_ms", self.search_interval_ms == 0),
            ("latest_query_limit", self.latest_query_limit == 0),
            ("search_query_limit", self.search_query_limit == 0),
        ];

        match zero.iter().find(|(_, is_zero)| *is_zero) {
            Some((field, _)) => Err(PollError::Config(format!(
                "{field} must be greater than 0"
            ))),
            None => Ok(()),
        }
    }

    /// Single-message refresh interval
    pub fn message_interval(&self) -> Duration {
        Duration::from_millis(self.message_interval_ms)
    }

    /// Search refresh interval
    pub fn search_interval(&self) -> Duration {
        Duration::from_millis(self.search_interval_ms)
    }
}
