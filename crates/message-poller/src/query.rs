// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Status query types and collaborator traits
//!
//! Sessions do not know the status service's schema. A [`MessageQueryBuilder`]
//! turns an identifier or a search filter into a [`StatusQuery`], a
//! [`StatusQueryExecutor`] runs it, and a [`MessageQueryParser`] turns the
//! returned `data` into messages.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{ChainId, Message, MessageStub};

use crate::error::PollResult;

/// Cache behavior requested for one query execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestPolicy {
    /// Serve a cached result when one exists, otherwise fetch
    #[default]
    CacheFirst,
    /// Always fetch, refreshing the cache
    NetworkOnly,
}

impl fmt::Display for RequestPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CacheFirst => f.write_str("cache-first"),
            Self::NetworkOnly => f.write_str("network-only"),
        }
    }
}

/// Which field a message identifier refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageIdentifierType {
    /// Message id
    Id,
    /// Origin or destination transaction hash
    TxHash,
}

/// Query document and variables for the status service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusQuery {
    /// GraphQL document
    pub query: String,
    /// Query variables, usually an object
    #[serde(default)]
    pub variables: Value,
}

impl StatusQuery {
    /// Create a query
    pub fn new(query: impl Into<String>, variables: Value) -> Self {
        Self {
            query: query.into(),
            variables,
        }
    }

    /// Key identifying this query and its variables in a result cache
    pub fn cache_key(&self) -> String {
        format!("{}\u{1f}{}", self.query, self.variables)
    }
}

/// Search and filter inputs of a listing session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Sanitized free-text input; empty for the latest-messages view
    pub input: String,
    /// Only messages sent from this chain
    pub origin_chain: Option<ChainId>,
    /// Only messages sent to this chain
    pub destination_chain: Option<ChainId>,
    /// Only messages sent at or after this time
    pub start_time: Option<DateTime<Utc>>,
    /// Only messages sent at or before this time
    pub end_time: Option<DateTime<Utc>>,
}

impl SearchFilter {
    /// Filter on free-text input only
    pub fn with_input(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    /// Whether there is no search input
    pub fn has_input(&self) -> bool {
        !self.input.is_empty()
    }
}

/// Builds status-service queries
#[cfg_attr(test, mockall::automock)]
pub trait MessageQueryBuilder: Send + Sync {
    /// Query for messages matching one identifier
    fn build_message_query(
        &self,
        id_type: MessageIdentifierType,
        value: &str,
        limit: u32,
    ) -> StatusQuery;

    /// Query for a message listing; `use_stub` selects the lighter stub fields
    fn build_search_query(&self, filter: &SearchFilter, limit: u32, use_stub: bool) -> StatusQuery;
}

/// Parses status-service results
///
/// Parsing is lenient: missing or unexpected data yields an empty list.
#[cfg_attr(test, mockall::automock)]
pub trait MessageQueryParser: Send + Sync {
    /// Full messages from a message query result
    fn parse_messages(&self, data: &Value) -> Vec<Message>;

    /// Message stubs from a search query result
    fn parse_message_stubs(&self, data: &Value) -> Vec<MessageStub>;
}

/// Runs status queries
pub trait StatusQueryExecutor: Send + Sync + 'static {
    /// Execute `query` and return its `data` object
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service reports query errors
    fn execute(
        &self,
        query: &StatusQuery,
        policy: RequestPolicy,
    ) -> impl Future<Output = PollResult<Value>> + Send;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn cache_key_includes_variables() {
        let a = StatusQuery::new("query Q($id: String)", json!({ "id": "0x1" }));
        let b = StatusQuery::new("query Q($id: String)", json!({ "id": "0x2" }));

        assert_ne!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), a.clone().cache_key());
    }

    #[test]
    fn request_policy_names() {
        assert_eq!(RequestPolicy::default(), RequestPolicy::CacheFirst);
        assert_eq!(RequestPolicy::NetworkOnly.to_string(), "network-only");
        assert_eq!(
            serde_json::to_value(RequestPolicy::CacheFirst).unwrap(),
            json!("cache-first")
        );
    }

    #[test]
    fn search_filter_input() {
        assert!(!SearchFilter::default().has_input());
        assert!(SearchFilter::with_input("0xabc").has_input());
    }
}
