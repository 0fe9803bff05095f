// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! GraphQL status-service executor
//!
//! Posts status queries to the message status service and keeps the last
//! result of every query in memory. [`RequestPolicy::CacheFirst`] answers from
//! that cache when it holds a fresh entry; [`RequestPolicy::NetworkOnly`]
//! always goes to the network and refreshes the cached entry.
//!
//! Entries expire after `cache_ttl_seconds`. Once `cache_max_entries` is
//! reached, expired entries are dropped first and then the oldest one.

use std::time::Duration;

use dashmap::DashMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::{Instant, timeout};
use tracing::{debug, trace, warn};
use url::Url;

use crate::{
    error::{PollError, PollResult},
    query::{RequestPolicy, StatusQuery, StatusQueryExecutor},
};

const DEFAULT_STATUS_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;
const DEFAULT_CACHE_MAX_ENTRIES: usize = 1000;
const USER_AGENT: &str = concat!("message-tracker/", env!("CARGO_PKG_VERSION"));

/// Configuration for the status-service executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphqlConfig {
    /// GraphQL endpoint
    pub endpoint: Url,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// How long a cached result may answer cache-first queries
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    /// Maximum number of cached query results
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_STATUS_TIMEOUT_SECONDS
}

fn default_cache_ttl_seconds() -> u64 {
    DEFAULT_CACHE_TTL_SECONDS
}

fn default_cache_max_entries() -> usize {
    DEFAULT_CACHE_MAX_ENTRIES
}

impl GraphqlConfig {
    /// Configuration for `endpoint` with default timeout and cache bounds
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            timeout_seconds: DEFAULT_STATUS_TIMEOUT_SECONDS,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }

    /// Lifetime of a cached result
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone)]
struct CachedResult {
    data: Value,
    fetched_at: Instant,
}

impl CachedResult {
    fn is_valid(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Status-service client with an in-memory result cache
#[derive(Debug)]
pub struct GraphqlExecutor {
    http: Client,
    config: GraphqlConfig,
    cache: DashMap<String, CachedResult>,
}

impl GraphqlExecutor {
    /// Create a new executor
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created
    pub fn new(config: GraphqlConfig) -> PollResult<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            config,
            cache: DashMap::new(),
        })
    }

    /// Number of queries with a cached result
    pub fn cached_queries(&self) -> usize {
        self.cache.len()
    }

    /// Age of the cached result for `query`
    pub fn cached_age(&self, query: &StatusQuery) -> Option<Duration> {
        self.cache
            .get(&query.cache_key())
            .map(|cached| cached.fetched_at.elapsed())
    }

    /// Drop every cached result
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Fresh cached result for `key`, dropping it if it has expired
    fn cached(&self, key: &str) -> Option<Value> {
        let ttl = self.config.cache_ttl();
        let cached = self.cache.get(key)?;
        if cached.is_valid(ttl) {
            return Some(cached.data.clone());
        }
        drop(cached);

        self.cache.remove_if(key, |_, cached| !cached.is_valid(ttl));
        trace!("expired status query removed from cache");
        None
    }

    fn store(&self, key: String, data: Value) {
        if !self.cache.contains_key(&key) && self.cache.len() >= self.config.cache_max_entries {
            let ttl = self.config.cache_ttl();
            self.cache.retain(|_, cached| cached.is_valid(ttl));
            if self.cache.len() >= self.config.cache_max_entries {
                self.evict_oldest();
            }
        }

        self.cache.insert(
            key,
            CachedResult {
                data,
                fetched_at: Instant::now(),
            },
        );
    }

    fn evict_oldest(&self) {
        let oldest = self
            .cache
            .iter()
            .min_by_key(|entry| entry.fetched_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            self.cache.remove(&key);
            debug!(entries = self.cache.len(), "evicted oldest status query from cache");
        }
    }

    /// Post `query`, bounding the whole exchange by the configured timeout
    async fn fetch(&self, query: &StatusQuery) -> PollResult<Value> {
        let timeout_seconds = self.config.timeout_seconds;
        timeout(Duration::from_secs(timeout_seconds), self.send(query))
            .await
            .map_err(|_| PollError::Timeout { timeout_seconds })?
    }

    async fn send(&self, query: &StatusQuery) -> PollResult<Value> {
        let response = self
            .http
            .post(self.config.endpoint.clone())
            .json(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(status = status.as_u16(), "status query failed");
            return Err(PollError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: GraphqlResponse = response.json().await?;
        if !response.errors.is_empty() {
            let messages: Vec<&str> = response
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect();
            return Err(PollError::query(messages.join("; ")));
        }

        match response.data {
            Some(data) if !data.is_null() => Ok(data),
            _ => Err(PollError::query("response has no data")),
        }
    }
}

impl StatusQueryExecutor for GraphqlExecutor {
    async fn execute(&self, query: &StatusQuery, policy: RequestPolicy) -> PollResult<Value> {
        let key = query.cache_key();

        if policy == RequestPolicy::CacheFirst
            && let Some(data) = self.cached(&key)
        {
            trace!("serving status query from cache");
            return Ok(data);
        }

        debug!(%policy, "fetching status query");
        let data = self.fetch(query).await?;
        self.store(key, data.clone());
        Ok(data)
    }
}
