// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Message status polling
//!
//! This crate keeps message status views fresh by re-running status queries on
//! a timer until the watched message reaches a final state, or for as long as
//! a listing is being watched.
//!
//! # Architecture
//!
//! - **Engine**: [`engine::PollingEngine`] - start/stop lifecycle, interval ticks, out-of-order result guard
//! - **Sessions**: [`message`] and [`search`] - stop and pause policies for single messages and listings
//! - **Queries**: [`query`] - query builder, parser and executor seams
//! - **Executor**: [`graphql::GraphqlExecutor`] - status-service client with a result cache
//!
//! # Features
//!
//! - **Cache Bypass**: every scheduled tick fetches with [`RequestPolicy::NetworkOnly`]
//! - **Latest Result Wins**: a slow response never overwrites a newer one
//! - **Clean Teardown**: stopping is idempotent and discards in-flight results

pub mod config;
pub mod engine;
pub mod error;
pub mod graphql;
pub mod message;
pub mod query;
pub mod search;

#[cfg(test)]
mod test_support;

pub use config::{
    LATEST_QUERY_LIMIT, MSG_AUTO_REFRESH_DELAY, PollerConfig, SEARCH_AUTO_REFRESH_DELAY,
    SEARCH_QUERY_LIMIT,
};
pub use engine::{PollSnapshot, PollTask, PollingEngine, SessionState};
pub use error::{PollError, PollResult};
pub use graphql::{GraphqlConfig, GraphqlExecutor};
pub use message::{MessagePollTask, MessageSession, message_session};
pub use query::{
    MessageIdentifierType, MessageQueryBuilder, MessageQueryParser, RequestPolicy, SearchFilter,
    StatusQuery, StatusQueryExecutor,
};
pub use search::{
    SearchPollTask, SearchSession, is_valid_search_query, sanitize_search_input, search_session,
};
