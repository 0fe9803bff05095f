// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Message search and latest-messages session
//!
//! With empty input the session lists the latest messages; otherwise the
//! input must be a transaction hash, or an address when address search is
//! enabled. Invalid input pauses the session so no doomed query is sent.
//! Listings never reach a final state, so the session polls until stopped.
//! A changed input or filter needs a new session.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use shared_types::MessageStub;
use tracing::debug;

use crate::{
    config::PollerConfig,
    engine::{PollSnapshot, PollTask, PollingEngine},
    error::PollResult,
    query::{
        MessageQueryBuilder, MessageQueryParser, RequestPolicy, SearchFilter, StatusQuery,
        StatusQueryExecutor,
    },
};

static TX_HASH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[0-9a-fA-F]{64}$").expect("tx hash regex is valid"));

static ADDRESS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("address regex is valid"));

/// Normalize raw search input
pub fn sanitize_search_input(input: &str) -> String {
    input.trim().to_owned()
}

/// Whether `input` is a transaction hash, or an address if `allow_address` is set
pub fn is_valid_search_query(input: &str, allow_address: bool) -> bool {
    if input.is_empty() {
        return false;
    }
    TX_HASH_REGEX.is_match(input) || (allow_address && ADDRESS_REGEX.is_match(input))
}

/// Poll task fetching a message listing
pub struct SearchPollTask<E> {
    executor: Arc<E>,
    parser: Arc<dyn MessageQueryParser>,
    filter: SearchFilter,
    query: StatusQuery,
    limit: u32,
    is_valid_input: bool,
}

impl<E> std::fmt::Debug for SearchPollTask<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchPollTask")
            .field("filter", &self.filter)
            .field("limit", &self.limit)
            .field("is_valid_input", &self.is_valid_input)
            .finish_non_exhaustive()
    }
}

impl<E: StatusQueryExecutor> SearchPollTask<E> {
    /// Create a task for `filter`, sanitizing its input and building its query once
    pub fn new(
        executor: Arc<E>,
        builder: &dyn MessageQueryBuilder,
        parser: Arc<dyn MessageQueryParser>,
        filter: SearchFilter,
        config: &PollerConfig,
    ) -> Self {
        let filter = SearchFilter {
            input: sanitize_search_input(&filter.input),
            ..filter
        };

        let has_input = filter.has_input();
        let is_valid_input =
            !has_input || is_valid_search_query(&filter.input, config.allow_address_search);
        let limit = if has_input {
            config.search_query_limit
        } else {
            config.latest_query_limit
        };
        let query = builder.build_search_query(&filter, limit, true);

        if !is_valid_input {
            debug!(input = %filter.input, "invalid search input, session paused");
        }

        Self {
            executor,
            parser,
            filter,
            query,
            limit,
            is_valid_input,
        }
    }

    /// Sanitized filter
    pub fn filter(&self) -> &SearchFilter {
        &self.filter
    }

    /// Row limit of the query
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Whether the input can be queried
    pub fn is_valid_input(&self) -> bool {
        self.is_valid_input
    }

    /// Query sent on every poll
    pub fn query(&self) -> &StatusQuery {
        &self.query
    }
}

impl<E: StatusQueryExecutor> PollTask for SearchPollTask<E> {
    type Output = Vec<MessageStub>;

    const NAME: &'static str = "search";

    async fn run(&self, policy: RequestPolicy) -> PollResult<Vec<MessageStub>> {
        let data = self.executor.execute(&self.query, policy).await?;
        Ok(self.parser.parse_message_stubs(&data))
    }

    fn is_paused(&self) -> bool {
        !self.is_valid_input
    }
}

/// Polling session for a message listing
pub type SearchSession<E> = PollingEngine<SearchPollTask<E>>;

/// Create an idle session polling `filter` every configured search interval
pub fn search_session<E: StatusQueryExecutor>(
    executor: Arc<E>,
    builder: &dyn MessageQueryBuilder,
    parser: Arc<dyn MessageQueryParser>,
    filter: SearchFilter,
    config: &PollerConfig,
) -> SearchSession<E> {
    PollingEngine::new(
        SearchPollTask::new(executor, builder, parser, filter, config),
        config.search_interval(),
    )
}

impl PollSnapshot<Vec<MessageStub>> {
    /// Whether the last successful poll returned any message
    pub fn is_messages_found(&self) -> bool {
        !self.messages().is_empty()
    }

    /// Messages returned by the last successful poll
    pub fn messages(&self) -> &[MessageStub] {
        self.result.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockall::predicate::{always, eq, function};
    use serde_json::json;
    use shared_types::{ChainId, MessageStatus};
    use tokio::time::sleep;

    use super::*;
    use crate::{
        query::MockMessageQueryBuilder,
        test_support::{JsonParser, ScriptedExecutor, stub},
    };

    const TX_HASH: &str = "0x0948a5377b757038b3f1a9948b8b5b2e5370c4d0801e68e005eb598048393d68";
    const ADDRESS: &str = "0xd4c1905bb1d26bc93dac913e13cacc278cdcc80d";

    fn builder_expecting(limit: u32) -> MockMessageQueryBuilder {
        let mut builder = MockMessageQueryBuilder::new();
        builder
            .expect_build_search_query()
            .with(always(), eq(limit), eq(true))
            .times(1)
            .returning(|filter, limit, _| {
                StatusQuery::new(
                    "query Search",
                    json!({ "search": filter.input, "limit": limit }),
                )
            });
        builder
    }

    fn session(
        executor: &Arc<ScriptedExecutor>,
        filter: SearchFilter,
        limit: u32,
    ) -> SearchSession<ScriptedExecutor> {
        search_session(
            Arc::clone(executor),
            &builder_expecting(limit),
            Arc::new(JsonParser),
            filter,
            &PollerConfig::default(),
        )
    }

    #[test]
    fn search_query_validation() {
        assert!(is_valid_search_query(TX_HASH, false));
        assert!(is_valid_search_query(&TX_HASH.to_uppercase().replacen("0X", "0x", 1), false));
        assert!(is_valid_search_query(ADDRESS, true));
        assert!(!is_valid_search_query(ADDRESS, false));
        assert!(!is_valid_search_query("", true));
        assert!(!is_valid_search_query("0xnonhex", true));
        assert!(!is_valid_search_query(&TX_HASH[2..], true));
        assert!(!is_valid_search_query(&format!("{TX_HASH}00"), true));
    }

    #[test]
    fn input_is_trimmed() {
        assert_eq!(sanitize_search_input(&format!("  {ADDRESS}\n")), ADDRESS);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_input_never_queries() {
        let executor = ScriptedExecutor::new(vec![]);
        let session = session(&executor, SearchFilter::with_input("0xnonhex"), 50);
        assert!(!session.task().is_valid_input());

        session.start().unwrap();
        sleep(Duration::from_secs(120)).await;

        assert_eq!(executor.call_count(), 0);
        let snapshot = session.snapshot();
        assert!(!snapshot.has_run);
        assert_eq!(snapshot.ticks_started, 0);
        assert!(snapshot.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn latest_view_polls_forever() {
        let executor = ScriptedExecutor::new(vec![
            Ok(json!({ "messages": [stub("0x01", MessageStatus::Delivered)] })),
            Ok(json!({ "messages": [
                stub("0x02", MessageStatus::Pending),
                stub("0x01", MessageStatus::Delivered),
            ] })),
        ]);
        let session = session(&executor, SearchFilter::default(), 12);
        assert_eq!(session.interval(), Duration::from_secs(15));
        assert_eq!(session.task().limit(), 12);

        session.start().unwrap();
        sleep(Duration::from_millis(1)).await;
        assert_eq!(session.snapshot().messages().len(), 1);

        sleep(Duration::from_secs(15)).await;
        let snapshot = session.snapshot();
        assert!(snapshot.is_messages_found());
        assert_eq!(snapshot.messages()[0].id, "0x02");

        // Empty listings keep the session alive too
        sleep(Duration::from_secs(60)).await;
        assert_eq!(executor.call_count(), 6);
        assert!(session.snapshot().is_active());
        assert!(!session.snapshot().is_messages_found());
    }

    #[tokio::test(start_paused = true)]
    async fn search_input_uses_search_limit() {
        let executor = ScriptedExecutor::new(vec![]);
        let filter = SearchFilter {
            input: format!(" {TX_HASH} "),
            origin_chain: Some(ChainId::ETHEREUM),
            ..SearchFilter::default()
        };
        let session = session(&executor, filter, 50);

        session.start().unwrap();
        sleep(Duration::from_millis(1)).await;

        let calls = executor.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.variables["search"], json!(TX_HASH));
        assert_eq!(calls[0].1, RequestPolicy::CacheFirst);
    }

    #[test]
    fn address_search_can_be_disabled() {
        let config = PollerConfig {
            allow_address_search: false,
            ..PollerConfig::default()
        };
        let mut builder = MockMessageQueryBuilder::new();
        builder
            .expect_build_search_query()
            .with(
                function(|filter: &SearchFilter| filter.input == ADDRESS),
                eq(config.search_query_limit),
                always(),
            )
            .returning(|_, _, _| StatusQuery::new("query Search", json!({})));

        let task = SearchPollTask::new(
            ScriptedExecutor::new(vec![]),
            &builder,
            Arc::new(JsonParser),
            SearchFilter::with_input(ADDRESS),
            &config,
        );
        assert!(!task.is_valid_input());
        assert!(task.is_paused());
    }
}
