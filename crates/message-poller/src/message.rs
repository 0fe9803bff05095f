// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Single-message status session
//!
//! Polls one message by id until it is delivered. Pending and failing
//! messages keep being polled at the same interval, since a failing message
//! can still be delivered once its relayer retries succeed.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use shared_types::Message;
use tracing::debug;

use crate::{
    config::PollerConfig,
    engine::{PollSnapshot, PollTask, PollingEngine},
    error::PollResult,
    query::{
        MessageIdentifierType, MessageQueryBuilder, MessageQueryParser, RequestPolicy,
        StatusQuery, StatusQueryExecutor,
    },
};

/// Records requested per message query
const MESSAGE_QUERY_LIMIT: u32 = 1;

/// Poll task fetching one message by id
pub struct MessagePollTask<E> {
    executor: Arc<E>,
    parser: Arc<dyn MessageQueryParser>,
    message_id: String,
    query: StatusQuery,
    paused: AtomicBool,
}

impl<E> std::fmt::Debug for MessagePollTask<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagePollTask")
            .field("message_id", &self.message_id)
            .field("paused", &self.is_paused_flag())
            .finish_non_exhaustive()
    }
}

impl<E: StatusQueryExecutor> MessagePollTask<E> {
    /// Create a task for `message_id`, building its query once
    pub fn new(
        executor: Arc<E>,
        builder: &dyn MessageQueryBuilder,
        parser: Arc<dyn MessageQueryParser>,
        message_id: impl Into<String>,
    ) -> Self {
        let message_id = message_id.into();
        let query =
            builder.build_message_query(MessageIdentifierType::Id, &message_id, MESSAGE_QUERY_LIMIT);

        Self {
            executor,
            parser,
            message_id,
            query,
            paused: AtomicBool::new(false),
        }
    }

    /// Start the task paused
    #[must_use]
    pub fn paused(self, paused: bool) -> Self {
        self.set_paused(paused);
        self
    }

    /// Suppress or resume queries
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    /// Polled message id
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Query sent on every poll
    pub fn query(&self) -> &StatusQuery {
        &self.query
    }
}

impl<E> MessagePollTask<E> {
    fn is_paused_flag(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }
}

impl<E: StatusQueryExecutor> PollTask for MessagePollTask<E> {
    type Output = Option<Message>;

    const NAME: &'static str = "message";

    async fn run(&self, policy: RequestPolicy) -> PollResult<Option<Message>> {
        let data = self.executor.execute(&self.query, policy).await?;
        let message = self.parser.parse_messages(&data).into_iter().next();

        if let Some(message) = &message {
            debug!(message_id = %self.message_id, status = ?message.status(), "message status");
        }
        Ok(message)
    }

    fn should_stop(&self, output: &Option<Message>) -> bool {
        output.as_ref().is_some_and(Message::is_delivered)
    }

    fn is_paused(&self) -> bool {
        self.is_paused_flag()
    }
}

/// Polling session for one message
pub type MessageSession<E> = PollingEngine<MessagePollTask<E>>;

/// Create an idle session polling `message_id` every configured message interval
pub fn message_session<E: StatusQueryExecutor>(
    executor: Arc<E>,
    builder: &dyn MessageQueryBuilder,
    parser: Arc<dyn MessageQueryParser>,
    message_id: impl Into<String>,
    config: &PollerConfig,
) -> MessageSession<E> {
    PollingEngine::new(
        MessagePollTask::new(executor, builder, parser, message_id),
        config.message_interval(),
    )
}

impl PollSnapshot<Option<Message>> {
    /// Whether the last successful poll found the message
    pub fn is_message_found(&self) -> bool {
        self.message().is_some()
    }

    /// Message found by the last successful poll
    pub fn message(&self) -> Option<&Message> {
        self.result.as_ref().and_then(Option::as_ref)
    }
}
