// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Fakes shared by the session tests

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use serde_json::{Value, json};
use shared_types::{ChainId, Message, MessageStatus, MessageStub, MessageTx};

use crate::{
    error::PollResult,
    query::{MessageQueryParser, RequestPolicy, StatusQuery, StatusQueryExecutor},
};

/// Executor answering from a script, then with `data` of `{"messages": []}`
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    pub calls: Mutex<Vec<(StatusQuery, RequestPolicy)>>,
    responses: Mutex<VecDeque<PollResult<Value>>>,
}

impl ScriptedExecutor {
    pub fn new(responses: Vec<PollResult<Value>>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::default(),
            responses: Mutex::new(responses.into()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn policies(&self) -> Vec<RequestPolicy> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, policy)| *policy)
            .collect()
    }
}

impl StatusQueryExecutor for ScriptedExecutor {
    async fn execute(&self, query: &StatusQuery, policy: RequestPolicy) -> PollResult<Value> {
        self.calls.lock().unwrap().push((query.clone(), policy));
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(json!({ "messages": [] })))
    }
}

/// Parser reading serde-shaped records from `data.messages`
#[derive(Debug, Default)]
pub struct JsonParser;

impl MessageQueryParser for JsonParser {
    fn parse_messages(&self, data: &Value) -> Vec<Message> {
        serde_json::from_value(data["messages"].clone()).unwrap_or_default()
    }

    fn parse_message_stubs(&self, data: &Value) -> Vec<MessageStub> {
        serde_json::from_value(data["messages"].clone()).unwrap_or_default()
    }
}

pub fn stub(id: &str, status: MessageStatus) -> MessageStub {
    MessageStub {
        id: id.to_string(),
        status,
        sender: "0x4bbeeb066ed09b7aed07bf39eee0460dfa261520".to_string(),
        recipient: "0xd4c1905bb1d26bc93dac913e13cacc278cdcc80d".to_string(),
        origin_chain_id: ChainId::ETHEREUM,
        destination_chain_id: ChainId::POLYGON,
        origin_transaction: MessageTx {
            timestamp: 1_700_000_000_000,
            hash: "0xabc".to_string(),
            from: "0x4bbeeb066ed09b7aed07bf39eee0460dfa261520".to_string(),
            to: "0xc005dc82818d67af737725bd4bf75435d065d239".to_string(),
            block_number: 100,
        },
        destination_transaction: None,
    }
}

pub fn message(id: &str, status: MessageStatus) -> Message {
    Message {
        stub: stub(id, status),
        body: "0x48656c6c6f".to_string(),
        nonce: 7,
    }
}

/// Status-service `data` carrying one message
pub fn message_data(id: &str, status: MessageStatus) -> Value {
    json!({ "messages": [message(id, status)] })
}
