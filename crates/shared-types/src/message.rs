// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Cross-chain message and delivery status types

use serde::{Deserialize, Serialize};

use crate::ChainId;

/// Delivery state of a cross-chain message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Dispatched on the origin chain, not yet processed on the destination
    Pending,
    /// Processed on the destination chain
    Delivered,
    /// Delivery attempts are failing; the reason may change as relayers retry
    Failing,
}

impl MessageStatus {
    /// Whether no further status change is expected
    ///
    /// Only delivery is terminal; a failing message can still be delivered.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Transaction that dispatched or processed a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTx {
    /// Block timestamp in milliseconds
    pub timestamp: u64,
    /// Transaction hash
    pub hash: String,
    /// Sender of the transaction
    pub from: String,
    /// Recipient of the transaction
    pub to: String,
    /// Block the transaction was included in
    pub block_number: u64,
}

/// Summary record returned by listing and search queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStub {
    /// Message id
    pub id: String,
    /// Current delivery status
    pub status: MessageStatus,
    /// Sender address on the origin chain
    pub sender: String,
    /// Recipient address on the destination chain
    pub recipient: String,
    /// Chain the message was dispatched from
    pub origin_chain_id: ChainId,
    /// Chain the message is addressed to
    pub destination_chain_id: ChainId,
    /// Dispatch transaction
    pub origin_transaction: MessageTx,
    /// Process transaction, once delivered
    #[serde(default)]
    pub destination_transaction: Option<MessageTx>,
}

/// Full message record returned by single-message queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Fields shared with the listing representation
    #[serde(flatten)]
    pub stub: MessageStub,
    /// Hex encoded message body
    pub body: String,
    /// Message nonce on the origin mailbox
    #[serde(default)]
    pub nonce: u64,
}

impl Message {
    /// Current delivery status
    pub fn status(&self) -> MessageStatus {
        self.stub.status
    }

    /// Whether the message reached the terminal delivered state
    pub fn is_delivered(&self) -> bool {
        self.stub.status.is_terminal()
    }
}

/// Reason reported by the debugger for a message that is failing to deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageDebugStatus {
    /// No problem detected, delivery is likely just delayed
    NoErrorsFound,
    /// Recipient address has no contract code
    RecipientNotContract,
    /// Recipient does not implement the message handler
    RecipientNotHandler,
    /// Recipient's interchain security module could not be resolved
    IsmNotFound,
    /// Multisig security module has no validators configured
    MultisigIsmEmpty,
    /// Handler call reverted
    HandleCallFailure,
    /// Not enough interchain gas was paid for delivery
    GasUnderfunded,
}

/// Outcome of checking a message's delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum MessageDeliveryStatus {
    /// Message was processed on the destination chain
    #[serde(rename_all = "camelCase")]
    Delivered {
        /// Transaction that processed the message
        delivery_transaction: MessageTx,
    },
    /// Message is not delivered and a likely cause was found
    #[serde(rename_all = "camelCase")]
    Failing {
        /// Classified reason
        debug_status: MessageDebugStatus,
        /// Human readable details
        debug_details: String,
    },
    /// Message is not delivered yet
    Pending,
}

impl MessageDeliveryStatus {
    /// Status tag of this result
    pub fn status(&self) -> MessageStatus {
        match self {
            Self::Delivered { .. } => MessageStatus::Delivered,
            Self::Failing { .. } => MessageStatus::Failing,
            Self::Pending => MessageStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn tx() -> MessageTx {
        MessageTx {
            timestamp: 1_700_000_000_000,
            hash: "0x0948a5377b757038b3f1a9948b8b5b2e5370c4d0801e68e005eb598048393d68".to_string(),
            from: "0x0000000000000000000000000000000000000000".to_string(),
            to: "0x0000000000000000000000000000000000000000".to_string(),
            block_number: 123_456_789,
        }
    }

    #[test]
    fn only_delivered_is_terminal() {
        assert!(MessageStatus::Delivered.is_terminal());
        assert!(!MessageStatus::Pending.is_terminal());
        assert!(!MessageStatus::Failing.is_terminal());
    }

    #[test]
    fn delivery_status_tagging() {
        let delivered = MessageDeliveryStatus::Delivered {
            delivery_transaction: tx(),
        };
        assert_eq!(delivered.status(), MessageStatus::Delivered);

        let value = serde_json::to_value(&delivered).unwrap();
        assert_eq!(value["status"], "delivered");
        assert_eq!(value["deliveryTransaction"]["blockNumber"], 123_456_789);

        let failing: MessageDeliveryStatus = serde_json::from_value(json!({
            "status": "failing",
            "debugStatus": "gasUnderfunded",
            "debugDetails": "paid 0 of 150000 gas"
        }))
        .unwrap();
        assert_eq!(failing.status(), MessageStatus::Failing);

        let pending: MessageDeliveryStatus =
            serde_json::from_value(json!({ "status": "pending" })).unwrap();
        assert_eq!(pending, MessageDeliveryStatus::Pending);
    }

    #[test]
    fn message_flattens_stub_fields() {
        let message: Message = serde_json::from_value(json!({
            "id": "0xabc",
            "status": "pending",
            "sender": "0x01",
            "recipient": "0x02",
            "originChainId": 1,
            "destinationChainId": 42161,
            "originTransaction": serde_json::to_value(tx()).unwrap(),
            "body": "0x"
        }))
        .unwrap();

        assert_eq!(message.status(), MessageStatus::Pending);
        assert!(!message.is_delivered());
        assert_eq!(message.stub.destination_chain_id, ChainId::ARBITRUM);
        assert!(message.stub.destination_transaction.is_none());
        assert_eq!(message.nonce, 0);
    }
}
