// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared types for the message tracker
//!
//! This crate provides the chain identifiers and message delivery data model
//! used by both the explorer client and the status poller, avoiding circular
//! dependencies between them.

pub mod chains;
pub mod message;

pub use chains::{ChainId, ChainIdParseError, Environment, EnvironmentParseError};
pub use message::{
    Message, MessageDebugStatus, MessageDeliveryStatus, MessageStatus, MessageStub, MessageTx,
};
