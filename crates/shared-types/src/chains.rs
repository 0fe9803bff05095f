// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Chain identifiers and deployment environments
//!
//! Chains are identified by their numeric EVM chain id. Unlike a fixed list of
//! supported networks, the set of chains is driven by configuration, so
//! [`ChainId`] accepts any value and leaves support decisions to the chain
//! config lookup.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Numeric blockchain chain identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(u64);

impl ChainId {
    /// Ethereum Mainnet
    pub const ETHEREUM: Self = Self(1);
    /// Polygon PoS
    pub const POLYGON: Self = Self(137);
    /// Arbitrum One
    pub const ARBITRUM: Self = Self(42161);

    /// Create a chain id from its numeric value
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the numeric chain ID
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChainId {
    type Err = ChainIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ChainIdParseError::InvalidId(s.to_string()))
    }
}

/// Error type for chain ID parsing
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChainIdParseError {
    /// Value is not a decimal chain id
    #[error("invalid chain ID: {0}")]
    InvalidId(String),
}

/// Deployment environment the tracker reads message data from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Production networks
    #[default]
    Mainnet,
    /// Test networks
    Testnet,
}

impl Environment {
    /// All known environments
    pub const fn all() -> &'static [Self] {
        &[Self::Mainnet, Self::Testnet]
    }

    /// Lowercase name used in config files and query strings
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = EnvironmentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|env| env.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EnvironmentParseError(s.to_string()))
    }
}

/// Returned when a string names no known environment
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown environment: {0}")]
pub struct EnvironmentParseError(String);
