// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Explorer API key wrapper
//!
//! [`ApiKey`] guarantees the key is non-empty by construction and keeps it out
//! of logs: both `Debug` and `Display` print a redacted placeholder. The raw
//! value is only reachable through [`ApiKey::expose`], which the client calls
//! when it appends the `apikey` query parameter.
//!
//! ```rust
//! use explorer_api::ApiKey;
//!
//! let key = ApiKey::new("ABCD1234").expect("non-empty key");
//! assert_eq!(key.expose(), "ABCD1234");
//! assert_eq!(format!("{key:?}"), "ApiKey(***)");
//!
//! assert!(ApiKey::new("   ").is_err());
//! ```

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, de};

/// Placeholder printed instead of a key
pub(crate) const REDACTED: &str = "***";

/// A non-empty explorer API key with redacted formatting
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(Box<str>);

impl ApiKey {
    /// Create a new `ApiKey`, trimming surrounding whitespace
    ///
    /// # Errors
    ///
    /// Returns an error message if the key is empty or whitespace-only
    pub fn new(key: impl Into<String>) -> Result<Self, String> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err("API key cannot be empty".to_string());
        }
        Ok(Self(trimmed.into()))
    }

    /// The raw key, for building authenticated requests only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({REDACTED})")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl FromStr for ApiKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for ApiKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(de::Error::custom)
    }
}
