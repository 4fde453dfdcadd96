//! Validated cache key.
//!
//! A [`TrackKey`] identifies one slot in the most-recent cache (for example
//! a vehicle or vessel id). The only way to obtain one is through
//! validation, so a key that exists is never empty.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors produced when constructing a [`TrackKey`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// The key was empty or contained only whitespace.
    #[error("track key must not be empty")]
    Empty,
}

/// Identifier of a tracked entity; one cache entry exists per key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackKey(String);

impl TrackKey {
    /// Validate and wrap a key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Empty`] if `raw` is empty or all whitespace.
    pub fn new(raw: impl Into<String>) -> Result<Self, KeyError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(KeyError::Empty);
        }
        Ok(Self(raw))
    }

    /// Borrow the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TrackKey {
    type Error = KeyError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl TryFrom<&str> for TrackKey {
    type Error = KeyError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<TrackKey> for String {
    fn from(key: TrackKey) -> Self {
        key.0
    }
}

impl AsRef<str> for TrackKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
