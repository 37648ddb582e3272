//! History fingerprint
//!
//! Folds a board's initial title and its ordered action history into one
//! digest:
//!
//! ```text
//! head_0 = H(title)
//! head_i = H(head_{i-1} ++ canonical_json(action_i))
//! ```
//!
//! `H` is BLAKE3 (32-byte output). Two parties holding the same history
//! compute the same head; any difference in title, order, length or content
//! of the history yields a different head.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::action::Action;

#[derive(Debug, Error, PartialEq)]
pub enum FingerprintError {
    #[error("Invalid fingerprint: expected 64 hex characters, got '{0}'")]
    InvalidHex(String),
}

/// A history digest, hex-encoded on the wire
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint([u8; blake3::OUT_LEN]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; blake3::OUT_LEN] {
        &self.0
    }

    /// First 12 hex characters, for display
    pub fn short(&self) -> String {
        let mut hex = self.to_string();
        hex.truncate(12);
        hex
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", blake3::Hash::from(self.0).to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        blake3::Hash::from_hex(s.trim())
            .map(|hash| Self(*hash.as_bytes()))
            .map_err(|_| FingerprintError::InvalidHex(s.to_string()))
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = FingerprintError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.to_string()
    }
}

/// Incremental fingerprint over a growing history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashChain {
    head: Fingerprint,
    len: usize,
}

impl HashChain {
    /// Starts a chain for a board with the given initial title
    pub fn new(initial_title: &str) -> Self {
        Self {
            head: Fingerprint(*blake3::hash(initial_title.as_bytes()).as_bytes()),
            len: 0,
        }
    }

    /// Builds the chain for a whole history
    pub fn over<'a>(
        initial_title: &str,
        actions: impl IntoIterator<Item = &'a Action>,
    ) -> serde_json::Result<Self> {
        let mut chain = Self::new(initial_title);
        for action in actions {
            chain.push(action)?;
        }
        Ok(chain)
    }

    /// Folds the next action into the chain
    pub fn push(&mut self, action: &Action) -> serde_json::Result<()> {
        let encoded = action.canonical_json()?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(self.head.as_bytes());
        hasher.update(&encoded);
        self.head = Fingerprint(*hasher.finalize().as_bytes());
        self.len += 1;

        Ok(())
    }

    /// Returns the chain extended by one action, leaving `self` as is
    pub fn with(&self, action: &Action) -> serde_json::Result<Self> {
        let mut next = self.clone();
        next.push(action)?;
        Ok(next)
    }

    /// Current digest
    pub fn head(&self) -> Fingerprint {
        self.head
    }

    /// Number of actions folded so far
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Fingerprint of a full history
pub fn fingerprint<'a>(
    initial_title: &str,
    actions: impl IntoIterator<Item = &'a Action>,
) -> serde_json::Result<Fingerprint> {
    HashChain::over(initial_title, actions).map(|chain| chain.head())
}
