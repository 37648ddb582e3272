//! Identifiers for boards and board nodes
//!
//! ID Format:
//! - Board IDs: `b-{7-char-hash}` (e.g., `b-7f2b4c1`)
//! - Node IDs: a per-board counter, shown as `#{n}` (e.g., `#3`)
//!
//! Board hashes are derived from the initial title + creation timestamp.
//! Node IDs are allocated by the board itself and never reused, so they
//! are only meaningful relative to the board that issued them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid board ID format: expected 'b-{{7-char-hash}}', got '{0}'")]
    InvalidBoardId(String),

    #[error("Invalid node ID: expected a number like '3' or '#3', got '{0}'")]
    InvalidNodeId(String),
}

/// Generates a 7-character hash from title and timestamp
fn generate_hash(title: &str, timestamp: DateTime<Utc>) -> String {
    let input = format!("{}{}", title, timestamp.timestamp_nanos_opt().unwrap_or(0));
    let hash = blake3::hash(input.as_bytes());
    let hex = hash.to_hex();
    hex[..7].to_string()
}

/// Board ID in the format `b-{7-char-hash}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BoardId {
    hash: String,
}

impl BoardId {
    /// Creates a new board ID from the initial title and creation time
    pub fn new(initial_title: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            hash: generate_hash(initial_title, timestamp),
        }
    }

    /// Returns the hash portion of the ID
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b-{}", self.hash)
    }
}

impl FromStr for BoardId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(hash) = s.strip_prefix("b-") else {
            return Err(IdError::InvalidBoardId(s.to_string()));
        };

        if hash.len() != 7 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IdError::InvalidBoardId(s.to_string()));
        }

        Ok(Self {
            hash: hash.to_ascii_lowercase(),
        })
    }
}

impl TryFrom<String> for BoardId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BoardId> for String {
    fn from(id: BoardId) -> Self {
        id.to_string()
    }
}

/// Identifier of a column or task, unique within one board
///
/// Ordering follows allocation order. Serializes as a bare number so the
/// canonical action encoding stays compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        digits
            .parse::<u64>()
            .map(Self)
            .map_err(|_| IdError::InvalidNodeId(s.to_string()))
    }
}

/// Per-board id allocator: hands out the current counter, then bumps it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub(crate) fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    pub(crate) fn peek(&self) -> NodeId {
        NodeId(self.next)
    }
}
