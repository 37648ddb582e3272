//! # Storage Layer
//!
//! Persisted board histories. A board is stored as its initial title plus
//! the ordered list of accepted actions; the tree itself is never stored,
//! it is rebuilt by replay.
//!
//! ## Backends
//!
//! | Backend | Format | Location |
//! |---------|--------|----------|
//! | [`JsonlStore`] | Header line + one action per line | `.boardlog/boards/{id}.jsonl` |
//! | [`SqliteStore`] | `boards` + `actions` tables | `.boardlog/boardlog.db` |
//! | [`MemoryStore`] | In-process map | none |
//!
//! ## Concurrency Safety
//!
//! Every backend implements [`HistoryStore::append`] as a compare-and-append:
//! the caller states how long it believes the history is, and the append
//! only happens if that is still true. Combined with the per-board lock in
//! the commit protocol this keeps each history a strict total order even
//! with several processes writing to the same project.
//!
//! - [`JsonlStore`] uses file locking (`fs2`) and ignores torn trailing lines
//! - [`SqliteStore`] appends inside an immediate transaction
//! - [`MemoryStore`] appends under a mutex
//!
//! ## Project Structure
//!
//! ```text
//! .boardlog/
//! ├── boards/
//! │   └── b-1234567.jsonl   # One history per board (jsonl backend)
//! ├── boardlog.db           # All histories (sqlite backend)
//! ├── config.toml           # Project configuration
//! └── .gitignore
//! ```

mod jsonl;
mod sqlite;
mod memory;
mod config;
mod project;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Action, BoardId};

pub use jsonl::JsonlStore;
pub use sqlite::SqliteStore;
pub use memory::MemoryStore;
pub use config::{Config, ConfigError, DisplayConfig, GlobalConfig, OutputFormat, ProjectConfig, StoreBackend};
pub use project::{Project, ProjectError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Board not found: {0}")]
    BoardNotFound(BoardId),

    #[error("History of {board} has {actual} actions, expected {expected}")]
    PositionConflict {
        board: BoardId,
        expected: usize,
        actual: usize,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt history at {location}: {reason}")]
    Corrupt { location: String, reason: String },

    #[error("Failed to encode action: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for failures of the storage medium itself (as opposed to a
    /// missing board or a lost compare-and-append race)
    pub fn is_unavailable(&self) -> bool {
        !matches!(
            self,
            StoreError::BoardNotFound(_) | StoreError::PositionConflict { .. }
        )
    }
}

/// Everything persisted about one board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardHistory {
    pub id: BoardId,
    pub initial_title: String,
    pub created_at: DateTime<Utc>,
    pub actions: Vec<Action>,
}

impl BoardHistory {
    pub fn new(id: BoardId, initial_title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            initial_title: initial_title.into(),
            created_at,
            actions: Vec::new(),
        }
    }

    /// The title after the latest rename, or the initial title
    pub fn current_title(&self) -> &str {
        self.actions
            .iter()
            .rev()
            .find_map(Action::board_title)
            .unwrap_or(self.initial_title.as_str())
    }

    pub fn summary(&self) -> BoardSummary {
        BoardSummary {
            id: self.id.clone(),
            title: self.current_title().to_string(),
            created_at: self.created_at,
            actions: self.actions.len(),
        }
    }
}

/// Listing entry for a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSummary {
    pub id: BoardId,
    /// Current title
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Number of actions in the history
    pub actions: usize,
}

/// Persisted board histories, keyed by board id
pub trait HistoryStore: Send + Sync {
    /// Creates a new board with an empty history
    fn create(&self, initial_title: &str) -> Result<BoardSummary, StoreError>;

    /// Reads a board's initial title and full history
    fn load(&self, board: &BoardId) -> Result<BoardHistory, StoreError>;

    /// Appends one action, but only if the history currently holds exactly
    /// `expected_len` actions. Either the action is durably appended or
    /// nothing changes.
    fn append(&self, board: &BoardId, expected_len: usize, action: &Action) -> Result<(), StoreError>;

    /// Deletes a board and its history
    fn delete(&self, board: &BoardId) -> Result<(), StoreError>;

    /// Lists all boards, oldest first
    fn list(&self) -> Result<Vec<BoardSummary>, StoreError>;
}

impl<S: HistoryStore + ?Sized> HistoryStore for Box<S> {
    fn create(&self, initial_title: &str) -> Result<BoardSummary, StoreError> {
        (**self).create(initial_title)
    }

    fn load(&self, board: &BoardId) -> Result<BoardHistory, StoreError> {
        (**self).load(board)
    }

    fn append(&self, board: &BoardId, expected_len: usize, action: &Action) -> Result<(), StoreError> {
        (**self).append(board, expected_len, action)
    }

    fn delete(&self, board: &BoardId) -> Result<(), StoreError> {
        (**self).delete(board)
    }

    fn list(&self) -> Result<Vec<BoardSummary>, StoreError> {
        (**self).list()
    }
}

impl<S: HistoryStore + ?Sized> HistoryStore for Arc<S> {
    fn create(&self, initial_title: &str) -> Result<BoardSummary, StoreError> {
        (**self).create(initial_title)
    }

    fn load(&self, board: &BoardId) -> Result<BoardHistory, StoreError> {
        (**self).load(board)
    }

    fn append(&self, board: &BoardId, expected_len: usize, action: &Action) -> Result<(), StoreError> {
        (**self).append(board, expected_len, action)
    }

    fn delete(&self, board: &BoardId) -> Result<(), StoreError> {
        (**self).delete(board)
    }

    fn list(&self) -> Result<Vec<BoardSummary>, StoreError> {
        (**self).list()
    }
}

/// Sorts listings oldest first, ties broken by id
fn sort_summaries(summaries: &mut [BoardSummary]) {
    summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NodeId;

    #[test]
    fn current_title_follows_latest_rename() {
        let mut history = BoardHistory::new(BoardId::new("Start", Utc::now()), "Start", Utc::now());
        assert_eq!(history.current_title(), "Start");

        history.actions.push(Action::EditBoard { title: "Middle".into() });
        history.actions.push(Action::AddColumn { title: "Todo".into() });
        history.actions.push(Action::EditBoard { title: "End".into() });
        history.actions.push(Action::EditColumn {
            target: NodeId::new(0),
            title: "Doing".into(),
        });

        assert_eq!(history.current_title(), "End");
        assert_eq!(history.summary().actions, 4);
    }

    #[test]
    fn unavailable_classification() {
        let id = BoardId::new("x", Utc::now());

        assert!(!StoreError::BoardNotFound(id.clone()).is_unavailable());
        assert!(!StoreError::PositionConflict {
            board: id,
            expected: 1,
            actual: 2
        }
        .is_unavailable());
        assert!(StoreError::io("/tmp/x", std::io::Error::other("disk gone")).is_unavailable());
    }
}
