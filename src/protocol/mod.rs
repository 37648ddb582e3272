//! # Commit Protocol
//!
//! Optimistic concurrency over board histories. A client proves it has
//! seen the whole authoritative history by sending the fingerprint of that
//! history extended with its candidate action; the first writer wins and
//! everybody else gets [`CommitError::StaleHistory`] and must refresh.
//!
//! - [`Committer`] is the authoritative side: it owns a [`HistoryStore`],
//!   serializes proposals per board and caches materialized boards.
//! - [`Replica`] is the client side: a local history, its replayed board
//!   and the running fingerprint.
//! - [`CommitRequest`] and [`CommitResponse`] are the wire records.
//!
//! [`HistoryStore`]: crate::storage::HistoryStore

mod commit;
mod replica;
mod wire;

use thiserror::Error;

use crate::domain::{BoardId, EngineError, ErrorKind, ReplayError};
use crate::storage::StoreError;

pub use commit::{Committer, Receipt};
pub use replica::Replica;
pub use wire::{CommitRequest, CommitResponse, Rejection};

/// Broad class of a commit failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitErrorKind {
    /// The caller's history is behind the authoritative one
    StaleHistory,
    BoardNotFound,
    /// The action names an id that does not exist
    NotFound,
    /// The action does not fit the board's shape
    StructuralPrecondition,
    /// The history store failed
    StorageUnavailable,
}

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("Stale history for {board}: the authoritative history has {len} actions")]
    StaleHistory { board: BoardId, len: usize },

    #[error("Board not found: {0}")]
    BoardNotFound(BoardId),

    #[error("Action rejected: {0}")]
    Rejected(#[from] EngineError),

    #[error("History of {board} cannot be replayed: {source}")]
    Unreplayable {
        board: BoardId,
        #[source]
        source: ReplayError,
    },

    #[error(transparent)]
    Storage(StoreError),

    #[error("Failed to encode action: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CommitError {
    pub fn kind(&self) -> CommitErrorKind {
        match self {
            CommitError::StaleHistory { .. } => CommitErrorKind::StaleHistory,
            CommitError::BoardNotFound(_) => CommitErrorKind::BoardNotFound,
            CommitError::Rejected(e) => match e.kind() {
                ErrorKind::NotFound => CommitErrorKind::NotFound,
                ErrorKind::StructuralPrecondition => CommitErrorKind::StructuralPrecondition,
            },
            CommitError::Unreplayable { .. } | CommitError::Storage(_) | CommitError::Encode(_) => {
                CommitErrorKind::StorageUnavailable
            }
        }
    }

    /// True when refetching the history and proposing again may succeed
    pub fn is_stale(&self) -> bool {
        self.kind() == CommitErrorKind::StaleHistory
    }
}

impl From<StoreError> for CommitError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::BoardNotFound(board) => CommitError::BoardNotFound(board),
            // Another process appended between our load and our append
            StoreError::PositionConflict { board, actual, .. } => {
                CommitError::StaleHistory { board, len: actual }
            }
            other => CommitError::Storage(other),
        }
    }
}
