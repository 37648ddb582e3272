//! Client side of the commit protocol
//!
//! A [`Replica`] mirrors one board: the history it has fetched, the board
//! replayed from it, and the running fingerprint. Edits are validated
//! locally in [`Replica::prepare`], sent to the committer, and only folded
//! in by [`Replica::confirm`] once accepted.

use super::wire::CommitRequest;
use super::CommitError;
use crate::domain::{replay, Action, Board, BoardId, Fingerprint, HashChain};
use crate::storage::BoardHistory;

#[derive(Debug, Clone)]
pub struct Replica {
    history: BoardHistory,
    board: Board,
    chain: HashChain,
}

impl Replica {
    /// Builds the local copy by replaying a fetched history
    pub fn new(history: BoardHistory) -> Result<Self, CommitError> {
        let board = replay(&history.initial_title, &history.actions).map_err(|source| {
            CommitError::Unreplayable {
                board: history.id.clone(),
                source,
            }
        })?;
        let chain = HashChain::over(&history.initial_title, &history.actions)?;

        Ok(Self {
            history,
            board,
            chain,
        })
    }

    pub fn id(&self) -> &BoardId {
        &self.history.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn history(&self) -> &BoardHistory {
        &self.history
    }

    /// Fingerprint of the local history
    pub fn head(&self) -> Fingerprint {
        self.chain.head()
    }

    /// Checks `action` against the local board and builds the request that
    /// proposes it
    pub fn prepare(&self, action: Action) -> Result<CommitRequest, CommitError> {
        let mut scratch = self.board.clone();
        scratch.apply(&action)?;

        let fingerprint = self.chain.with(&action)?.head();
        Ok(CommitRequest {
            board: self.history.id.clone(),
            action,
            fingerprint,
        })
    }

    /// Folds an accepted action into the local copy
    pub fn confirm(&mut self, action: Action) -> Result<(), CommitError> {
        self.board.apply(&action)?;
        self.chain.push(&action)?;
        self.history.actions.push(action);
        Ok(())
    }

    /// Replaces the local copy with a freshly fetched history
    pub fn refresh(&mut self, history: BoardHistory) -> Result<(), CommitError> {
        *self = Self::new(history)?;
        Ok(())
    }
}
