//! Authoritative side of the commit protocol

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};

use super::wire::{CommitRequest, CommitResponse};
use super::CommitError;
use crate::domain::{replay, Action, Board, BoardId, Fingerprint, HashChain};
use crate::storage::{BoardHistory, BoardSummary, HistoryStore};

/// Number of live entries before dead locks are purged
const CLEANUP_THRESHOLD: usize = 64;

/// Purge at most once per this many acquisitions
const CLEANUP_INTERVAL: usize = 32;

/// One mutex per board id, created on demand
///
/// Entries are weak so a board nobody is proposing to costs nothing but a
/// map slot, and dead slots are swept now and then.
#[derive(Debug, Default)]
struct BoardLocks {
    locks: Mutex<HashMap<BoardId, Weak<Mutex<()>>>>,
    acquire_counter: AtomicUsize,
}

impl BoardLocks {
    fn handle(&self, board: &BoardId) -> Arc<Mutex<()>> {
        let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);

        let lock = map.get(board).and_then(Weak::upgrade).unwrap_or_else(|| {
            let lock = Arc::new(Mutex::new(()));
            map.insert(board.clone(), Arc::downgrade(&lock));
            lock
        });

        let tick = self.acquire_counter.fetch_add(1, Ordering::Relaxed);
        if map.len() > CLEANUP_THRESHOLD && tick % CLEANUP_INTERVAL == 0 {
            map.retain(|_, weak| weak.strong_count() > 0);
        }

        lock
    }
}

fn hold(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Proof of an accepted action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub board: BoardId,
    /// Position of the action in the history, from 0
    pub sequence: usize,
    /// Fingerprint of the history ending with the action
    pub head: Fingerprint,
}

/// A board replayed up to a known history head
#[derive(Debug, Clone)]
struct Materialized {
    head: Fingerprint,
    board: Board,
}

/// Serializes and validates commits against a [`HistoryStore`]
pub struct Committer<S> {
    store: S,
    locks: BoardLocks,
    cache: Mutex<HashMap<BoardId, Materialized>>,
}

impl<S: HistoryStore> Committer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: BoardLocks::default(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying history store
    pub fn store(&self) -> &S {
        &self.store
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<BoardId, Materialized>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create_board(&self, initial_title: &str) -> Result<BoardSummary, CommitError> {
        let summary = self.store.create(initial_title)?;
        tracing::info!(board = %summary.id, title = initial_title, "created board");
        Ok(summary)
    }

    pub fn delete_board(&self, board: &BoardId) -> Result<(), CommitError> {
        let lock = self.locks.handle(board);
        let _guard = hold(&lock);

        self.store.delete(board)?;
        self.cache().remove(board);

        tracing::info!(board = %board, "deleted board");
        Ok(())
    }

    /// Lists all boards, oldest first
    pub fn boards(&self) -> Result<Vec<BoardSummary>, CommitError> {
        Ok(self.store.list()?)
    }

    /// The authoritative history of a board
    pub fn history(&self, board: &BoardId) -> Result<BoardHistory, CommitError> {
        Ok(self.store.load(board)?)
    }

    /// The authoritative board and the fingerprint of the history behind it
    pub fn materialize(&self, board: &BoardId) -> Result<(Board, Fingerprint), CommitError> {
        let history = self.store.load(board)?;
        let chain = HashChain::over(&history.initial_title, &history.actions)?;
        let materialized = self.materialized(&history, &chain)?;
        Ok((materialized, chain.head()))
    }

    /// Board state for `history`, from the cache when its head matches
    fn materialized(&self, history: &BoardHistory, chain: &HashChain) -> Result<Board, CommitError> {
        if let Some(cached) = self.cache().get(&history.id) {
            if cached.head == chain.head() {
                tracing::debug!(board = %history.id, head = %chain.head().short(), "board cache hit");
                return Ok(cached.board.clone());
            }
        }

        let board = replay(&history.initial_title, &history.actions).map_err(|source| {
            CommitError::Unreplayable {
                board: history.id.clone(),
                source,
            }
        })?;

        self.cache().insert(
            history.id.clone(),
            Materialized {
                head: chain.head(),
                board: board.clone(),
            },
        );
        Ok(board)
    }

    /// Appends `action` to the board's history if `fingerprint` matches the
    /// fingerprint of the authoritative history extended by `action`
    ///
    /// Proposals to one board run one at a time. A mismatch is
    /// [`CommitError::StaleHistory`]; an action the engine refuses is
    /// [`CommitError::Rejected`]. Neither changes the history.
    pub fn propose(
        &self,
        board: &BoardId,
        action: Action,
        fingerprint: &Fingerprint,
    ) -> Result<Receipt, CommitError> {
        let lock = self.locks.handle(board);
        let _guard = hold(&lock);

        let history = self.store.load(board)?;
        let chain = HashChain::over(&history.initial_title, &history.actions)?;
        let next = chain.with(&action)?;

        if next.head() != *fingerprint {
            tracing::warn!(
                board = %board,
                len = history.actions.len(),
                expected = %next.head().short(),
                got = %fingerprint.short(),
                "stale commit"
            );
            return Err(CommitError::StaleHistory {
                board: board.clone(),
                len: history.actions.len(),
            });
        }

        let mut state = self.materialized(&history, &chain)?;
        if let Err(e) = state.apply(&action) {
            tracing::warn!(board = %board, action = action.tag(), error = %e, "rejected commit");
            return Err(CommitError::Rejected(e));
        }

        let sequence = history.actions.len();
        self.store.append(board, sequence, &action)?;

        self.cache().insert(
            board.clone(),
            Materialized {
                head: next.head(),
                board: state,
            },
        );

        tracing::info!(
            board = %board,
            sequence,
            action = action.tag(),
            head = %next.head().short(),
            "accepted commit"
        );

        Ok(Receipt {
            board: board.clone(),
            sequence,
            head: next.head(),
        })
    }

    /// [`Committer::propose`] for a wire request
    pub fn handle(&self, request: CommitRequest) -> CommitResponse {
        let CommitRequest {
            board,
            action,
            fingerprint,
        } = request;

        match self.propose(&board, action, &fingerprint) {
            Ok(receipt) => CommitResponse::accepted(&receipt),
            Err(e) => CommitResponse::rejected(&e),
        }
    }
}
