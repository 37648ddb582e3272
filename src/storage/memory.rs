//! In-memory history store
//!
//! Keeps every history in a map behind a mutex. Nothing survives the
//! process; useful for tests and for embedding the protocol in a server
//! that persists elsewhere.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use super::{sort_summaries, BoardHistory, BoardSummary, HistoryStore, StoreError};
use crate::domain::{Action, BoardId};

#[derive(Debug, Default)]
pub struct MemoryStore {
    boards: Mutex<HashMap<BoardId, BoardHistory>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn boards(&self) -> MutexGuard<'_, HashMap<BoardId, BoardHistory>> {
        self.boards.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HistoryStore for MemoryStore {
    fn create(&self, initial_title: &str) -> Result<BoardSummary, StoreError> {
        let mut boards = self.boards();

        let mut created_at = Utc::now();
        let mut id = BoardId::new(initial_title, created_at);
        while boards.contains_key(&id) {
            created_at += chrono::Duration::nanoseconds(1);
            id = BoardId::new(initial_title, created_at);
        }

        let history = BoardHistory::new(id.clone(), initial_title, created_at);
        let summary = history.summary();
        boards.insert(id, history);

        Ok(summary)
    }

    fn load(&self, board: &BoardId) -> Result<BoardHistory, StoreError> {
        self.boards()
            .get(board)
            .cloned()
            .ok_or_else(|| StoreError::BoardNotFound(board.clone()))
    }

    fn append(&self, board: &BoardId, expected_len: usize, action: &Action) -> Result<(), StoreError> {
        let mut boards = self.boards();
        let history = boards
            .get_mut(board)
            .ok_or_else(|| StoreError::BoardNotFound(board.clone()))?;

        if history.actions.len() != expected_len {
            return Err(StoreError::PositionConflict {
                board: board.clone(),
                expected: expected_len,
                actual: history.actions.len(),
            });
        }

        history.actions.push(action.clone());
        Ok(())
    }

    fn delete(&self, board: &BoardId) -> Result<(), StoreError> {
        self.boards()
            .remove(board)
            .map(|_| ())
            .ok_or_else(|| StoreError::BoardNotFound(board.clone()))
    }

    fn list(&self) -> Result<Vec<BoardSummary>, StoreError> {
        let mut summaries: Vec<_> = self.boards().values().map(BoardHistory::summary).collect();
        sort_summaries(&mut summaries);
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_column(title: &str) -> Action {
        Action::AddColumn {
            title: title.to_string(),
        }
    }

    #[test]
    fn create_and_load_empty_history() {
        let store = MemoryStore::new();
        let summary = store.create("Roadmap").unwrap();

        let history = store.load(&summary.id).unwrap();
        assert_eq!(history.initial_title, "Roadmap");
        assert!(history.actions.is_empty());
    }

    #[test]
    fn same_title_creates_distinct_boards() {
        let store = MemoryStore::new();
        let a = store.create("Same").unwrap();
        let b = store.create("Same").unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn append_checks_expected_length() {
        let store = MemoryStore::new();
        let id = store.create("Roadmap").unwrap().id;

        store.append(&id, 0, &add_column("A")).unwrap();
        let err = store.append(&id, 0, &add_column("B")).unwrap_err();

        assert!(matches!(
            err,
            StoreError::PositionConflict {
                expected: 0,
                actual: 1,
                ..
            }
        ));
        assert_eq!(store.load(&id).unwrap().actions, vec![add_column("A")]);
    }

    #[test]
    fn missing_board_is_reported() {
        let store = MemoryStore::new();
        let id = BoardId::new("ghost", Utc::now());

        assert!(matches!(store.load(&id), Err(StoreError::BoardNotFound(_))));
        assert!(matches!(
            store.append(&id, 0, &add_column("A")),
            Err(StoreError::BoardNotFound(_))
        ));
        assert!(matches!(store.delete(&id), Err(StoreError::BoardNotFound(_))));
    }

    #[test]
    fn delete_removes_board() {
        let store = MemoryStore::new();
        let id = store.create("Roadmap").unwrap().id;

        store.delete(&id).unwrap();

        assert!(store.list().unwrap().is_empty());
    }
}
