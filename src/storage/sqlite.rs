//! SQLite storage for board histories
//!
//! All boards of a project live in `.boardlog/boardlog.db`. The `boards`
//! table holds the header of each history (plus the current title, so
//! listings don't need a replay) and `actions` holds one row per accepted
//! action, keyed by board and sequence number.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{sort_summaries, BoardHistory, BoardSummary, HistoryStore, StoreError};
use crate::domain::{Action, BoardId};

/// Store for board histories in a single SQLite database
pub struct SqliteStore {
    /// Path to the database, for error messages
    db_path: PathBuf,

    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Schema version - bump when the schema changes
    const SCHEMA_VERSION: i32 = 1;

    /// Opens (creating if needed) the database at `db_path`
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let conn = Connection::open(&db_path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        Self::with_connection(db_path, conn)
    }

    /// Opens the default database for a project
    pub fn for_project(project_root: &Path) -> Result<Self, StoreError> {
        Self::open(project_root.join(".boardlog").join("boardlog.db"))
    }

    /// Opens a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(PathBuf::from(":memory:"), Connection::open_in_memory()?)
    }

    fn with_connection(db_path: PathBuf, conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            db_path,
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ensures the schema is present and current
    fn ensure_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn();
        let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        match version {
            0 => {
                conn.execute_batch(
                    "
                    CREATE TABLE IF NOT EXISTS boards (
                        id TEXT PRIMARY KEY,
                        initial_title TEXT NOT NULL,
                        title TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    );

                    CREATE TABLE IF NOT EXISTS actions (
                        board_id TEXT NOT NULL,
                        seq INTEGER NOT NULL,
                        body TEXT NOT NULL,
                        PRIMARY KEY (board_id, seq)
                    );
                    ",
                )?;
                conn.execute_batch(&format!("PRAGMA user_version = {}", Self::SCHEMA_VERSION))?;
                Ok(())
            }
            v if v == Self::SCHEMA_VERSION => Ok(()),
            v => Err(StoreError::Corrupt {
                location: self.db_path.display().to_string(),
                reason: format!("unsupported schema version {}", v),
            }),
        }
    }

    fn corrupt(&self, board: &BoardId, reason: impl Into<String>) -> StoreError {
        StoreError::Corrupt {
            location: format!("{}#{}", self.db_path.display(), board),
            reason: reason.into(),
        }
    }

    fn parse_time(&self, board: &BoardId, raw: &str) -> Result<DateTime<Utc>, StoreError> {
        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| self.corrupt(board, format!("bad created_at: {}", e)))
    }
}

fn count_actions(conn: &Connection, board: &BoardId) -> rusqlite::Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM actions WHERE board_id = ?1",
        params![board.to_string()],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

fn board_exists(conn: &Connection, board: &BoardId) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM boards WHERE id = ?1",
        params![board.to_string()],
        |_| Ok(()),
    )
    .optional()
    .map(|row| row.is_some())
}

impl HistoryStore for SqliteStore {
    fn create(&self, initial_title: &str) -> Result<BoardSummary, StoreError> {
        let conn = self.conn();

        let mut created_at = Utc::now();
        loop {
            let id = BoardId::new(initial_title, created_at);
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO boards (id, initial_title, title, created_at)
                 VALUES (?1, ?2, ?2, ?3)",
                params![id.to_string(), initial_title, created_at.to_rfc3339()],
            )?;

            if inserted == 1 {
                tracing::debug!(board = %id, "created board row");
                return Ok(BoardHistory::new(id, initial_title, created_at).summary());
            }
            created_at += chrono::Duration::nanoseconds(1);
        }
    }

    fn load(&self, board: &BoardId) -> Result<BoardHistory, StoreError> {
        let conn = self.conn();
        let key = board.to_string();

        let header: Option<(String, String)> = conn
            .query_row(
                "SELECT initial_title, created_at FROM boards WHERE id = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (initial_title, created_at) =
            header.ok_or_else(|| StoreError::BoardNotFound(board.clone()))?;

        let mut history =
            BoardHistory::new(board.clone(), initial_title, self.parse_time(board, &created_at)?);

        let mut stmt =
            conn.prepare("SELECT seq, body FROM actions WHERE board_id = ?1 ORDER BY seq")?;
        let rows = stmt.query_map(params![key], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (seq, body) = row?;
            if seq as usize != history.actions.len() {
                return Err(self.corrupt(board, format!("gap in history at sequence {}", seq)));
            }
            let action: Action = serde_json::from_str(&body)
                .map_err(|e| self.corrupt(board, format!("action {}: {}", seq, e)))?;
            history.actions.push(action);
        }

        Ok(history)
    }

    fn append(&self, board: &BoardId, expected_len: usize, action: &Action) -> Result<(), StoreError> {
        let body = String::from_utf8(action.canonical_json()?)
            .map_err(|e| self.corrupt(board, e.to_string()))?;

        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !board_exists(&tx, board)? {
            return Err(StoreError::BoardNotFound(board.clone()));
        }

        let actual = count_actions(&tx, board)?;
        if actual != expected_len {
            return Err(StoreError::PositionConflict {
                board: board.clone(),
                expected: expected_len,
                actual,
            });
        }

        tx.execute(
            "INSERT INTO actions (board_id, seq, body) VALUES (?1, ?2, ?3)",
            params![board.to_string(), expected_len as i64, body],
        )?;

        if let Some(title) = action.board_title() {
            tx.execute(
                "UPDATE boards SET title = ?1 WHERE id = ?2",
                params![title, board.to_string()],
            )?;
        }

        tx.commit()?;

        tracing::debug!(board = %board, seq = expected_len, "appended action");
        Ok(())
    }

    fn delete(&self, board: &BoardId) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let removed = tx.execute("DELETE FROM boards WHERE id = ?1", params![board.to_string()])?;
        if removed == 0 {
            return Err(StoreError::BoardNotFound(board.clone()));
        }
        tx.execute(
            "DELETE FROM actions WHERE board_id = ?1",
            params![board.to_string()],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<BoardSummary>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT b.id, b.title, b.created_at,
                    (SELECT COUNT(*) FROM actions a WHERE a.board_id = b.id)
             FROM boards b",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (id, title, created_at, actions) = row?;
            let id: BoardId = id.parse().map_err(|e: crate::domain::IdError| StoreError::Corrupt {
                location: self.db_path.display().to_string(),
                reason: e.to_string(),
            })?;
            let created_at = self.parse_time(&id, &created_at)?;
            summaries.push(BoardSummary {
                id,
                title,
                created_at,
                actions: actions as usize,
            });
        }

        sort_summaries(&mut summaries);
        Ok(summaries)
    }
}
