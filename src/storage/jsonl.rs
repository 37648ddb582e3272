//! JSONL storage for board histories
//!
//! Each board lives in `.boardlog/boards/{id}.jsonl`: the first line is a
//! header with the board id, initial title and creation time, and every
//! following line is one accepted action in canonical JSON.
//!
//! Uses file locking for concurrent access safety. A line only counts once
//! its terminating newline is on disk; a trailing fragment left by an
//! interrupted append is ignored on read and cut off by the next append.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use super::{sort_summaries, BoardHistory, BoardSummary, HistoryStore, StoreError};
use crate::domain::{Action, BoardId};

/// First line of a board file
#[derive(Debug, Serialize, Deserialize)]
struct Header {
    id: BoardId,
    initial_title: String,
    created_at: DateTime<Utc>,
}

/// Store for board histories, one JSONL file per board
pub struct JsonlStore {
    dir: PathBuf,
}

impl JsonlStore {
    /// Creates a new store rooted at the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates the default store for a project
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(".boardlog").join("boards"))
    }

    /// Returns the directory holding the board files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of one board's file
    pub fn board_path(&self, board: &BoardId) -> PathBuf {
        self.dir.join(format!("{}.jsonl", board))
    }

    fn open(&self, board: &BoardId, write: bool) -> Result<(File, PathBuf), StoreError> {
        let path = self.board_path(board);
        let file = OpenOptions::new()
            .read(true)
            .write(write)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => StoreError::BoardNotFound(board.clone()),
                _ => StoreError::io(&path, e),
            })?;
        Ok((file, path))
    }

    /// Opens a board file and takes its lock, shared or exclusive
    ///
    /// A delete can unlink the file while we wait for the lock. Once the
    /// lock is held the path must still name the inode we opened, otherwise
    /// the board is gone and anything written would land in no log.
    fn lock(&self, board: &BoardId, exclusive: bool) -> Result<(File, PathBuf), StoreError> {
        let (file, path) = self.open(board, exclusive)?;

        if exclusive {
            file.lock_exclusive()
        } else {
            file.lock_shared()
        }
        .map_err(|e| StoreError::io(&path, e))?;

        if !still_linked(&file, &path).map_err(|e| StoreError::io(&path, e))? {
            tracing::debug!(board = %board, "board file unlinked while waiting for lock");
            return Err(StoreError::BoardNotFound(board.clone()));
        }

        // Lock is released when file is dropped
        Ok((file, path))
    }

    /// Writes a new board file, bumping the timestamp past taken ids
    fn create_at(
        &self,
        initial_title: &str,
        mut created_at: DateTime<Utc>,
    ) -> Result<BoardSummary, StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        loop {
            let id = BoardId::new(initial_title, created_at);
            let header = Header {
                id: id.clone(),
                initial_title: initial_title.to_string(),
                created_at,
            };
            let mut line = serde_json::to_vec(&header)?;
            line.push(b'\n');

            // Write to temp file first
            let path = self.board_path(&id);
            let temp_path = self
                .dir
                .join(format!("{}.jsonl.{}.tmp", id, std::process::id()));
            {
                let mut file =
                    File::create(&temp_path).map_err(|e| StoreError::io(&temp_path, e))?;
                file.write_all(&line)
                    .and_then(|_| file.sync_all())
                    .map_err(|e| StoreError::io(&temp_path, e))?;
            }

            // Publish without replacing: linking fails if the id is taken
            let published = fs::hard_link(&temp_path, &path);
            fs::remove_file(&temp_path).map_err(|e| StoreError::io(&temp_path, e))?;
            match published {
                Ok(()) => {
                    tracing::debug!(board = %id, path = %path.display(), "created board file");
                    return Ok(BoardHistory::new(id, initial_title, created_at).summary());
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    created_at += chrono::Duration::nanoseconds(1);
                }
                Err(e) => return Err(StoreError::io(&path, e)),
            }
        }
    }

    fn read_locked(file: &mut File, path: &Path) -> Result<(BoardHistory, usize, usize), StoreError> {
        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| StoreError::io(path, e))?;
        let (history, committed) = parse(path, &content)?;
        Ok((history, committed, content.len()))
    }

    fn read_file(&self, board: &BoardId) -> Result<BoardHistory, StoreError> {
        let (mut file, path) = self.lock(board, false)?;
        let (history, _, _) = Self::read_locked(&mut file, &path)?;

        if history.id != *board {
            return Err(StoreError::Corrupt {
                location: path.display().to_string(),
                reason: format!("header names board {}", history.id),
            });
        }

        Ok(history)
    }
}

/// True when `path` still names the same file as the open handle
#[cfg(unix)]
fn still_linked(file: &File, path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let open = file.metadata()?;
    match fs::metadata(path) {
        Ok(named) => Ok(named.dev() == open.dev() && named.ino() == open.ino()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// True when `path` still names a file (open files cannot be unlinked here)
#[cfg(not(unix))]
fn still_linked(_file: &File, path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Parses a board file, returning the history and the byte length of the
/// committed (newline-terminated) prefix
fn parse(path: &Path, content: &str) -> Result<(BoardHistory, usize), StoreError> {
    let committed = content.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let mut lines = content[..committed].lines().enumerate();

    let corrupt = |line_num: usize, reason: String| StoreError::Corrupt {
        location: format!("{}:{}", path.display(), line_num + 1),
        reason,
    };

    let header: Header = match lines.next() {
        Some((line_num, line)) => {
            serde_json::from_str(line).map_err(|e| corrupt(line_num, e.to_string()))?
        }
        None => return Err(corrupt(0, "missing header".to_string())),
    };

    let mut history = BoardHistory::new(header.id, header.initial_title, header.created_at);
    for (line_num, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let action: Action =
            serde_json::from_str(line).map_err(|e| corrupt(line_num, e.to_string()))?;
        history.actions.push(action);
    }

    Ok((history, committed))
}

impl HistoryStore for JsonlStore {
    fn create(&self, initial_title: &str) -> Result<BoardSummary, StoreError> {
        self.create_at(initial_title, Utc::now())
    }

    fn load(&self, board: &BoardId) -> Result<BoardHistory, StoreError> {
        self.read_file(board)
    }

    fn append(&self, board: &BoardId, expected_len: usize, action: &Action) -> Result<(), StoreError> {
        let (mut file, path) = self.lock(board, true)?;

        let (history, committed, total) = Self::read_locked(&mut file, &path)?;
        if history.actions.len() != expected_len {
            return Err(StoreError::PositionConflict {
                board: board.clone(),
                expected: expected_len,
                actual: history.actions.len(),
            });
        }

        if committed < total {
            tracing::warn!(
                board = %board,
                bytes = total - committed,
                "discarding torn trailing line"
            );
            file.set_len(committed as u64)
                .map_err(|e| StoreError::io(&path, e))?;
        }

        let mut line = action.canonical_json()?;
        line.push(b'\n');

        file.seek(SeekFrom::End(0))
            .and_then(|_| file.write_all(&line))
            .and_then(|_| file.sync_data())
            .map_err(|e| StoreError::io(&path, e))?;

        tracing::debug!(board = %board, seq = expected_len, "appended action");
        Ok(())
    }

    fn delete(&self, board: &BoardId) -> Result<(), StoreError> {
        // Waits for in-flight appends before unlinking
        let (_file, path) = self.lock(board, true)?;
        fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;

        tracing::debug!(board = %board, "deleted board file");
        Ok(())
    }

    fn list(&self) -> Result<Vec<BoardSummary>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut summaries = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.dir, e))?;
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<BoardId>().ok())
            else {
                continue;
            };

            match self.read_file(&id) {
                Ok(history) => summaries.push(history.summary()),
                // Deleted between read_dir and open
                Err(StoreError::BoardNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        sort_summaries(&mut summaries);
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NodeId;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> JsonlStore {
        JsonlStore::new(dir.path().join("boards"))
    }

    fn add_column(title: &str) -> Action {
        Action::AddColumn {
            title: title.to_string(),
        }
    }

    #[test]
    fn list_empty_store() {
        let dir = TempDir::new().unwrap();

        assert!(store(&dir).list().unwrap().is_empty());
    }

    #[test]
    fn create_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let summary = store.create("Roadmap").unwrap();

        let content = fs::read_to_string(store.board_path(&summary.id)).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("\"initial_title\":\"Roadmap\""));
        // Temp file should not exist after write
        assert_eq!(fs::read_dir(store.dir()).unwrap().count(), 1);
    }

    #[test]
    fn append_and_load_actions() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let id = store.create("Roadmap").unwrap().id;

        store.append(&id, 0, &add_column("Todo")).unwrap();
        store
            .append(
                &id,
                1,
                &Action::AddTask {
                    parent: NodeId::new(0),
                    content: "first".into(),
                },
            )
            .unwrap();

        let history = store.load(&id).unwrap();
        assert_eq!(history.initial_title, "Roadmap");
        assert_eq!(history.actions.len(), 2);
        assert_eq!(history.actions[0], add_column("Todo"));

        let content = fs::read_to_string(store.board_path(&id)).unwrap();
        assert!(content.ends_with("{\"tag\":\"add_task\",\"parent\":0,\"content\":\"first\"}\n"));
    }

    #[test]
    fn append_at_stale_position_is_refused() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let id = store.create("Roadmap").unwrap().id;
        store.append(&id, 0, &add_column("A")).unwrap();

        let err = store.append(&id, 0, &add_column("B")).unwrap_err();

        assert!(matches!(err, StoreError::PositionConflict { actual: 1, .. }));
        assert_eq!(store.load(&id).unwrap().actions.len(), 1);
    }

    #[test]
    fn torn_trailing_line_is_ignored_then_replaced() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let id = store.create("Roadmap").unwrap().id;
        store.append(&id, 0, &add_column("A")).unwrap();

        // Simulate a crash halfway through writing a second action
        let mut file = OpenOptions::new()
            .append(true)
            .open(store.board_path(&id))
            .unwrap();
        file.write_all(b"{\"tag\":\"add_col").unwrap();
        drop(file);

        assert_eq!(store.load(&id).unwrap().actions.len(), 1);

        store.append(&id, 1, &add_column("B")).unwrap();
        let history = store.load(&id).unwrap();
        assert_eq!(history.actions, vec![add_column("A"), add_column("B")]);
    }

    #[test]
    fn corrupt_line_is_reported_with_location() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let id = store.create("Roadmap").unwrap().id;

        let mut file = OpenOptions::new()
            .append(true)
            .open(store.board_path(&id))
            .unwrap();
        file.write_all(b"not json\n").unwrap();
        drop(file);

        match store.load(&id) {
            Err(StoreError::Corrupt { location, .. }) => assert!(location.ends_with(":2")),
            other => panic!("expected corrupt error, got {:?}", other),
        }
    }

    #[test]
    fn list_reports_current_titles() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let first = store.create("First").unwrap().id;
        store.create("Second").unwrap();
        store
            .append(&first, 0, &Action::EditBoard { title: "Renamed".into() })
            .unwrap();

        // Stray files are skipped
        fs::write(store.dir().join("notes.txt"), "hello").unwrap();

        let titles: Vec<_> = store.list().unwrap().into_iter().map(|s| s.title).collect();
        assert_eq!(titles.len(), 2);
        assert!(titles.contains(&"Renamed".to_string()));
        assert!(titles.contains(&"Second".to_string()));
    }

    #[test]
    fn delete_removes_file() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let id = store.create("Roadmap").unwrap().id;

        store.delete(&id).unwrap();

        assert!(!store.board_path(&id).exists());
        assert!(matches!(store.load(&id), Err(StoreError::BoardNotFound(_))));
        assert!(matches!(store.delete(&id), Err(StoreError::BoardNotFound(_))));
    }

    #[test]
    fn create_never_replaces_an_existing_board() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let at = Utc::now();

        let first = store.create_at("Roadmap", at).unwrap().id;
        store.append(&first, 0, &add_column("kept")).unwrap();
        let second = store.create_at("Roadmap", at).unwrap().id;

        assert_ne!(first, second);
        assert_eq!(store.load(&first).unwrap().actions, vec![add_column("kept")]);
        assert!(store.load(&second).unwrap().actions.is_empty());
        assert_eq!(fs::read_dir(store.dir()).unwrap().count(), 2);
    }

    #[test]
    fn append_waiting_on_a_deleted_board_fails() {
        let dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(store(&dir));
        let id = store.create("Roadmap").unwrap().id;
        let path = store.board_path(&id);

        // Another writer holds the lock while the board goes away
        let holder = File::open(&path).unwrap();
        holder.lock_exclusive().unwrap();

        let appender = {
            let store = std::sync::Arc::clone(&store);
            let id = id.clone();
            std::thread::spawn(move || store.append(&id, 0, &add_column("lost")))
        };
        std::thread::sleep(std::time::Duration::from_millis(100));
        fs::remove_file(&path).unwrap();
        drop(holder);

        let result = appender.join().unwrap();
        assert!(matches!(result, Err(StoreError::BoardNotFound(_))), "{:?}", result);
        assert!(matches!(store.load(&id), Err(StoreError::BoardNotFound(_))));
    }
}
