//! Project management
//!
//! Handles project initialization and provides access to the history store.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::{Config, HistoryStore, JsonlStore, SqliteStore, StoreBackend};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Project already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("Not in a boardlog project. Run 'boardlog init' first.")]
    NotInProject,

    #[error("Failed to create project: {0}")]
    CreateFailed(String),
}

const DEFAULT_CONFIG: &str = r#"# boardlog configuration

# History store: "jsonl" (one file per board) or "sqlite"
store = "jsonl"

# Board used when --board is not given (set by 'boardlog board use')
# default_board = "b-0000000"

# Times an edit is re-proposed after losing a race with another writer
stale_retries = 1

[display]
# Print node ids next to titles
show_ids = true

# Spaces per nesting level
indent = 2
"#;

const GITIGNORE: &str = r#"# SQLite side files
*.db-wal
*.db-shm

# Interrupted board creation
boards/*.tmp
"#;

/// A boardlog project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let boardlog_dir = root.join(".boardlog");

        if !boardlog_dir.is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path
    ///
    /// Initializing an existing project leaves its files untouched.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let boardlog_dir = root.join(".boardlog");

        if boardlog_dir.exists() && !boardlog_dir.is_dir() {
            return Err(ProjectError::CreateFailed(format!(
                "{} exists and is not a directory",
                boardlog_dir.display()
            ))
            .into());
        }

        // Create directory structure
        let boards_dir = boardlog_dir.join("boards");
        fs::create_dir_all(&boards_dir).with_context(|| {
            format!("Failed to create boards directory: {}", boards_dir.display())
        })?;

        // Create default config
        let config_path = boardlog_dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = boardlog_dir.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, GITIGNORE).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        tracing::debug!(root = %root.display(), "initialized project");
        Self::open(root)
    }

    /// Like [`Project::init`], but fails if a project is already there
    pub fn init_new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if root.join(".boardlog").is_dir() {
            return Err(ProjectError::AlreadyExists(root).into());
        }
        Self::init(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .boardlog directory path
    pub fn boardlog_dir(&self) -> PathBuf {
        self.root.join(".boardlog")
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a mutable reference to the configuration
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Opens the history store selected by the project config
    pub fn store(&self) -> Result<Box<dyn HistoryStore>> {
        let store: Box<dyn HistoryStore> = match self.config.project.store {
            StoreBackend::Jsonl => Box::new(JsonlStore::for_project(&self.root)),
            StoreBackend::Sqlite => Box::new(
                SqliteStore::for_project(&self.root).context("Failed to open board database")?,
            ),
        };
        Ok(store)
    }
}
