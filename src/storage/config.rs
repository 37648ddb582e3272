//! Configuration handling for boardlog
//!
//! Configuration is stored in `.boardlog/config.toml` (project) and
//! `~/.config/boardlog/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::BoardId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Which history store backs a project
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// One JSONL file per board
    #[default]
    Jsonl,
    /// A single SQLite database
    Sqlite,
}

impl StoreBackend {
    pub fn as_str(&self) -> &str {
        match self {
            StoreBackend::Jsonl => "jsonl",
            StoreBackend::Sqlite => "sqlite",
        }
    }
}

/// Text rendering of boards
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Print node ids next to titles
    pub show_ids: bool,

    /// Spaces per nesting level
    pub indent: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_ids: true,
            indent: 2,
        }
    }
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// History store backend
    pub store: StoreBackend,

    /// Board used when `--board` is not given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_board: Option<BoardId>,

    /// How often an edit is re-proposed after a stale rejection
    pub stale_retries: u32,

    /// Text output settings
    pub display: DisplayConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            store: StoreBackend::Jsonl,
            default_board: None,
            stale_retries: 1,
            display: DisplayConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Checks values that parse but make no sense
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.display.indent == 0 || self.display.indent > 8 {
            return Err(ConfigError::Invalid(format!(
                "display.indent must be between 1 and 8, got {}",
                self.display.indent
            )));
        }
        Ok(())
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let (project, project_root) = Self::load_project()?;

        Ok(Self {
            project,
            global,
            project_root,
        })
    }

    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self {
            project,
            global,
            project_root: Some(project_root.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "boardlog", "boardlog").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Finds and loads project configuration
    fn load_project() -> Result<(ProjectConfig, Option<PathBuf>)> {
        match Self::find_project_root() {
            Some(root) => {
                let config = Self::load_project_config(&root)?;
                Ok((config, Some(root)))
            }
            None => Ok((ProjectConfig::default(), None)),
        }
    }

    /// Loads project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(".boardlog").join("config.toml");

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;

        config
            .validate()
            .with_context(|| format!("In {}", config_path.display()))?;

        Ok(config)
    }

    /// Finds the project root by looking for a `.boardlog/` directory
    /// in the current directory or any parent
    pub fn find_project_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_project_root_from(&current)
    }

    /// Like [`Config::find_project_root`], starting from `start`
    pub fn find_project_root_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(".boardlog").is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Returns true if we're in a boardlog project
    pub fn is_in_project(&self) -> bool {
        self.project_root.is_some()
    }

    /// Returns the project root, or an error if not in a project
    pub fn require_project_root(&self) -> Result<&Path> {
        self.project_root
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Not in a boardlog project. Run 'boardlog init' first."))
    }

    /// Saves the project configuration
    pub fn save_project(&self) -> Result<()> {
        let root = self.require_project_root()?;
        let config_path = root.join(".boardlog").join("config.toml");

        let content =
            toml::to_string_pretty(&self.project).context("Failed to serialize project config")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write project config: {}", config_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = ProjectConfig::default();

        assert_eq!(config.store, StoreBackend::Jsonl);
        assert_eq!(config.stale_retries, 1);
        assert!(config.display.show_ids);
        assert_eq!(config.display.indent, 2);
        assert!(config.default_board.is_none());
        assert_eq!(GlobalConfig::default().default_format, OutputFormat::Text);
    }

    #[test]
    fn parse_project_config() {
        let toml = r#"
store = "sqlite"
default_board = "b-a1b2c3d"
stale_retries = 3

[display]
show_ids = false
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.store, StoreBackend::Sqlite);
        assert_eq!(config.default_board.unwrap().to_string(), "b-a1b2c3d");
        assert_eq!(config.stale_retries, 3);
        assert!(!config.display.show_ids);
        // Unset fields keep their defaults
        assert_eq!(config.display.indent, 2);
    }

    #[test]
    fn bad_default_board_is_a_parse_error() {
        let result: Result<ProjectConfig, _> = toml::from_str(r#"default_board = "nope""#);

        assert!(result.is_err());
    }

    #[test]
    fn zero_indent_is_invalid() {
        let mut config = ProjectConfig::default();
        config.display.indent = 0;

        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn parse_global_config() {
        let config: GlobalConfig = toml::from_str(r#"default_format = "json""#).unwrap();

        assert_eq!(config.default_format, OutputFormat::Json);
    }

    #[test]
    fn find_project_root_from_subdirectory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".boardlog")).unwrap();

        let sub_dir = dir.path().join("sub").join("dir");
        fs::create_dir_all(&sub_dir).unwrap();

        let root = Config::find_project_root_from(&sub_dir);
        assert_eq!(root.as_deref(), Some(dir.path()));
    }

    #[test]
    fn find_project_root_outside_project() {
        let dir = TempDir::new().unwrap();

        // The temp dir may itself sit under some project, so only check
        // that the result is not inside the temp dir
        let root = Config::find_project_root_from(dir.path());
        assert!(root.map_or(true, |r| !r.starts_with(dir.path())));
    }

    #[test]
    fn save_and_reload_project_config() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".boardlog")).unwrap();

        let mut config = Config::for_project(dir.path()).unwrap();
        config.project.store = StoreBackend::Sqlite;
        config.project.stale_retries = 0;
        config.save_project().unwrap();

        let reloaded = Config::for_project(dir.path()).unwrap();
        assert_eq!(reloaded.project.store, StoreBackend::Sqlite);
        assert_eq!(reloaded.project.stale_retries, 0);
    }

    #[test]
    fn config_not_in_project() {
        let config = Config {
            project: ProjectConfig::default(),
            global: GlobalConfig::default(),
            project_root: None,
        };

        assert!(!config.is_in_project());
        assert!(config.require_project_root().is_err());
    }
}
