//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project setup | `init` |
//! | Board | Board lifecycle | `board new`, `board list`, `board show`, `board history` |
//! | Column | Top-level buckets | `column add`, `column mv` |
//! | Task | Nested work items | `task add`, `task edit`, `task mv` |
//! | Protocol | Raw commit access | `fingerprint`, `commit` |
//!
//! Every edit goes through the commit protocol: the command fetches the
//! board's history, checks the action locally, and proposes it with the
//! matching fingerprint. Losing a race with another writer refetches and
//! retries `stale_retries` times.
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for progress lines and debug logs:
//! ```bash
//! boardlog --verbose task add 0 "Write spec"
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod session;
mod render;
mod board;
mod column;
mod task;
mod protocol_cmd;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
