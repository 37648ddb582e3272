//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::{board, column, protocol_cmd, task};
use crate::domain::BoardId;
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "boardlog")]
#[command(author, version, about = "Hash-chained kanban boards with optimistic commits")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Board to operate on (defaults to the project's default board)
    #[arg(long, short = 'b', global = true, env = "BOARDLOG_BOARD")]
    pub board: Option<BoardId>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new boardlog project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Manage boards
    #[command(subcommand)]
    Board(board::BoardCommands),

    /// Manage columns of the current board
    #[command(subcommand)]
    Column(column::ColumnCommands),

    /// Manage tasks of the current board
    #[command(subcommand)]
    Task(task::TaskCommands),

    /// Print the fingerprint of the current board's history
    Fingerprint {
        /// Fingerprint the history extended by this action (JSON)
        #[arg(long)]
        with: Option<String>,
    },

    /// Propose one action with an explicit fingerprint
    ///
    /// Example:
    ///   boardlog commit '{"tag":"add_column","title":"Todo"}' "$(boardlog fingerprint --with '{"tag":"add_column","title":"Todo"}')"
    Commit {
        /// Action as JSON
        action: String,

        /// Fingerprint of the history extended by the action
        fingerprint: String,
    },
}

/// Installs the stderr log subscriber
///
/// `RUST_LOG` wins; otherwise `--verbose` shows this crate's debug events.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "boardlog=debug" } else { "warn" })
    });

    // A second init (e.g. from tests driving `run`) is not an error worth reporting
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let format = match cli.format {
        Some(format) => format,
        None => Config::load()
            .map(|config| OutputFormat::from(config.global.default_format))
            .unwrap_or_default(),
    };
    let output = Output::new(format, cli.verbose);
    let board = cli.board.as_ref();

    output.verbose("boardlog starting");

    match cli.command {
        Commands::Init { path } => {
            output.verbose_ctx("init", &format!("Initializing project at: {}", path));
            let project = Project::init(&path)?;
            output.verbose_ctx(
                "init",
                &format!("Created .boardlog directory at: {}", project.boardlog_dir().display()),
            );
            output.success(&format!("Initialized boardlog project at {}", project.root().display()));
        }

        Commands::Board(cmd) => board::run(cmd, &output, board)?,
        Commands::Column(cmd) => column::run(cmd, &output, board)?,
        Commands::Task(cmd) => task::run(cmd, &output, board)?,

        Commands::Fingerprint { with } => protocol_cmd::fingerprint(&output, board, with.as_deref())?,
        Commands::Commit {
            action,
            fingerprint,
        } => protocol_cmd::commit(&output, board, &action, &fingerprint)?,
    }

    Ok(())
}
