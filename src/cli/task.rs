//! Task CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use super::session::{last_allocated, Session};
use crate::domain::{Action, BoardId, NodeId, TaskPosition};

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task to a column, or a subtask to a task
    ///
    /// Examples:
    ///   boardlog task add 0 "Write spec"   # Top-level task in column #0
    ///   boardlog task add 4 "Outline"      # Subtask of task #4
    Add {
        /// Column or task to add under
        parent: NodeId,

        /// Task content
        content: String,
    },

    /// Change a task's content
    Edit {
        /// Task ID
        id: NodeId,

        /// New content
        content: String,
    },

    /// Remove a task with all its subtasks
    Rm {
        /// Task ID
        id: NodeId,
    },

    /// Move a task (with its subtasks)
    ///
    /// Examples:
    ///   boardlog task mv 4 --into 1    # First task of column or task #1
    ///   boardlog task mv 4 --after 2   # Right after task #2
    Mv {
        /// Task ID
        id: NodeId,

        /// Column or task to become the first child of
        #[arg(long, conflicts_with = "after", required_unless_present = "after")]
        into: Option<NodeId>,

        /// Task to place it after
        #[arg(long)]
        after: Option<NodeId>,
    },
}

pub fn run(cmd: TaskCommands, output: &Output, board: Option<&BoardId>) -> Result<()> {
    let session = Session::open()?;
    let board = session.board_id(board)?;

    // `None` means the action allocates the id
    let (action, target) = match cmd {
        TaskCommands::Add { parent, content } => (Action::AddTask { parent, content }, None),
        TaskCommands::Edit { id, content } => (Action::EditTask { target: id, content }, Some(id)),
        TaskCommands::Rm { id } => (Action::RemoveTask { target: id }, Some(id)),
        TaskCommands::Mv { id, into, after } => {
            let dest = match (into, after) {
                (Some(parent), _) => TaskPosition::FirstChildOf { parent },
                (None, Some(sibling)) => TaskPosition::After { sibling },
                (None, None) => anyhow::bail!("Pass --into <parent> or --after <sibling>"),
            };
            (Action::MoveTask { src: id, dest }, Some(id))
        }
    };

    output.verbose_ctx("task", &format!("Committing to {}: {}", board, action));
    let (receipt, replica) = session.commit(output, &board, action.clone())?;
    let id = target.unwrap_or_else(|| last_allocated(replica.board()));

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": id,
            "action": action,
            "sequence": receipt.sequence,
            "head": receipt.head,
        }));
    } else {
        let message = match &action {
            Action::AddTask { parent, content } => {
                format!("Created task: {} - {} (under {})", id, content, parent)
            }
            Action::EditTask { content, .. } => format!("Updated task {}: {}", id, content),
            Action::RemoveTask { .. } => format!("Removed task {}", id),
            _ => format!("Moved task {}", id),
        };
        output.success(&message);
    }

    Ok(())
}
