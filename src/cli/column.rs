//! Column CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use super::session::{last_allocated, Session};
use crate::domain::{Action, BoardId, ColumnPosition, NodeId};

#[derive(Subcommand)]
pub enum ColumnCommands {
    /// Add a column at the end of the board
    Add {
        /// Column title
        title: String,
    },

    /// Rename a column
    Rename {
        /// Column ID (e.g. 3 or #3)
        id: NodeId,

        /// New title
        title: String,
    },

    /// Remove a column with all its tasks
    Rm {
        /// Column ID
        id: NodeId,
    },

    /// Move a column
    ///
    /// Examples:
    ///   boardlog column mv 3             # Make #3 the first column
    ///   boardlog column mv 3 --after 0   # Put #3 right after #0
    Mv {
        /// Column ID
        id: NodeId,

        /// Column to place it after (omit to make it the first column)
        #[arg(long)]
        after: Option<NodeId>,
    },
}

pub fn run(cmd: ColumnCommands, output: &Output, board: Option<&BoardId>) -> Result<()> {
    let session = Session::open()?;
    let board = session.board_id(board)?;

    // `None` means the action allocates the id
    let (action, target) = match cmd {
        ColumnCommands::Add { title } => (Action::AddColumn { title }, None),
        ColumnCommands::Rename { id, title } => (Action::EditColumn { target: id, title }, Some(id)),
        ColumnCommands::Rm { id } => (Action::RemoveColumn { target: id }, Some(id)),
        ColumnCommands::Mv { id, after } => {
            let dest = match after {
                Some(sibling) => ColumnPosition::After { sibling },
                None => ColumnPosition::FirstChild,
            };
            (Action::MoveColumn { src: id, dest }, Some(id))
        }
    };

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
            Action::AddColumn { title } => format!("Added column {} - {}", id, title),
            Action::EditColumn { title, .. } => format!("Renamed column {} to {}", id, title),
            Action::RemoveColumn { .. } => format!("Removed column {}", id),
            _ => format!("Moved column {}", id),
        };
        output.success(&message);
    }

    Ok(())
}
