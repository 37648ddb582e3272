//! Board CLI commands

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;

use super::output::Output;
use super::render;
use super::session::Session;
use crate::domain::{Action, BoardId, BoardView, Fingerprint};

#[derive(Subcommand)]
pub enum BoardCommands {
    /// Create a board
    ///
    /// The first board of a project becomes the default board.
    New {
        /// Board title
        title: String,

        /// Make the new board the default even if one is already set
        #[arg(long = "use")]
        make_default: bool,
    },

    /// List boards
    List,

    /// Show a board's columns and tasks
    Show,

    /// Set the default board
    Use {
        /// Board ID
        id: BoardId,
    },

    /// Rename a board
    Rename {
        /// New title
        title: String,
    },

    /// Delete a board and its history
    Delete {
        /// Board ID
        id: BoardId,
    },

    /// Show a board's action history
    History,
}

pub fn run(cmd: BoardCommands, output: &Output, board: Option<&BoardId>) -> Result<()> {
    let mut session = Session::open()?;

    match cmd {
        BoardCommands::New {
            title,
            make_default,
        } => new_board(&mut session, output, &title, make_default),
        BoardCommands::List => list_boards(&session, output),
        BoardCommands::Show => {
            let id = session.board_id(board)?;
            show_board(&session, output, &id)
        }
        BoardCommands::Use { id } => use_board(&mut session, output, id),
        BoardCommands::Rename { title } => {
            let id = session.board_id(board)?;
            let (receipt, _) = session.commit(output, &id, Action::EditBoard { title: title.clone() })?;

            if output.is_json() {
                output.data(&receipt);
            } else {
                output.success(&format!("Renamed board {} to {}", id, title));
            }
            Ok(())
        }
        BoardCommands::Delete { id } => delete_board(&mut session, output, &id),
        BoardCommands::History => {
            let id = session.board_id(board)?;
            show_history(&session, output, &id)
        }
    }
}

fn new_board(session: &mut Session, output: &Output, title: &str, make_default: bool) -> Result<()> {
    let summary = session.committer().create_board(title)?;

    let config = session.project_mut().config_mut();
    let became_default = make_default || config.project.default_board.is_none();
    if became_default {
        config.project.default_board = Some(summary.id.clone());
        config.save_project()?;
        output.verbose_ctx("board", &format!("Default board is now {}", summary.id));
    }

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": summary.id,
            "title": summary.title,
            "created_at": summary.created_at,
            "default": became_default,
        }));
    } else {
        output.success(&format!("Created board: {} - {}", summary.id, summary.title));
    }

    Ok(())
}

fn list_boards(session: &Session, output: &Output) -> Result<()> {
    let boards = session.committer().boards()?;
    let default = session.project().config().project.default_board.as_ref();

    if output.is_json() {
        let items: Vec<_> = boards
            .iter()
            .map(|b| {
                serde_json::json!({
                    "id": b.id,
                    "title": b.title,
                    "created_at": b.created_at,
                    "actions": b.actions,
                    "default": Some(&b.id) == default,
                })
            })
            .collect();
        output.data(&items);
    } else if boards.is_empty() {
        println!("No boards");
    } else {
        println!("  {:<10} {:>7}  TITLE", "ID", "ACTIONS");
        println!("{}", "-".repeat(50));

        for b in &boards {
            let marker = if Some(&b.id) == default { "*" } else { " " };
            println!("{} {:<10} {:>7}  {}", marker, b.id.to_string(), b.actions, b.title);
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct Shown<'a> {
    id: &'a BoardId,
    head: Fingerprint,
    #[serde(flatten)]
    view: BoardView,
}

fn show_board(session: &Session, output: &Output, id: &BoardId) -> Result<()> {
    let (board, head) = session.committer().materialize(id)?;
    let view = BoardView::from(&board);

    if output.is_json() {
        output.data(&Shown { id, head, view });
    } else {
        let display = &session.project().config().project.display;
        println!("{}", render::board(&view, display));
        output.verbose_ctx("board", &format!("{} at {}", id, head));
    }

    Ok(())
}

fn use_board(session: &mut Session, output: &Output, id: BoardId) -> Result<()> {
    // Fail early on a typo rather than saving a dangling default
    let history = session
        .committer()
        .history(&id)
        .with_context(|| format!("Cannot use board {}", id))?;

    let config = session.project_mut().config_mut();
    config.project.default_board = Some(id.clone());
    config.save_project()?;

    output.success(&format!(
        "Default board: {} - {}",
        id,
        history.current_title()
    ));
    Ok(())
}

fn delete_board(session: &mut Session, output: &Output, id: &BoardId) -> Result<()> {
    session.committer().delete_board(id)?;

    let config = session.project_mut().config_mut();
    if config.project.default_board.as_ref() == Some(id) {
        config.project.default_board = None;
        config.save_project()?;
        output.verbose_ctx("board", "Cleared default board");
    }

    output.success(&format!("Deleted board: {}", id));
    Ok(())
}

fn show_history(session: &Session, output: &Output, id: &BoardId) -> Result<()> {
    let history = session.committer().history(id)?;

    if output.is_json() {
        let items: Vec<_> = history
            .actions
            .iter()
            .enumerate()
            .map(|(sequence, action)| {
                serde_json::json!({
                    "sequence": sequence,
                    "action": action,
                })
            })
            .collect();
        output.data(&serde_json::json!({
            "id": history.id,
            "initial_title": history.initial_title,
            "created_at": history.created_at,
            "actions": items,
        }));
    } else {
        println!(
            "Board {} created {} as {:?}",
            history.id,
            history.created_at.format("%Y-%m-%d %H:%M"),
            history.initial_title
        );
        if history.actions.is_empty() {
            println!("No actions");
        }
        for (sequence, action) in history.actions.iter().enumerate() {
            output.row(&[&format!("{:>4}", sequence), &action.to_string()]);
        }
    }

    Ok(())
}
