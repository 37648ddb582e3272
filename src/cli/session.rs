//! Shared state for commands that touch boards

use anyhow::{Context, Result};

use super::output::Output;
use crate::domain::{Action, Board, BoardId, NodeId};
use crate::protocol::{Committer, Receipt, Replica};
use crate::storage::{HistoryStore, Project};

/// The open project and a committer over its history store
pub struct Session {
    project: Project,
    committer: Committer<Box<dyn HistoryStore>>,
}

impl Session {
    /// Opens the project containing the current directory
    pub fn open() -> Result<Self> {
        let project = Project::open_current()?;
        let committer = Committer::new(project.store()?);
        Ok(Self { project, committer })
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn project_mut(&mut self) -> &mut Project {
        &mut self.project
    }

    pub fn committer(&self) -> &Committer<Box<dyn HistoryStore>> {
        &self.committer
    }

    /// The board named by `--board`, or the project's default board
    pub fn board_id(&self, flag: Option<&BoardId>) -> Result<BoardId> {
        flag.cloned()
            .or_else(|| self.project.config().project.default_board.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("No board selected. Pass --board or run 'boardlog board use <id>'.")
            })
    }

    /// A fresh local copy of a board
    pub fn replica(&self, board: &BoardId) -> Result<Replica> {
        let history = self.committer.history(board)?;
        Ok(Replica::new(history)?)
    }

    /// Proposes `action` the way a remote client would: fetch, validate
    /// locally, fingerprint, propose. A stale rejection refetches and tries
    /// again up to `stale_retries` times.
    ///
    /// Returns the receipt and the local copy with the action folded in.
    pub fn commit(&self, output: &Output, board: &BoardId, action: Action) -> Result<(Receipt, Replica)> {
        let retries = self.project.config().project.stale_retries;
        let mut attempt = 0;

        loop {
            let mut replica = self.replica(board)?;
            let request = replica
                .prepare(action.clone())
                .with_context(|| format!("Cannot {}", action))?;

            output.verbose_ctx(
                "commit",
                &format!(
                    "Proposing {} at position {} with {}",
                    action.tag(),
                    replica.history().actions.len(),
                    request.fingerprint.short()
                ),
            );

            match self
                .committer
                .propose(&request.board, request.action, &request.fingerprint)
            {
                Ok(receipt) => {
                    replica.confirm(action)?;
                    return Ok((receipt, replica));
                }
                Err(e) if e.is_stale() && attempt < retries => {
                    attempt += 1;
                    output.verbose_ctx(
                        "commit",
                        &format!("{}; refetching (retry {} of {})", e, attempt, retries),
                    );
                }
                Err(e) => return Err(e).with_context(|| format!("Cannot {}", action)),
            }
        }
    }
}

/// The id handed out by the most recent add on `board`
pub fn last_allocated(board: &Board) -> NodeId {
    NodeId::new(board.next_id().value().saturating_sub(1))
}
