//! Raw protocol commands: fingerprints and wire-level commits

use anyhow::{Context, Result};

use super::output::Output;
use super::session::Session;
use crate::domain::{Action, BoardId, Fingerprint};
use crate::protocol::CommitRequest;

fn parse_action(raw: &str) -> Result<Action> {
    serde_json::from_str(raw).with_context(|| format!("Invalid action JSON: {}", raw))
}

/// Prints the fingerprint of a board's history, optionally extended by one
/// more action
pub fn fingerprint(output: &Output, board: Option<&BoardId>, with: Option<&str>) -> Result<()> {
    let session = Session::open()?;
    let board = session.board_id(board)?;
    let mut replica = session.replica(&board)?;

    let (head, length) = match with {
        Some(raw) => {
            let action = parse_action(raw)?;
            let request = replica
                .prepare(action.clone())
                .with_context(|| format!("Cannot {}", action))?;
            replica.confirm(action)?;
            (request.fingerprint, replica.history().actions.len())
        }
        None => (replica.head(), replica.history().actions.len()),
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "board": board,
            "length": length,
            "fingerprint": head,
        }));
    } else {
        println!("{}", head);
    }

    Ok(())
}

/// Proposes one action with a caller-supplied fingerprint
pub fn commit(output: &Output, board: Option<&BoardId>, action: &str, fingerprint: &str) -> Result<()> {
    let session = Session::open()?;
    let board = session.board_id(board)?;

    let request = CommitRequest {
        board,
        action: parse_action(action)?,
        fingerprint: fingerprint
            .parse::<Fingerprint>()
            .context("Invalid fingerprint")?,
    };
    output.verbose_ctx("commit", &format!("Proposing {} to {}", request.action, request.board));

    let response = session.committer().handle(request);

    if output.is_json() {
        output.data(&response);
    }

    if !response.ok {
        anyhow::bail!("{}", response.message);
    }

    if !output.is_json() {
        let sequence = response.sequence.unwrap_or_default();
        match response.head {
            Some(head) => output.success(&format!("Accepted as action {} ({})", sequence, head)),
            None => output.success(&format!("Accepted as action {}", sequence)),
        }
    }

    Ok(())
}
