//! Commit request and response records
//!
//! ```json
//! {"board":"b-1a2b3c4","action":{"tag":"add_column","title":"Todo"},"fingerprint":"9f…"}
//! {"ok":true,"message":"success","sequence":0,"head":"9f…"}
//! {"ok":false,"message":"Stale history for b-1a2b3c4: …","rejection":"stale_fingerprint"}
//! ```

use serde::{Deserialize, Serialize};

use super::commit::Receipt;
use super::{CommitError, CommitErrorKind};
use crate::domain::{Action, BoardId, Fingerprint};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRequest {
    pub board: BoardId,
    pub action: Action,
    /// Fingerprint of the client's history extended by `action`
    pub fingerprint: Fingerprint,
}

/// Why a commit was turned down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    StaleFingerprint,
    BoardNotFound,
    InvalidAction,
    StorageUnavailable,
}

impl From<CommitErrorKind> for Rejection {
    fn from(kind: CommitErrorKind) -> Self {
        match kind {
            CommitErrorKind::StaleHistory => Rejection::StaleFingerprint,
            CommitErrorKind::BoardNotFound => Rejection::BoardNotFound,
            CommitErrorKind::NotFound | CommitErrorKind::StructuralPrecondition => {
                Rejection::InvalidAction
            }
            CommitErrorKind::StorageUnavailable => Rejection::StorageUnavailable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResponse {
    pub ok: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Fingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
}

impl CommitResponse {
    pub fn accepted(receipt: &Receipt) -> Self {
        Self {
            ok: true,
            message: "success".to_string(),
            sequence: Some(receipt.sequence),
            head: Some(receipt.head),
            rejection: None,
        }
    }

    pub fn rejected(err: &CommitError) -> Self {
        Self {
            ok: false,
            message: err.to_string(),
            sequence: None,
            head: None,
            rejection: Some(err.kind().into()),
        }
    }

    /// True when the client should refresh its history and retry
    pub fn is_stale(&self) -> bool {
        self.rejection == Some(Rejection::StaleFingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{fingerprint, EngineError, NodeId};
    use chrono::Utc;

    #[test]
    fn accepted_response_shape() {
        let head = fingerprint("Board", &Vec::<Action>::new()).unwrap();
        let receipt = Receipt {
            board: BoardId::new("Board", Utc::now()),
            sequence: 4,
            head,
        };

        let json = serde_json::to_value(CommitResponse::accepted(&receipt)).unwrap();

        assert_eq!(json["ok"], true);
        assert_eq!(json["message"], "success");
        assert_eq!(json["sequence"], 4);
        assert_eq!(json["head"], head.to_string());
        assert!(json.get("rejection").is_none());
    }

    #[test]
    fn rejection_names() {
        let stale = CommitError::StaleHistory {
            board: BoardId::new("Board", Utc::now()),
            len: 2,
        };
        let json = serde_json::to_value(CommitResponse::rejected(&stale)).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["rejection"], "stale_fingerprint");
        assert!(json.get("sequence").is_none());

        let invalid = CommitError::Rejected(EngineError::ColumnNotFound(NodeId::new(9)));
        let response = CommitResponse::rejected(&invalid);
        assert_eq!(response.rejection, Some(Rejection::InvalidAction));
        assert!(!response.is_stale());
    }

    #[test]
    fn request_parses_from_json() {
        let head = fingerprint("Board", &Vec::<Action>::new()).unwrap();
        let raw = format!(
            r#"{{"board":"b-00ff00a","action":{{"tag":"edit_board","title":"New"}},"fingerprint":"{}"}}"#,
            head
        );

        let request: CommitRequest = serde_json::from_str(&raw).unwrap();

        assert_eq!(request.board.to_string(), "b-00ff00a");
        assert_eq!(request.action, Action::EditBoard { title: "New".into() });
        assert_eq!(request.fingerprint, head);
    }
}
