//! Board edit actions
//!
//! An [`Action`] is one edit in a board's history. Actions travel as tagged
//! JSON records, e.g. `{"tag":"add_task","parent":0,"content":"write spec"}`.
//!
//! The serialized form doubles as the canonical encoding hashed into the
//! history fingerprint, so field order here is part of the wire contract:
//! `tag` first, then fields in declaration order, no whitespace.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::NodeId;

/// Where a moved task lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum TaskPosition {
    /// First child of a column or task
    FirstChildOf { parent: NodeId },
    /// Directly after a sibling task
    After { sibling: NodeId },
}

/// Where a moved column lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum ColumnPosition {
    /// First column of the board
    FirstChild,
    /// Directly after a sibling column
    After { sibling: NodeId },
}

/// One edit against a board
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum Action {
    AddColumn { title: String },
    AddTask { parent: NodeId, content: String },
    RemoveColumn { target: NodeId },
    RemoveTask { target: NodeId },
    MoveTask { src: NodeId, dest: TaskPosition },
    MoveColumn { src: NodeId, dest: ColumnPosition },
    EditTask { target: NodeId, content: String },
    EditColumn { target: NodeId, title: String },
    EditBoard { title: String },
}

impl Action {
    /// The wire tag of this action
    pub fn tag(&self) -> &'static str {
        match self {
            Action::AddColumn { .. } => "add_column",
            Action::AddTask { .. } => "add_task",
            Action::RemoveColumn { .. } => "remove_column",
            Action::RemoveTask { .. } => "remove_task",
            Action::MoveTask { .. } => "move_task",
            Action::MoveColumn { .. } => "move_column",
            Action::EditTask { .. } => "edit_task",
            Action::EditColumn { .. } => "edit_column",
            Action::EditBoard { .. } => "edit_board",
        }
    }

    /// Canonical JSON bytes: the exact bytes hashed into a fingerprint
    pub fn canonical_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// The board title this action sets, if it renames the board
    pub fn board_title(&self) -> Option<&str> {
        match self {
            Action::EditBoard { title } => Some(title),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::AddColumn { title } => write!(f, "add column {:?}", title),
            Action::AddTask { parent, content } => {
                write!(f, "add task {:?} under {}", content, parent)
            }
            Action::RemoveColumn { target } => write!(f, "remove column {}", target),
            Action::RemoveTask { target } => write!(f, "remove task {}", target),
            Action::MoveTask { src, dest } => match dest {
                TaskPosition::FirstChildOf { parent } => {
                    write!(f, "move task {} to top of {}", src, parent)
                }
                TaskPosition::After { sibling } => {
                    write!(f, "move task {} after {}", src, sibling)
                }
            },
            Action::MoveColumn { src, dest } => match dest {
                ColumnPosition::FirstChild => write!(f, "move column {} to front", src),
                ColumnPosition::After { sibling } => {
                    write!(f, "move column {} after {}", src, sibling)
                }
            },
            Action::EditTask { target, content } => {
                write!(f, "edit task {} to {:?}", target, content)
            }
            Action::EditColumn { target, title } => {
                write!(f, "rename column {} to {:?}", target, title)
            }
            Action::EditBoard { title } => write!(f, "rename board to {:?}", title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> NodeId {
        NodeId::new(n)
    }

    #[test]
    fn canonical_json_puts_tag_first_without_whitespace() {
        let action = Action::AddTask {
            parent: id(0),
            content: "write spec".to_string(),
        };

        let json = String::from_utf8(action.canonical_json().unwrap()).unwrap();
        assert_eq!(json, r#"{"tag":"add_task","parent":0,"content":"write spec"}"#);
    }

    #[test]
    fn positions_use_documented_shapes() {
        let into = Action::MoveTask {
            src: id(3),
            dest: TaskPosition::FirstChildOf { parent: id(0) },
        };
        let front = Action::MoveColumn {
            src: id(1),
            dest: ColumnPosition::FirstChild,
        };
        let after = Action::MoveColumn {
            src: id(1),
            dest: ColumnPosition::After { sibling: id(2) },
        };

        assert_eq!(
            serde_json::to_string(&into).unwrap(),
            r#"{"tag":"move_task","src":3,"dest":{"tag":"first_child_of","parent":0}}"#
        );
        assert_eq!(
            serde_json::to_string(&front).unwrap(),
            r#"{"tag":"move_column","src":1,"dest":{"tag":"first_child"}}"#
        );
        assert_eq!(
            serde_json::to_string(&after).unwrap(),
            r#"{"tag":"move_column","src":1,"dest":{"tag":"after","sibling":2}}"#
        );
    }

    #[test]
    fn parses_client_json_regardless_of_field_order() {
        let parsed: Action =
            serde_json::from_str(r#"{ "content": "x", "parent": 4, "tag": "add_task" }"#).unwrap();

        assert_eq!(
            parsed,
            Action::AddTask {
                parent: id(4),
                content: "x".to_string()
            }
        );
        // Re-encoding normalizes the order
        assert_eq!(
            parsed.canonical_json().unwrap(),
            br#"{"tag":"add_task","parent":4,"content":"x"}"#.to_vec()
        );
    }

    #[test]
    fn rejects_unknown_tags() {
        assert!(serde_json::from_str::<Action>(r#"{"tag":"merge","target":1}"#).is_err());
        assert!(serde_json::from_str::<Action>(r#"{"tag":"remove_task"}"#).is_err());
    }

    #[test]
    fn tag_matches_serialized_tag() {
        let actions = [
            Action::AddColumn { title: "a".into() },
            Action::RemoveColumn { target: id(0) },
            Action::RemoveTask { target: id(1) },
            Action::EditTask {
                target: id(1),
                content: "c".into(),
            },
            Action::EditColumn {
                target: id(0),
                title: "t".into(),
            },
            Action::EditBoard { title: "b".into() },
        ];

        for action in actions {
            let value = serde_json::to_value(&action).unwrap();
            assert_eq!(value["tag"], action.tag());
        }
    }

    #[test]
    fn board_title_only_for_edit_board() {
        assert_eq!(
            Action::EditBoard { title: "New".into() }.board_title(),
            Some("New")
        );
        assert_eq!(Action::AddColumn { title: "New".into() }.board_title(), None);
    }

    #[test]
    fn display_is_human_readable() {
        let action = Action::MoveTask {
            src: id(5),
            dest: TaskPosition::After { sibling: id(2) },
        };
        assert_eq!(action.to_string(), "move task #5 after #2");
    }
}
