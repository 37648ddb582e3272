//! Action execution engine
//!
//! Applies one [`Action`] to a live [`Board`]. Every transition resolves all
//! the ids it needs before touching a link, so a failed action leaves the
//! board exactly as it was.

use thiserror::Error;

use super::action::{Action, ColumnPosition, TaskPosition};
use super::id::NodeId;
use super::tree::{Board, NodeKind, Parent};

/// Broad class of an engine failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An id did not resolve to a node of the expected kind
    NotFound,
    /// The board's shape does not allow the action
    StructuralPrecondition,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("Column not found: {0}")]
    ColumnNotFound(NodeId),

    #[error("Task not found: {0}")]
    TaskNotFound(NodeId),

    #[error("No column or task {0} to hold tasks")]
    ParentNotFound(NodeId),

    #[error("Cannot {action} on a board without columns")]
    EmptyBoard { action: &'static str },

    #[error("Cannot move {src} into itself or its own subtree (destination {dest})")]
    MoveIntoSubtree { src: NodeId, dest: NodeId },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::ColumnNotFound(_)
            | EngineError::TaskNotFound(_)
            | EngineError::ParentNotFound(_) => ErrorKind::NotFound,
            EngineError::EmptyBoard { .. } | EngineError::MoveIntoSubtree { .. } => {
                ErrorKind::StructuralPrecondition
            }
        }
    }
}

/// Applies `action` to `board`, or fails leaving it untouched
pub fn execute(board: &mut Board, action: &Action) -> Result<(), EngineError> {
    match action {
        Action::AddColumn { title } => {
            let column = board.spawn(NodeKind::Column, title.as_str());
            board.insert_last_child(Parent::Root, column);
        }

        Action::AddTask { parent, content } => {
            require_columns(board, action)?;
            let parent = board
                .find_container(*parent)
                .ok_or(EngineError::ParentNotFound(*parent))?;
            let task = board.spawn(NodeKind::Task, content.as_str());
            board.insert_last_child(Parent::Node(parent), task);
        }

        Action::RemoveColumn { target } => {
            require_columns(board, action)?;
            board
                .find_column(*target)
                .ok_or(EngineError::ColumnNotFound(*target))?;
            let removed = board
                .remove_by_id(Parent::Root, *target)
                .ok_or(EngineError::ColumnNotFound(*target))?;
            board.drop_subtree(removed);
        }

        Action::RemoveTask { target } => {
            require_columns(board, action)?;
            board
                .find_task(*target)
                .ok_or(EngineError::TaskNotFound(*target))?;
            let removed = board
                .remove_by_id(Parent::Root, *target)
                .ok_or(EngineError::TaskNotFound(*target))?;
            board.drop_subtree(removed);
        }

        Action::MoveTask { src, dest } => {
            require_columns(board, action)?;
            let src_slot = board
                .find_task(*src)
                .ok_or(EngineError::TaskNotFound(*src))?;

            let (anchor, anchor_id) = match dest {
                TaskPosition::FirstChildOf { parent } => (
                    board
                        .find_container(*parent)
                        .ok_or(EngineError::ParentNotFound(*parent))?,
                    *parent,
                ),
                TaskPosition::After { sibling } => (
                    board
                        .find_task(*sibling)
                        .ok_or(EngineError::TaskNotFound(*sibling))?,
                    *sibling,
                ),
            };
            if board.is_within(src_slot, anchor) {
                return Err(EngineError::MoveIntoSubtree {
                    src: *src,
                    dest: anchor_id,
                });
            }

            let moved = board
                .remove_by_id(Parent::Root, *src)
                .ok_or(EngineError::TaskNotFound(*src))?;
            match dest {
                TaskPosition::FirstChildOf { .. } => {
                    board.insert_first_child(Parent::Node(anchor), moved)
                }
                TaskPosition::After { .. } => board.insert_after(anchor, moved),
            }
        }

        Action::MoveColumn { src, dest } => {
            require_columns(board, action)?;
            board
                .find_column(*src)
                .ok_or(EngineError::ColumnNotFound(*src))?;

            let anchor = match dest {
                ColumnPosition::FirstChild => None,
                ColumnPosition::After { sibling } => {
                    if sibling == src {
                        return Err(EngineError::MoveIntoSubtree {
                            src: *src,
                            dest: *sibling,
                        });
                    }
                    Some(
                        board
                            .find_column(*sibling)
                            .ok_or(EngineError::ColumnNotFound(*sibling))?,
                    )
                }
            };

            let moved = board
                .remove_by_id(Parent::Root, *src)
                .ok_or(EngineError::ColumnNotFound(*src))?;
            match anchor {
                None => board.insert_first_child(Parent::Root, moved),
                Some(anchor) => board.insert_after(anchor, moved),
            }
        }

        Action::EditTask { target, content } => {
            require_columns(board, action)?;
            let slot = board
                .find_task(*target)
                .ok_or(EngineError::TaskNotFound(*target))?;
            board.node_mut(slot).set_text(content.as_str());
        }

        Action::EditColumn { target, title } => {
            require_columns(board, action)?;
            let slot = board
                .find_column(*target)
                .ok_or(EngineError::ColumnNotFound(*target))?;
            board.node_mut(slot).set_text(title.as_str());
        }

        Action::EditBoard { title } => board.set_title(title.as_str()),
    }

    Ok(())
}

fn require_columns(board: &Board, action: &Action) -> Result<(), EngineError> {
    if board.is_empty() {
        return Err(EngineError::EmptyBoard {
            action: action.tag(),
        });
    }
    Ok(())
}

/// Rebuilds a board by replaying `actions` from an empty board
pub fn replay<'a>(
    initial_title: &str,
    actions: impl IntoIterator<Item = &'a Action>,
) -> Result<Board, ReplayError> {
    let mut board = Board::new(initial_title);
    for (index, action) in actions.into_iter().enumerate() {
        execute(&mut board, action).map_err(|source| ReplayError { index, source })?;
    }
    Ok(board)
}

/// A history that cannot be replayed: the action at `index` failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Action {index} of history cannot be replayed: {source}")]
pub struct ReplayError {
    pub index: usize,
    #[source]
    pub source: EngineError,
}

impl Board {
    /// Applies one action; see [`execute`]
    pub fn apply(&mut self, action: &Action) -> Result<(), EngineError> {
        execute(self, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::view::BoardView;

    fn id(n: u64) -> NodeId {
        NodeId::new(n)
    }

    fn add_column(title: &str) -> Action {
        Action::AddColumn {
            title: title.to_string(),
        }
    }

    fn add_task(parent: u64, content: &str) -> Action {
        Action::AddTask {
            parent: id(parent),
            content: content.to_string(),
        }
    }

    fn ids<'a>(iter: impl Iterator<Item = &'a crate::domain::Node>) -> Vec<u64> {
        iter.map(|n| n.id().value()).collect()
    }

    /// Column 0 with tasks 1, 2 (2 has sub-task 4), column 3 empty
    fn sample() -> Board {
        replay(
            "Board",
            &[
                add_column("Todo"),
                add_task(0, "one"),
                add_task(0, "two"),
                add_column("Done"),
                add_task(2, "two.a"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn scenario_add_column_then_task() {
        let mut board = Board::new("Board");

        board.apply(&add_column("Todo")).unwrap();
        let column = board.columns().next().unwrap();
        assert_eq!(column.id(), id(0));
        assert_eq!(column.text(), "Todo");

        board.apply(&add_task(0, "write spec")).unwrap();
        let task = board.children(id(0)).next().unwrap();
        assert_eq!(task.id(), id(1));
        assert_eq!(task.text(), "write spec");
    }

    #[test]
    fn scenario_remove_head_task() {
        let mut board = replay(
            "Board",
            &[add_column("Todo"), add_task(0, "one"), add_task(0, "two")],
        )
        .unwrap();

        board.apply(&Action::RemoveTask { target: id(1) }).unwrap();

        assert_eq!(ids(board.children(id(0))), vec![2]);
        assert!(board.get(id(1)).is_none());
        assert_eq!(board.get(id(2)).unwrap().text(), "two");
    }

    #[test]
    fn scenario_move_column_to_front() {
        let mut board = replay("Board", &[add_column("A"), add_column("B")]).unwrap();

        board
            .apply(&Action::MoveColumn {
                src: id(1),
                dest: ColumnPosition::FirstChild,
            })
            .unwrap();

        assert_eq!(ids(board.columns()), vec![1, 0]);
    }

    #[test]
    fn add_task_nests_under_task() {
        let board = sample();

        assert_eq!(ids(board.children(id(2))), vec![4]);
        assert_eq!(board.next_id(), id(5));
    }

    #[test]
    fn add_task_to_missing_parent_fails() {
        let mut board = sample();
        let err = board.apply(&add_task(42, "x")).unwrap_err();

        assert_eq!(err, EngineError::ParentNotFound(id(42)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(board.next_id(), id(5), "no id consumed by a failed add");
    }

    #[test]
    fn structural_actions_on_empty_board_fail() {
        let mut board = Board::new("Empty");

        for action in [
            add_task(0, "x"),
            Action::RemoveTask { target: id(0) },
            Action::RemoveColumn { target: id(0) },
            Action::MoveTask {
                src: id(0),
                dest: TaskPosition::FirstChildOf { parent: id(1) },
            },
            Action::EditColumn {
                target: id(0),
                title: "x".into(),
            },
        ] {
            let err = board.apply(&action).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::StructuralPrecondition, "{action}");
        }
        assert!(board.is_empty());
    }

    #[test]
    fn remove_column_drops_its_tasks() {
        let mut board = sample();

        board.apply(&Action::RemoveColumn { target: id(0) }).unwrap();

        assert_eq!(ids(board.columns()), vec![3]);
        for gone in [0, 1, 2, 4] {
            assert!(board.get(id(gone)).is_none());
        }
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn remove_with_wrong_kind_is_not_found() {
        let mut board = sample();
        let before = BoardView::from(&board);

        assert_eq!(
            board.apply(&Action::RemoveTask { target: id(0) }),
            Err(EngineError::TaskNotFound(id(0)))
        );
        assert_eq!(
            board.apply(&Action::RemoveColumn { target: id(1) }),
            Err(EngineError::ColumnNotFound(id(1)))
        );
        assert_eq!(BoardView::from(&board), before);
    }

    #[test]
    fn move_task_into_other_column_as_first_child() {
        let mut board = sample();

        board
            .apply(&Action::MoveTask {
                src: id(2),
                dest: TaskPosition::FirstChildOf { parent: id(3) },
            })
            .unwrap();

        assert_eq!(ids(board.children(id(0))), vec![1]);
        assert_eq!(ids(board.children(id(3))), vec![2]);
        assert_eq!(ids(board.children(id(2))), vec![4], "subtree moves along");
    }

    #[test]
    fn move_task_after_sibling() {
        let mut board = sample();

        board
            .apply(&Action::MoveTask {
                src: id(1),
                dest: TaskPosition::After { sibling: id(2) },
            })
            .unwrap();
        assert_eq!(ids(board.children(id(0))), vec![2, 1]);

        board
            .apply(&Action::MoveTask {
                src: id(1),
                dest: TaskPosition::After { sibling: id(4) },
            })
            .unwrap();
        assert_eq!(ids(board.children(id(0))), vec![2]);
        assert_eq!(ids(board.children(id(2))), vec![4, 1]);
    }

    #[test]
    fn move_task_into_own_subtree_is_rejected() {
        let mut board = sample();
        let before = BoardView::from(&board);

        let into_child = board.apply(&Action::MoveTask {
            src: id(2),
            dest: TaskPosition::FirstChildOf { parent: id(4) },
        });
        let after_self = board.apply(&Action::MoveTask {
            src: id(2),
            dest: TaskPosition::After { sibling: id(2) },
        });

        assert_eq!(
            into_child,
            Err(EngineError::MoveIntoSubtree {
                src: id(2),
                dest: id(4)
            })
        );
        assert!(after_self.is_err());
        assert_eq!(BoardView::from(&board), before);
    }

    #[test]
    fn move_task_to_missing_destination_keeps_task() {
        let mut board = sample();
        let before = BoardView::from(&board);

        let result = board.apply(&Action::MoveTask {
            src: id(1),
            dest: TaskPosition::After { sibling: id(99) },
        });

        assert_eq!(result, Err(EngineError::TaskNotFound(id(99))));
        assert_eq!(BoardView::from(&board), before);
    }

    #[test]
    fn move_task_after_column_is_not_found() {
        let mut board = sample();

        let result = board.apply(&Action::MoveTask {
            src: id(1),
            dest: TaskPosition::After { sibling: id(3) },
        });

        assert_eq!(result, Err(EngineError::TaskNotFound(id(3))));
    }

    #[test]
    fn move_column_after_sibling() {
        let mut board = replay("B", &[add_column("A"), add_column("B"), add_column("C")]).unwrap();

        board
            .apply(&Action::MoveColumn {
                src: id(0),
                dest: ColumnPosition::After { sibling: id(2) },
            })
            .unwrap();
        assert_eq!(ids(board.columns()), vec![1, 2, 0]);

        assert!(board
            .apply(&Action::MoveColumn {
                src: id(1),
                dest: ColumnPosition::After { sibling: id(1) },
            })
            .is_err());
        assert_eq!(ids(board.columns()), vec![1, 2, 0]);
    }

    #[test]
    fn edits_change_text_only() {
        let mut board = sample();

        board
            .apply(&Action::EditTask {
                target: id(2),
                content: "second".into(),
            })
            .unwrap();
        board
            .apply(&Action::EditColumn {
                target: id(3),
                title: "Shipped".into(),
            })
            .unwrap();
        board
            .apply(&Action::EditBoard {
                title: "Renamed".into(),
            })
            .unwrap();

        assert_eq!(board.get(id(2)).unwrap().text(), "second");
        assert_eq!(board.get(id(3)).unwrap().text(), "Shipped");
        assert_eq!(board.title(), "Renamed");
        assert_eq!(ids(board.children(id(2))), vec![4]);
        assert_eq!(
            board.apply(&Action::EditTask {
                target: id(3),
                content: "x".into()
            }),
            Err(EngineError::TaskNotFound(id(3)))
        );
    }

    #[test]
    fn replay_reports_failing_index() {
        let err = replay("B", &[add_column("A"), add_task(9, "x")]).unwrap_err();

        assert_eq!(err.index, 1);
        assert_eq!(err.source, EngineError::ParentNotFound(id(9)));
    }

    #[test]
    fn ids_are_never_reused_after_removal() {
        let mut board = sample();
        board.apply(&Action::RemoveTask { target: id(4) }).unwrap();
        board.apply(&add_task(0, "fresh")).unwrap();

        assert!(board.get(id(4)).is_none());
        assert_eq!(board.get(id(5)).unwrap().text(), "fresh");
    }
}
