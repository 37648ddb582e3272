//! Flat snapshot of a board
//!
//! [`BoardView`] turns the linked tree into plain vectors. Each column lists
//! its tasks in pre-order with their nesting depth, so a task's sub-tasks
//! follow it directly at `depth + 1`. Pre-order plus depth pins down the
//! shape, which makes two boards structurally identical exactly when their
//! views are equal. Nothing here recurses, so tasks may nest arbitrarily
//! deep.

use serde::Serialize;

use super::id::NodeId;
use super::tree::Board;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardView {
    pub title: String,
    pub next_id: NodeId,
    pub columns: Vec<ColumnView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnView {
    pub id: NodeId,
    pub title: String,
    /// Every task of the column, depth-first
    pub tasks: Vec<TaskView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskView {
    pub id: NodeId,
    pub content: String,
    /// 0 for a column's own tasks, 1 for their sub-tasks, and so on
    pub depth: usize,
}

impl BoardView {
    /// Total number of tasks at every depth
    pub fn task_count(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }
}

impl ColumnView {
    /// Tasks sitting directly in the column
    pub fn top_level(&self) -> impl Iterator<Item = &TaskView> {
        self.tasks.iter().filter(|t| t.depth == 0)
    }
}

fn tasks_of(board: &Board, column: NodeId) -> Vec<TaskView> {
    let mut out = Vec::new();
    let mut pending: Vec<(NodeId, usize)> = Vec::new();

    let push_children = |pending: &mut Vec<(NodeId, usize)>, parent: NodeId, depth: usize| {
        let start = pending.len();
        pending.extend(board.children(parent).map(|task| (task.id(), depth)));
        pending[start..].reverse();
    };

    push_children(&mut pending, column, 0);
    while let Some((id, depth)) = pending.pop() {
        let Some(task) = board.get(id) else {
            continue;
        };
        out.push(TaskView {
            id,
            content: task.text().to_string(),
            depth,
        });
        push_children(&mut pending, id, depth + 1);
    }

    out
}

impl From<&Board> for BoardView {
    fn from(board: &Board) -> Self {
        Self {
            title: board.title().to_string(),
            next_id: board.next_id(),
            columns: board
                .columns()
                .map(|column| ColumnView {
                    id: column.id(),
                    title: column.text().to_string(),
                    tasks: tasks_of(board, column.id()),
                })
                .collect(),
        }
    }
}
