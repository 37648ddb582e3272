//! Text rendering of boards

use crate::domain::{BoardView, NodeId};
use crate::storage::DisplayConfig;

fn label(text: &str, id: NodeId, display: &DisplayConfig) -> String {
    if display.show_ids {
        format!("{} {}", text, id)
    } else {
        text.to_string()
    }
}

/// Renders a board as an indented outline
///
/// ```text
/// Roadmap
///
/// Todo #0
///   - write spec #1
///     - outline #2
/// Done #3
///   (empty)
/// ```
pub fn board(view: &BoardView, display: &DisplayConfig) -> String {
    let mut out = vec![view.title.clone(), String::new()];

    if view.columns.is_empty() {
        out.push("(no columns)".to_string());
    }

    for column in &view.columns {
        out.push(label(&column.title, column.id, display));
        if column.tasks.is_empty() {
            out.push(format!("{}(empty)", " ".repeat(display.indent)));
        }
        for task in &column.tasks {
            out.push(format!(
                "{}- {}",
                " ".repeat((task.depth + 1) * display.indent),
                label(&task.content, task.id, display)
            ));
        }
    }

    out.join("\n")
}
