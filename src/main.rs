//! boardlog - Hash-chained kanban boards with optimistic commits

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = boardlog::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
