//! Domain models for boardlog
//!
//! The board tree, the edit actions that change it, and the fingerprint
//! that summarizes a history of actions. No I/O happens here.

mod id;
mod tree;
mod action;
mod engine;
mod fingerprint;
mod view;

pub use id::{BoardId, IdError, NodeId};
pub use tree::{Board, Node, NodeKind, Siblings};
pub use action::{Action, ColumnPosition, TaskPosition};
pub use engine::{execute, replay, EngineError, ErrorKind, ReplayError};
pub use fingerprint::{fingerprint, Fingerprint, FingerprintError, HashChain};
pub use view::{BoardView, ColumnView, TaskView};
