//! boardlog - Hash-chained kanban boards with optimistic concurrency
//!
//! A board is a title plus an ordered history of edit actions; its columns
//! and nested tasks are rebuilt by replaying that history. Writers commit
//! one action at a time and prove they saw the whole history by sending its
//! fingerprint, so concurrent edits are serialized first-writer-wins.
//!
//! - [`domain`]: board tree, actions, execution engine, fingerprints
//! - [`storage`]: persisted histories, configuration, projects
//! - [`protocol`]: the commit protocol and client replicas
//! - [`cli`]: the `boardlog` command line

pub mod domain;
pub mod storage;
pub mod protocol;
pub mod cli;

pub use domain::{Action, Board, BoardId, Fingerprint, NodeId};
pub use protocol::{CommitError, Committer, Replica};
