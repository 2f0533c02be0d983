//! Tasktree library crate
//!
//! This library provides a hierarchical to-do tracker: a pure reducer over an
//! arena-backed task tree, a shared store that serializes commands, and HTTP and
//! command-line surfaces on top of it.

pub mod api;
pub mod cli;
pub mod models;
pub mod store;
pub mod view;

// Re-export the main types for convenience
pub use models::{
    reduce, Command, Direction, InsertPolicy, IntegrityError, RestoreRecord, Task, TaskId,
    TodoState, INSERT_POLICY, ROOT_ID,
};
pub use store::{Store, StoreError, StoreResponse, TransitionLogEntry};
pub use view::{LogBookEntry, TaskTreeNode, TreeView};
