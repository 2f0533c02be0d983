//! Client trait definition
//!
//! This module defines the `Client` trait that abstracts over different client implementations.

use crate::models::{Command, Direction, TaskId, TodoState};
use crate::store::{StoreError, StoreResponse, TransitionLogEntry};
use crate::view::TreeView;

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Missing data in response")]
    MissingData,

    #[error("Task {0} not found")]
    TaskNotFound(TaskId),
}

/// Convert StoreError to ClientError for interface compatibility
impl From<StoreError> for ClientError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::TaskNotFound(id) => ClientError::TaskNotFound(id),
            other => ClientError::Api(other.to_string()),
        }
    }
}

/// Shorthand for the reply to a command
pub type CommandResult = Result<StoreResponse<TodoState>, ClientError>;

/// Trait defining the API client interface for the tasktree service
#[async_trait::async_trait]
pub trait Client {
    /// Get the full state
    async fn get_state(&self) -> CommandResult;

    /// Get the renderer view
    async fn get_view(&self) -> Result<TreeView, ClientError>;

    /// Get the recent state transitions
    async fn get_history(&self) -> Result<Vec<TransitionLogEntry>, ClientError>;

    /// Send any command
    async fn dispatch(&self, command: Command) -> CommandResult;

    /// Add a task under the current selection
    async fn add_task(&self, title: String) -> CommandResult;

    /// Delete a task, moving it to the log-book
    async fn delete_task(&self, id: TaskId) -> CommandResult;

    /// Restore the most recently deleted task
    async fn restore_task(&self) -> CommandResult;

    /// Permanently drop every deleted task
    async fn empty_completed_tasks(&self) -> CommandResult;

    /// Expand or collapse a task's children
    async fn toggle_sub_tasks_open(&self, id: TaskId) -> CommandResult;

    /// Toggle the log-book, or set it when `force` is given
    async fn toggle_log_book_open(&self, force: Option<bool>) -> CommandResult;

    /// Move the selection one step
    async fn select(&self, direction: Direction) -> CommandResult;

    /// Jump the selection to a task
    async fn select_task(&self, id: TaskId) -> CommandResult;
}
