//! Core client implementation
//!
//! This module provides a client implementation that wraps a Store directly,
//! providing the same interface as HttpClientImpl but without HTTP overhead.

use super::trait_def::CommandResult;
use super::{Client, ClientError};
use crate::models::{Command, Direction, TaskId};
use crate::store::TransitionLogEntry;
use crate::view::TreeView;
use crate::Store;

/// A client implementation that wraps a Store directly
#[derive(Clone)]
pub struct CoreClient {
    store: Store,
}

impl CoreClient {
    /// Create a new CoreClient with the given Store instance
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Client for CoreClient {
    async fn get_state(&self) -> CommandResult {
        Ok(self.store.state())
    }

    async fn get_view(&self) -> Result<TreeView, ClientError> {
        Ok(self.store.view())
    }

    async fn get_history(&self) -> Result<Vec<TransitionLogEntry>, ClientError> {
        Ok(self.store.history())
    }

    async fn dispatch(&self, command: Command) -> CommandResult {
        self.store.dispatch(command).map_err(ClientError::from)
    }

    async fn add_task(&self, title: String) -> CommandResult {
        self.store.add_task(title).map_err(ClientError::from)
    }

    async fn delete_task(&self, id: TaskId) -> CommandResult {
        self.store.delete_task(id).map_err(ClientError::from)
    }

    async fn restore_task(&self) -> CommandResult {
        self.store.restore_task().map_err(ClientError::from)
    }

    async fn empty_completed_tasks(&self) -> CommandResult {
        self.store.empty_completed_tasks().map_err(ClientError::from)
    }

    async fn toggle_sub_tasks_open(&self, id: TaskId) -> CommandResult {
        self.store.toggle_sub_tasks_open(id).map_err(ClientError::from)
    }

    async fn toggle_log_book_open(&self, force: Option<bool>) -> CommandResult {
        self.store
            .toggle_log_book_open(force)
            .map_err(ClientError::from)
    }

    async fn select(&self, direction: Direction) -> CommandResult {
        self.store
            .dispatch(direction.command())
            .map_err(ClientError::from)
    }

    async fn select_task(&self, id: TaskId) -> CommandResult {
        self.store.select_task(id).map_err(ClientError::from)
    }
}
