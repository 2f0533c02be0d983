//! The process-wide task store
//!
//! [`Store`] owns the single [`TodoState`] of a session. Commands are validated,
//! reduced to a new state and swapped in under one lock, so observers never see
//! a partially applied command.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Command, Direction, TaskId, TodoState, ROOT_ID};
use crate::view::TreeView;

// Define the maximum size for the history buffer
pub const MAX_HISTORY_SIZE: usize = 20;

/// Errors reported by the store before a command reaches the reducer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Task {0} not found")]
    TaskNotFound(TaskId),

    #[error("The root task cannot be deleted")]
    RootTask,

    #[error("Unknown direction '{0}' (expected next, previous, inside or outside)")]
    UnknownDirection(String),
}

/// Represents a single state transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub details: Option<String>,
}

impl TransitionLogEntry {
    pub fn new(action: String, details: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            details,
        }
    }
}

/// Result of a store call together with the view the renderer should draw
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreResponse<T> {
    pub res: T,
    /// Whether the command changed the state
    pub changed: bool,
    pub view: TreeView,
}

impl<T> StoreResponse<T> {
    pub fn new(res: T, changed: bool, view: TreeView) -> Self {
        Self { res, changed, view }
    }

    pub fn inner(&self) -> &T {
        &self.res
    }

    pub fn into_inner(self) -> T {
        self.res
    }
}

/// Checks the preconditions the reducer silently ignores.
/// Documented no-ops (empty titles, boundary moves, empty log-book) pass.
pub fn validate(state: &TodoState, command: &Command) -> Result<(), StoreError> {
    match command {
        Command::DeleteTask { id } if *id == ROOT_ID => Err(StoreError::RootTask),
        Command::DeleteTask { id } | Command::ToggleSubTasksOpen { id } => {
            require_task(state, *id)
        }
        Command::SelectTask { id } if *id != ROOT_ID => require_task(state, *id),
        _ => Ok(()),
    }
}

fn require_task(state: &TodoState, id: TaskId) -> Result<(), StoreError> {
    match state.task(id) {
        Some(_) => Ok(()),
        None => Err(StoreError::TaskNotFound(id)),
    }
}

struct Session {
    state: TodoState,
    history: VecDeque<TransitionLogEntry>,
}

impl Session {
    /// Logs a state transition, maintaining the history buffer size.
    fn log_transition(&mut self, action: String, details: Option<String>) {
        if self.history.len() == MAX_HISTORY_SIZE {
            self.history.pop_front(); // Remove the oldest entry
        }
        self.history
            .push_back(TransitionLogEntry::new(action, details));
    }
}

#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<Session>>,
    update_tx: Arc<tokio::sync::broadcast::Sender<()>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(TodoState::default())
    }
}

impl Store {
    pub fn new(state: TodoState) -> Self {
        // Create a broadcast channel with capacity for 100 messages
        let (tx, _rx) = tokio::sync::broadcast::channel(100);

        Self {
            inner: Arc::new(Mutex::new(Session {
                state,
                history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            })),
            update_tx: Arc::new(tx),
        }
    }

    fn with_session<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Session) -> R,
    {
        let mut session = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("store lock poisoned, recovering the last state");
                poisoned.into_inner()
            }
        };
        f(&mut session)
    }

    /// Validates and applies a command, returning the resulting state
    pub fn dispatch(&self, command: Command) -> Result<StoreResponse<TodoState>, StoreError> {
        self.with_session(|session| {
            if let Err(err) = validate(&session.state, &command) {
                tracing::warn!(action = command.name(), "rejected command: {}", err);
                return Err(err);
            }

            let next = session.state.apply(&command);
            let changed = next != session.state;

            if changed {
                session.state = next;
                session.log_transition(command.name().to_string(), Some(command.to_string()));
                tracing::info!(
                    action = command.name(),
                    selected = session.state.selected_task_id(),
                    tasks = session.state.remaining_tasks().len(),
                    "applied {}",
                    command
                );
                // Nobody listening is fine
                let _ = self.update_tx.send(());
            } else {
                tracing::debug!(action = command.name(), "no-op: {}", command);
            }

            let view = TreeView::from_state(&session.state);
            Ok(StoreResponse::new(session.state.clone(), changed, view))
        })
    }

    pub fn add_task(&self, title: String) -> Result<StoreResponse<TodoState>, StoreError> {
        self.dispatch(Command::AddTask { title })
    }

    pub fn delete_task(&self, id: TaskId) -> Result<StoreResponse<TodoState>, StoreError> {
        self.dispatch(Command::DeleteTask { id })
    }

    pub fn restore_task(&self) -> Result<StoreResponse<TodoState>, StoreError> {
        self.dispatch(Command::RestoreTask)
    }

    pub fn empty_completed_tasks(&self) -> Result<StoreResponse<TodoState>, StoreError> {
        self.dispatch(Command::EmptyCompletedTasks)
    }

    pub fn toggle_sub_tasks_open(&self, id: TaskId) -> Result<StoreResponse<TodoState>, StoreError> {
        self.dispatch(Command::ToggleSubTasksOpen { id })
    }

    pub fn toggle_log_book_open(
        &self,
        force: Option<bool>,
    ) -> Result<StoreResponse<TodoState>, StoreError> {
        self.dispatch(Command::ToggleLogBookOpen { force })
    }

    /// Moves the selection in the named direction (next, previous, inside, outside)
    pub fn select_direction(&self, direction: &str) -> Result<StoreResponse<TodoState>, StoreError> {
        let direction: Direction = direction.parse().map_err(StoreError::UnknownDirection)?;
        self.dispatch(direction.command())
    }

    pub fn select_task(&self, id: TaskId) -> Result<StoreResponse<TodoState>, StoreError> {
        self.dispatch(Command::SelectTask { id })
    }

    /// Gets the current state
    pub fn state(&self) -> StoreResponse<TodoState> {
        self.with_session(|session| {
            let view = TreeView::from_state(&session.state);
            StoreResponse::new(session.state.clone(), false, view)
        })
    }

    /// Gets the renderer view of the current state
    pub fn view(&self) -> TreeView {
        self.with_session(|session| TreeView::from_state(&session.state))
    }

    /// Gets the recent state transitions, oldest first
    pub fn history(&self) -> Vec<TransitionLogEntry> {
        self.with_session(|session| session.history.iter().cloned().collect())
    }

    // Subscribe to state updates
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<()> {
        self.update_tx.subscribe()
    }
}
