//! Core models for the tasktree library
//!
//! This module contains the task tree state, the commands that drive it, and the
//! pure transition function mapping a state and a command to the next state.
//! The tree is stored arena-style: every task lives in one id-indexed map and
//! refers to its children by id.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a task, unique for the lifetime of a session
pub type TaskId = u32;

/// The permanent root task. It is never deleted and never restored.
pub const ROOT_ID: TaskId = 0;

/// Where new and restored tasks land among their siblings
pub const INSERT_POLICY: InsertPolicy = InsertPolicy::Head;

/// Sibling insertion policy shared by add and restore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum InsertPolicy {
    /// The newest sibling becomes the first child
    Head,
    /// The newest sibling becomes the last child
    Tail,
}

impl InsertPolicy {
    fn insert(self, siblings: &mut Vec<TaskId>, id: TaskId) {
        match self {
            InsertPolicy::Head => siblings.insert(0, id),
            InsertPolicy::Tail => siblings.push(id),
        }
    }
}

impl Default for InsertPolicy {
    fn default() -> Self {
        INSERT_POLICY
    }
}

/// A single node of the task tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    title: String,
    sub_tasks: Vec<TaskId>,
    is_open: bool,
}

impl Task {
    /// Creates a new open task without children
    pub fn new(title: String) -> Self {
        Self {
            title,
            sub_tasks: Vec::new(),
            is_open: true,
        }
    }

    /// Creates an open task that already references the given children
    pub fn with_sub_tasks(title: String, sub_tasks: Vec<TaskId>) -> Self {
        Self {
            title,
            sub_tasks,
            is_open: true,
        }
    }

    /// Gets the title of this task
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Gets the ordered child ids of this task
    pub fn sub_tasks(&self) -> &[TaskId] {
        &self.sub_tasks
    }

    /// Whether the children of this task are expanded
    pub fn is_open(&self) -> bool {
        self.is_open
    }
}

/// Snapshot of a deleted task, sufficient to put it back where it was
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRecord {
    pub task: Task,
    pub self_id: TaskId,
    pub parent_id: TaskId,
    /// Descendants detached together with the task, keyed by their original ids
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub detached: BTreeMap<TaskId, Task>,
}

/// A command understood by the reducer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    AddTask {
        title: String,
    },
    DeleteTask {
        id: TaskId,
    },
    RestoreTask,
    EmptyCompletedTasks,
    ToggleSubTasksOpen {
        id: TaskId,
    },
    ToggleLogBookOpen {
        #[serde(default)]
        force: Option<bool>,
    },
    SelectNext,
    SelectPrevious,
    SelectInside,
    SelectOutside,
    #[serde(alias = "select_new_task", alias = "update_selected_task_id")]
    SelectTask {
        id: TaskId,
    },
}

impl Command {
    /// Short action name used in transition logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::AddTask { .. } => "add_task",
            Command::DeleteTask { .. } => "delete_task",
            Command::RestoreTask => "restore_task",
            Command::EmptyCompletedTasks => "empty_completed_tasks",
            Command::ToggleSubTasksOpen { .. } => "toggle_sub_tasks_open",
            Command::ToggleLogBookOpen { .. } => "toggle_log_book_open",
            Command::SelectNext => "select_next",
            Command::SelectPrevious => "select_previous",
            Command::SelectInside => "select_inside",
            Command::SelectOutside => "select_outside",
            Command::SelectTask { .. } => "select_task",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::AddTask { title } => write!(f, "add task '{}'", title),
            Command::DeleteTask { id } => write!(f, "delete task {}", id),
            Command::ToggleSubTasksOpen { id } => write!(f, "toggle children of task {}", id),
            Command::ToggleLogBookOpen { force: Some(open) } => {
                write!(f, "set log-book open to {}", open)
            }
            Command::ToggleLogBookOpen { force: None } => write!(f, "toggle log-book"),
            Command::SelectTask { id } => write!(f, "select task {}", id),
            other => f.write_str(&other.name().replace('_', " ")),
        }
    }
}

/// Sibling and depth navigation directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Next,
    Previous,
    Inside,
    Outside,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Next => "next",
            Direction::Previous => "previous",
            Direction::Inside => "inside",
            Direction::Outside => "outside",
        }
    }

    /// The navigation command for this direction
    pub fn command(self) -> Command {
        match self {
            Direction::Next => Command::SelectNext,
            Direction::Previous => Command::SelectPrevious,
            Direction::Inside => Command::SelectInside,
            Direction::Outside => Command::SelectOutside,
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "next" | "down" => Ok(Direction::Next),
            "previous" | "prev" | "up" => Ok(Direction::Previous),
            "inside" | "in" => Ok(Direction::Inside),
            "outside" | "out" => Ok(Direction::Outside),
            other => Err(other.to_string()),
        }
    }
}

/// Structural problems detected by [`TodoState::check_integrity`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    #[error("root task is missing")]
    MissingRoot,

    #[error("task {parent} references missing child {child}")]
    DanglingChild { parent: TaskId, child: TaskId },

    #[error("task {0} is referenced more than once")]
    SharedChild(TaskId),

    #[error("task {0} is not reachable from the root")]
    Orphan(TaskId),

    #[error("selection ({selected}, parent {parent}) does not match the tree")]
    BadSelection { selected: TaskId, parent: TaskId },

    #[error("next task id {next} is not above used id {used}")]
    StaleCounter { next: TaskId, used: TaskId },
}

/// The whole tracker state: live tree, selection cursor and restore stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoState {
    remaining_tasks: BTreeMap<TaskId, Task>,
    selected_task_id: TaskId,
    parent_id: TaskId,
    next_task_id: TaskId,
    completed_tasks: Vec<RestoreRecord>,
    is_log_book_open: bool,
    #[serde(default)]
    insert_policy: InsertPolicy,
}

impl Default for TodoState {
    fn default() -> Self {
        Self::with_policy(INSERT_POLICY)
    }
}

/// Applies a command to a state, producing the next state
pub fn reduce(state: &TodoState, command: &Command) -> TodoState {
    state.apply(command)
}

impl TodoState {
    /// Creates the start-of-session state with the given insertion policy
    pub fn with_policy(insert_policy: InsertPolicy) -> Self {
        let mut remaining_tasks = BTreeMap::new();
        remaining_tasks.insert(ROOT_ID, Task::new("root".to_string()));

        Self {
            remaining_tasks,
            selected_task_id: ROOT_ID,
            parent_id: ROOT_ID,
            next_task_id: ROOT_ID + 1,
            completed_tasks: Vec::new(),
            is_log_book_open: false,
            insert_policy,
        }
    }

    /// Builds a state from an existing set of tasks. The id counter starts
    /// above the largest given id; the root is created if absent.
    pub fn from_tasks(tasks: impl IntoIterator<Item = (TaskId, Task)>) -> Self {
        let mut state = Self::default();
        state.remaining_tasks.extend(tasks);
        state.next_task_id = state
            .remaining_tasks
            .keys()
            .max()
            .map_or(ROOT_ID + 1, |max| max + 1);
        state
    }

    // State access

    pub fn remaining_tasks(&self) -> &BTreeMap<TaskId, Task> {
        &self.remaining_tasks
    }

    pub fn selected_task_id(&self) -> TaskId {
        self.selected_task_id
    }

    pub fn parent_id(&self) -> TaskId {
        self.parent_id
    }

    pub fn next_task_id(&self) -> TaskId {
        self.next_task_id
    }

    pub fn completed_tasks(&self) -> &[RestoreRecord] {
        &self.completed_tasks
    }

    pub fn is_log_book_open(&self) -> bool {
        self.is_log_book_open
    }

    pub fn insert_policy(&self) -> InsertPolicy {
        self.insert_policy
    }

    /// Gets a live task by id
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.remaining_tasks.get(&id)
    }

    /// Gets the currently selected task
    pub fn selected_task(&self) -> Option<&Task> {
        self.task(self.selected_task_id)
    }

    /// Gets the child ids of a task, empty if the task does not exist
    pub fn children(&self, id: TaskId) -> &[TaskId] {
        self.task(id).map_or(&[], |task| task.sub_tasks())
    }

    /// Finds the parent of a live task by scanning every child list.
    /// Returns `None` for the root and for unknown ids.
    pub fn find_parent(&self, id: TaskId) -> Option<TaskId> {
        self.remaining_tasks
            .iter()
            .find(|(_, task)| task.sub_tasks.contains(&id))
            .map(|(&parent_id, _)| parent_id)
    }

    // Transitions

    /// Returns the state that results from applying `command`. No-op commands
    /// return a state equal to `self`; `self` is never modified.
    pub fn apply(&self, command: &Command) -> Self {
        let mut next = self.clone();
        match command {
            Command::AddTask { title } => next.insert_new_task(title),
            Command::DeleteTask { id } => next.detach_task(*id),
            Command::RestoreTask => next.reattach_last(),
            Command::EmptyCompletedTasks => next.completed_tasks.clear(),
            Command::ToggleSubTasksOpen { id } => {
                if let Some(task) = next.remaining_tasks.get_mut(id) {
                    task.is_open = !task.is_open;
                }
            }
            Command::ToggleLogBookOpen { force } => {
                next.is_log_book_open = force.unwrap_or(!next.is_log_book_open);
            }
            Command::SelectNext => next.step_sibling(1),
            Command::SelectPrevious => next.step_sibling(-1),
            Command::SelectInside => next.descend(),
            Command::SelectOutside => next.ascend(),
            Command::SelectTask { id } => next.jump_to(*id),
        }
        next
    }

    pub fn add_task(&self, title: &str) -> Self {
        self.apply(&Command::AddTask {
            title: title.to_string(),
        })
    }

    pub fn delete_task(&self, id: TaskId) -> Self {
        self.apply(&Command::DeleteTask { id })
    }

    pub fn restore_task(&self) -> Self {
        self.apply(&Command::RestoreTask)
    }

    pub fn empty_completed_tasks(&self) -> Self {
        self.apply(&Command::EmptyCompletedTasks)
    }

    pub fn toggle_sub_tasks_open(&self, id: TaskId) -> Self {
        self.apply(&Command::ToggleSubTasksOpen { id })
    }

    pub fn toggle_log_book_open(&self, force: Option<bool>) -> Self {
        self.apply(&Command::ToggleLogBookOpen { force })
    }

    pub fn select_next(&self) -> Self {
        self.apply(&Command::SelectNext)
    }

    pub fn select_previous(&self) -> Self {
        self.apply(&Command::SelectPrevious)
    }

    pub fn select_inside(&self) -> Self {
        self.apply(&Command::SelectInside)
    }

    pub fn select_outside(&self) -> Self {
        self.apply(&Command::SelectOutside)
    }

    pub fn select_task(&self, id: TaskId) -> Self {
        self.apply(&Command::SelectTask { id })
    }

    fn insert_new_task(&mut self, title: &str) {
        if title.is_empty() {
            return;
        }

        let id = self.next_task_id;
        let policy = self.insert_policy;
        let Some(parent) = self.remaining_tasks.get_mut(&self.selected_task_id) else {
            return;
        };
        policy.insert(&mut parent.sub_tasks, id);

        self.remaining_tasks.insert(id, Task::new(title.to_string()));
        self.next_task_id += 1;
    }

    fn detach_task(&mut self, id: TaskId) {
        if id == ROOT_ID || !self.remaining_tasks.contains_key(&id) {
            return;
        }
        let Some(parent_id) = self.find_parent(id) else {
            return;
        };

        if let Some(parent) = self.remaining_tasks.get_mut(&parent_id) {
            parent.sub_tasks.retain(|&child| child != id);
        }
        let Some(task) = self.remaining_tasks.remove(&id) else {
            return;
        };
        let detached = self.detach_descendants(&task);

        self.completed_tasks.push(RestoreRecord {
            task,
            self_id: id,
            parent_id,
            detached,
        });
        self.selected_task_id = ROOT_ID;
        self.parent_id = ROOT_ID;
    }

    /// Moves every task reachable from `task` out of the live map
    fn detach_descendants(&mut self, task: &Task) -> BTreeMap<TaskId, Task> {
        let mut detached = BTreeMap::new();
        let mut pending = task.sub_tasks.clone();

        while let Some(id) = pending.pop() {
            if let Some(child) = self.remaining_tasks.remove(&id) {
                pending.extend(child.sub_tasks.iter().copied());
                detached.insert(id, child);
            }
        }

        detached
    }

    fn reattach_last(&mut self) {
        let Some(record) = self.completed_tasks.pop() else {
            return;
        };
        let RestoreRecord {
            task,
            self_id,
            parent_id,
            detached,
        } = record;

        // LIFO order keeps the recorded parent alive; fall back to the root otherwise.
        let parent_id = if self.remaining_tasks.contains_key(&parent_id) {
            parent_id
        } else {
            ROOT_ID
        };

        self.remaining_tasks.extend(detached);
        self.remaining_tasks.insert(self_id, task);

        let policy = self.insert_policy;
        if let Some(parent) = self.remaining_tasks.get_mut(&parent_id) {
            policy.insert(&mut parent.sub_tasks, self_id);
        }
        self.is_log_book_open = false;
    }

    fn step_sibling(&mut self, offset: isize) {
        if self.selected_task_id == ROOT_ID {
            return;
        }
        let Some(siblings) = self.remaining_tasks.get(&self.parent_id).map(|p| &p.sub_tasks)
        else {
            return;
        };
        let Some(position) = siblings.iter().position(|&id| id == self.selected_task_id) else {
            return;
        };

        let target = position
            .checked_add_signed(offset)
            .and_then(|index| siblings.get(index).copied());
        if let Some(id) = target {
            self.selected_task_id = id;
        }
    }

    fn descend(&mut self) {
        let first_child = self
            .selected_task()
            .and_then(|task| task.sub_tasks.first().copied());

        if let Some(child) = first_child {
            self.parent_id = self.selected_task_id;
            self.selected_task_id = child;
        }
    }

    fn ascend(&mut self) {
        if self.selected_task_id == ROOT_ID {
            return;
        }

        let new_selection = self.parent_id;
        self.parent_id = self.find_parent(new_selection).unwrap_or(ROOT_ID);
        self.selected_task_id = new_selection;
    }

    fn jump_to(&mut self, id: TaskId) {
        if id == ROOT_ID {
            self.selected_task_id = ROOT_ID;
            self.parent_id = ROOT_ID;
            return;
        }

        if let Some(parent_id) = self.find_parent(id) {
            self.selected_task_id = id;
            self.parent_id = parent_id;
        }
    }

    // Invariants

    /// Verifies the structural invariants of the tree, the selection and the id counter
    pub fn check_integrity(&self) -> Result<(), IntegrityError> {
        if !self.remaining_tasks.contains_key(&ROOT_ID) {
            return Err(IntegrityError::MissingRoot);
        }

        let mut reached = HashSet::from([ROOT_ID]);
        let mut pending = vec![ROOT_ID];
        while let Some(id) = pending.pop() {
            for &child in self.children(id) {
                if !self.remaining_tasks.contains_key(&child) {
                    return Err(IntegrityError::DanglingChild { parent: id, child });
                }
                if !reached.insert(child) {
                    return Err(IntegrityError::SharedChild(child));
                }
                pending.push(child);
            }
        }
        if let Some(&orphan) = self.remaining_tasks.keys().find(|id| !reached.contains(id)) {
            return Err(IntegrityError::Orphan(orphan));
        }

        let selection_ok = if self.selected_task_id == ROOT_ID {
            self.parent_id == ROOT_ID
        } else {
            self.find_parent(self.selected_task_id) == Some(self.parent_id)
        };
        if !selection_ok {
            return Err(IntegrityError::BadSelection {
                selected: self.selected_task_id,
                parent: self.parent_id,
            });
        }

        let used = self
            .remaining_tasks
            .keys()
            .copied()
            .chain(self.completed_tasks.iter().flat_map(|record| {
                std::iter::once(record.self_id).chain(record.detached.keys().copied())
            }))
            .max()
            .unwrap_or(ROOT_ID);
        if used >= self.next_task_id {
            return Err(IntegrityError::StaleCounter {
                next: self.next_task_id,
                used,
            });
        }

        Ok(())
    }
}
