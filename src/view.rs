//! Renderer-facing snapshot of the task tree
//!
//! A [`TreeView`] is what a rendering layer reads after every command: the tree
//! with collapsed branches pruned, the selection cursor, and the log-book of
//! deleted tasks.

use serde::{Deserialize, Serialize};

use crate::models::{TaskId, TodoState, ROOT_ID};

/// A shown node of the task tree, listed in display order
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskTreeNode {
    /// The id of the task
    pub id: TaskId,
    /// The title of the task
    pub title: String,
    /// Distance from the root (the root itself is 0)
    pub depth: usize,
    /// Whether the children of this task are shown
    pub is_open: bool,
    /// Whether this is the selected task
    pub is_selected: bool,
    /// Number of direct children, shown or not
    pub child_count: usize,
}

/// One deleted task as listed in the log-book
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogBookEntry {
    pub id: TaskId,
    pub title: String,
    pub parent_id: TaskId,
    pub parent_title: Option<String>,
    /// Number of descendants that will come back with this task
    pub detached_count: usize,
}

/// Everything a renderer needs to draw the current state
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TreeView {
    /// Shown nodes in depth-first order, starting with the root.
    /// Children of closed tasks are left out.
    pub nodes: Vec<TaskTreeNode>,
    pub selected_task_id: TaskId,
    pub parent_id: TaskId,
    /// Deleted tasks, most recently deleted first
    pub log_book: Vec<LogBookEntry>,
    pub is_log_book_open: bool,
}

impl TreeView {
    /// Builds the view for the given state
    pub fn from_state(state: &TodoState) -> Self {
        let log_book = state
            .completed_tasks()
            .iter()
            .rev()
            .map(|record| LogBookEntry {
                id: record.self_id,
                title: record.task.title().to_string(),
                parent_id: record.parent_id,
                parent_title: state.task(record.parent_id).map(|t| t.title().to_string()),
                detached_count: record.detached.len(),
            })
            .collect();

        Self {
            nodes: shown_nodes(state),
            selected_task_id: state.selected_task_id(),
            parent_id: state.parent_id(),
            log_book,
            is_log_book_open: state.is_log_book_open(),
        }
    }

    /// Ids of the shown nodes in display order
    pub fn visible_ids(&self) -> Vec<TaskId> {
        self.nodes.iter().map(|node| node.id).collect()
    }

    /// The root node, if the state had one
    pub fn root(&self) -> Option<&TaskTreeNode> {
        self.nodes.first()
    }
}

/// Walks the open part of the tree with an explicit stack, so depth is bounded
/// only by memory
fn shown_nodes(state: &TodoState) -> Vec<TaskTreeNode> {
    let mut nodes = Vec::with_capacity(state.remaining_tasks().len());
    let mut pending = vec![(ROOT_ID, 0)];

    while let Some((id, depth)) = pending.pop() {
        let Some(task) = state.task(id) else {
            continue;
        };

        if task.is_open() {
            pending.extend(task.sub_tasks().iter().rev().map(|&child| (child, depth + 1)));
        }
        nodes.push(TaskTreeNode {
            id,
            title: task.title().to_string(),
            depth,
            is_open: task.is_open(),
            is_selected: id == state.selected_task_id(),
            child_count: task.sub_tasks().len(),
        });
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_view_follows_head_insertion_order() {
        let state = TodoState::default().add_task("first").add_task("second");

        let view = TreeView::from_state(&state);

        assert_eq!(view.visible_ids(), vec![0, 2, 1]);
        let root = view.root().unwrap();
        assert!(root.is_selected);
        assert_eq!(root.child_count, 2);
        assert_eq!(view.nodes[1].depth, 1);
    }

    #[test]
    fn test_closed_tasks_hide_children() {
        let state = TodoState::default()
            .add_task("parent")
            .select_task(1)
            .add_task("child")
            .toggle_sub_tasks_open(1);

        let view = TreeView::from_state(&state);

        assert_eq!(view.visible_ids(), vec![0, 1]);
        let parent = &view.nodes[1];
        assert!(parent.is_selected);
        assert!(!parent.is_open);
        assert_eq!(parent.child_count, 1);
    }

    #[test]
    fn test_log_book_lists_newest_first() {
        let state = TodoState::default()
            .add_task("a")
            .add_task("b")
            .delete_task(1)
            .delete_task(2);

        let view = TreeView::from_state(&state);

        let titles: Vec<_> = view.log_book.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a"]);
        assert_eq!(view.log_book[0].parent_title.as_deref(), Some("root"));
    }

    #[test]
    fn test_nodes_are_listed_depth_first() {
        let state = TodoState::with_policy(crate::models::InsertPolicy::Tail)
            .add_task("a")
            .add_task("b")
            .select_task(1)
            .add_task("a1")
            .select_inside()
            .add_task("a1x");

        let view = TreeView::from_state(&state);

        assert_eq!(view.visible_ids(), vec![0, 1, 3, 4, 2]);
        let depths: Vec<_> = view.nodes.iter().map(|n| n.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 3, 1]);
        assert!(view.nodes[2].is_selected);
    }

    #[test]
    fn test_deep_tree_view_round_trips_through_json() {
        let mut state = TodoState::default();
        for depth in 0..100 {
            state = state.add_task(&format!("level {}", depth)).select_inside();
        }

        let view = TreeView::from_state(&state);
        assert_eq!(view.nodes.len(), 101);
        assert_eq!(view.nodes[100].depth, 100);

        let json = serde_json::to_string(&view).unwrap();
        let decoded: TreeView = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, view);
    }
}
