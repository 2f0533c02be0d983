use pretty_assertions::assert_eq;
use tasktree::models::{Command, InsertPolicy, RestoreRecord, Task, TaskId, TodoState, ROOT_ID};
use tasktree::reduce;

/// Applies every command in order, checking the tree after each step
fn run(mut state: TodoState, commands: &[Command]) -> TodoState {
    for command in commands {
        state = reduce(&state, command);
        if let Err(err) = state.check_integrity() {
            panic!("integrity broken after {}: {}", command, err);
        }
    }
    state
}

fn add(title: &str) -> Command {
    Command::AddTask {
        title: title.to_string(),
    }
}

fn select(id: TaskId) -> Command {
    Command::SelectTask { id }
}

/// root -> [a, b, c] under the given policy, with `a` holding two children
fn sample(policy: InsertPolicy) -> TodoState {
    run(
        TodoState::with_policy(policy),
        &[
            add("a"),
            add("b"),
            add("c"),
            select(1),
            add("a1"),
            add("a2"),
            select(ROOT_ID),
        ],
    )
}

#[test]
fn test_add_delete_restore_example() {
    let start = TodoState::default();
    assert_eq!(start.next_task_id(), 1);
    assert_eq!(start.children(ROOT_ID), &[] as &[TaskId]);

    // Add one task
    let added = start.add_task("a");
    assert_eq!(added.children(ROOT_ID), &[1]);
    assert_eq!(added.task(1), Some(&Task::new("a".to_string())));
    assert_eq!(added.next_task_id(), 2);

    // Delete it
    let deleted = added.delete_task(1);
    assert_eq!(deleted.remaining_tasks().len(), 1);
    assert_eq!(deleted.children(ROOT_ID), &[] as &[TaskId]);
    assert_eq!(
        deleted.completed_tasks(),
        &[RestoreRecord {
            task: Task::new("a".to_string()),
            self_id: 1,
            parent_id: ROOT_ID,
            detached: Default::default(),
        }]
    );
    assert_eq!(deleted.selected_task_id(), ROOT_ID);
    assert_eq!(deleted.parent_id(), ROOT_ID);

    // Restore brings back the post-add state exactly
    let restored = deleted.restore_task();
    assert_eq!(restored, added);
    assert!(restored.completed_tasks().is_empty());
    assert!(!restored.is_log_book_open());
}

#[test]
fn test_empty_title_is_identity() {
    let state = sample(InsertPolicy::Head);

    assert_eq!(state.add_task(""), state);
}

#[test]
fn test_add_grows_by_exactly_one() {
    for policy in [InsertPolicy::Head, InsertPolicy::Tail] {
        let state = sample(policy);
        let next = state.select_task(2).add_task("new");

        assert_eq!(next.next_task_id(), state.next_task_id() + 1);
        assert_eq!(
            next.remaining_tasks().len(),
            state.remaining_tasks().len() + 1
        );
        assert!(next.check_integrity().is_ok());
    }
}

#[test]
fn test_insert_policy_orders_siblings() {
    let head = sample(InsertPolicy::Head);
    assert_eq!(head.children(ROOT_ID), &[3, 2, 1]);
    assert_eq!(head.children(1), &[5, 4]);

    let tail = sample(InsertPolicy::Tail);
    assert_eq!(tail.children(ROOT_ID), &[1, 2, 3]);
    assert_eq!(tail.children(1), &[4, 5]);
}

#[test]
fn test_delete_then_restore_returns_task_to_policy_position() {
    for policy in [InsertPolicy::Head, InsertPolicy::Tail] {
        let state = sample(policy).toggle_sub_tasks_open(1);
        let original = state.task(1).cloned();

        let restored = run(state.clone(), &[Command::DeleteTask { id: 1 }, Command::RestoreTask]);

        // Same object under the same id and parent
        assert_eq!(restored.task(1).cloned(), original);
        assert_eq!(restored.find_parent(1), Some(ROOT_ID));
        // The children came back too
        assert_eq!(restored.task(4).map(Task::title), Some("a1"));
        assert_eq!(restored.task(5).map(Task::title), Some("a2"));

        let siblings = restored.children(ROOT_ID);
        match policy {
            InsertPolicy::Head => assert_eq!(siblings.first(), Some(&1)),
            InsertPolicy::Tail => assert_eq!(siblings.last(), Some(&1)),
        }
    }
}

#[test]
fn test_completed_tasks_are_lifo() {
    let state = run(
        sample(InsertPolicy::Head),
        &[
            Command::DeleteTask { id: 2 },
            Command::DeleteTask { id: 3 },
            Command::RestoreTask,
        ],
    );

    assert!(state.task(3).is_some());
    assert!(state.task(2).is_none());
    assert_eq!(state.completed_tasks().len(), 1);
    assert_eq!(state.completed_tasks()[0].self_id, 2);
}

#[test]
fn test_empty_completed_tasks_is_permanent() {
    let state = run(
        sample(InsertPolicy::Head),
        &[
            Command::DeleteTask { id: 1 },
            Command::EmptyCompletedTasks,
            Command::RestoreTask,
        ],
    );

    assert!(state.completed_tasks().is_empty());
    assert!(state.task(1).is_none());
    assert!(state.task(4).is_none());
    // Ids are never reused
    assert_eq!(state.add_task("later").task(6).map(Task::title), Some("later"));
}

#[test]
fn test_restore_on_empty_log_book_keeps_it_open() {
    let state = TodoState::default().toggle_log_book_open(Some(true));

    let next = state.restore_task();

    assert_eq!(next, state);
    assert!(next.is_log_book_open());
}

#[test]
fn test_next_and_previous_are_inverses() {
    let state = sample(InsertPolicy::Head).select_task(2);

    assert_eq!(state.select_next().select_previous(), state);
    assert_eq!(state.select_previous().select_next(), state);
}

#[test]
fn test_boundary_moves_are_noops() {
    let head = sample(InsertPolicy::Head);

    // Root has no siblings and no parent
    assert_eq!(head.select_next(), head);
    assert_eq!(head.select_previous(), head);
    assert_eq!(head.select_outside(), head);

    // First and last siblings
    let first = head.select_task(3);
    assert_eq!(first.select_previous(), first);
    let last = head.select_task(1);
    assert_eq!(last.select_next(), last);

    // Leaves have nowhere to go inside
    let leaf = head.select_task(2);
    assert_eq!(leaf.select_inside(), leaf);
}

#[test]
fn test_inside_then_outside_round_trips() {
    for policy in [InsertPolicy::Head, InsertPolicy::Tail] {
        let base = sample(policy);
        for id in [ROOT_ID, 1] {
            let state = base.select_task(id);

            let back = state.select_inside().select_outside();

            assert_eq!(back.selected_task_id(), state.selected_task_id());
            assert_eq!(back.parent_id(), state.parent_id());
        }
    }
}

#[test]
fn test_inside_lands_on_first_child() {
    let head = sample(InsertPolicy::Head).select_task(1).select_inside();
    assert_eq!((head.selected_task_id(), head.parent_id()), (5, 1));

    let tail = sample(InsertPolicy::Tail).select_task(1).select_inside();
    assert_eq!((tail.selected_task_id(), tail.parent_id()), (4, 1));
}

#[test]
fn test_delete_anywhere_resets_selection() {
    let state = sample(InsertPolicy::Head).select_task(4);

    let next = state.delete_task(2);

    assert_eq!(next.selected_task_id(), ROOT_ID);
    assert_eq!(next.parent_id(), ROOT_ID);
}

#[test]
fn test_restore_keeps_selection() {
    let state = run(
        sample(InsertPolicy::Head),
        &[Command::DeleteTask { id: 2 }, select(4), Command::RestoreTask],
    );

    assert_eq!(state.selected_task_id(), 4);
    assert_eq!(state.parent_id(), 1);
}

#[test]
fn test_nested_restores_rebuild_the_tree() {
    let state = sample(InsertPolicy::Tail);

    let restored = run(
        state.clone(),
        &[
            Command::DeleteTask { id: 4 },
            Command::DeleteTask { id: 1 },
            Command::RestoreTask,
            Command::RestoreTask,
        ],
    );

    assert_eq!(restored.remaining_tasks().len(), state.remaining_tasks().len());
    assert_eq!(restored.children(1), &[5, 4]);
    assert_eq!(restored.children(ROOT_ID), &[2, 3, 1]);
}

#[test]
fn test_toggle_flips_only_is_open() {
    let state = sample(InsertPolicy::Head);

    let toggled = state.toggle_sub_tasks_open(1);
    let task = toggled.task(1).unwrap();
    assert!(!task.is_open());
    assert_eq!(task.title(), "a");
    assert_eq!(task.sub_tasks(), &[5, 4]);

    assert_eq!(toggled.toggle_sub_tasks_open(1), state);
    // Unknown ids are ignored
    assert_eq!(state.toggle_sub_tasks_open(99), state);
}

#[test]
fn test_log_book_toggle_and_force() {
    let state = TodoState::default();

    assert!(state.toggle_log_book_open(None).is_log_book_open());
    assert!(!state.toggle_log_book_open(None).toggle_log_book_open(None).is_log_book_open());

    let open = state.toggle_log_book_open(Some(true));
    assert_eq!(open.toggle_log_book_open(Some(true)), open);
    assert!(!open.toggle_log_book_open(Some(false)).is_log_book_open());
}

#[test]
fn test_commands_deserialize_with_aliases() {
    let commands: Vec<Command> = serde_json::from_str(
        r#"[
            {"type": "add_task", "title": "a"},
            {"type": "select_new_task", "id": 1},
            {"type": "update_selected_task_id", "id": 0},
            {"type": "toggle_log_book_open"},
            {"type": "toggle_log_book_open", "force": true},
            {"type": "select_inside"}
        ]"#,
    )
    .unwrap();

    assert_eq!(commands[1], select(1));
    assert_eq!(commands[2], select(ROOT_ID));
    assert_eq!(commands[3], Command::ToggleLogBookOpen { force: None });

    let state = run(TodoState::default(), &commands);
    assert_eq!(state.selected_task_id(), 1);
    assert_eq!(state.parent_id(), ROOT_ID);
    assert!(state.is_log_book_open());
}

#[test]
fn test_long_session_keeps_integrity() {
    let mut commands = Vec::new();
    for round in 0..5 {
        commands.extend([
            add(&format!("task {}", round)),
            Command::SelectInside,
            add(&format!("child {}", round)),
            Command::SelectInside,
            Command::SelectOutside,
            Command::SelectNext,
            Command::SelectPrevious,
        ]);
    }
    commands.extend([
        Command::DeleteTask { id: 1 },
        Command::DeleteTask { id: 3 },
        Command::RestoreTask,
        Command::SelectInside,
        Command::ToggleSubTasksOpen { id: 3 },
        Command::RestoreTask,
        Command::EmptyCompletedTasks,
    ]);

    for policy in [InsertPolicy::Head, InsertPolicy::Tail] {
        let state = run(TodoState::with_policy(policy), &commands);
        assert!(state.completed_tasks().is_empty());
    }
}
