//! CLI module
//!
//! This module provides the command-line interface for the tasktree tool: a
//! `serve` command hosting the store, and thin client commands that send one
//! store command each and print the resulting tree.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io;

use crate::{
    api::{serve, Client, ClientConfig, ClientError, HttpClientImpl, ServerConfig},
    models::{Direction, InsertPolicy, TaskId, TodoState, INSERT_POLICY, ROOT_ID},
    store::{StoreResponse, TransitionLogEntry},
    view::{TaskTreeNode, TreeView},
    Store,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API server URL
    #[arg(
        short,
        long,
        env = "TASKTREE_SERVER",
        default_value = "http://localhost:3000"
    )]
    server: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the tasktree API server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "TASKTREE_PORT", default_value_t = 3000)]
        port: u16,

        /// Populate with an example task tree
        #[arg(long)]
        example: bool,

        /// Where new and restored tasks are placed among their siblings
        #[arg(long, value_enum, default_value_t = INSERT_POLICY)]
        insert_policy: InsertPolicy,
    },

    /// Add a task under the selected task
    Add {
        /// Task title
        title: String,
    },

    /// Delete a task (it can be restored from the log-book)
    Delete {
        /// Task id
        id: TaskId,
    },

    /// Restore the most recently deleted task
    Restore,

    /// Permanently empty the log-book
    #[command(name = "empty-log")]
    EmptyLog,

    /// Expand or collapse the children of a task
    Toggle {
        /// Task id
        id: TaskId,
    },

    /// Toggle the log-book, or set it with --open / --close
    Logbook {
        #[arg(long, conflicts_with = "close")]
        open: bool,

        #[arg(long)]
        close: bool,
    },

    /// Select the next sibling
    #[command(alias = "down")]
    Next,

    /// Select the previous sibling
    #[command(alias = "up")]
    Prev,

    /// Select the first child of the selected task
    In,

    /// Select the parent of the selected task
    Out,

    /// Select a task by id (0 selects the root)
    Select {
        /// Task id
        id: TaskId,
    },

    /// Show the task tree
    Tree,

    /// Show the log-book of deleted tasks
    Log,

    /// Show recent state transitions
    History,

    /// How to use this tool
    Guide,

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Run the CLI application
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve {
            port,
            example,
            insert_policy,
        } => {
            println!("Starting tasktree API server on port {}...", port);

            let state = if *example {
                println!("Populating with example task tree...");
                example_state(*insert_policy)
            } else {
                TodoState::with_policy(*insert_policy)
            };

            let config = ServerConfig {
                address: ([127, 0, 0, 1], *port).into(),
            };

            serve(Store::new(state), config).await?;
            Ok(())
        }

        Commands::Guide => {
            print_guide();
            Ok(())
        }

        Commands::Completions { shell } => {
            // Generate completions for the specified shell
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, bin_name, &mut io::stdout());
            Ok(())
        }

        command => {
            let client = create_client(&cli.server);
            run_client_command(&client, command).await?;
            Ok(())
        }
    }
}

fn create_client(server_url: &str) -> HttpClientImpl {
    let config = ClientConfig {
        base_url: server_url.to_string(),
    };

    HttpClientImpl::with_config(config)
}

async fn run_client_command<C>(client: &C, command: &Commands) -> Result<(), ClientError>
where
    C: Client + Sync,
{
    let (response, done) = match command {
        Commands::Add { title } => (
            client.add_task(title.clone()).await?,
            format!("Added \"{}\"", title),
        ),
        Commands::Delete { id } => (
            client.delete_task(*id).await?,
            format!("Deleted task {}", id),
        ),
        Commands::Restore => (client.restore_task().await?, "Restored".to_string()),
        Commands::EmptyLog => (
            client.empty_completed_tasks().await?,
            "Emptied the log-book".to_string(),
        ),
        Commands::Toggle { id } => (
            client.toggle_sub_tasks_open(*id).await?,
            format!("Toggled task {}", id),
        ),
        Commands::Logbook { open, close } => {
            let force = match (*open, *close) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            (
                client.toggle_log_book_open(force).await?,
                "Updated the log-book".to_string(),
            )
        }
        Commands::Next => (client.select(Direction::Next).await?, "Moved".to_string()),
        Commands::Prev => (
            client.select(Direction::Previous).await?,
            "Moved".to_string(),
        ),
        Commands::In => (
            client.select(Direction::Inside).await?,
            "Moved".to_string(),
        ),
        Commands::Out => (
            client.select(Direction::Outside).await?,
            "Moved".to_string(),
        ),
        Commands::Select { id } => (
            client.select_task(*id).await?,
            format!("Selected task {}", id),
        ),
        Commands::Tree => {
            print_tree(&client.get_view().await?);
            return Ok(());
        }
        Commands::Log => {
            print_log_book(&client.get_view().await?);
            return Ok(());
        }
        Commands::History => {
            print_history(&client.get_history().await?);
            return Ok(());
        }
        Commands::Serve { .. } | Commands::Guide | Commands::Completions { .. } => {
            return Ok(());
        }
    };

    print_response(&response, &done);
    Ok(())
}

/// Prints the outcome of a command followed by the tree it produced
fn print_response(response: &StoreResponse<TodoState>, done: &str) {
    if response.changed {
        println!("{}", done.green());
    } else {
        println!("{}", "Nothing to do".dimmed());
    }

    print_tree(&response.view);
    if response.view.is_log_book_open {
        print_log_book(&response.view);
    }
}

fn print_tree(view: &TreeView) {
    println!();
    for node in &view.nodes {
        print_node(node);
    }
}

fn print_node(node: &TaskTreeNode) {
    let indent = "  ".repeat(node.depth);
    let marker = match (node.child_count, node.is_open) {
        (0, _) => " ",
        (_, true) => "▾",
        (_, false) => "▸",
    };
    let label = format!("{} [{}] {}", marker, node.id, node.title);

    if node.is_selected {
        println!("{}{} {}", indent, "→".green(), label.green().bold());
    } else if node.id == ROOT_ID {
        println!("{}  {}", indent, label.dimmed());
    } else {
        println!("{}  {}", indent, label);
    }
}

fn print_log_book(view: &TreeView) {
    println!("\n{}", "LOG-BOOK".bold());
    if view.log_book.is_empty() {
        println!("  (empty)");
        return;
    }

    for (position, entry) in view.log_book.iter().enumerate() {
        let next = if position == 0 { " ← next restore" } else { "" };
        let carried = if entry.detached_count > 0 {
            format!(" (+{} subtasks)", entry.detached_count)
        } else {
            String::new()
        };
        println!(
            "  [{}] {}{} from \"{}\"{}",
            entry.id,
            entry.title,
            carried,
            entry.parent_title.as_deref().unwrap_or("?"),
            next.dimmed()
        );
    }
}

fn print_history(history: &[TransitionLogEntry]) {
    if history.is_empty() {
        println!("No transitions yet");
        return;
    }

    for entry in history {
        println!(
            "{} {:<22} {}",
            entry.timestamp.format("%H:%M:%S").to_string().dimmed(),
            entry.action,
            entry.details.as_deref().unwrap_or("")
        );
    }
}

fn print_guide() {
    let guide = r#"
=== TASKTREE GUIDE ===

Tasktree keeps your work as a tree of tasks under a permanent root (id 0).
One task is always selected; new tasks are added under the selection.

== BUILDING THE TREE ==
  $ tasktree add "Title"          Add a task under the selected task
  $ tasktree delete <ID>          Move a task (and its subtasks) to the log-book
  $ tasktree restore              Put the most recently deleted task back
  $ tasktree empty-log            Forget every deleted task for good
  $ tasktree toggle <ID>          Expand or collapse a task's subtasks

== MOVING AROUND ==
  $ tasktree next | prev          Move across siblings
  $ tasktree in | out             Move to the first child / to the parent
  $ tasktree select <ID>          Jump straight to a task (0 is the root)

Deleting any task moves the selection back to the root.

== VIEWING ==
  $ tasktree tree                 Show the tree
  $ tasktree log                  Show the log-book
  $ tasktree logbook [--open|--close]
  $ tasktree history              Show recent changes

== SERVER ==
  $ tasktree serve [--port <PORT>] [--example] [--insert-policy head|tail]
  $ tasktree --server <URL> ...   Talk to another server (or set TASKTREE_SERVER)
  Open http://localhost:3000/ui for a live view.
"#;

    println!("{}", guide);
}

/// Builds a small example tree for trying the tool out
pub fn example_state(policy: InsertPolicy) -> TodoState {
    let state = TodoState::with_policy(policy)
        .add_task("Write documentation")
        .add_task("Ship release");
    let release = state.next_task_id() - 1;
    let docs = release - 1;

    let state = state
        .select_task(release)
        .add_task("Tag version")
        .add_task("Build artifacts");
    let artifacts = state.next_task_id() - 1;

    state
        .select_task(artifacts)
        .add_task("Linux")
        .add_task("macOS")
        .select_task(docs)
        .add_task("API reference")
        .add_task("Getting started")
        .select_task(ROOT_ID)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CoreClient;

    #[test]
    fn test_example_state_is_consistent() {
        for policy in [InsertPolicy::Head, InsertPolicy::Tail] {
            let state = example_state(policy);

            assert!(state.check_integrity().is_ok());
            assert_eq!(state.remaining_tasks().len(), 9);
            assert_eq!(state.selected_task_id(), ROOT_ID);
        }
    }

    #[tokio::test]
    async fn test_client_commands_drive_the_store() {
        let store = Store::default();
        let client = CoreClient::new(store.clone());

        run_client_command(&client, &Commands::Add { title: "a".to_string() })
            .await
            .unwrap();
        run_client_command(&client, &Commands::Select { id: 1 })
            .await
            .unwrap();
        run_client_command(&client, &Commands::Logbook { open: true, close: false })
            .await
            .unwrap();

        let state = store.state().into_inner();
        assert_eq!(state.selected_task_id(), 1);
        assert!(state.is_log_book_open());

        let missing = run_client_command(&client, &Commands::Delete { id: 42 }).await;
        assert!(matches!(missing, Err(ClientError::TaskNotFound(42))));
    }

    #[test]
    fn test_cli_parses_commands() {
        let cli = Cli::try_parse_from(["tasktree", "logbook", "--open"]).unwrap();
        assert!(matches!(cli.command, Commands::Logbook { open: true, close: false }));

        let cli = Cli::try_parse_from(["tasktree", "up"]).unwrap();
        assert!(matches!(cli.command, Commands::Prev));

        assert!(Cli::try_parse_from(["tasktree", "logbook", "--open", "--close"]).is_err());

        let cli = Cli::try_parse_from(["tasktree", "serve", "--insert-policy", "tail"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Serve {
                insert_policy: InsertPolicy::Tail,
                ..
            }
        ));
    }
}
