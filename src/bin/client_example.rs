//! Example client for the tasktree API

use tasktree::api::{Client, HttpClientImpl};
use tasktree::Direction;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Create a client with default configuration (localhost:3000)
    // You can customize with ClientConfig if needed
    let client = HttpClientImpl::new();
    println!("Tasktree API Client Example");
    println!("---------------------------");

    // Add a task under the current selection
    println!("\nAdding a task...");
    let response = client.add_task("Client example task".to_string()).await?;
    let id = response.inner().next_task_id() - 1;
    println!("Added task {}", id);

    // Select it and add a subtask
    println!("\nSelecting the task...");
    client.select_task(id).await?;
    let response = client.add_task("Client example subtask".to_string()).await?;
    let sub_id = response.inner().next_task_id() - 1;
    println!("Added subtask {}", sub_id);

    // Walk into the subtask and back out
    client.select(Direction::Inside).await?;
    let response = client.select(Direction::Outside).await?;
    println!("Selected task is {}", response.inner().selected_task_id());

    // Delete the task; its subtask goes to the log-book with it
    println!("\nDeleting the task...");
    let response = client.delete_task(id).await?;
    println!("Log-book holds {} record(s)", response.view.log_book.len());

    // Bring it back
    println!("\nRestoring...");
    let response = client.restore_task().await?;
    println!(
        "Restored {} task(s) in total",
        response.inner().remaining_tasks().len() - 1
    );

    println!("\nAll operations completed successfully!");
    Ok(())
}
