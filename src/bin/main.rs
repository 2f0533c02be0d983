//! Binary entrypoint for the tasktree tool

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tasktree::cli::run().await
}
