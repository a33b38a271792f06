use anyhow::Result;
use quixa::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
