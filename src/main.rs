use anyhow::Result;
use xword_arena::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run_cli().await
}
