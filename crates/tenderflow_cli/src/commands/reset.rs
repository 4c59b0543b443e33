use anyhow::Result;
use std::io::{self, Write};
use tenderflow_db::{ledger, ConnectionPool, FileStatus};
use tenderflow_schema::RunContext;

/// Interactively clears a selection of the processed-files ledger.
pub async fn execute(ctx: &RunContext) -> Result<()> {
    let pool = ConnectionPool::connect(ctx).await?;

    println!("Clear ledger entries:");
    println!("  [1] completed files only");
    println!("  [2] failed files only");
    println!("  [3] everything");
    println!("  [q] cancel");
    print!("> ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let removed = match input.trim() {
        "1" => ledger::clear_by_status(pool.raw(), FileStatus::Completed).await?,
        "2" => ledger::clear_by_status(pool.raw(), FileStatus::Failed).await?,
        "3" => ledger::clear_all(pool.raw()).await?,
        _ => {
            println!("cancelled");
            pool.close().await;
            return Ok(());
        }
    };

    println!("removed {removed} ledger entries");
    pool.close().await;
    Ok(())
}
