use anyhow::Result;
use tenderflow_db::{ledger, ConnectionPool, FileStatus};
use tenderflow_schema::RunContext;

pub async fn execute(ctx: &RunContext) -> Result<()> {
    let pool = ConnectionPool::connect(ctx).await?;

    let completed = ledger::count_by_status(pool.raw(), FileStatus::Completed).await?;
    let failed = ledger::count_by_status(pool.raw(), FileStatus::Failed).await?;

    println!("tenderflow ingestion status");
    println!("  completed files: {completed}");
    println!("  failed files:    {failed}");

    pool.close().await;
    Ok(())
}
