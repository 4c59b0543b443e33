use anyhow::Result;
use tenderflow_db::ConnectionPool;
use tenderflow_ingest::{CancellationToken, IngestSummary};
use tenderflow_schema::RunContext;
use tracing::info;

/// Process exit codes for a completed run.
pub const EXIT_OK: i32 = 0;
pub const EXIT_FATAL: i32 = 1;
pub const EXIT_PARTIAL: i32 = 2;

pub async fn execute(ctx: &RunContext) -> Result<i32> {
    let pool = ConnectionPool::connect(ctx).await?;
    let token = CancellationToken::new();
    install_ctrl_c_handler(token.clone());

    let summary: IngestSummary = tenderflow_ingest::run(ctx, &pool, &token).await?;
    pool.close().await;

    info!(
        completed = summary.files_completed,
        failed = summary.files_failed,
        records = summary.total_records,
        "ingestion run finished"
    );

    Ok(if summary.files_failed > 0 { EXIT_PARTIAL } else { EXIT_OK })
}

fn install_ctrl_c_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, finishing in-flight batches then stopping");
            token.cancel();
        }
    });
}
