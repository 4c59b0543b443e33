use crate::error::TenderflowDbError;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{Connection, Executor, MySql, MySqlConnection, MySqlPool, Transaction};
use std::time::Duration;
use tenderflow_schema::RunContext;
use tracing::{info, warn};

const MAX_ENSURE_RETRIES: u32 = 3;
const DEFAULT_POOL_SIZE: u32 = 2;

/// Owns the MySQL connection pool used for the whole run.
///
/// Pool size is intentionally small (default 2): the schema evolution
/// mutex, not the store, is the bottleneck in this pipeline (see the design
/// note on pool sizing).
pub struct ConnectionPool {
    pool: MySqlPool,
}

impl ConnectionPool {
    /// Connects to the target database, creating it first if it does not
    /// exist. Retries the existence check up to [`MAX_ENSURE_RETRIES`] times
    /// with doubling backoff on transient connection faults.
    pub async fn connect(ctx: &RunContext) -> Result<Self, TenderflowDbError> {
        ensure_database_exists(ctx).await?;

        let options: MySqlConnectOptions = ctx
            .mysql_url()
            .parse()
            .map_err(|e: sqlx::Error| TenderflowDbError::Fatal(e))?;

        let pool = MySqlPoolOptions::new()
            .max_connections(DEFAULT_POOL_SIZE)
            .acquire_timeout(Duration::from_secs(ctx.pool_wait_timeout_secs))
            .connect_with(options)
            .await
            .map_err(TenderflowDbError::classify)?;

        Ok(Self { pool })
    }

    pub fn raw(&self) -> &MySqlPool {
        &self.pool
    }

    /// Acquires a connection bound to a fresh transaction. Callers commit on
    /// success and let the guard roll back on drop otherwise.
    pub async fn begin(&self) -> Result<Transaction<'_, MySql>, TenderflowDbError> {
        self.pool.begin().await.map_err(TenderflowDbError::classify)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn ensure_database_exists(ctx: &RunContext) -> Result<(), TenderflowDbError> {
    let mut attempt = 0u32;
    let mut delay = Duration::from_millis(500);

    loop {
        match try_ensure_database(ctx).await {
            Ok(()) => return Ok(()),
            Err(err) if attempt + 1 < MAX_ENSURE_RETRIES && is_retryable(&err) => {
                attempt += 1;
                warn!(attempt, error = %err, "retrying database existence check");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(err) => return Err(err),
        }
    }
}

async fn try_ensure_database(ctx: &RunContext) -> Result<(), TenderflowDbError> {
    let options: MySqlConnectOptions = ctx
        .mysql_server_url()
        .parse()
        .map_err(|e: sqlx::Error| TenderflowDbError::Fatal(e))?;

    let mut conn = MySqlConnection::connect_with(&options)
        .await
        .map_err(TenderflowDbError::classify)?;

    let stmt = format!(
        "CREATE DATABASE IF NOT EXISTS `{}` CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci",
        ctx.db_name
    );
    conn.execute(stmt.as_str()).await.map_err(TenderflowDbError::classify)?;
    info!(database = %ctx.db_name, "database ready");
    Ok(())
}

fn is_retryable(err: &TenderflowDbError) -> bool {
    matches!(err, TenderflowDbError::ConnectionLost(_))
}
