use crate::error::TenderflowDbError;
use chrono::{DateTime, Utc};
use sqlx::{Executor, MySql, Row};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Completed,
    Failed,
}

impl FileStatus {
    fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Completed => "completed",
            FileStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub file_name: String,
    pub processed_at: DateTime<Utc>,
    pub record_count: i64,
    pub status: FileStatus,
    pub error_message: Option<String>,
}

/// True if `file_name` already has a `completed` row in `processed_files`.
pub async fn is_completed<'e, E>(executor: E, file_name: &str) -> Result<bool, TenderflowDbError>
where
    E: Executor<'e, Database = MySql>,
{
    let row = sqlx::query("SELECT status FROM processed_files WHERE file_name = ?")
        .bind(file_name)
        .fetch_optional(executor)
        .await
        .map_err(TenderflowDbError::classify)?;

    Ok(match row {
        Some(row) => row.try_get::<String, _>("status").map(|s| s == "completed").unwrap_or(false),
        None => false,
    })
}

/// Upserts a ledger row for `file_name`, replacing any prior attempt.
pub async fn upsert_entry<'e, E>(
    executor: E,
    file_name: &str,
    record_count: i64,
    status: FileStatus,
    error_message: Option<&str>,
) -> Result<(), TenderflowDbError>
where
    E: Executor<'e, Database = MySql>,
{
    sqlx::query(
        "INSERT INTO processed_files (file_name, processed_at, record_count, status, error_message)
         VALUES (?, UTC_TIMESTAMP(), ?, ?, ?)
         ON DUPLICATE KEY UPDATE
             processed_at = VALUES(processed_at),
             record_count = VALUES(record_count),
             status = VALUES(status),
             error_message = VALUES(error_message)",
    )
    .bind(file_name)
    .bind(record_count)
    .bind(status.as_str())
    .bind(error_message)
    .execute(executor)
    .await
    .map_err(TenderflowDbError::classify)?;
    Ok(())
}

pub async fn count_by_status<'e, E>(executor: E, status: FileStatus) -> Result<i64, TenderflowDbError>
where
    E: Executor<'e, Database = MySql>,
{
    let row = sqlx::query("SELECT COUNT(*) AS n FROM processed_files WHERE status = ?")
        .bind(status.as_str())
        .fetch_one(executor)
        .await
        .map_err(TenderflowDbError::classify)?;
    row.try_get::<i64, _>("n").map_err(|e| TenderflowDbError::classify(sqlx::Error::from(e)))
}

/// Deletes every ledger row with the given status, returning how many rows
/// were removed.
pub async fn clear_by_status<'e, E>(executor: E, status: FileStatus) -> Result<u64, TenderflowDbError>
where
    E: Executor<'e, Database = MySql>,
{
    let result = sqlx::query("DELETE FROM processed_files WHERE status = ?")
        .bind(status.as_str())
        .execute(executor)
        .await
        .map_err(TenderflowDbError::classify)?;
    Ok(result.rows_affected())
}

/// Deletes every row in the ledger, returning how many rows were removed.
pub async fn clear_all<'e, E>(executor: E) -> Result<u64, TenderflowDbError>
where
    E: Executor<'e, Database = MySql>,
{
    let result = sqlx::query("DELETE FROM processed_files")
        .execute(executor)
        .await
        .map_err(TenderflowDbError::classify)?;
    Ok(result.rows_affected())
}
