use crate::error::TenderflowDbError;
use sqlx::{Executor, MySql};
use tenderflow_schema::{ColumnType, FieldDescriptor, Schema};
use tracing::debug;

pub const MAIN_TABLE: &str = "main_data";

/// Creates the bookkeeping tables (`field_mapping`, `processed_files`) that
/// exist regardless of the inferred schema.
pub async fn create_bookkeeping_tables<'e, E>(executor: E) -> Result<(), TenderflowDbError>
where
    E: Executor<'e, Database = MySql> + Copy,
{
    executor
        .execute(
            "CREATE TABLE IF NOT EXISTS field_mapping (
                original_name VARCHAR(255) NOT NULL,
                sanitized_name VARCHAR(64) NOT NULL,
                field_type VARCHAR(32) NOT NULL,
                PRIMARY KEY (original_name)
            )",
        )
        .await
        .map_err(TenderflowDbError::classify)?;

    executor
        .execute(
            "CREATE TABLE IF NOT EXISTS processed_files (
                id BIGINT AUTO_INCREMENT PRIMARY KEY,
                file_name VARCHAR(1024) NOT NULL,
                processed_at DATETIME NOT NULL,
                record_count BIGINT NOT NULL,
                status ENUM('completed', 'failed') NOT NULL,
                error_message TEXT,
                UNIQUE KEY uq_processed_files_file_name (file_name(768))
            )",
        )
        .await
        .map_err(TenderflowDbError::classify)?;

    Ok(())
}

/// Creates `main_data` with the column order fixed by `schema.fields`, plus
/// the system columns and indexes required by the component design.
pub async fn create_main_table<'e, E>(executor: E, schema: &Schema) -> Result<(), TenderflowDbError>
where
    E: Executor<'e, Database = MySql> + Copy,
{
    let mut columns = vec!["cig VARCHAR(64) NOT NULL PRIMARY KEY".to_string()];
    for field in &schema.fields {
        if field.declared_type.is_json() || field.sanitized_name == "cig" {
            continue;
        }
        columns.push(format!(
            "`{}` {} NULL",
            field.sanitized_name,
            field.declared_type.sql_fragment()
        ));
    }
    columns.push("created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP".to_string());
    columns.push("source_file VARCHAR(1024) NOT NULL".to_string());
    columns.push("batch_id VARCHAR(64) NOT NULL".to_string());

    let stmt = format!("CREATE TABLE IF NOT EXISTS {MAIN_TABLE} ({})", columns.join(", "));
    debug!(%stmt, "creating main table");
    executor.execute(stmt.as_str()).await.map_err(TenderflowDbError::classify)?;

    for (name, definition) in [
        ("idx_main_data_created_at", "created_at"),
        ("idx_main_data_source_file", "source_file"),
        ("idx_main_data_batch_id", "batch_id"),
        ("idx_main_data_cig_source_file", "cig, source_file"),
        ("idx_main_data_cig_batch_id", "cig, batch_id"),
    ] {
        let stmt = format!("CREATE INDEX {name} ON {MAIN_TABLE} ({definition})");
        if let Err(err) = executor.execute(stmt.as_str()).await {
            let classified = TenderflowDbError::classify(err);
            if !matches!(classified, TenderflowDbError::SchemaConflict(_)) {
                return Err(classified);
            }
        }
    }

    Ok(())
}

/// Creates the auxiliary table for one structured-JSON field.
pub async fn create_auxiliary_table<'e, E>(
    executor: E,
    field: &FieldDescriptor,
) -> Result<(), TenderflowDbError>
where
    E: Executor<'e, Database = MySql> + Copy,
{
    let table = auxiliary_table_name(&field.sanitized_name);
    let json_column = format!("{}_json", field.sanitized_name);
    let stmt = format!(
        "CREATE TABLE IF NOT EXISTS `{table}` (
            cig VARCHAR(64) NOT NULL PRIMARY KEY,
            `{json_column}` JSON NULL,
            source_file VARCHAR(1024) NOT NULL,
            batch_id VARCHAR(64) NOT NULL,
            FOREIGN KEY (cig) REFERENCES {MAIN_TABLE} (cig)
        )"
    );
    executor.execute(stmt.as_str()).await.map_err(TenderflowDbError::classify)?;
    Ok(())
}

pub fn auxiliary_table_name(sanitized_field: &str) -> String {
    format!("{sanitized_field}_data")
}

/// Adds one column to `main_data` with the given declared type. Duplicate
/// column errors (a concurrent race during evolution) are swallowed.
pub async fn add_column<'e, E>(
    executor: E,
    column: &str,
    declared_type: ColumnType,
) -> Result<(), TenderflowDbError>
where
    E: Executor<'e, Database = MySql> + Copy,
{
    let stmt = format!(
        "ALTER TABLE {MAIN_TABLE} ADD COLUMN `{column}` {} NULL",
        declared_type.sql_fragment()
    );
    match executor.execute(stmt.as_str()).await {
        Ok(_) => Ok(()),
        Err(err) => match TenderflowDbError::classify(err) {
            TenderflowDbError::SchemaConflict(_) => Ok(()),
            other => Err(other),
        },
    }
}

/// Widens a bounded-text column to unbounded text in response to a
/// width-exceeded error during loading.
pub async fn widen_column_to_text<'e, E>(executor: E, column: &str) -> Result<(), TenderflowDbError>
where
    E: Executor<'e, Database = MySql> + Copy,
{
    let stmt = format!("ALTER TABLE {MAIN_TABLE} MODIFY COLUMN `{column}` TEXT NULL");
    executor.execute(stmt.as_str()).await.map_err(TenderflowDbError::classify)?;
    Ok(())
}

pub async fn upsert_field_mapping<'e, E>(
    executor: E,
    original_name: &str,
    sanitized_name: &str,
    declared_type: ColumnType,
) -> Result<(), TenderflowDbError>
where
    E: Executor<'e, Database = MySql> + Copy,
{
    let type_name = format!("{:?}", declared_type);
    sqlx::query(
        "INSERT INTO field_mapping (original_name, sanitized_name, field_type)
         VALUES (?, ?, ?)
         ON DUPLICATE KEY UPDATE sanitized_name = VALUES(sanitized_name), field_type = VALUES(field_type)",
    )
    .bind(original_name)
    .bind(sanitized_name)
    .bind(type_name)
    .execute(executor)
    .await
    .map_err(TenderflowDbError::classify)?;
    Ok(())
}
