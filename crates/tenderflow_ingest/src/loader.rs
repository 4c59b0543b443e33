//! The Batch Loader: executes chunked multi-row inserts with recovery for
//! width-exceeded and packet-too-large errors.

use crate::batch_sizer::MIN_BATCH_SIZE;
use crate::router::{ordered_primary_tuple, RoutedRecord};
use serde_json::Value;
use sqlx::{MySql, QueryBuilder};
use tenderflow_db::{ddl, ConnectionPool, TenderflowDbError};
use tenderflow_schema::Schema;
use tracing::warn;

pub struct BatchLoader<'a> {
    pool: &'a ConnectionPool,
}

impl<'a> BatchLoader<'a> {
    pub fn new(pool: &'a ConnectionPool) -> Self {
        Self { pool }
    }

    /// Inserts `rows` into `main_data`, splitting into chunks of
    /// `batch_size` and recovering locally from width-exceeded and
    /// packet-too-large errors. A `ConnectionLost` error is propagated to
    /// the caller unchanged so the orchestrator can retry with backoff.
    pub async fn load_primary(
        &self,
        schema: &Schema,
        rows: &[RoutedRecord],
        batch_size: usize,
    ) -> Result<usize, TenderflowDbError> {
        let mut inserted = 0;
        for chunk in rows.chunks(batch_size.max(1)) {
            inserted += self.insert_primary_chunk_with_recovery(schema, chunk).await?;
        }
        Ok(inserted)
    }

    /// Inserts one field's structured-JSON values into its auxiliary table.
    pub async fn load_auxiliary(
        &self,
        sanitized_field: &str,
        rows: &[(String, Value, String, String)],
        batch_size: usize,
    ) -> Result<usize, TenderflowDbError> {
        let mut inserted = 0;
        for chunk in rows.chunks(batch_size.max(1)) {
            inserted += self.insert_auxiliary_chunk(sanitized_field, chunk).await?;
        }
        Ok(inserted)
    }

    async fn insert_primary_chunk_with_recovery(
        &self,
        schema: &Schema,
        chunk: &[RoutedRecord],
    ) -> Result<usize, TenderflowDbError> {
        if chunk.is_empty() {
            return Ok(0);
        }
        match self.insert_primary_chunk(schema, chunk).await {
            Ok(n) => Ok(n),
            Err(TenderflowDbError::WidthExceeded { column }) => {
                warn!(column, "widening column after data-too-long error, retrying once");
                ddl::widen_column_to_text(self.pool.raw(), &column).await?;
                self.insert_primary_chunk(schema, chunk).await
            }
            Err(TenderflowDbError::BatchTooLarge { .. }) => {
                if chunk.len() <= MIN_BATCH_SIZE {
                    return Err(TenderflowDbError::BatchTooLarge { attempted: chunk.len() });
                }
                let mid = chunk.len() / 2;
                let (first, second) = chunk.split_at(mid);
                let a = Box::pin(self.insert_primary_chunk_with_recovery(schema, first)).await?;
                let b = Box::pin(self.insert_primary_chunk_with_recovery(schema, second)).await?;
                Ok(a + b)
            }
            Err(other) => Err(other),
        }
    }

    async fn insert_primary_chunk(
        &self,
        schema: &Schema,
        chunk: &[RoutedRecord],
    ) -> Result<usize, TenderflowDbError> {
        let scalar_fields: Vec<&str> = schema
            .fields
            .iter()
            .filter(|f| !f.declared_type.is_json())
            .map(|f| f.sanitized_name.as_str())
            .collect();

        let mut columns = vec!["cig"];
        columns.extend(scalar_fields.iter().copied());
        columns.push("source_file");
        columns.push("batch_id");

        let column_list = columns
            .iter()
            .map(|c| format!("`{c}`"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut qb: QueryBuilder<MySql> =
            QueryBuilder::new(format!("INSERT INTO {} ({column_list}) ", ddl::MAIN_TABLE));

        qb.push_values(chunk, |mut b, routed| {
            b.push_bind(routed.cig.clone());
            for value in ordered_primary_tuple(schema, routed) {
                b.push_bind(value.as_ref().map(value_to_bind_string));
            }
            b.push_bind(routed.source_file.clone());
            b.push_bind(routed.batch_id.clone());
        });

        qb.push(" ON DUPLICATE KEY UPDATE ");
        let updates = columns
            .iter()
            .filter(|c| **c != "cig")
            .map(|c| format!("`{c}` = VALUES(`{c}`)"))
            .collect::<Vec<_>>()
            .join(", ");
        qb.push(updates);

        let query = qb.build();
        query
            .execute(self.pool.raw())
            .await
            .map(|result| result.rows_affected() as usize)
            .map_err(TenderflowDbError::classify)
    }

    async fn insert_auxiliary_chunk(
        &self,
        sanitized_field: &str,
        chunk: &[(String, Value, String, String)],
    ) -> Result<usize, TenderflowDbError> {
        if chunk.is_empty() {
            return Ok(0);
        }
        let table = ddl::auxiliary_table_name(sanitized_field);
        let json_column = format!("{sanitized_field}_json");

        let mut qb: QueryBuilder<MySql> = QueryBuilder::new(format!(
            "INSERT INTO `{table}` (cig, `{json_column}`, source_file, batch_id) "
        ));
        qb.push_values(chunk, |mut b, (cig, value, source_file, batch_id)| {
            b.push_bind(cig.clone());
            b.push_bind(serde_json::to_string(value).unwrap_or_default());
            b.push_bind(source_file.clone());
            b.push_bind(batch_id.clone());
        });
        qb.push(format!(
            " ON DUPLICATE KEY UPDATE `{json_column}` = VALUES(`{json_column}`), \
              source_file = VALUES(source_file), batch_id = VALUES(batch_id)"
        ));

        let query = qb.build();
        query
            .execute(self.pool.raw())
            .await
            .map(|result| result.rows_affected() as usize)
            .map_err(TenderflowDbError::classify)
    }
}

/// Converts a scalar JSON value to the text form bound into the prepared
/// statement. MySQL coerces the bound string to the column's declared type
/// on insert.
fn value_to_bind_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
