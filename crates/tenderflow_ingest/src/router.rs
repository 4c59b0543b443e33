//! The Record Router: validates, normalizes, and fans out one decoded
//! record into the shape the Batch Loader expects.

use crate::schema_manager::SchemaManager;
use serde_json::Value;
use tenderflow_db::{ConnectionPool, TenderflowDbError};
use tenderflow_schema::{Record, Schema};
use tracing::warn;

/// One record, normalized: the primary-table tuple (column name, value)
/// pairs in no particular order (the loader re-orders them against the
/// live schema at insert time) plus any structured-JSON fields destined for
/// auxiliary tables.
#[derive(Debug, Clone)]
pub struct RoutedRecord {
    pub cig: String,
    pub primary_values: Vec<(String, Option<Value>)>,
    pub json_values: Vec<(String, Value)>,
    pub source_file: String,
    pub batch_id: String,
}

pub struct Router;

impl Router {
    pub fn new() -> Self {
        Self
    }

    /// Routes one record. Returns `Ok(None)` for records dropped for
    /// lacking a usable `cig` (logged, not fatal). Schema evolution for
    /// unseen fields happens here via `schema_manager`.
    pub async fn route(
        &self,
        record: &Record,
        schema_manager: &SchemaManager,
        pool: &ConnectionPool,
        source_file: &str,
        batch_id: &str,
    ) -> Result<Option<RoutedRecord>, TenderflowDbError> {
        if !record.is_valid() {
            warn!(source_file, "dropping record with missing or empty cig");
            return Ok(None);
        }
        let cig = record.cig().unwrap().to_string();

        let mut primary_values = Vec::new();
        let mut json_values = Vec::new();

        for (original_name, value) in record.fields() {
            if original_name == "cig" {
                continue;
            }
            let descriptor = schema_manager.ensure_column(pool, original_name, value).await?;

            if descriptor.declared_type.is_json() {
                json_values.push((descriptor.sanitized_name, value.clone()));
            } else {
                primary_values.push((descriptor.sanitized_name, normalize_scalar(value)));
            }
        }

        Ok(Some(RoutedRecord {
            cig,
            primary_values,
            json_values,
            source_file: source_file.to_string(),
            batch_id: batch_id.to_string(),
        }))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_scalar(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        other => Some(other.clone()),
    }
}

/// Builds the ordered tuple of primary-table values for one routed record,
/// filling missing fields with null and translating to the schema's current
/// column order.
pub fn ordered_primary_tuple(schema: &Schema, routed: &RoutedRecord) -> Vec<Option<Value>> {
    schema
        .fields
        .iter()
        .filter(|f| !f.declared_type.is_json())
        .map(|f| {
            routed
                .primary_values
                .iter()
                .find(|(name, _)| name == &f.sanitized_name)
                .and_then(|(_, v)| v.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenderflow_schema::{ColumnType, FieldDescriptor};

    fn schema_with(names: &[&str]) -> Schema {
        let mut schema = Schema::new();
        for name in names {
            let mut field = FieldDescriptor::new(name.to_string(), name.to_string());
            field.declared_type = ColumnType::BoundedText(50);
            schema.push(field);
        }
        schema
    }

    #[test]
    fn missing_fields_become_null_in_order() {
        let schema = schema_with(&["a", "b", "c"]);
        let routed = RoutedRecord {
            cig: "X".to_string(),
            primary_values: vec![("b".to_string(), Some(Value::from("v")))],
            json_values: vec![],
            source_file: "f.json".to_string(),
            batch_id: "1_0".to_string(),
        };
        let tuple = ordered_primary_tuple(&schema, &routed);
        assert_eq!(tuple, vec![None, Some(Value::from("v")), None]);
    }
}
