//! The runtime half of the Dynamic Schema Manager: serializes column
//! additions discovered mid-stream behind one lock and keeps the in-memory
//! [`Schema`] in sync with what has actually been issued to the store.

use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use tenderflow_db::ddl;
use tenderflow_db::ConnectionPool;
use tenderflow_db::TenderflowDbError;
use tenderflow_infer::patterns;
use tenderflow_infer::rules::resolve_column_type;
use tenderflow_schema::{naming, ColumnType, FieldDescriptor, Schema};
use tokio::sync::Mutex;
use tracing::info;

struct State {
    schema: Schema,
    taken_names: HashSet<String>,
}

/// Owns the schema for the lifetime of a run. All mutation goes through
/// [`SchemaManager::ensure_column`], which is the only place the schema
/// changes after the initial DDL pass.
pub struct SchemaManager {
    state: Mutex<State>,
}

impl SchemaManager {
    pub fn new(schema: Schema) -> Self {
        let taken_names = schema.fields.iter().map(|f| f.sanitized_name.clone()).collect();
        Self {
            state: Mutex::new(State { schema, taken_names }),
        }
    }

    pub async fn snapshot(&self) -> Schema {
        self.state.lock().await.schema.clone()
    }

    /// Ensures a column exists for `original_name`, inferring its type from
    /// `sample_value` if this is the first time the field has been seen.
    /// Returns the field descriptor either way. The whole check-then-add
    /// sequence runs under the manager's single lock so concurrent routers
    /// cannot both decide to add the same column.
    pub async fn ensure_column(
        &self,
        pool: &ConnectionPool,
        original_name: &str,
        sample_value: &Value,
    ) -> Result<FieldDescriptor, TenderflowDbError> {
        let mut state = self.state.lock().await;

        if let Some(existing) = state.schema.field_by_original(original_name) {
            return Ok(existing.clone());
        }

        let sanitized = naming::sanitize_column_name(original_name, &state.taken_names);
        let tag = patterns::classify(sample_value);
        let mixed = matches!(sample_value, Value::String(s) if patterns::has_letter_and_digit(s));
        let mut patterns_set = BTreeSet::new();
        patterns_set.insert(tag);
        let declared_type = resolve_column_type(original_name, &patterns_set, mixed, value_len(sample_value));

        if declared_type.is_json() {
            ddl::create_auxiliary_table(pool.raw(), &make_descriptor(original_name, &sanitized, declared_type))
                .await?;
        } else {
            ddl::add_column(pool.raw(), &sanitized, declared_type).await?;
        }
        ddl::upsert_field_mapping(pool.raw(), original_name, &sanitized, declared_type).await?;

        let descriptor = make_descriptor(original_name, &sanitized, declared_type);
        state.taken_names.insert(sanitized);
        state.schema.push(descriptor.clone());

        info!(field = original_name, sanitized = %descriptor.sanitized_name, ?declared_type, "evolved schema with new column");
        Ok(descriptor)
    }
}

fn make_descriptor(original_name: &str, sanitized: &str, declared_type: ColumnType) -> FieldDescriptor {
    let mut descriptor = FieldDescriptor::new(original_name.to_string(), sanitized.to_string());
    descriptor.declared_type = declared_type;
    descriptor
}

fn value_len(value: &Value) -> usize {
    match value {
        Value::String(s) => s.chars().count(),
        _ => 0,
    }
}
