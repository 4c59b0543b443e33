use serde_json::Value;
use tenderflow_ingest::batch_sizer::AdaptiveBatchSizer;
use tenderflow_ingest::router::{ordered_primary_tuple, RoutedRecord};
use tenderflow_schema::{ColumnType, FieldDescriptor, Schema};

// SchemaManager and ConnectionPool need a live MySQL server, so this exercises
// the pure halves of the record-routing and batch-sizing path together: a
// routed record re-ordered against an evolving schema, and the batch sizer
// reacting to that file's apparent memory pressure.

fn schema_with(fields: &[(&str, ColumnType)]) -> Schema {
    let mut schema = Schema::new();
    for (name, ty) in fields {
        let mut field = FieldDescriptor::new(name.to_string(), name.to_string());
        field.declared_type = *ty;
        schema.push(field);
    }
    schema
}

#[test]
fn routed_record_survives_a_schema_widened_after_it_was_built() {
    let schema = schema_with(&[
        ("cig", ColumnType::BoundedText(64)),
        ("importo", ColumnType::Decimal { precision: 20, scale: 2 }),
    ]);

    let routed = RoutedRecord {
        cig: "A".to_string(),
        primary_values: vec![("importo".to_string(), Some(Value::from(10.5)))],
        json_values: vec![],
        source_file: "bandi_2026.json".to_string(),
        batch_id: "1_0".to_string(),
    };

    // A field observed later in the same file widens the schema; a record
    // routed before that point must still tuple up correctly against it.
    let mut widened = schema.clone();
    let mut new_field = FieldDescriptor::new("stato", "stato");
    new_field.declared_type = ColumnType::BoundedText(50);
    widened.push(new_field);

    let tuple = ordered_primary_tuple(&widened, &routed);
    assert_eq!(tuple.len(), 2);
    assert_eq!(tuple[0], Some(Value::from(10.5)));
    assert_eq!(tuple[1], None);
}

#[test]
fn batch_sizer_seed_is_within_documented_bounds() {
    let sizer = AdaptiveBatchSizer::new();
    let size = sizer.current();
    assert!(size >= 10_000, "seed must not fall below the floor: {size}");
    assert!(size <= 1_000_000, "seed must not exceed the ceiling: {size}");
}
