use std::collections::HashSet;
use tenderflow_schema::{naming, ColumnType, FieldDescriptor, Schema};

#[test]
fn field_mapping_is_bijective_within_one_schema() {
    let mut taken = HashSet::new();
    let originals = ["Data Creazione", "data-creazione", "DATA_CREAZIONE!"];
    let mut sanitized_names = Vec::new();

    for original in originals {
        let sanitized = naming::sanitize_column_name(original, &taken);
        taken.insert(sanitized.clone());
        sanitized_names.push(sanitized);
    }

    let unique: HashSet<_> = sanitized_names.iter().collect();
    assert_eq!(unique.len(), sanitized_names.len(), "every sanitized name must be distinct");
}

#[test]
fn schema_row_width_excludes_json_fields() {
    let mut schema = Schema::new();

    let mut text_field = FieldDescriptor::new("descrizione", "descrizione");
    text_field.declared_type = ColumnType::BoundedText(500);
    schema.push(text_field);

    let mut json_field = FieldDescriptor::new("dettagli", "dettagli");
    json_field.declared_type = ColumnType::Json;
    schema.push(json_field);

    assert_eq!(schema.estimated_row_width(), ColumnType::BoundedText(500).estimated_width());
}
