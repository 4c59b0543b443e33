use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Reserved column names a sanitized field name must never collide with.
pub const RESERVED_COLUMNS: &[&str] = &["id", "cig", "created_at", "source_file", "batch_id"];

/// Closed sum type for declared relational column types.
///
/// This replaces ad-hoc dictionary introspection with an explicit, exhaustive
/// set of shapes the inference engine is allowed to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    BoundedText(u16),
    UnboundedText,
    Int32,
    Decimal { precision: u8, scale: u8 },
    Date,
    DateTime,
    Boolean,
    Json,
}

impl ColumnType {
    /// Estimated worst-case byte width of one value of this type in a row,
    /// used by the inferencer's row-width promotion check (see
    /// [`ColumnType::promote_if_bounded`]).
    pub fn estimated_width(self) -> usize {
        match self {
            ColumnType::BoundedText(n) => n as usize * 4,
            ColumnType::UnboundedText => 0, // stored out-of-row
            ColumnType::Int32 => 4,
            ColumnType::Decimal { .. } => 8,
            ColumnType::Date => 4,
            ColumnType::DateTime => 8,
            ColumnType::Boolean => 1,
            ColumnType::Json => 0, // routed to an auxiliary table
        }
    }

    /// Widens a 500-char bounded text column to unbounded text. No-op for
    /// every other variant; this is the only retyping step permitted after
    /// initial inference.
    pub fn promote_if_bounded_500(self) -> ColumnType {
        match self {
            ColumnType::BoundedText(500) => ColumnType::UnboundedText,
            other => other,
        }
    }

    pub fn is_json(self) -> bool {
        matches!(self, ColumnType::Json)
    }

    /// The SQL type fragment for DDL generation.
    pub fn sql_fragment(self) -> String {
        match self {
            ColumnType::BoundedText(n) => format!("VARCHAR({n})"),
            ColumnType::UnboundedText => "TEXT".to_string(),
            ColumnType::Int32 => "INT".to_string(),
            ColumnType::Decimal { precision, scale } => format!("DECIMAL({precision},{scale})"),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::DateTime => "DATETIME".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Json => "JSON".to_string(),
        }
    }
}

/// A value-shape tag assigned to a single scalar during inference.
///
/// The set is closed: every value seen during sampling is classified into
/// exactly one of these, and a field's resolved [`ColumnType`] is a function
/// of the set of tags its values produced (see `tenderflow_infer`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PatternTag {
    Null,
    Empty,
    Boolean,
    PureInteger,
    PureDecimal,
    Monetary,
    Percentage,
    DateIso,
    DateEuropean,
    DateAmerican,
    DatetimeIso,
    DatetimeEuropean,
    Timestamp,
    Email,
    Url,
    Phone,
    PostalCode,
    FiscalCode,
    PartitaIva,
    CupCode,
    CigCode,
    AlphanumericMixed,
    Json,
    Text,
}

/// What the inference engine knows about one field after sampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub original_name: String,
    pub sanitized_name: String,
    pub patterns: BTreeSet<PatternTag>,
    pub mixed: bool,
    pub max_len: usize,
    pub declared_type: ColumnType,
}

impl FieldDescriptor {
    pub fn new(original_name: impl Into<String>, sanitized_name: impl Into<String>) -> Self {
        Self {
            original_name: original_name.into(),
            sanitized_name: sanitized_name.into(),
            patterns: BTreeSet::new(),
            mixed: false,
            max_len: 0,
            declared_type: ColumnType::BoundedText(50),
        }
    }

    pub fn observe_len(&mut self, len: usize) {
        if len > self.max_len {
            self.max_len = len;
        }
    }
}

/// The full relational schema for one ingestion run: the primary table's
/// column set plus the set of auxiliary JSON tables fanned out from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<FieldDescriptor>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(&self, sanitized_name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.sanitized_name == sanitized_name)
    }

    pub fn field_by_original(&self, original_name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.original_name == original_name)
    }

    pub fn has_sanitized(&self, sanitized_name: &str) -> bool {
        self.fields.iter().any(|f| f.sanitized_name == sanitized_name)
    }

    pub fn json_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.declared_type.is_json())
    }

    pub fn push(&mut self, descriptor: FieldDescriptor) {
        self.fields.push(descriptor);
    }

    /// Total estimated row width in bytes, excluding fields routed to
    /// auxiliary tables.
    pub fn estimated_row_width(&self) -> usize {
        self.fields.iter().map(|f| f.declared_type.estimated_width()).sum()
    }
}

/// One decoded JSON record from an input file, with its primary key cached
/// so routing does not need to re-look it up on every access.
#[derive(Debug, Clone)]
pub struct Record {
    fields: Map<String, Value>,
    cig: Option<String>,
}

impl Record {
    pub fn from_value(value: Value) -> Option<Self> {
        let fields = match value {
            Value::Object(map) => map,
            _ => return None,
        };
        let cig = fields.get("cig").and_then(Value::as_str).map(str::to_owned);
        Some(Self { fields, cig })
    }

    pub fn cig(&self) -> Option<&str> {
        self.cig.as_deref()
    }

    pub fn is_valid(&self) -> bool {
        self.cig.as_deref().map(|c| !c.is_empty()).unwrap_or(false)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, original_name: &str) -> Option<&Value> {
        self.fields.get(original_name)
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_extracts_cig() {
        let record = Record::from_value(serde_json::json!({"cig": "ABC123", "x": 1})).unwrap();
        assert_eq!(record.cig(), Some("ABC123"));
        assert!(record.is_valid());
    }

    #[test]
    fn record_without_cig_is_invalid() {
        let record = Record::from_value(serde_json::json!({"x": 1})).unwrap();
        assert!(!record.is_valid());
    }

    #[test]
    fn record_rejects_non_object() {
        assert!(Record::from_value(serde_json::json!([1, 2, 3])).is_none());
    }

    #[test]
    fn promote_widens_only_bounded_500() {
        assert_eq!(
            ColumnType::BoundedText(500).promote_if_bounded_500(),
            ColumnType::UnboundedText
        );
        assert_eq!(
            ColumnType::BoundedText(150).promote_if_bounded_500(),
            ColumnType::BoundedText(150)
        );
    }

    #[test]
    fn schema_tracks_json_fields() {
        let mut schema = Schema::new();
        let mut json_field = FieldDescriptor::new("dettagli", "dettagli");
        json_field.declared_type = ColumnType::Json;
        schema.push(json_field);
        schema.push(FieldDescriptor::new("cig", "cig"));
        assert_eq!(schema.json_fields().count(), 1);
    }
}
