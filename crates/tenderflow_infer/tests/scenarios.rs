use std::io::Write;
use tempfile::NamedTempFile;
use tenderflow_infer::{CorpusStats, Inferencer};
use tenderflow_schema::ColumnType;

fn write_jsonl(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}

#[test]
fn single_file_two_records_monetary_column() {
    let file = write_jsonl(&[
        r#"{"cig":"A","oggetto":"x","importo":10.5}"#,
        r#"{"cig":"B","oggetto":"y","importo":20}"#,
    ]);

    let inferencer = Inferencer::new();
    let mut stats = CorpusStats::new();
    inferencer.sample_file(file.path(), &mut stats).unwrap();
    let schema = inferencer.resolve_schema(stats);

    let importo = schema.field_by_original("importo").unwrap();
    assert_eq!(importo.declared_type, ColumnType::Decimal { precision: 20, scale: 2 });
}

#[test]
fn mixed_alphanumeric_field_never_resolves_to_integer() {
    let file = write_jsonl(&[
        r#"{"cig":"A","numero_gara":"Z2B1FADD05"}"#,
        r#"{"cig":"B","numero_gara":"12345"}"#,
    ]);

    let inferencer = Inferencer::new();
    let mut stats = CorpusStats::new();
    inferencer.sample_file(file.path(), &mut stats).unwrap();
    let schema = inferencer.resolve_schema(stats);

    let field = schema.field_by_original("numero_gara").unwrap();
    assert!(!matches!(field.declared_type, ColumnType::Int32));
}

#[test]
fn wide_row_promotes_bounded_text_columns_to_unbounded() {
    // Enough 500-char-ish fields to exceed the 65,535-byte row limit.
    let long_value = "x".repeat(480);
    let mut lines = Vec::new();
    let mut fields = String::new();
    for i in 0..40 {
        fields.push_str(&format!(r#","field_{i}":"{long_value}""#));
    }
    lines.push(format!(r#"{{"cig":"A"{fields}}}"#));
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let file = write_jsonl(&refs);

    let inferencer = Inferencer::new();
    let mut stats = CorpusStats::new();
    inferencer.sample_file(file.path(), &mut stats).unwrap();
    let schema = inferencer.resolve_schema(stats);

    let any_field = schema.field_by_original("field_0").unwrap();
    assert_eq!(any_field.declared_type, ColumnType::UnboundedText);
}
