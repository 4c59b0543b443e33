use tenderflow_db::ddl;
use tenderflow_db::TenderflowDbError;

// DDL statement execution needs a live MySQL server (AUTO_INCREMENT, ENUM,
// and JSON column types have no sqlite equivalent), so these exercise only
// the pure naming and error-classification helpers that back it.

#[test]
fn auxiliary_table_name_appends_suffix() {
    assert_eq!(ddl::auxiliary_table_name("dettagli"), "dettagli_data");
    assert_eq!(ddl::auxiliary_table_name("lotti"), "lotti_data");
}

#[test]
fn main_table_name_is_stable() {
    assert_eq!(ddl::MAIN_TABLE, "main_data");
}

#[test]
fn width_exceeded_error_names_its_column() {
    let err = TenderflowDbError::WidthExceeded { column: "descrizione".to_string() };
    assert!(err.to_string().contains("descrizione"));
}

#[test]
fn batch_too_large_error_is_distinct_from_width_exceeded() {
    let err = TenderflowDbError::BatchTooLarge { attempted: 200_000 };
    assert!(!matches!(err, TenderflowDbError::WidthExceeded { .. }));
    assert!(err.to_string().contains("200000"));
}
