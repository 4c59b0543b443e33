use thiserror::Error;

/// Error taxonomy for the store layer. Variants are chosen so that callers
/// can pattern-match on recoverability rather than inspecting driver error
/// codes themselves.
#[derive(Debug, Error)]
pub enum TenderflowDbError {
    #[error("connection to the store was lost: {0}")]
    ConnectionLost(String),

    #[error("column {column} exceeds its current width")]
    WidthExceeded { column: String },

    #[error("batch of {attempted} rows exceeds the store's packet size")]
    BatchTooLarge { attempted: usize },

    #[error("schema conflict (likely a concurrent duplicate column): {0}")]
    SchemaConflict(String),

    #[error("fatal store error: {0}")]
    Fatal(#[from] sqlx::Error),
}

impl TenderflowDbError {
    /// Classifies a raw `sqlx::Error` into the taxonomy above by inspecting
    /// the underlying driver error code/message, the only way MySQL signals
    /// these conditions through `sqlx`.
    pub fn classify(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let message = db_err.message().to_lowercase();
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();

            // MySQL 1406: Data too long for column
            if code == "1406" || message.contains("data too long") {
                if let Some(column) = extract_column_name(&message) {
                    return TenderflowDbError::WidthExceeded { column };
                }
                return TenderflowDbError::WidthExceeded {
                    column: "unknown".to_string(),
                };
            }

            // MySQL 1060: Duplicate column name
            if code == "1060" || message.contains("duplicate column") {
                return TenderflowDbError::SchemaConflict(message);
            }

            // MySQL 1153/2006/2013/1040: packet too large / gone away / lost
            if code == "1153" || message.contains("packet too large") {
                return TenderflowDbError::BatchTooLarge { attempted: 0 };
            }
        }

        if is_connection_lost(&err) {
            return TenderflowDbError::ConnectionLost(err.to_string());
        }

        TenderflowDbError::Fatal(err)
    }
}

fn is_connection_lost(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => true,
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_lowercase();
            message.contains("gone away")
                || message.contains("broken pipe")
                || message.contains("connection reset")
                || message.contains("lost connection")
        }
        _ => false,
    }
}

/// Best-effort extraction of the offending column name from a MySQL
/// "Data too long for column 'x' at row N" message.
fn extract_column_name(message: &str) -> Option<String> {
    let start = message.find("column '")? + "column '".len();
    let rest = &message[start..];
    let end = rest.find('\'')?;
    Some(rest[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_column_from_data_too_long_message() {
        let msg = "data too long for column 'descrizione' at row 12";
        assert_eq!(extract_column_name(msg), Some("descrizione".to_string()));
    }

    #[test]
    fn returns_none_without_quoted_column() {
        assert_eq!(extract_column_name("some other error"), None);
    }
}
