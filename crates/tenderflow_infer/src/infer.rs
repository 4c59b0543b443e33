//! The two-pass schema inference engine.
//!
//! Pass one streams up to [`Inferencer::max_records_per_file`] records per
//! file and accumulates, per field, the set of pattern tags observed, the
//! mixed-alphanumeric flag, and the maximum string length. Pass two walks
//! the accumulated per-field statistics once inference across the whole
//! corpus is complete and resolves each field's declared type via the
//! priority rules in [`crate::rules`], then applies the row-width
//! promotion check.

use crate::memory::{self, HARD_CEILING_UTILIZATION};
use crate::patterns::{self, has_letter_and_digit};
use crate::rules::resolve_column_type;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::{BufRead, BufReader};
use std::path::Path;
use tenderflow_schema::{ColumnType, FieldDescriptor, PatternTag, Schema};
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_MAX_RECORDS_PER_FILE: usize = 2000;
const MEMORY_CHECK_INTERVAL: usize = 1000;

#[derive(Debug, Error)]
pub enum InferError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Default, Clone)]
struct FieldAccumulator {
    patterns: BTreeSet<PatternTag>,
    mixed: bool,
    max_len: usize,
}

impl FieldAccumulator {
    fn observe(&mut self, value: &Value) {
        let tag = patterns::classify(value);
        self.patterns.insert(tag);
        if let Value::String(s) = value {
            self.max_len = self.max_len.max(s.chars().count());
            if has_letter_and_digit(s) {
                self.mixed = true;
            }
        }
    }
}

/// Accumulates field statistics across every file sampled so far, to be
/// resolved into a [`Schema`] once the whole corpus has been sampled.
#[derive(Default)]
pub struct CorpusStats {
    order: Vec<String>,
    fields: HashMap<String, FieldAccumulator>,
}

impl CorpusStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, name: &str, value: &Value) {
        if !self.fields.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.fields.entry(name.to_string()).or_default().observe(value);
    }
}

pub struct Inferencer {
    max_records_per_file: usize,
}

impl Default for Inferencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Inferencer {
    pub fn new() -> Self {
        Self { max_records_per_file: DEFAULT_MAX_RECORDS_PER_FILE }
    }

    #[cfg(test)]
    fn with_max_records(max_records_per_file: usize) -> Self {
        Self { max_records_per_file }
    }

    /// Samples up to `max_records_per_file` records from `path` into
    /// `stats`. Aborts the file early if memory pressure crosses the hard
    /// ceiling. Malformed lines are skipped, not fatal.
    pub fn sample_file(&self, path: &Path, stats: &mut CorpusStats) -> Result<usize, InferError> {
        let file = std::fs::File::open(path).map_err(|source| InferError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut sampled = 0usize;

        for (line_no, line) in reader.lines().enumerate() {
            if sampled >= self.max_records_per_file {
                break;
            }
            let line = match line {
                Ok(l) => l,
                Err(err) => {
                    warn!(path = %path.display(), line_no, error = %err, "failed to read line");
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let value: Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(err) => {
                    warn!(path = %path.display(), line_no, error = %err, "skipping malformed record during sampling");
                    continue;
                }
            };
            if let Value::Object(map) = value {
                for (key, val) in map.iter() {
                    stats.record(key, val);
                }
                sampled += 1;
            }

            if sampled % MEMORY_CHECK_INTERVAL == 0 {
                let snap = memory::snapshot();
                if snap.fraction_of_target() >= HARD_CEILING_UTILIZATION / memory::TARGET_UTILIZATION {
                    warn!(
                        path = %path.display(),
                        sampled,
                        utilization = snap.utilization(),
                        "aborting file sample early due to memory pressure"
                    );
                    break;
                }
            }
        }

        info!(path = %path.display(), sampled, "sampled file for schema inference");
        Ok(sampled)
    }

    /// Resolves accumulated corpus statistics into a concrete [`Schema`],
    /// sanitizing field names in first-seen order and applying the
    /// row-width promotion check.
    pub fn resolve_schema(&self, stats: CorpusStats) -> Schema {
        let mut schema = Schema::new();
        let mut taken: HashSet<String> = HashSet::new();

        for original_name in &stats.order {
            let acc = stats.fields.get(original_name).expect("recorded field must have stats");
            let sanitized = tenderflow_schema::naming::sanitize_column_name(original_name, &taken);
            taken.insert(sanitized.clone());

            let declared_type = if original_name == "cig" {
                ColumnType::BoundedText(64)
            } else {
                resolve_column_type(original_name, &acc.patterns, acc.mixed, acc.max_len)
            };

            let mut descriptor = FieldDescriptor::new(original_name.clone(), sanitized);
            descriptor.patterns = acc.patterns.clone();
            descriptor.mixed = acc.mixed;
            descriptor.max_len = acc.max_len;
            descriptor.declared_type = declared_type;
            schema.push(descriptor);
        }

        promote_if_row_too_wide(&mut schema);
        schema
    }
}

/// If the estimated row width exceeds the hard relational-store limit,
/// promotes every 500-char bounded text column to unbounded text and
/// recomputes. This is the only retyping step permitted after initial
/// inference.
fn promote_if_row_too_wide(schema: &mut Schema) {
    const ROW_LIMIT_BYTES: usize = 65_535;
    if schema.estimated_row_width() <= ROW_LIMIT_BYTES {
        return;
    }
    for field in &mut schema.fields {
        field.declared_type = field.declared_type.promote_if_bounded_500();
    }
    info!("promoted bounded-text-500 columns to unbounded text to satisfy row width limit");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_jsonl(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn infers_decimal_and_text_columns() {
        let file = write_jsonl(&[
            r#"{"cig":"A","oggetto":"Fornitura sedie","importo":10.50}"#,
            r#"{"cig":"B","oggetto":"Fornitura tavoli","importo":20}"#,
        ]);
        let inferencer = Inferencer::new();
        let mut stats = CorpusStats::new();
        inferencer.sample_file(file.path(), &mut stats).unwrap();
        let schema = inferencer.resolve_schema(stats);

        let importo = schema.field_by_original("importo").unwrap();
        assert_eq!(importo.declared_type, ColumnType::Decimal { precision: 20, scale: 2 });

        let oggetto = schema.field_by_original("oggetto").unwrap();
        assert_eq!(oggetto.declared_type, ColumnType::UnboundedText);
    }

    #[test]
    fn skips_malformed_lines_without_failing() {
        let file = write_jsonl(&[r#"{"cig":"A","x":1}"#, "not json", r#"{"cig":"B","x":2}"#]);
        let inferencer = Inferencer::new();
        let mut stats = CorpusStats::new();
        let sampled = inferencer.sample_file(file.path(), &mut stats).unwrap();
        assert_eq!(sampled, 2);
    }

    #[test]
    fn respects_max_records_per_file() {
        let lines: Vec<String> = (0..10).map(|i| format!(r#"{{"cig":"{i}","x":1}}"#)).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let file = write_jsonl(&refs);
        let inferencer = Inferencer::with_max_records(3);
        let mut stats = CorpusStats::new();
        let sampled = inferencer.sample_file(file.path(), &mut stats).unwrap();
        assert_eq!(sampled, 3);
    }

    #[test]
    fn mixed_alphanumeric_field_is_bounded_text_not_integer() {
        let file = write_jsonl(&[
            r#"{"cig":"A","numero_gara":"Z2B1FADD05"}"#,
            r#"{"cig":"B","numero_gara":"12345"}"#,
        ]);
        let inferencer = Inferencer::new();
        let mut stats = CorpusStats::new();
        inferencer.sample_file(file.path(), &mut stats).unwrap();
        let schema = inferencer.resolve_schema(stats);
        let field = schema.field_by_original("numero_gara").unwrap();
        assert!(matches!(field.declared_type, ColumnType::BoundedText(_)));
    }
}
