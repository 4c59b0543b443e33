//! The ordered priority rules that turn one field's observed pattern tags
//! into a declared [`ColumnType`]. First matching rule wins.

use std::collections::BTreeSet;
use tenderflow_schema::{ColumnType, PatternTag};

const DATETIME_FIELD_NAMES: &[&str] = &[
    "data_creazione",
    "data_pubblicazione",
    "data_scadenza",
    "data_aggiornamento",
    "data_inizio",
    "data_fine",
    "data_inserimento",
    "data_modifica",
    "created_at",
    "updated_at",
    "published_at",
    "expired_at",
];

const UNBOUNDED_TEXT_SUBSTRINGS: &[&str] = &[
    "denominazione",
    "descrizione",
    "amministrazione",
    "ragione_sociale",
    "oggetto",
    "dettaglio",
    "motivazione",
    "specifiche",
    "note",
];

const IDENTIFIER_FIELD_NAMES: &[&str] = &[
    "cig",
    "cup",
    "codice_fiscale",
    "partita_iva",
    "numero_verde",
    "numero_telefono",
    "numero_gara",
    "codice_gara",
    "id_gara",
    "numero",
    "codice",
    "id",
    "identificativo",
    "riferimento",
    "numero_lotto",
];

/// Resolves the declared column type for a field from its name and the
/// pattern tags/mixed flag/max length observed across the sample.
pub fn resolve_column_type(
    field_name: &str,
    patterns: &BTreeSet<PatternTag>,
    mixed: bool,
    max_len: usize,
) -> ColumnType {
    // Rule 1: known datetime field names.
    if DATETIME_FIELD_NAMES.contains(&field_name) {
        return ColumnType::DateTime;
    }

    // Rule 2: known free-text field names.
    if UNBOUNDED_TEXT_SUBSTRINGS.iter().any(|s| field_name.contains(s)) {
        return ColumnType::UnboundedText;
    }

    // Rule 3: known identifier field names.
    if IDENTIFIER_FIELD_NAMES.contains(&field_name) {
        return identifier_width(field_name, max_len);
    }

    // Rule 4: mixed or alphanumeric-mixed values are never numeric/native.
    if mixed || patterns.contains(&PatternTag::AlphanumericMixed) {
        return bounded_text_for_len(max_len);
    }

    // Rule 5: a single monomorphic pattern maps directly to a native type.
    if let Some(only) = single_tag(patterns) {
        if let Some(native) = native_type_for_tag(only) {
            return native;
        }
    }

    // Rule 6: fallback, sized by the observed maximum length.
    bounded_text_for_len(max_len)
}

fn single_tag(patterns: &BTreeSet<PatternTag>) -> Option<PatternTag> {
    let mut iter = patterns.iter();
    let first = *iter.next()?;
    if iter.next().is_some() {
        None
    } else {
        Some(first)
    }
}

fn native_type_for_tag(tag: PatternTag) -> Option<ColumnType> {
    Some(match tag {
        PatternTag::Boolean => ColumnType::Boolean,
        PatternTag::PureInteger => ColumnType::Int32,
        PatternTag::PureDecimal | PatternTag::Monetary => ColumnType::Decimal { precision: 20, scale: 2 },
        PatternTag::Percentage => ColumnType::Decimal { precision: 5, scale: 2 },
        PatternTag::DateIso | PatternTag::DateEuropean | PatternTag::DateAmerican => ColumnType::Date,
        PatternTag::DatetimeIso | PatternTag::DatetimeEuropean | PatternTag::Timestamp => ColumnType::DateTime,
        PatternTag::Json => ColumnType::Json,
        PatternTag::Email => ColumnType::BoundedText(100),
        PatternTag::Url => ColumnType::UnboundedText,
        PatternTag::Phone => ColumnType::BoundedText(20),
        PatternTag::PostalCode => ColumnType::BoundedText(5),
        PatternTag::FiscalCode => ColumnType::BoundedText(16),
        PatternTag::PartitaIva => ColumnType::BoundedText(11),
        PatternTag::CupCode => ColumnType::BoundedText(15),
        PatternTag::CigCode => ColumnType::BoundedText(13),
        PatternTag::Null | PatternTag::Empty | PatternTag::AlphanumericMixed | PatternTag::Text => return None,
    })
}

fn identifier_width(field_name: &str, max_len: usize) -> ColumnType {
    match field_name {
        "cig" => ColumnType::BoundedText(13),
        "cup" => ColumnType::BoundedText(15),
        "codice_fiscale" => ColumnType::BoundedText(16),
        "partita_iva" => ColumnType::BoundedText(11),
        "numero_telefono" | "numero_verde" => ColumnType::BoundedText(20),
        _ => bounded_text_for_len(max_len),
    }
}

fn bounded_text_for_len(max_len: usize) -> ColumnType {
    ColumnType::BoundedText(match max_len {
        0..=50 => 50,
        51..=100 => 150,
        101..=200 => 250,
        201..=500 => 500,
        501..=1000 => 500,
        _ => return ColumnType::UnboundedText,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[PatternTag]) -> BTreeSet<PatternTag> {
        values.iter().copied().collect()
    }

    #[test]
    fn datetime_field_name_wins_over_pattern() {
        let patterns = tags(&[PatternTag::Text]);
        assert_eq!(
            resolve_column_type("data_creazione", &patterns, false, 10),
            ColumnType::DateTime
        );
    }

    #[test]
    fn free_text_field_name_forces_unbounded() {
        let patterns = tags(&[PatternTag::PureInteger]);
        assert_eq!(
            resolve_column_type("descrizione_lotto", &patterns, false, 5),
            ColumnType::UnboundedText
        );
    }

    #[test]
    fn mixed_values_are_never_numeric() {
        let patterns = tags(&[PatternTag::AlphanumericMixed]);
        assert_eq!(
            resolve_column_type("numero_gara", &patterns, true, 10),
            ColumnType::BoundedText(13)
        );
    }

    #[test]
    fn monomorphic_decimal_resolves_to_decimal() {
        let patterns = tags(&[PatternTag::Monetary]);
        assert_eq!(
            resolve_column_type("importo", &patterns, false, 8),
            ColumnType::Decimal { precision: 20, scale: 2 }
        );
    }

    #[test]
    fn fallback_sizes_by_max_len() {
        let patterns = tags(&[PatternTag::Text, PatternTag::Empty]);
        assert_eq!(resolve_column_type("varie", &patterns, false, 40), ColumnType::BoundedText(50));
        assert_eq!(resolve_column_type("varie", &patterns, false, 2000), ColumnType::UnboundedText);
    }
}
