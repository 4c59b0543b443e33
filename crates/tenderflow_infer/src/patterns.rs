//! Classifies a single JSON scalar into one tag of the closed pattern set.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tenderflow_schema::PatternTag;

struct Patterns {
    date_iso: Regex,
    date_european: Regex,
    date_american: Regex,
    datetime_iso: Regex,
    datetime_european: Regex,
    email: Regex,
    url: Regex,
    phone: Regex,
    postal_code: Regex,
    fiscal_code: Regex,
    partita_iva: Regex,
    cup_code: Regex,
    cig_code: Regex,
    monetary: Regex,
    percentage: Regex,
    pure_decimal: Regex,
    pure_integer: Regex,
    timestamp: Regex,
}

static PATTERNS: Lazy<Patterns> = Lazy::new(|| Patterns {
    date_iso: Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap(),
    date_european: Regex::new(r"^\d{2}/\d{2}/\d{4}$").unwrap(),
    date_american: Regex::new(r"^\d{2}-\d{2}-\d{4}$").unwrap(),
    datetime_iso: Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}").unwrap(),
    datetime_european: Regex::new(r"^\d{2}/\d{2}/\d{4}[ T]\d{2}:\d{2}:\d{2}").unwrap(),
    email: Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap(),
    url: Regex::new(r"^https?://\S+$").unwrap(),
    phone: Regex::new(r"^(\+39)?\s?0?\d{6,11}$").unwrap(),
    postal_code: Regex::new(r"^\d{5}$").unwrap(),
    fiscal_code: Regex::new(r"^[A-Za-z]{6}\d{2}[A-Za-z]\d{2}[A-Za-z]\d{3}[A-Za-z]$").unwrap(),
    partita_iva: Regex::new(r"^\d{11}$").unwrap(),
    cup_code: Regex::new(r"^[A-Za-z0-9]{15}$").unwrap(),
    cig_code: Regex::new(r"^[A-Za-z0-9]{10}$").unwrap(),
    monetary: Regex::new(r"^€?\s?-?\d{1,3}(?:[.,]\d{3})*[.,]\d{2}\s?€?$").unwrap(),
    percentage: Regex::new(r"^-?\d+(?:[.,]\d+)?\s?%$").unwrap(),
    pure_decimal: Regex::new(r"^-?\d+[.,]\d+$").unwrap(),
    pure_integer: Regex::new(r"^-?\d+$").unwrap(),
    timestamp: Regex::new(r"^\d{10}(\d{3})?$").unwrap(),
});

/// Classifies one JSON value into exactly one [`PatternTag`].
pub fn classify(value: &Value) -> PatternTag {
    match value {
        Value::Null => PatternTag::Null,
        Value::Bool(_) => PatternTag::Boolean,
        Value::Number(n) => classify_number_text(&n.to_string()),
        Value::Array(_) | Value::Object(_) => PatternTag::Json,
        Value::String(s) => classify_string(s),
    }
}

fn classify_number_text(text: &str) -> PatternTag {
    let p = &*PATTERNS;
    if p.timestamp.is_match(text) {
        PatternTag::Timestamp
    } else if p.pure_integer.is_match(text) {
        PatternTag::PureInteger
    } else {
        PatternTag::PureDecimal
    }
}

fn classify_string(s: &str) -> PatternTag {
    let p = &*PATTERNS;
    let trimmed = s.trim();

    if trimmed.is_empty() {
        return PatternTag::Empty;
    }
    if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
        return PatternTag::Boolean;
    }
    if p.datetime_iso.is_match(trimmed) {
        return PatternTag::DatetimeIso;
    }
    if p.datetime_european.is_match(trimmed) {
        return PatternTag::DatetimeEuropean;
    }
    if p.date_iso.is_match(trimmed) {
        return PatternTag::DateIso;
    }
    if p.date_european.is_match(trimmed) {
        return PatternTag::DateEuropean;
    }
    if p.date_american.is_match(trimmed) {
        return PatternTag::DateAmerican;
    }
    if p.email.is_match(trimmed) {
        return PatternTag::Email;
    }
    if p.url.is_match(trimmed) {
        return PatternTag::Url;
    }
    if p.fiscal_code.is_match(trimmed) {
        return PatternTag::FiscalCode;
    }
    if p.partita_iva.is_match(trimmed) {
        return PatternTag::PartitaIva;
    }
    if p.postal_code.is_match(trimmed) {
        return PatternTag::PostalCode;
    }
    if p.cup_code.is_match(trimmed) && has_letter_and_digit(trimmed) {
        return PatternTag::CupCode;
    }
    if p.cig_code.is_match(trimmed) && has_letter_and_digit(trimmed) {
        return PatternTag::CigCode;
    }
    if p.monetary.is_match(trimmed) {
        return PatternTag::Monetary;
    }
    if p.percentage.is_match(trimmed) {
        return PatternTag::Percentage;
    }
    if p.pure_decimal.is_match(trimmed) {
        return PatternTag::PureDecimal;
    }
    if p.timestamp.is_match(trimmed) {
        return PatternTag::Timestamp;
    }
    if p.pure_integer.is_match(trimmed) {
        return PatternTag::PureInteger;
    }
    if p.phone.is_match(trimmed) {
        return PatternTag::Phone;
    }
    if has_letter_and_digit(trimmed) {
        return PatternTag::AlphanumericMixed;
    }
    PatternTag::Text
}

/// Whether a string mixes letters and digits, used both for the
/// `alphanumeric_mixed` tag and the field-level `mixed` flag.
pub fn has_letter_and_digit(s: &str) -> bool {
    let has_letter = s.chars().any(|c| c.is_alphabetic());
    let has_digit = s.chars().any(|c| c.is_ascii_digit());
    has_letter && has_digit
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_iso_date() {
        assert_eq!(classify(&json!("2024-03-15")), PatternTag::DateIso);
    }

    #[test]
    fn classifies_european_date() {
        assert_eq!(classify(&json!("15/03/2024")), PatternTag::DateEuropean);
    }

    #[test]
    fn classifies_email() {
        assert_eq!(classify(&json!("ufficio@comune.it")), PatternTag::Email);
    }

    #[test]
    fn classifies_mixed_alphanumeric() {
        assert_eq!(classify(&json!("Z2B1FADD05")), PatternTag::AlphanumericMixed);
        assert!(has_letter_and_digit("Z2B1FADD05"));
    }

    #[test]
    fn classifies_monetary() {
        assert_eq!(classify(&json!("1.234,56")), PatternTag::Monetary);
    }

    #[test]
    fn classifies_percentage() {
        assert_eq!(classify(&json!("12,5%")), PatternTag::Percentage);
    }

    #[test]
    fn classifies_plain_integer_number() {
        assert_eq!(classify(&json!(42)), PatternTag::PureInteger);
    }

    #[test]
    fn classifies_empty_string() {
        assert_eq!(classify(&json!("  ")), PatternTag::Empty);
    }

    #[test]
    fn classifies_nested_object_as_json() {
        assert_eq!(classify(&json!({"a": 1})), PatternTag::Json);
    }
}
