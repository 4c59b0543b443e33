//! Sanitizes original JSON field names into safe relational identifiers.
//!
//! Adapted from the filesystem-safe output-id slugger: non-word characters
//! collapse to `_`, runs of `_` collapse to one, and leading/trailing `_` is
//! trimmed. Two rules are specific to relational identifiers rather than
//! filenames: a name that would start with a digit gets a `field_` prefix,
//! and a name longer than 64 characters is replaced by an initials-based
//! alias instead of truncated, with a counter to break collisions.

use super::types::RESERVED_COLUMNS;
use std::collections::HashSet;

const MAX_IDENTIFIER_LEN: usize = 64;

/// Sanitizes `original` into a column-safe identifier, breaking collisions
/// against `taken` (the set of sanitized names already used in this schema).
pub fn sanitize_column_name(original: &str, taken: &HashSet<String>) -> String {
    let collapsed = collapse(original);
    let based = if collapsed.is_empty() {
        "field".to_string()
    } else {
        collapsed
    };

    let prefixed = if based.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        format!("field_{based}")
    } else {
        based
    };

    let sized = if prefixed.len() > MAX_IDENTIFIER_LEN {
        initials_alias(&prefixed)
    } else {
        prefixed
    };

    dedupe(sized, taken)
}

fn collapse(original: &str) -> String {
    let mut out = String::with_capacity(original.len());
    let mut last_was_underscore = false;
    for ch in original.chars() {
        let mapped = if ch.is_ascii_alphanumeric() {
            ch.to_ascii_lowercase()
        } else {
            '_'
        };
        if mapped == '_' {
            if last_was_underscore {
                continue;
            }
            last_was_underscore = true;
        } else {
            last_was_underscore = false;
        }
        out.push(mapped);
    }
    out.trim_matches('_').to_string()
}

/// Builds a short alias from the initials of `_`-separated tokens, or the
/// first 8 characters if the name has no separators to take initials from.
fn initials_alias(name: &str) -> String {
    let tokens: Vec<&str> = name.split('_').filter(|t| !t.is_empty()).collect();
    if tokens.len() > 1 {
        tokens
            .iter()
            .filter_map(|t| t.chars().next())
            .collect::<String>()
    } else {
        name.chars().take(8).collect()
    }
}

fn dedupe(mut candidate: String, taken: &HashSet<String>) -> String {
    if candidate.is_empty() {
        candidate = "field".to_string();
    }
    if !is_reserved(&candidate) && !taken.contains(&candidate) {
        return candidate;
    }
    let mut counter = 1u32;
    loop {
        let attempt = format!("{candidate}_{counter}");
        if !is_reserved(&attempt) && !taken.contains(&attempt) {
            return attempt;
        }
        counter += 1;
    }
}

fn is_reserved(name: &str) -> bool {
    RESERVED_COLUMNS.contains(&name) && name != "cig"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn collapses_non_word_runs() {
        let taken = empty();
        assert_eq!(sanitize_column_name("Data Creazione!!", &taken), "data_creazione");
    }

    #[test]
    fn prefixes_digit_leading_names() {
        let taken = empty();
        assert_eq!(sanitize_column_name("2024_importo", &taken), "field_2024_importo");
    }

    #[test]
    fn aliases_overlong_names() {
        let taken = empty();
        let long = "a_very_long_descriptive_field_name_that_goes_on_and_on_and_on_forever_more";
        let sanitized = sanitize_column_name(long, &taken);
        assert!(sanitized.len() <= MAX_IDENTIFIER_LEN);
    }

    #[test]
    fn breaks_collisions_with_counter() {
        let mut taken = empty();
        taken.insert("x".to_string());
        let second = sanitize_column_name("x", &taken);
        assert_eq!(second, "x_1");
    }

    #[test]
    fn avoids_reserved_names() {
        let taken = empty();
        assert_eq!(sanitize_column_name("created_at", &taken), "created_at_1");
    }
}
