//! Tag normalization for the `Tags` supporter field.

use super::form::FieldValue;

/// Split a `|`-delimited string (or take a list's items in order) and trim
/// each entry. Duplicates and blank entries are kept.
pub fn normalize_tags(value: &FieldValue) -> Vec<String> {
    match value {
        FieldValue::Text(s) => s.split('|').map(|t| t.trim().to_string()).collect(),
        FieldValue::List(items) => items.iter().map(|t| t.trim().to_string()).collect(),
    }
}
