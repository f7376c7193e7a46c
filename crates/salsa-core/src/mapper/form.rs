//! Read-only view of the host form platform: form definition, entry, and
//! the optional export-value accessor for custom field kinds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A submitted value: plain text or an ordered list (multi-select style fields).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn empty() -> Self {
        FieldValue::Text(String::new())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::List(v) => v.is_empty(),
        }
    }

    /// Text form; list items are joined with `|`.
    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(v) => v.join("|"),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::List(_) => None,
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::empty()
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

/// Display format of a phone field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneFormat {
    /// US/Canada `(###) ###-####`.
    Standard,
    International,
}

/// Field kinds that need their own extraction; everything else is `Generic`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Address,
    Name,
    /// Input ids of the individual choices, e.g. `["3.1", "3.2"]`.
    Checkbox { inputs: Vec<String> },
    Phone { format: PhoneFormat },
    Generic { input_type: String },
}

#[derive(Debug, Deserialize)]
struct RawField {
    id: u32,
    #[serde(default)]
    label: String,
    #[serde(rename = "type", default)]
    input_type: String,
    #[serde(default)]
    inputs: Vec<String>,
    #[serde(rename = "phoneFormat", default)]
    phone_format: String,
}

impl From<RawField> for FormField {
    fn from(raw: RawField) -> Self {
        let kind = match raw.input_type.as_str() {
            "address" => FieldKind::Address,
            "name" => FieldKind::Name,
            "checkbox" => FieldKind::Checkbox { inputs: raw.inputs },
            "phone" => FieldKind::Phone {
                format: if raw.phone_format == "standard" {
                    PhoneFormat::Standard
                } else {
                    PhoneFormat::International
                },
            },
            _ => FieldKind::Generic {
                input_type: raw.input_type,
            },
        };
        FormField {
            id: raw.id,
            label: raw.label,
            kind,
        }
    }
}

/// One field of a form definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawField")]
pub struct FormField {
    pub id: u32,
    pub label: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Form {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fields: Vec<FormField>,
}

impl Form {
    /// The field an id refers to; `"4.3"` (an input of field 4) resolves to field 4.
    pub fn field(&self, field_id: &str) -> Option<&FormField> {
        let base = field_id.split('.').next()?.trim();
        let id: u32 = base.parse().ok()?;
        self.fields.iter().find(|f| f.id == id)
    }
}

/// A submitted entry: field values keyed by field/input id, plus metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Unset while the entry has not been persisted yet.
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub values: BTreeMap<String, FieldValue>,
}

impl Entry {
    /// Raw stored value; missing ids read as empty text.
    pub fn value(&self, id: &str) -> FieldValue {
        self.values.get(id).cloned().unwrap_or_default()
    }

    /// Raw value as trimmed text.
    pub fn text(&self, id: &str) -> String {
        self.value(id).to_text().trim().to_string()
    }

    pub fn with_value(mut self, id: &str, value: impl Into<FieldValue>) -> Self {
        self.values.insert(id.to_string(), value.into());
        self
    }
}

/// Platform hook that renders a field's value for export.
///
/// Returning `None` falls back to the raw stored value.
pub trait FieldValueAccessor {
    fn export_value(&self, field: &FormField, entry: &Entry, field_id: &str) -> Option<FieldValue>;
}

/// Accessor that never overrides the raw stored value.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawValues;

impl FieldValueAccessor for RawValues {
    fn export_value(&self, _: &FormField, _: &Entry, _: &str) -> Option<FieldValue> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_json_maps_field_kinds() {
        let form: Form = serde_json::from_str(
            r#"{
                "id": 3, "title": "Sign up",
                "fields": [
                    {"id": 1, "type": "name"},
                    {"id": 2, "type": "email", "label": "Email"},
                    {"id": 3, "type": "checkbox", "inputs": ["3.1", "3.2"]},
                    {"id": 4, "type": "phone", "phoneFormat": "standard"},
                    {"id": 5, "type": "address"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(form.fields[0].kind, FieldKind::Name);
        assert_eq!(
            form.fields[1].kind,
            FieldKind::Generic { input_type: "email".into() }
        );
        assert_eq!(
            form.fields[2].kind,
            FieldKind::Checkbox { inputs: vec!["3.1".into(), "3.2".into()] }
        );
        assert_eq!(
            form.fields[3].kind,
            FieldKind::Phone { format: PhoneFormat::Standard }
        );
        assert_eq!(form.field("5.3").map(|f| f.id), Some(5));
        assert!(form.field("form_title").is_none());
    }

    #[test]
    fn entry_values_text_or_list() {
        let entry: Entry = serde_json::from_str(
            r#"{"ip": "10.0.0.1", "values": {"1": "Ann", "7": ["a", "b"]}}"#,
        )
        .unwrap();
        assert_eq!(entry.value("1"), FieldValue::from("Ann"));
        assert_eq!(entry.value("7").to_text(), "a|b");
        assert!(entry.value("99").is_empty());
        assert!(entry.date_created.is_none());
    }
}
