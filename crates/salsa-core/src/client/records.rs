//! Typed records decoded from Salsa JSON rows.
//!
//! Salsa returns every column as a string (`"groups_KEY":"123"`), so key
//! fields accept either a JSON string or a number.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ClientError;

fn as_object<'a>(row: &'a Value, what: &str) -> Result<&'a Map<String, Value>, ClientError> {
    row.as_object()
        .ok_or_else(|| ClientError::Decode(format!("{what} row is not an object: {row}")))
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn required_text(obj: &Map<String, Value>, key: &str, what: &str) -> Result<String, ClientError> {
    text(obj, key).ok_or_else(|| ClientError::Decode(format!("{what} row is missing {key}")))
}

fn required_key(obj: &Map<String, Value>, key: &str, what: &str) -> Result<u64, ClientError> {
    let raw = required_text(obj, key, what)?;
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ClientError::Decode(format!("{what} {key} is not an integer: {raw:?}")))
}

/// A Salsa group a supporter can be added to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub groups_key: u64,
}

impl Group {
    pub fn from_row(row: &Value) -> Result<Self, ClientError> {
        let obj = as_object(row, "groups")?;
        Ok(Self {
            name: required_text(obj, "Group_Name", "groups")?,
            groups_key: required_key(obj, "groups_KEY", "groups")?,
        })
    }
}

/// A tag defined in the Salsa account.
///
/// `kind` is Salsa's tag prefix; it is empty for plain tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub tag_key: u64,
    pub kind: String,
    pub tag: String,
}

impl Tag {
    pub fn from_row(row: &Value) -> Result<Self, ClientError> {
        let obj = as_object(row, "tag")?;
        Ok(Self {
            tag_key: required_key(obj, "tag_KEY", "tag")?,
            kind: text(obj, "prefix").unwrap_or_default(),
            tag: required_text(obj, "tag", "tag")?,
        })
    }
}

/// Outcome of a `/save` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveResult {
    pub result: String,
    pub key: Option<String>,
}

impl SaveResult {
    /// Decode from the one-element list (or bare object) `/save` returns.
    pub fn from_response(value: &Value) -> Result<Self, ClientError> {
        let row = match value {
            Value::Array(items) => items
                .first()
                .ok_or_else(|| ClientError::InvalidResponse("save".into()))?,
            other => other,
        };
        let obj = as_object(row, "save")?;
        let result = required_text(obj, "result", "save")?;
        let key = text(obj, "key").filter(|k| !k.is_empty());
        if result == "success" && key.is_none() {
            return Err(ClientError::Decode("save succeeded without a key".into()));
        }
        Ok(Self { result, key })
    }

    pub fn is_success(&self) -> bool {
        self.result == "success"
    }
}

/// `count` from a getCount response: `{"count":"5"}` or `[{"count":5}]`.
pub fn count_from_response(value: &Value) -> Result<u64, ClientError> {
    let row = match value {
        Value::Array(items) => items
            .first()
            .ok_or_else(|| ClientError::InvalidResponse("count".into()))?,
        other => other,
    };
    required_key(as_object(row, "count")?, "count", "count")
}
