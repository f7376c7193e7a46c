//! Ordered request parameters and Salsa's form-body encoding.
//!
//! Salsa's request parser expects a key with several values to be repeated
//! (`groups_KEY=1&groups_KEY=2`), never the bracketed `key[]=` form that
//! generic query builders emit.

use url::form_urlencoded::byte_serialize;

use super::Session;

/// A single or multi-valued parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Multi(Vec<String>),
}

impl ParamValue {
    /// True for an empty string or an empty list.
    pub fn is_empty(&self) -> bool {
        match self {
            ParamValue::Single(s) => s.is_empty(),
            ParamValue::Multi(v) => v.is_empty(),
        }
    }

    pub fn as_single(&self) -> Option<&str> {
        match self {
            ParamValue::Single(s) => Some(s),
            ParamValue::Multi(_) => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Single(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Single(s)
    }
}

impl From<&String> for ParamValue {
    fn from(s: &String) -> Self {
        ParamValue::Single(s.clone())
    }
}

impl From<u64> for ParamValue {
    fn from(n: u64) -> Self {
        ParamValue::Single(n.to_string())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        ParamValue::Multi(v)
    }
}

impl From<&[&str]> for ParamValue {
    fn from(v: &[&str]) -> Self {
        ParamValue::Multi(v.iter().map(|s| s.to_string()).collect())
    }
}

/// Insertion-ordered parameter list with unique keys.
///
/// Re-setting a key replaces its value in place, keeping the original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Params::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Merge `other` into `self`; keys in `other` win.
    pub fn merge(&mut self, other: Params) {
        for (k, v) in other.entries {
            self.set(k, v);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

/// Encode `params` as `key=value&...`, injecting the session's organization
/// and chapter keys. Values are url-encoded one at a time; keys are sent as-is.
pub fn serialize_params(params: &Params, session: Option<&Session>) -> String {
    let mut params = params.clone();
    if let Some(session) = session {
        if let Some(org) = &session.organization_key {
            params.set("organization_KEY", org.as_str());
        }
        if let Some(chapter) = &session.chapter_key {
            params.set("chapter_KEY", chapter.as_str());
        }
    }

    let mut pairs: Vec<String> = Vec::with_capacity(params.len());
    for (key, value) in params.iter() {
        match value {
            ParamValue::Single(v) => pairs.push(format!("{}={}", key, encode(v))),
            ParamValue::Multi(vs) => {
                for v in vs {
                    pairs.push(format!("{}={}", key, encode(v)));
                }
            }
        }
    }
    pairs.join("&")
}

/// Same encoding with any `password` value masked; for logging only.
pub fn redacted(params: &Params) -> String {
    let mut params = params.clone();
    if params.get("password").is_some() {
        params.set("password", "***");
    }
    serialize_params(&params, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(org: Option<&str>, chapter: Option<&str>) -> Session {
        Session {
            host: "salsa4.salsalabs.com".into(),
            organization_key: org.map(str::to_string),
            chapter_key: chapter.map(str::to_string),
        }
    }

    #[test]
    fn multi_values_repeat_the_key() {
        let params = Params::new()
            .with("A", "1")
            .with("B", vec!["x".to_string(), "y".to_string()]);
        let body = serialize_params(&params, Some(&session(Some("42"), None)));
        assert!(body.contains("A=1&B=x&B=y"), "{body}");
        assert!(body.contains("organization_KEY=42"));
        assert!(!body.contains("B[]="));
        assert!(!body.contains("chapter_KEY"));
    }

    #[test]
    fn chapter_key_injected_when_present() {
        let body = serialize_params(&Params::new(), Some(&session(Some("1"), Some("9"))));
        assert_eq!(body, "organization_KEY=1&chapter_KEY=9");
    }

    #[test]
    fn values_are_url_encoded() {
        let params = Params::new().with("Email", "a+b@example.org").with("City", "New York");
        let body = serialize_params(&params, None);
        assert_eq!(body, "Email=a%2Bb%40example.org&City=New+York");
    }

    #[test]
    fn set_replaces_in_place() {
        let mut params = Params::new().with("a", "1").with("b", "2");
        params.set("a", "3");
        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(params.get("a"), Some(&ParamValue::from("3")));
    }

    #[test]
    fn redacted_masks_password() {
        let params = Params::new().with("email", "u@x.org").with("password", "hunter2");
        let shown = redacted(&params);
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("password=***") || shown.contains("password=%2A%2A%2A"));
    }
}
