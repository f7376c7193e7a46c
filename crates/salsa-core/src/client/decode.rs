//! Response decoding: JSON for API calls, XML for the login call.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::Value;

use crate::error::ClientError;

/// Which serialization the request asks Salsa for. Sent as the first body token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Xml,
}

impl ResponseFormat {
    pub fn discriminator(self) -> &'static str {
        match self {
            ResponseFormat::Json => "json",
            ResponseFormat::Xml => "xml",
        }
    }
}

/// Root element of an XML response: its attributes and any `<error>` child text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlDocument {
    pub root: String,
    pub attributes: Vec<(String, String)>,
    pub error: Option<String>,
}

impl XmlDocument {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

fn non_empty(body: &[u8]) -> Result<&[u8], ClientError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ClientError::EmptyResponse);
    }
    Ok(body)
}

/// Decode a JSON body. Empty bodies and bodies that are not JSON are errors.
pub fn parse_json(body: &[u8]) -> Result<Value, ClientError> {
    let body = non_empty(body)?;
    serde_json::from_slice(body).map_err(|e| ClientError::Decode(format!("invalid JSON: {e}")))
}

fn attributes_of(start: &BytesStart<'_>) -> Result<Vec<(String, String)>, ClientError> {
    let mut out = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ClientError::Decode(format!("invalid XML attribute: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        let value = quick_xml::escape::unescape(&raw)
            .map(|v| v.into_owned())
            .unwrap_or(raw);
        out.push((key, value));
    }
    Ok(out)
}

/// Decode an XML body down to what the client needs from it.
pub fn parse_xml(body: &[u8]) -> Result<XmlDocument, ClientError> {
    let body = non_empty(body)?;
    let text = std::str::from_utf8(body)
        .map_err(|e| ClientError::Decode(format!("XML is not UTF-8: {e}")))?;
    let mut reader = Reader::from_str(text);

    let mut doc: Option<XmlDocument> = None;
    let mut depth = 0usize;
    let mut in_error = false;
    let mut error_text = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ClientError::Decode(format!("invalid XML: {e}")))?;
        match event {
            Event::Start(start) => {
                depth += 1;
                if depth == 1 {
                    doc = Some(XmlDocument {
                        root: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
                        attributes: attributes_of(&start)?,
                        error: None,
                    });
                } else if depth == 2 && start.name().as_ref() == b"error" {
                    in_error = true;
                }
            }
            Event::Empty(start) => {
                if depth == 0 {
                    doc = Some(XmlDocument {
                        root: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
                        attributes: attributes_of(&start)?,
                        error: None,
                    });
                } else if depth == 1 && start.name().as_ref() == b"error" {
                    if let Some(d) = doc.as_mut() {
                        d.error = Some(String::new());
                    }
                }
            }
            Event::Text(t) if in_error => {
                error_text.push_str(&String::from_utf8_lossy(&t));
            }
            Event::CData(t) if in_error => {
                error_text.push_str(&String::from_utf8_lossy(&t));
            }
            Event::End(_) => {
                if in_error && depth == 2 {
                    if let Some(d) = doc.as_mut() {
                        d.error = Some(error_text.trim().to_string());
                    }
                    in_error = false;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    doc.ok_or_else(|| ClientError::Decode("XML response has no root element".into()))
}

/// True when a response exists and does not carry an `error` member.
pub fn success(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.contains_key("error"),
        Value::Array(items) => !items
            .iter()
            .any(|item| item.as_object().is_some_and(|m| m.contains_key("error"))),
        _ => true,
    }
}

/// Text of an `error` member, if the response has one.
pub fn error_message(value: &Value) -> Option<String> {
    let obj = match value {
        Value::Object(map) => Some(map),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_object)
            .find(|m| m.contains_key("error")),
        _ => None,
    }?;
    obj.get("error").map(|e| match e {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}
