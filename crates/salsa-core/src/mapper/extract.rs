//! Value extraction: turns a mapped source id into the value sent to Salsa.

use once_cell::sync::Lazy;
use regex::Regex;

use super::form::{Entry, FieldKind, FieldValue, FieldValueAccessor, Form, FormField, PhoneFormat};
use crate::abbrev;

static STANDARD_PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\D?(\d{3})\D?\D?(\d{3})\D?(\d{4})$").expect("valid phone regex"));

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("valid email regex")
});

/// Name input suffixes in display order: prefix, first, middle, last, suffix.
const NAME_INPUTS: [&str; 5] = ["2", "3", "4", "6", "8"];

/// Source ids that refer to form or entry metadata rather than a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    FormTitle,
    DateCreated,
    Ip,
    SourceUrl,
    Field,
}

impl Source {
    /// Case-insensitive match on the pseudo-field names.
    pub fn parse(field_id: &str) -> Self {
        match field_id.to_ascii_lowercase().as_str() {
            "form_title" => Source::FormTitle,
            "date_created" => Source::DateCreated,
            "ip" => Source::Ip,
            "source_url" => Source::SourceUrl,
            _ => Source::Field,
        }
    }
}

/// Syntax check for the supporter Email.
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL.is_match(email)
}

/// `NNN-NNN-NNNN` for ten-digit input, otherwise the input unchanged.
pub fn format_phone(value: &str) -> String {
    match STANDARD_PHONE.captures(value) {
        Some(c) => format!("{}-{}-{}", &c[1], &c[2], &c[3]),
        None => value.to_string(),
    }
}

/// Salsa's single-line address: street, street 2, city, state, zip and
/// country joined by two spaces. Blank street/city/state/zip become `-`;
/// a country name is reduced to its two-letter code.
pub fn full_address(entry: &Entry, field_id: &str) -> String {
    let part = |n: u8| entry.text(&format!("{field_id}.{n}"));
    let squeeze = |s: String| s.replace("  ", " ");
    let or_dash = |s: String| if s.is_empty() { "-".to_string() } else { s };

    let street = squeeze(part(1));
    let street2 = squeeze(part(2));
    let city = squeeze(part(3));
    let state = squeeze(part(4));
    let zip = part(5);
    let mut country = part(6);
    if !country.is_empty() {
        country = abbrev::abbreviate(&country, "Country");
    }

    [
        or_dash(street),
        street2,
        or_dash(city),
        or_dash(state),
        or_dash(zip),
        country,
    ]
    .join("  ")
}

/// Name parts joined with single spaces; falls back to the raw value for
/// single-input name fields.
pub fn full_name(entry: &Entry, field_id: &str) -> String {
    let parts: Vec<String> = NAME_INPUTS
        .iter()
        .map(|n| entry.text(&format!("{field_id}.{n}")))
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        entry.text(field_id)
    } else {
        parts.join(" ")
    }
}

/// Checked choices joined with `|`.
pub fn checked_values(entry: &Entry, inputs: &[String]) -> String {
    inputs
        .iter()
        .map(|id| entry.value(id))
        .filter(|v| !v.is_empty())
        .map(|v| v.to_text())
        .collect::<Vec<_>>()
        .join("|")
}

fn is_whole_field_id(field_id: &str) -> bool {
    !field_id.is_empty() && field_id.bytes().all(|b| b.is_ascii_digit())
}

fn field_value(
    field: &FormField,
    entry: &Entry,
    field_id: &str,
    accessor: &dyn FieldValueAccessor,
) -> FieldValue {
    let whole = is_whole_field_id(field_id);
    match &field.kind {
        FieldKind::Address if whole => full_address(entry, field_id).into(),
        FieldKind::Name if whole => full_name(entry, field_id).into(),
        FieldKind::Checkbox { inputs } if whole => checked_values(entry, inputs).into(),
        FieldKind::Phone {
            format: PhoneFormat::Standard,
        } => match entry.value(field_id) {
            FieldValue::Text(raw) if !raw.is_empty() => format_phone(&raw).into(),
            other => other,
        },
        _ => accessor
            .export_value(field, entry, field_id)
            .unwrap_or_else(|| entry.value(field_id)),
    }
}

/// Resolve `field_id` to a value for this submission.
pub fn extract(
    form: &Form,
    entry: &Entry,
    field_id: &str,
    accessor: &dyn FieldValueAccessor,
) -> FieldValue {
    match Source::parse(field_id) {
        Source::FormTitle => form.title.as_str().into(),
        Source::DateCreated => match entry.date_created.as_deref() {
            Some(d) if !d.is_empty() => d.into(),
            // Entry not persisted yet.
            _ => chrono::Utc::now()
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .into(),
        },
        Source::Ip => entry.ip.clone().unwrap_or_default().into(),
        Source::SourceUrl => entry.source_url.clone().unwrap_or_default().into(),
        Source::Field => match form.field(field_id) {
            Some(field) => field_value(field, entry, field_id, accessor),
            None => entry.value(field_id),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::form::RawValues;

    fn form() -> Form {
        serde_json::from_str(
            r#"{"title": "Petition", "fields": [
                {"id": 1, "type": "name"},
                {"id": 2, "type": "email"},
                {"id": 3, "type": "checkbox", "inputs": ["3.1", "3.2", "3.3"]},
                {"id": 4, "type": "phone", "phoneFormat": "standard"},
                {"id": 5, "type": "address"},
                {"id": 6, "type": "phone", "phoneFormat": "international"}
            ]}"#,
        )
        .unwrap()
    }

    fn get(entry: &Entry, id: &str) -> FieldValue {
        extract(&form(), entry, id, &RawValues)
    }

    #[test]
    fn phone_reformatting() {
        assert_eq!(format_phone("(404) 555-1212"), "404-555-1212");
        assert_eq!(format_phone("404.555.1212"), "404-555-1212");
        assert_eq!(format_phone("4045551212"), "404-555-1212");
        assert_eq!(format_phone("404-555-121"), "404-555-121");
        assert_eq!(format_phone("+44 20 7946 0958"), "+44 20 7946 0958");
    }

    #[test]
    fn phone_only_for_standard_format() {
        let entry = Entry::default()
            .with_value("4", "(404) 555-1212")
            .with_value("6", "(404) 555-1212");
        assert_eq!(get(&entry, "4"), FieldValue::from("404-555-1212"));
        assert_eq!(get(&entry, "6"), FieldValue::from("(404) 555-1212"));
    }

    #[test]
    fn address_with_blanks_and_country_code() {
        let entry = Entry::default()
            .with_value("5.1", " 1 Main  St ")
            .with_value("5.3", "Springfield")
            .with_value("5.6", "France");
        assert_eq!(
            get(&entry, "5"),
            FieldValue::from("1 Main St    Springfield  -  -  FR")
        );
    }

    #[test]
    fn address_sub_input_is_plain_value() {
        let entry = Entry::default().with_value("5.3", "Springfield");
        assert_eq!(get(&entry, "5.3"), FieldValue::from("Springfield"));
    }

    #[test]
    fn name_and_checkbox() {
        let entry = Entry::default()
            .with_value("1.3", "Ann")
            .with_value("1.6", "Lee")
            .with_value("3.1", "Email")
            .with_value("3.3", "Phone");
        assert_eq!(get(&entry, "1"), FieldValue::from("Ann Lee"));
        assert_eq!(get(&entry, "3"), FieldValue::from("Email|Phone"));
    }

    #[test]
    fn pseudo_fields() {
        let entry = Entry {
            ip: Some("10.1.2.3".into()),
            source_url: Some("https://example.org/form".into()),
            date_created: Some("2024-01-02 03:04:05".into()),
            ..Entry::default()
        };
        assert_eq!(get(&entry, "form_title"), FieldValue::from("Petition"));
        assert_eq!(get(&entry, "IP"), FieldValue::from("10.1.2.3"));
        assert_eq!(get(&entry, "source_url"), FieldValue::from("https://example.org/form"));
        assert_eq!(get(&entry, "date_created"), FieldValue::from("2024-01-02 03:04:05"));
    }

    #[test]
    fn date_created_defaults_to_now() {
        let v = get(&Entry::default(), "date_created").to_text();
        assert!(chrono::NaiveDateTime::parse_from_str(&v, "%Y-%m-%d %H:%M:%S").is_ok(), "{v}");
    }

    #[test]
    fn unknown_field_reads_raw_value() {
        let entry = Entry::default().with_value("99", "x");
        assert_eq!(get(&entry, "99"), FieldValue::from("x"));
        assert!(get(&entry, "98").is_empty());
    }

    #[test]
    fn accessor_overrides_generic_fields() {
        struct Upper;
        impl FieldValueAccessor for Upper {
            fn export_value(&self, _: &FormField, e: &Entry, id: &str) -> Option<FieldValue> {
                Some(e.text(id).to_uppercase().into())
            }
        }
        let entry = Entry::default().with_value("2", "a@b.org").with_value("1.3", "Ann");
        assert_eq!(extract(&form(), &entry, "2", &Upper), FieldValue::from("A@B.ORG"));
        // Compound fields keep their own extraction.
        assert_eq!(extract(&form(), &entry, "1", &Upper), FieldValue::from("Ann"));
    }

    #[test]
    fn email_syntax() {
        assert!(is_valid_email("ann.lee+news@example.org"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("ann@"));
        assert!(!is_valid_email("ann@localhost"));
        assert!(!is_valid_email("two@@example.org"));
        assert!(!is_valid_email("a b@example.org"));
    }
}
