//! Feed configuration: field map, group selection and optional condition.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::extract::extract;
use super::form::{Entry, FieldValue, FieldValueAccessor, Form};

/// Supporter fields offered for mapping. `Email` is required.
pub const SUPPORTER_FIELDS: &[&str] = &[
    "First_Name",
    "MI",
    "Last_Name",
    "Suffix",
    "Email",
    "Phone",
    "Cell_Phone",
    "Work_Phone",
    "Street",
    "Street_2",
    "Street_3",
    "City",
    "State",
    "Zip",
    "County",
    "Country",
    "Organization",
    "Department",
    "Occupation",
    "Web_Page",
    "Other_Data_1",
    "Other_Data_2",
    "Other_Data_3",
    "Source_Tracking_Code",
    "Tracking_Code",
    "Timezone",
    "Tags",
];

/// One supporter field bound to a form source id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Salsa supporter field, e.g. `First_Name`.
    pub field: String,
    /// Form field/input id (`"1.3"`) or pseudo field (`form_title`). Empty means unmapped.
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicType {
    #[default]
    All,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Is,
    #[serde(alias = "isnot")]
    IsNot,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionRule {
    pub field_id: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: String,
}

impl ConditionRule {
    fn matches_one(&self, actual: &str) -> bool {
        let actual = actual.trim().to_lowercase();
        let target = self.value.trim().to_lowercase();
        match self.operator {
            Operator::Is => actual == target,
            Operator::IsNot => actual != target,
            Operator::Contains => actual.contains(&target),
            Operator::StartsWith => actual.starts_with(&target),
            Operator::EndsWith => actual.ends_with(&target),
            Operator::GreaterThan | Operator::LessThan => {
                match (actual.parse::<f64>(), target.parse::<f64>()) {
                    (Ok(a), Ok(t)) if self.operator == Operator::GreaterThan => a > t,
                    (Ok(a), Ok(t)) => a < t,
                    _ => false,
                }
            }
        }
    }

    /// Lists (and `|`-joined checkbox values) match if any item does; `is_not` needs every item to differ.
    pub fn matches(&self, value: &FieldValue) -> bool {
        let items: Vec<String> = match value {
            FieldValue::Text(s) if s.contains('|') => s.split('|').map(str::to_string).collect(),
            FieldValue::Text(s) => vec![s.clone()],
            FieldValue::List(v) if v.is_empty() => vec![String::new()],
            FieldValue::List(v) => v.clone(),
        };
        if self.operator == Operator::IsNot {
            items.iter().all(|i| self.matches_one(i))
        } else {
            items.iter().any(|i| self.matches_one(i))
        }
    }
}

/// Predicate over submitted values deciding whether the feed runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCondition {
    #[serde(default)]
    pub logic: LogicType,
    #[serde(default)]
    pub rules: Vec<ConditionRule>,
}

impl FeedCondition {
    pub fn is_met(&self, form: &Form, entry: &Entry, accessor: &dyn FieldValueAccessor) -> bool {
        if self.rules.is_empty() {
            return true;
        }
        let mut results = self
            .rules
            .iter()
            .map(|r| r.matches(&extract(form, entry, &r.field_id, accessor)));
        match self.logic {
            LogicType::All => results.all(|m| m),
            LogicType::Any => results.any(|m| m),
        }
    }
}

/// One saved feed: binds a form to supporter fields and groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub field_map: Vec<FieldMapping>,
    /// Group key -> selected.
    #[serde(default)]
    pub groups: BTreeMap<String, bool>,
    #[serde(default)]
    pub condition: Option<FeedCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("feed {0:?} does not map the required Email field")]
    EmailNotMapped(String),
    #[error("feed {feed:?} maps {field} more than once")]
    DuplicateField { feed: String, field: String },
}

impl FeedConfig {
    /// Source id bound to `field`, if mapped to a non-empty source.
    pub fn source_for(&self, field: &str) -> Option<&str> {
        self.field_map
            .iter()
            .find(|m| m.field == field)
            .map(|m| m.source.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Mapped fields with a non-empty source, in map order.
    pub fn mapped(&self) -> impl Iterator<Item = &FieldMapping> {
        self.field_map.iter().filter(|m| !m.source.is_empty())
    }

    /// Group keys flagged as selected.
    pub fn selected_groups(&self) -> Vec<&str> {
        self.groups
            .iter()
            .filter(|(_, on)| **on)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Email must be mapped and field names unique. Unknown names are
    /// allowed (custom supporter fields) but logged.
    pub fn validate(&self) -> Result<(), FeedError> {
        let mut seen = std::collections::HashSet::new();
        for m in &self.field_map {
            if !seen.insert(m.field.as_str()) {
                return Err(FeedError::DuplicateField {
                    feed: self.name.clone(),
                    field: m.field.clone(),
                });
            }
            if !SUPPORTER_FIELDS.contains(&m.field.as_str()) {
                tracing::warn!(feed = %self.name, field = %m.field, "mapping a non-standard supporter field");
            }
        }
        if self.source_for("Email").is_none() {
            return Err(FeedError::EmailNotMapped(self.name.clone()));
        }
        Ok(())
    }

    pub fn condition_met(&self, form: &Form, entry: &Entry, accessor: &dyn FieldValueAccessor) -> bool {
        self.condition
            .as_ref()
            .map_or(true, |c| c.is_met(form, entry, accessor))
    }
}
