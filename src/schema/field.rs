use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// The value a field holds before anything has been entered.
pub const UNSET: &str = "";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Textarea,
    Dropdown,
}

impl FieldType {
    pub const ALL: [FieldType; 5] = [
        FieldType::Text,
        FieldType::Number,
        FieldType::Date,
        FieldType::Textarea,
        FieldType::Dropdown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Textarea => "textarea",
            FieldType::Dropdown => "dropdown",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(())
    }
}

/// One field of a form schema. Only constructed through `FormSchema`, which
/// enforces the naming and option invariants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl FormField {
    /// Label shown to users, falling back to the field name.
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.name
        } else {
            &self.label
        }
    }

    /// Turn raw text typed into a control into the value stored for this field.
    ///
    /// Numbers become JSON numbers when they parse; empty input stays the
    /// unset sentinel rather than zero. Anything unparsable is kept verbatim
    /// so `check` can report it.
    pub fn coerce_input(&self, raw: &str) -> Value {
        match self.field_type {
            FieldType::Number => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    Value::String(UNSET.to_string())
                } else {
                    parse_number(trimmed).unwrap_or_else(|| Value::String(raw.to_string()))
                }
            }
            FieldType::Text | FieldType::Date | FieldType::Textarea | FieldType::Dropdown => {
                Value::String(raw.to_string())
            }
        }
    }

    /// Normalize a submitted value and check it against the field's type,
    /// options, and required flag.
    ///
    /// `null` is read as the unset sentinel. Returns the value to store or a
    /// message for the caller.
    pub fn check(&self, value: &Value) -> Result<Value, String> {
        let normalized = match value {
            Value::Null => Value::String(UNSET.to_string()),
            Value::String(s) => self.coerce_input(s),
            Value::Number(n) if self.field_type == FieldType::Number => Value::Number(n.clone()),
            Value::Number(_) => {
                return Err(format!("{} must be text", self.display_label()));
            }
            Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
                return Err(format!(
                    "{} must be a {} value",
                    self.display_label(),
                    self.field_type
                ));
            }
        };

        if is_unset(&normalized) {
            if self.required {
                return Err(format!("{} is required", self.display_label()));
            }
            return Ok(normalized);
        }

        match (self.field_type, &normalized) {
            (FieldType::Number, Value::Number(_)) => {}
            (FieldType::Number, _) => {
                return Err(format!("{} must be a number", self.display_label()));
            }
            (FieldType::Date, Value::String(s)) => {
                if NaiveDate::parse_from_str(s, DATE_FORMAT).is_err() {
                    return Err(format!(
                        "{} must be a date in YYYY-MM-DD format",
                        self.display_label()
                    ));
                }
            }
            (FieldType::Dropdown, Value::String(s)) => {
                if !self.options.iter().any(|o| o == s) {
                    return Err(format!(
                        "{} must be one of: {}",
                        self.display_label(),
                        self.options.join(", ")
                    ));
                }
            }
            _ => {}
        }

        Ok(normalized)
    }
}

pub fn is_unset(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.is_empty())
}

fn parse_number(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}
