//! Form schemas: the ordered field definitions a project's entries are
//! validated against and its forms are rendered from.

pub mod field;

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use field::{FieldType, FormField, UNSET};

/// Field name -> human-readable message, for every failing field.
pub type FieldErrors = BTreeMap<String, String>;

pub const MAX_NAME_LEN: usize = 64;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid field name regex"));

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("field {index} has an empty name")]
    EmptyName { index: usize },
    #[error(
        "field {index} ('{name}') must start with a letter or underscore and contain only letters, digits, and underscores (max 64)"
    )]
    UnsafeName { index: usize, name: String },
    #[error("field {index} ('{name}') repeats an earlier field name")]
    DuplicateName { index: usize, name: String },
    #[error("field {index} ('{name}') has unknown type '{field_type}'")]
    UnknownType {
        index: usize,
        name: String,
        field_type: String,
    },
    #[error("dropdown field {index} ('{name}') needs at least one option")]
    MissingOptions { index: usize, name: String },
    #[error("dropdown field {index} ('{name}') has a blank option")]
    BlankOption { index: usize, name: String },
    #[error("field {index} ('{name}') of type {field_type} cannot have options")]
    UnexpectedOptions {
        index: usize,
        name: String,
        field_type: FieldType,
    },
}

impl SchemaError {
    pub fn field_name(&self) -> Option<&str> {
        match self {
            SchemaError::EmptyName { .. } => None,
            SchemaError::UnsafeName { name, .. }
            | SchemaError::DuplicateName { name, .. }
            | SchemaError::UnknownType { name, .. }
            | SchemaError::MissingOptions { name, .. }
            | SchemaError::BlankOption { name, .. }
            | SchemaError::UnexpectedOptions { name, .. } => Some(name),
        }
    }
}

/// A field as written by an admin, before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

/// An ordered, validated list of form fields.
///
/// The order is the rendering and tab order and survives storage verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FieldSpec>", into = "Vec<FormField>")]
pub struct FormSchema {
    fields: Vec<FormField>,
}

impl FormSchema {
    pub fn new(specs: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::with_capacity(specs.len());
        let mut fields = Vec::with_capacity(specs.len());

        for (index, spec) in specs.into_iter().enumerate() {
            let FieldSpec {
                name,
                label,
                field_type,
                required,
                options,
            } = spec;

            if name.is_empty() {
                return Err(SchemaError::EmptyName { index });
            }
            if name.len() > MAX_NAME_LEN || !NAME_RE.is_match(&name) {
                return Err(SchemaError::UnsafeName { index, name });
            }
            if !seen.insert(name.clone()) {
                return Err(SchemaError::DuplicateName { index, name });
            }

            let Ok(parsed_type) = field_type.parse::<FieldType>() else {
                return Err(SchemaError::UnknownType {
                    index,
                    name,
                    field_type,
                });
            };

            let options = options.unwrap_or_default();
            match parsed_type {
                FieldType::Dropdown if options.is_empty() => {
                    return Err(SchemaError::MissingOptions { index, name });
                }
                FieldType::Dropdown if options.iter().any(|o| o.trim().is_empty()) => {
                    return Err(SchemaError::BlankOption { index, name });
                }
                FieldType::Dropdown => {}
                other if !options.is_empty() => {
                    return Err(SchemaError::UnexpectedOptions {
                        index,
                        name,
                        field_type: other,
                    });
                }
                _ => {}
            }

            fields.push(FormField {
                name,
                label,
                field_type: parsed_type,
                required,
                options,
            });
        }

        Ok(FormSchema { fields })
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Validate submitted entry data and return the normalized value to store.
    ///
    /// The key set must equal the schema's field set exactly. Every failing
    /// field is reported, not just the first.
    pub fn check_entry(&self, data: &Value) -> Result<Map<String, Value>, FieldErrors> {
        let mut errors = FieldErrors::new();

        let Some(obj) = data.as_object() else {
            errors.insert(
                "data".to_string(),
                "Entry data must be an object keyed by field name".to_string(),
            );
            return Err(errors);
        };

        for key in obj.keys() {
            if self.field(key).is_none() {
                errors.insert(key.clone(), format!("{key} is not a field of this form"));
            }
        }

        let mut normalized = Map::with_capacity(self.fields.len());
        for field in &self.fields {
            let Some(value) = obj.get(&field.name) else {
                errors.insert(
                    field.name.clone(),
                    format!("{} is missing from the submission", field.display_label()),
                );
                continue;
            };
            match field.check(value) {
                Ok(v) => {
                    normalized.insert(field.name.clone(), v);
                }
                Err(msg) => {
                    errors.insert(field.name.clone(), msg);
                }
            }
        }

        if errors.is_empty() {
            Ok(normalized)
        } else {
            Err(errors)
        }
    }
}

impl TryFrom<Vec<FieldSpec>> for FormSchema {
    type Error = SchemaError;

    fn try_from(specs: Vec<FieldSpec>) -> Result<Self, Self::Error> {
        FormSchema::new(specs)
    }
}

impl From<FormSchema> for Vec<FormField> {
    fn from(schema: FormSchema) -> Self {
        schema.fields
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(v: Value) -> Result<FormSchema, String> {
        serde_json::from_value::<FormSchema>(v).map_err(|e| e.to_string())
    }

    fn site_survey() -> FormSchema {
        parse(json!([
            { "name": "site", "label": "Site", "type": "text", "required": true },
            { "name": "count", "label": "Count", "type": "number", "required": true },
            { "name": "visited_on", "label": "Visited", "type": "date" },
            { "name": "notes", "label": "Notes", "type": "textarea" },
            { "name": "weather", "label": "Weather", "type": "dropdown", "options": ["sun", "rain"] }
        ]))
        .unwrap()
    }

    #[test]
    fn serialization_preserves_order_and_content() {
        let input = json!([
            { "name": "z", "label": "Last", "type": "text", "required": false },
            { "name": "a", "label": "First", "type": "dropdown", "required": true, "options": ["y", "x"] },
            { "name": "m", "label": "Middle", "type": "number", "required": true }
        ]);
        let schema = parse(input.clone()).unwrap();
        assert_eq!(serde_json::to_value(&schema).unwrap(), input);

        let names: Vec<_> = schema.field_names().collect();
        assert_eq!(names, ["z", "a", "m"]);
    }

    #[test]
    fn rejects_misspelled_attributes() {
        let err = parse(json!([
            { "name": "count", "label": "Count", "type": "number", "requried": true }
        ]))
        .unwrap_err();
        assert!(err.contains("requried"), "{err}");
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = FormSchema::new(vec![spec("a", "text"), spec("a", "number")]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateName {
                index: 1,
                name: "a".to_string()
            }
        );
    }

    #[test]
    fn rejects_unsafe_and_empty_names() {
        assert_eq!(
            FormSchema::new(vec![spec("", "text")]).unwrap_err(),
            SchemaError::EmptyName { index: 0 }
        );
        let too_long = "a".repeat(MAX_NAME_LEN + 1);
        for bad in ["1st", "with space", "dash-ed", "__proto__.x", too_long.as_str()] {
            assert!(
                matches!(
                    FormSchema::new(vec![spec(bad, "text")]),
                    Err(SchemaError::UnsafeName { .. })
                ),
                "{bad} should be rejected"
            );
        }
        assert!(FormSchema::new(vec![spec("_ok_1", "text")]).is_ok());
    }

    #[test]
    fn rejects_unknown_types() {
        assert!(matches!(
            FormSchema::new(vec![spec("a", "checkbox")]),
            Err(SchemaError::UnknownType { .. })
        ));
        assert!(parse(json!([{ "name": "a", "type": "Text" }])).is_err());
    }

    #[test]
    fn dropdown_option_rules() {
        assert!(matches!(
            FormSchema::new(vec![spec("a", "dropdown")]),
            Err(SchemaError::MissingOptions { .. })
        ));

        let mut blank = spec("a", "dropdown");
        blank.options = Some(vec!["x".to_string(), " ".to_string()]);
        assert!(matches!(
            FormSchema::new(vec![blank]),
            Err(SchemaError::BlankOption { .. })
        ));

        let mut stray = spec("a", "text");
        stray.options = Some(vec!["x".to_string()]);
        assert!(matches!(
            FormSchema::new(vec![stray]),
            Err(SchemaError::UnexpectedOptions { .. })
        ));

        let mut empty_list = spec("a", "text");
        empty_list.options = Some(Vec::new());
        assert!(FormSchema::new(vec![empty_list]).is_ok());
    }

    #[test]
    fn entry_with_exact_keys_is_normalized() {
        let data = site_survey()
            .check_entry(&json!({
                "site": "North",
                "count": "5",
                "visited_on": "2024-05-01",
                "notes": null,
                "weather": "rain"
            }))
            .unwrap();
        assert_eq!(data["count"], json!(5));
        assert_eq!(data["notes"], json!(""));
        assert_eq!(data.len(), 5);
    }

    #[test]
    fn entry_with_extra_or_missing_keys_is_rejected() {
        let errors = site_survey()
            .check_entry(&json!({
                "site": "North",
                "count": 1,
                "visited_on": "",
                "weather": "sun",
                "extra": "x"
            }))
            .unwrap_err();
        assert!(errors["extra"].contains("not a field"));
        assert!(errors["notes"].contains("missing"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn entry_reports_every_failing_field() {
        let errors = site_survey()
            .check_entry(&json!({
                "site": "",
                "count": "",
                "visited_on": "soon",
                "notes": "",
                "weather": "snow"
            }))
            .unwrap_err();
        assert_eq!(errors["site"], "Site is required");
        assert_eq!(errors["count"], "Count is required");
        assert!(errors.contains_key("visited_on"));
        assert!(errors.contains_key("weather"));
        assert!(!errors.contains_key("notes"));
    }

    #[test]
    fn entry_data_must_be_an_object() {
        let errors = site_survey().check_entry(&json!([1, 2])).unwrap_err();
        assert!(errors.contains_key("data"));
    }

    fn spec(name: &str, field_type: &str) -> FieldSpec {
        FieldSpec {
            name: name.to_string(),
            label: String::new(),
            field_type: field_type.to_string(),
            required: false,
            options: None,
        }
    }
}
