//! Schema-driven form state: one control per field, the same coercion and
//! checks the server applies, and a payload with exactly the schema's keys.

pub mod html;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::schema::{FieldErrors, FieldType, FormField, FormSchema, UNSET};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Control {
    TextInput,
    NumberInput,
    DateInput,
    TextArea,
    Select { options: Vec<String> },
}

impl Control {
    pub fn for_field(field: &FormField) -> Self {
        match field.field_type {
            FieldType::Text => Control::TextInput,
            FieldType::Number => Control::NumberInput,
            FieldType::Date => Control::DateInput,
            FieldType::Textarea => Control::TextArea,
            FieldType::Dropdown => Control::Select {
                options: field.options.clone(),
            },
        }
    }
}

/// A field as it should be drawn: control, current value, and any error.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedField {
    pub name: String,
    pub label: String,
    pub required: bool,
    pub control: Control,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("'{0}' is not a field of this form")]
pub struct UnknownField(pub String);

/// Editable values for one form, keyed by the schema's field names.
#[derive(Debug, Clone)]
pub struct FormState<'s> {
    schema: &'s FormSchema,
    values: Map<String, Value>,
}

impl<'s> FormState<'s> {
    /// Start a form with every schema field set to the unset sentinel, then
    /// copy over any initial values for fields the schema declares.
    pub fn new(schema: &'s FormSchema, initial: Option<&Map<String, Value>>) -> Self {
        let values = schema
            .fields()
            .iter()
            .map(|field| {
                let value = initial
                    .and_then(|init| init.get(&field.name))
                    .filter(|v| !v.is_null())
                    .cloned()
                    .unwrap_or_else(|| Value::String(UNSET.to_string()));
                (field.name.clone(), value)
            })
            .collect();

        FormState { schema, values }
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Apply raw text from a control, coerced per the field's type.
    pub fn set_input(&mut self, name: &str, raw: &str) -> Result<(), UnknownField> {
        let field = self
            .schema
            .field(name)
            .ok_or_else(|| UnknownField(name.to_string()))?;
        self.values
            .insert(field.name.clone(), field.coerce_input(raw));
        Ok(())
    }

    /// Errors for every field that would be rejected on submit.
    pub fn validate(&self) -> FieldErrors {
        self.schema
            .fields()
            .iter()
            .filter_map(|field| {
                let value = self.values.get(&field.name)?;
                field
                    .check(value)
                    .err()
                    .map(|msg| (field.name.clone(), msg))
            })
            .collect()
    }

    /// The entry payload, or the errors that block submission.
    pub fn submit(&self) -> Result<Map<String, Value>, FieldErrors> {
        self.schema.check_entry(&Value::Object(self.values.clone()))
    }

    /// Controls in schema order, annotated with `errors` where present.
    pub fn controls(&self, errors: &FieldErrors) -> Vec<RenderedField> {
        self.schema
            .fields()
            .iter()
            .map(|field| RenderedField {
                name: field.name.clone(),
                label: field.display_label().to_string(),
                required: field.required,
                control: Control::for_field(field),
                value: self
                    .values
                    .get(&field.name)
                    .cloned()
                    .unwrap_or_else(|| Value::String(UNSET.to_string())),
                error: errors.get(&field.name).cloned(),
            })
            .collect()
    }
}
