use askama::Template;
use serde_json::Value;

use super::{Control, RenderedField};

pub struct OptionView {
    pub value: String,
    pub selected: bool,
}

pub struct FieldView {
    pub name: String,
    pub label: String,
    pub required: bool,
    /// One of `input`, `textarea`, `select`.
    pub element: &'static str,
    pub input_type: &'static str,
    pub value: String,
    pub options: Vec<OptionView>,
    pub error: Option<String>,
}

impl From<RenderedField> for FieldView {
    fn from(field: RenderedField) -> Self {
        let value = match field.value {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };

        let (element, input_type, options) = match field.control {
            Control::TextInput => ("input", "text", Vec::new()),
            Control::NumberInput => ("input", "number", Vec::new()),
            Control::DateInput => ("input", "date", Vec::new()),
            Control::TextArea => ("textarea", "", Vec::new()),
            Control::Select { options } => (
                "select",
                "",
                options
                    .into_iter()
                    .map(|o| OptionView {
                        selected: o == value,
                        value: o,
                    })
                    .collect(),
            ),
        };

        FieldView {
            name: field.name,
            label: field.label,
            required: field.required,
            element,
            input_type,
            value,
            options,
            error: field.error,
        }
    }
}

#[derive(Template)]
#[template(path = "forms/render.html")]
pub struct FormTemplate {
    pub title: String,
    pub project_id: String,
    pub action: String,
    /// API verb for the submitting script; browsers only post the form.
    pub method: &'static str,
    pub submit_label: String,
    pub fields: Vec<FieldView>,
}

impl FormTemplate {
    pub fn new(
        title: String,
        project_id: String,
        action: String,
        method: &'static str,
        submit_label: &str,
        fields: Vec<RenderedField>,
    ) -> Self {
        FormTemplate {
            title,
            project_id,
            action,
            method,
            submit_label: submit_label.to_string(),
            fields: fields.into_iter().map(FieldView::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::render::FormState;
    use crate::schema::FormSchema;

    #[test]
    fn renders_controls_in_order_with_escaping() {
        let schema: FormSchema = serde_json::from_value(json!([
            { "name": "site", "label": "Site <name>", "type": "text", "required": true },
            { "name": "kind", "label": "Kind", "type": "dropdown", "options": ["a", "b"] },
            { "name": "notes", "label": "Notes", "type": "textarea" }
        ]))
        .unwrap();
        let initial = json!({ "kind": "b" });
        let form = FormState::new(&schema, initial.as_object());

        let html = FormTemplate::new(
            "Survey".to_string(),
            "p-1".to_string(),
            "/api/v1/entries".to_string(),
            "post",
            "Submit",
            form.controls(&form.validate()),
        )
        .render()
        .unwrap();

        let site = html.find("name=\"site\"").unwrap();
        let kind = html.find("name=\"kind\"").unwrap();
        let notes = html.find("name=\"notes\"").unwrap();
        assert!(site < kind && kind < notes);
        assert!(html.contains("Site &lt;name&gt;"));
        assert!(html.contains("<option value=\"b\" selected>"));
        assert!(html.contains("Site &lt;name&gt; is required"));
    }

    #[test]
    fn edit_form_posts_and_carries_the_api_verb() {
        let schema: FormSchema =
            serde_json::from_value(json!([{ "name": "count", "type": "number" }])).unwrap();
        let initial = json!({ "count": 4 });
        let form = FormState::new(&schema, initial.as_object());

        let html = FormTemplate::new(
            "Survey".to_string(),
            "p-1".to_string(),
            "/api/v1/entries/e-1".to_string(),
            "put",
            "Save",
            form.controls(&Default::default()),
        )
        .render()
        .unwrap();

        assert!(html.contains("method=\"post\" data-method=\"put\""));
        assert!(!html.contains(" method=\"put\""));
        assert!(html.contains("value=\"4\""));
    }
}
