use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Placeholder name -> literal replacement text.
pub type PromptVariables = BTreeMap<String, String>;

/// Closed set of prompt templates the pipeline can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptType {
    ExtractFields,
    SynthesizeValues,
}

impl PromptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptType::ExtractFields => "extract_fields",
            PromptType::SynthesizeValues => "synthesize_values",
        }
    }
}

/// A (system instruction, user instruction) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
}

impl PromptTemplate {
    pub fn new(system: &str, user: &str) -> Self {
        Self {
            system: system.to_string(),
            user: user.to_string(),
        }
    }

    /// User instruction with every `{name}` token substituted.
    pub fn render_user(&self, variables: &PromptVariables) -> String {
        substitute(&self.user, variables)
    }
}

/// Replace each `{name}` token whose name is a key of `variables` with the
/// value verbatim. Single left-to-right pass: inserted text is never rescanned,
/// and tokens without a matching variable are kept as written.
pub fn substitute(template: &str, variables: &PromptVariables) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if variables.contains_key(&after[..close]) => {
                out.push_str(&variables[&after[..close]]);
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Immutable registry holding one template per `PromptType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRegistry {
    extract_fields: PromptTemplate,
    synthesize_values: PromptTemplate,
}

/// Optional replacements for the built-in templates, read from config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptOverrides {
    #[serde(default)]
    pub extract_fields: Option<PromptTemplate>,
    #[serde(default)]
    pub synthesize_values: Option<PromptTemplate>,
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptRegistry {
    pub fn builtin() -> Self {
        Self {
            extract_fields: PromptTemplate::new(EXTRACT_FIELDS_SYSTEM, EXTRACT_FIELDS_USER),
            synthesize_values: PromptTemplate::new(
                SYNTHESIZE_VALUES_SYSTEM,
                SYNTHESIZE_VALUES_USER,
            ),
        }
    }

    pub fn with_overrides(overrides: &PromptOverrides) -> Self {
        let mut registry = Self::builtin();
        if let Some(t) = &overrides.extract_fields {
            registry.extract_fields = t.clone();
        }
        if let Some(t) = &overrides.synthesize_values {
            registry.synthesize_values = t.clone();
        }
        registry
    }

    pub fn template(&self, prompt: PromptType) -> &PromptTemplate {
        match prompt {
            PromptType::ExtractFields => &self.extract_fields,
            PromptType::SynthesizeValues => &self.synthesize_values,
        }
    }
}

// ============================================================================
// Built-in templates
// ============================================================================

const EXTRACT_FIELDS_SYSTEM: &str = r#"You analyze HTML forms and describe every input they contain as JSON.

Rules:
1. List every input-like element: text, email, tel, textarea, file upload, radio button, checkbox, dropdown/select, and any other form control.
2. For each field report every identifier that exists, using these keys: "data-ui", "id", "name", "aria-label", "placeholder". When choosing how to refer to a field, prefer them in exactly that order.
3. Radio buttons and checkboxes that share a "name" are ONE field. Give that field the question text as "label" and list every choice under "options" as {"value": "...", "label": "..."}.
4. Never list the same field twice.
5. Do not fill in values.
6. Describe the submit button separately under "submit", never as a field.

Respond with one JSON object of this shape and nothing else:
{
  "fields": [
    {
      "type": "text|email|tel|textarea|file|radio|checkbox|dropdown|<other input type>",
      "data-ui": "",
      "id": "",
      "name": "",
      "aria-label": "",
      "placeholder": "",
      "label": "",
      "options": [{"value": "", "label": ""}],
      "required": false
    }
  ],
  "submit": {"data-ui": "", "id": "", "name": "", "text": ""}
}"#;

const EXTRACT_FIELDS_USER: &str = r#"Extract every input field and its identifiers from this HTML form:

{html_form}

Return the JSON object described in your instructions."#;

const SYNTHESIZE_VALUES_SYSTEM: &str = r#"You fill in web forms on behalf of a user.

You receive a JSON object with a "fields" array and a JSON document describing the user. Return the same "fields" array, unchanged except that every field gains a "value" string.

Rules for values:
1. Prefer facts from the user document whenever one applies.
2. Text fields: a plausible answer derived from the user document, or a generic but realistic placeholder when nothing applies.
3. Dropdown, radio and checkbox fields: the value MUST be exactly one of that field's option "value" strings.
4. Numeric fields: stay inside any range the label or options state.
5. Date fields: YYYY-MM-DD.
6. Phone fields (type "tel"): the country calling code for the user's country followed directly by the national number, no spaces or separators, e.g. +15551234567.
7. File fields: a placeholder file name with a realistic extension, e.g. resume.pdf.
8. Keep answers consistent with each other.

Respond with one JSON object {"fields": [...]} and nothing else."#;

const SYNTHESIZE_VALUES_USER: &str = r#"Form fields:
{input_fields}

User document:
{user_meta_data}

Add a "value" to every field and return the JSON object."#;
