use crate::schema::field_model::{Field, Identifier, SubmitTarget};

/// Escape a value for use inside a single-quoted CSS attribute string.
pub fn css_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\a "),
            _ => out.push(c),
        }
    }
    out
}

pub fn attribute_selector(attribute: &str, value: &str) -> String {
    format!("[{}='{}']", attribute, css_string(value))
}

/// Whether `value` can follow `#` without escaping.
fn is_plain_ident(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn identifier_selector(identifier: Identifier<'_>) -> String {
    match identifier {
        Identifier::UiTag(v) => attribute_selector("data-ui", v),
        Identifier::Id(v) if is_plain_ident(v) => format!("#{}", v),
        Identifier::Id(v) => attribute_selector("id", v),
        Identifier::Name(v) => attribute_selector("name", v),
        Identifier::AriaLabel(v) => attribute_selector("aria-label", v),
        Identifier::Placeholder(v) => attribute_selector("placeholder", v),
    }
}

/// Selector for the first identifier present in priority order.
pub fn primary_selector(field: &Field) -> Option<String> {
    field.identifiers.primary().map(identifier_selector)
}

/// Date inputs are addressed by their `name` attribute.
pub fn date_input_selector(name: &str) -> String {
    format!("input{}", attribute_selector("name", name))
}

/// File inputs are addressed by their ui-tag only.
pub fn file_input_selector(ui_tag: &str) -> String {
    format!("input{}", attribute_selector("data-ui", ui_tag))
}

/// One option of a radio group: shared name plus the option's value.
pub fn radio_option_selector(group: &str, value: &str) -> String {
    format!(
        "input{}{}",
        attribute_selector("name", group),
        attribute_selector("value", value)
    )
}

/// Selector for the submit control described by the extractor, if any.
pub fn submit_selector(target: &SubmitTarget) -> Option<String> {
    if let Some(identifier) = target.identifiers.primary() {
        return Some(identifier_selector(identifier));
    }
    target
        .text
        .as_deref()
        .map(|text| format!("button:has-text('{}')", css_string(text)))
}
