use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::error::{SchemaParseError, Stage};
use crate::schema::field_model::{
    Field, FieldKind, FieldOption, FieldSchema, Identifiers, SubmitTarget,
};

// ============================================================================
// Locating JSON inside generated text
// ============================================================================

/// Find the JSON payload in a model reply.
///
/// Accepts a bare JSON document, a ```json fenced block, or prose wrapped
/// around the first balanced object or array that parses.
pub fn locate_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if serde_json::from_str::<Value>(trimmed).is_ok() {
        return Some(trimmed);
    }

    if let Some(block) = fenced_block(trimmed) {
        if serde_json::from_str::<Value>(block).is_ok() {
            return Some(block);
        }
        if let Some(span) = first_json_span(block) {
            return Some(span);
        }
    }

    first_json_span(trimmed)
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    // Skip the info string (e.g. "json") up to the end of the fence line.
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// First balanced span that is valid JSON. Bracketed prose such as
/// "[2 total]" balances but does not parse, so scanning moves past it.
fn first_json_span(text: &str) -> Option<&str> {
    text.match_indices(['{', '['])
        .filter_map(|(start, _)| balanced_span_at(text, start))
        .find(|span| serde_json::from_str::<Value>(span).is_ok())
}

/// Balanced `{...}` or `[...]` span opening at `start`, respecting string literals.
fn balanced_span_at(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in text.as_bytes()[start..].iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

// ============================================================================
// Lenient scalar readers
// ============================================================================

/// Non-empty trimmed string; numbers are stringified, everything else is absent.
fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Synthesized values keep inner whitespace and may legitimately be "".
fn value_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn bool_of(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes"),
        _ => false,
    }
}

fn identifiers_of(obj: &Map<String, Value>) -> Identifiers {
    Identifiers {
        ui_tag: text_of(obj.get("data-ui").or_else(|| obj.get("data_ui"))),
        id: text_of(obj.get("id")),
        name: text_of(obj.get("name")),
        aria_label: text_of(obj.get("aria-label").or_else(|| obj.get("aria_label"))),
        placeholder: text_of(obj.get("placeholder")),
    }
}

fn options_of(value: Option<&Value>) -> Vec<FieldOption> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(o) => {
                let label = text_of(o.get("label"));
                let value = text_of(o.get("value")).or_else(|| label.clone())?;
                Some(FieldOption { value, label })
            }
            Value::String(_) | Value::Number(_) => {
                text_of(Some(item)).map(|v| FieldOption::new(&v, None))
            }
            _ => None,
        })
        .collect()
}

fn field_from_value(raw: &Value) -> Result<Field, String> {
    let obj = raw
        .as_object()
        .ok_or_else(|| format!("expected an object, got {}", json_type(raw)))?;

    let raw_type = text_of(obj.get("type")).unwrap_or_default();
    let kind = FieldKind::from_type(&raw_type);
    let identifiers = identifiers_of(obj);
    if identifiers.is_empty() {
        return Err("field has no identifier (data-ui, id, name, aria-label, placeholder)".into());
    }

    let options = if kind.has_options() {
        options_of(obj.get("options"))
    } else {
        Vec::new()
    };

    Ok(Field {
        kind,
        identifiers,
        label: text_of(obj.get("label").or_else(|| obj.get("question"))),
        options,
        required: bool_of(obj.get("required")),
        value: value_of(obj.get("value")),
    })
}

fn submit_from_value(raw: &Value) -> Option<SubmitTarget> {
    let obj = raw.as_object()?;
    let identifiers = identifiers_of(obj);
    let text = text_of(
        obj.get("text")
            .or_else(|| obj.get("label"))
            .or_else(|| obj.get("value")),
    );
    if identifiers.is_empty() && text.is_none() {
        return None;
    }
    Some(SubmitTarget { identifiers, text })
}

/// Extractors sometimes emit one entry per radio/checkbox input, carrying the
/// option in `value` instead of `options`. Turn that into a one-option field so
/// group merging can union them.
fn promote_lone_option(field: &mut Field, raw: &Value) {
    if !field.kind.is_group() || !field.options.is_empty() {
        return;
    }
    let Some(value) = text_of(raw.get("value")) else {
        return;
    };
    let label = text_of(raw.get("option_label").or_else(|| raw.get("text")));
    field.options.push(FieldOption { value, label });
}

fn is_submit_marker(raw: &Value) -> bool {
    raw.get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| matches!(t.trim().to_ascii_lowercase().as_str(), "submit" | "button"))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Schema invariants
// ============================================================================

/// Merge radio/checkbox fields sharing a group name into the first of them.
/// Options are unioned by value in order of first appearance.
pub fn merge_groups(fields: Vec<Field>) -> Vec<Field> {
    let mut merged: Vec<Field> = Vec::with_capacity(fields.len());
    let mut group_slots: HashMap<(String, String), usize> = HashMap::new();

    for field in fields {
        let group_key = field
            .group_name()
            .map(|name| (field.kind.as_str().to_string(), name.to_string()));

        let Some(key) = group_key else {
            merged.push(field);
            continue;
        };

        match group_slots.get(&key) {
            Some(&slot) => {
                tracing::debug!(group = %key.1, "merging grouped input into existing field");
                let target = &mut merged[slot];
                for option in field.options {
                    if !target.has_option_value(&option.value) {
                        target.options.push(option);
                    }
                }
                if target.label.is_none() {
                    target.label = field.label;
                }
                if target.value.is_none() {
                    target.value = field.value;
                }
                target.required |= field.required;
                target.identifiers.absorb(&field.identifiers);
            }
            None => {
                group_slots.insert(key, merged.len());
                merged.push(field);
            }
        }
    }

    merged
}

/// Drop fields whose identifier tuple was already seen. First occurrence wins.
pub fn dedupe(fields: Vec<Field>) -> Vec<Field> {
    let mut seen: HashSet<Identifiers> = HashSet::new();
    fields
        .into_iter()
        .filter(|field| {
            let fresh = seen.insert(field.identifiers.clone());
            if !fresh {
                tracing::debug!(field = %field.display_name(), "dropping duplicate field");
            }
            fresh
        })
        .collect()
}

// ============================================================================
// Entry point
// ============================================================================

/// Parse and validate model output into a `FieldSchema`.
///
/// Accepted shapes: `{"fields": [...], "submit": {...}}`, `{"fields": [...]}`
/// whose trailing submit/button entry becomes the submit marker, or a bare
/// array of fields.
pub fn parse_field_schema(text: &str, stage: Stage) -> Result<FieldSchema, SchemaParseError> {
    let json = locate_json(text).ok_or(SchemaParseError::NoJson { stage })?;
    let root: Value =
        serde_json::from_str(json).map_err(|source| SchemaParseError::Json { stage, source })?;

    let (raw_fields, mut submit) = match &root {
        Value::Array(items) => (items, None),
        Value::Object(obj) => {
            let items = obj
                .get("fields")
                .or_else(|| obj.get("inputs"))
                .and_then(Value::as_array)
                .ok_or(SchemaParseError::MissingFields { stage })?;
            let submit = obj
                .get("submit")
                .or_else(|| obj.get("submit_button"))
                .and_then(submit_from_value);
            (items, submit)
        }
        _ => return Err(SchemaParseError::MissingFields { stage }),
    };

    let mut fields = Vec::with_capacity(raw_fields.len());
    for (index, raw) in raw_fields.iter().enumerate() {
        if is_submit_marker(raw) {
            if submit.is_none() {
                submit = submit_from_value(raw);
            }
            continue;
        }
        let mut field = field_from_value(raw)
            .map_err(|reason| SchemaParseError::Field { stage, index, reason })?;
        if stage == Stage::Extraction {
            promote_lone_option(&mut field, raw);
        }
        fields.push(field);
    }

    let fields = dedupe(merge_groups(fields));
    Ok(FieldSchema { fields, submit })
}
