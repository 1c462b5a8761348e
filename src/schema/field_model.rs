use serde::{Serialize, Serializer};

// ============================================================================
// Field model: the typed description of one form input
// ============================================================================

/// Widget type of a form input.
///
/// `Other` keeps the type string the extractor reported, so the synthesis
/// prompt still sees e.g. "number" or "date" even though the driver does not
/// fill those kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Email,
    Tel,
    Textarea,
    File,
    Radio,
    Checkbox,
    Dropdown,
    Other(String),
}

impl FieldKind {
    /// Map a raw `type` string to a kind. Never fails: unknown types become `Other`.
    pub fn from_type(raw: &str) -> Self {
        let lower = raw.trim().to_ascii_lowercase();
        match lower.as_str() {
            "text" => FieldKind::Text,
            "email" => FieldKind::Email,
            "tel" | "phone" => FieldKind::Tel,
            "textarea" => FieldKind::Textarea,
            "file" => FieldKind::File,
            "radio" => FieldKind::Radio,
            "checkbox" => FieldKind::Checkbox,
            "dropdown" | "select" | "select-one" => FieldKind::Dropdown,
            _ => FieldKind::Other(lower),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Email => "email",
            FieldKind::Tel => "tel",
            FieldKind::Textarea => "textarea",
            FieldKind::File => "file",
            FieldKind::Radio => "radio",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Dropdown => "dropdown",
            FieldKind::Other(raw) if raw.is_empty() => "other",
            FieldKind::Other(raw) => raw.as_str(),
        }
    }

    /// Kinds whose answer must come from a declared option list.
    pub fn has_options(&self) -> bool {
        matches!(
            self,
            FieldKind::Radio | FieldKind::Checkbox | FieldKind::Dropdown
        )
    }

    /// Kinds whose inputs are grouped by a shared `name` attribute.
    pub fn is_group(&self) -> bool {
        matches!(self, FieldKind::Radio | FieldKind::Checkbox)
    }
}

impl Serialize for FieldKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Candidate selectors for one input, as reported by the extractor.
///
/// The full tuple is the field's identity within a schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Identifiers {
    #[serde(rename = "data-ui", skip_serializing_if = "Option::is_none")]
    pub ui_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "aria-label", skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

/// One identifier together with the attribute it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identifier<'a> {
    UiTag(&'a str),
    Id(&'a str),
    Name(&'a str),
    AriaLabel(&'a str),
    Placeholder(&'a str),
}

impl Identifiers {
    /// Present identifiers in lookup priority order:
    /// ui-tag > id > name > aria-label > placeholder.
    pub fn priority(&self) -> Vec<Identifier<'_>> {
        let mut out = Vec::with_capacity(5);
        if let Some(v) = self.ui_tag.as_deref() {
            out.push(Identifier::UiTag(v));
        }
        if let Some(v) = self.id.as_deref() {
            out.push(Identifier::Id(v));
        }
        if let Some(v) = self.name.as_deref() {
            out.push(Identifier::Name(v));
        }
        if let Some(v) = self.aria_label.as_deref() {
            out.push(Identifier::AriaLabel(v));
        }
        if let Some(v) = self.placeholder.as_deref() {
            out.push(Identifier::Placeholder(v));
        }
        out
    }

    pub fn primary(&self) -> Option<Identifier<'_>> {
        self.priority().into_iter().next()
    }

    pub fn is_empty(&self) -> bool {
        self.priority().is_empty()
    }

    /// Fill any identifier this tuple lacks from `other`.
    pub fn absorb(&mut self, other: &Identifiers) {
        fn take(slot: &mut Option<String>, from: &Option<String>) {
            if slot.is_none() {
                slot.clone_from(from);
            }
        }
        take(&mut self.ui_tag, &other.ui_tag);
        take(&mut self.id, &other.id);
        take(&mut self.name, &other.name);
        take(&mut self.aria_label, &other.aria_label);
        take(&mut self.placeholder, &other.placeholder);
    }
}

/// One selectable answer of a radio, checkbox or dropdown field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldOption {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl FieldOption {
    pub fn new(value: &str, label: Option<&str>) -> Self {
        Self {
            value: value.to_string(),
            label: label.map(str::to_string),
        }
    }
}

/// One form input descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(flatten)]
    pub identifiers: Identifiers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Field {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            identifiers: Identifiers::default(),
            label: None,
            options: Vec::new(),
            required: false,
            value: None,
        }
    }

    pub fn with_ui_tag(mut self, ui_tag: &str) -> Self {
        self.identifiers.ui_tag = Some(ui_tag.to_string());
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.identifiers.id = Some(id.to_string());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.identifiers.name = Some(name.to_string());
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_option(mut self, value: &str, label: &str) -> Self {
        self.options.push(FieldOption::new(value, Some(label)));
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    /// Human-facing name for logs and reports. Never includes the value.
    pub fn display_name(&self) -> String {
        if let Some(label) = self.label.as_deref().filter(|l| !l.trim().is_empty()) {
            return label.trim().to_string();
        }
        match self.identifiers.primary() {
            Some(
                Identifier::UiTag(v)
                | Identifier::Id(v)
                | Identifier::Name(v)
                | Identifier::AriaLabel(v)
                | Identifier::Placeholder(v),
            ) => v.to_string(),
            None => format!("<unnamed {}>", self.kind.as_str()),
        }
    }

    /// Shared `name` of a radio or checkbox group.
    pub fn group_name(&self) -> Option<&str> {
        if self.kind.is_group() {
            self.identifiers.name.as_deref()
        } else {
            None
        }
    }

    /// Whether the label contains the word "date".
    pub fn is_date_like(&self) -> bool {
        self.label.as_deref().is_some_and(|label| {
            label
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| word.eq_ignore_ascii_case("date"))
        })
    }

    pub fn has_option_value(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }
}

/// Identifying details of the form's submit control. Not a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubmitTarget {
    #[serde(flatten)]
    pub identifiers: Identifiers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

// ============================================================================
// Field schema: the ordered fields of one form
// ============================================================================

/// Ordered fields of one form plus its submit marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldSchema {
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit: Option<SubmitTarget>,
}

#[derive(Serialize)]
struct PromptFields<'a> {
    fields: &'a [Field],
}

impl FieldSchema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            submit: None,
        }
    }

    pub fn with_submit(mut self, submit: SubmitTarget) -> Self {
        self.submit = Some(submit);
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub fn find(&self, identifiers: &Identifiers) -> Option<&Field> {
        self.fields.iter().find(|f| &f.identifiers == identifiers)
    }

    /// Exact identifier tuple, else a field of the same kind whose primary
    /// identifier matches.
    fn counterpart(&self, field: &Field) -> Option<&Field> {
        self.find(&field.identifiers).or_else(|| {
            let primary = field.identifiers.primary()?;
            self.fields
                .iter()
                .find(|f| f.kind == field.kind && f.identifiers.primary() == Some(primary))
        })
    }

    /// `{"fields": [...]}` as sent to the synthesis prompt.
    pub fn to_prompt_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&PromptFields {
            fields: &self.fields,
        })
    }

    pub fn clear_values(&mut self) {
        for field in &mut self.fields {
            field.value = None;
        }
    }

    /// Copy values from a synthesized schema onto this one, matching fields
    /// by identifier tuple. Structure always stays that of `self`.
    ///
    /// Returns the number of fields that received a value.
    pub fn apply_values(&mut self, synthesized: &FieldSchema) -> usize {
        let mut applied = 0;
        for field in &mut self.fields {
            match synthesized.counterpart(field) {
                Some(source) if source.value.is_some() => {
                    field.value.clone_from(&source.value);
                    applied += 1;
                }
                _ => {
                    tracing::warn!(field = %field.display_name(), "synthesis produced no value");
                }
            }
        }
        for extra in synthesized
            .fields
            .iter()
            .filter(|s| self.counterpart(s).is_none())
        {
            tracing::debug!(field = %extra.display_name(), "ignoring field invented by synthesis");
        }
        applied
    }

    /// Fields that still have no value.
    pub fn unfilled(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.value.is_none())
    }

    /// Structural fingerprint: kinds, identifiers and option values, in order.
    /// Values are excluded, so re-extractions of identical markup compare equal.
    pub fn fingerprint(&self) -> String {
        use sha1::{Digest, Sha1};

        let mut hasher = Sha1::new();
        for field in &self.fields {
            let ids = &field.identifiers;
            let line = format!(
                "{}|{}|{}|{}|{}|{}|{}\n",
                field.kind.as_str(),
                ids.ui_tag.as_deref().unwrap_or(""),
                ids.id.as_deref().unwrap_or(""),
                ids.name.as_deref().unwrap_or(""),
                ids.aria_label.as_deref().unwrap_or(""),
                ids.placeholder.as_deref().unwrap_or(""),
                field
                    .options
                    .iter()
                    .map(|o| o.value.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            );
            hasher.update(line.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}
