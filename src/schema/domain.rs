use serde::{Deserialize, Serialize};

use crate::error::SchemaParseError;
use crate::schema::field_model::FieldSchema;

/// What to do with a synthesized option value that is not one of the
/// field's declared options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValuePolicy {
    /// Map label or case-insensitive matches onto the option value; clear
    /// anything else so the driver reports the field as missing a value.
    #[default]
    Reconcile,
    /// Any out-of-domain value fails the run.
    Reject,
    /// Leave values untouched.
    PassThrough,
}

/// Result of reconciling one schema.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DomainReport {
    pub rewritten: Vec<String>,
    pub cleared: Vec<String>,
}

/// Enforce that radio/checkbox/dropdown values come from their options.
///
/// An option-kind field whose extraction found no options has an empty
/// domain: `Reject` fails on any value set for it, `Reconcile` keeps the
/// value since there is nothing to reconcile against.
pub fn enforce_value_domain(
    schema: &mut FieldSchema,
    policy: ValuePolicy,
) -> Result<DomainReport, SchemaParseError> {
    let mut report = DomainReport::default();
    if policy == ValuePolicy::PassThrough {
        return Ok(report);
    }

    for field in &mut schema.fields {
        if !field.kind.has_options() {
            continue;
        }
        let Some(value) = field.value.as_deref() else {
            continue;
        };
        if field.has_option_value(value) {
            continue;
        }

        if policy == ValuePolicy::Reject {
            return Err(SchemaParseError::ValueOutOfDomain {
                field: field.display_name(),
                value: value.to_string(),
            });
        }

        if field.options.is_empty() {
            tracing::debug!(field = %field.display_name(), "no options extracted; keeping synthesized value");
            continue;
        }

        let wanted = value.trim();
        let matched = field
            .options
            .iter()
            .find(|o| {
                o.value.trim().eq_ignore_ascii_case(wanted)
                    || o.label
                        .as_deref()
                        .is_some_and(|l| l.trim().eq_ignore_ascii_case(wanted))
            })
            .map(|o| o.value.clone());

        match matched {
            Some(option_value) => {
                tracing::debug!(field = %field.display_name(), "mapped synthesized answer onto option value");
                report.rewritten.push(field.display_name());
                field.value = Some(option_value);
            }
            None => {
                tracing::warn!(field = %field.display_name(), "synthesized answer is not one of the options");
                report.cleared.push(field.display_name());
                field.value = None;
            }
        }
    }

    Ok(report)
}
