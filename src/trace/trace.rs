use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::driver::form_driver::FieldState;
use crate::schema::field_model::Field;

/// One line of the fill trace. Never carries field values.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub step: u64,

    pub state: String,

    pub field: Option<String>,
    pub kind: Option<String>,
    pub selector: Option<String>,
    pub reason: Option<String>,
}

impl TraceEvent {
    pub fn now(step: u64, state: impl ToString) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            step,
            state: state.to_string(),
            field: None,
            kind: None,
            selector: None,
            reason: None,
        }
    }

    /// Event for a field entering `state`.
    pub fn for_field(step: u64, field: &Field, state: &FieldState) -> Self {
        let event = Self::now(step, state.label()).with_field(field);
        match state {
            FieldState::Skipped(reason) => event.with_reason(reason),
            _ => event,
        }
    }

    pub fn with_field(mut self, field: &Field) -> Self {
        self.field = Some(field.display_name());
        self.kind = Some(field.kind.as_str().to_string());
        self
    }

    pub fn with_selector(mut self, selector: &str) -> Self {
        self.selector = Some(selector.to_string());
        self
    }

    pub fn with_reason(mut self, reason: impl ToString) -> Self {
        self.reason = Some(reason.to_string());
        self
    }
}
