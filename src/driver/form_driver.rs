use std::fmt;

use serde::{Deserialize, Serialize};

use crate::driver::page::{ClickOptions, ElementHandle, FormPage, WaitState};
use crate::driver::selectors::{
    date_input_selector, file_input_selector, primary_selector, radio_option_selector,
    submit_selector,
};
use crate::driver::uploads::UploadResolver;
use crate::error::{BrowserError, FieldFillError, SubmissionError};
use crate::schema::field_model::{Field, FieldKind, FieldSchema};
use crate::trace::{logger::TraceLogger, trace::TraceEvent};

pub const DEFAULT_SUBMIT_SELECTOR: &str = "button[data-ui='apply-button']";
pub const DEFAULT_CONSENT_SELECTOR: &str =
    r#"//label[contains(@class, "cb-lb")]/input[@type="checkbox"]"#;
pub const DEFAULT_RADIO_TIMEOUT_MS: u64 = 5000;

// ============================================================================
// Configuration
// ============================================================================

/// `driver:` section of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Used when the extractor reported no submit control.
    #[serde(default = "default_submit_selector")]
    pub submit_selector: String,

    /// Checkbox to tick after submitting; `null` skips the step.
    #[serde(default = "default_consent_selector")]
    pub consent_selector: Option<String>,

    /// How long a radio option may take to become visible.
    #[serde(default = "default_radio_timeout_ms")]
    pub radio_timeout_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            submit_selector: default_submit_selector(),
            consent_selector: default_consent_selector(),
            radio_timeout_ms: DEFAULT_RADIO_TIMEOUT_MS,
        }
    }
}

fn default_submit_selector() -> String { DEFAULT_SUBMIT_SELECTOR.to_string() }
fn default_consent_selector() -> Option<String> { Some(DEFAULT_CONSENT_SELECTOR.to_string()) }
fn default_radio_timeout_ms() -> u64 { DEFAULT_RADIO_TIMEOUT_MS }

// ============================================================================
// Field state machine
// ============================================================================

/// Why a field ended up skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The driver has no fill strategy for this kind.
    UnhandledKind,
    /// Filling failed; the message mirrors the recorded `FieldFillError`.
    Failed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnhandledKind => write!(f, "no fill strategy for this kind"),
            SkipReason::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

/// `Pending -> Located -> Filled | Skipped`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldState {
    Pending,
    Located,
    Filled,
    Skipped(SkipReason),
}

impl FieldState {
    pub fn label(&self) -> &'static str {
        match self {
            FieldState::Pending => "pending",
            FieldState::Located => "located",
            FieldState::Filled => "filled",
            FieldState::Skipped(_) => "skipped",
        }
    }
}

/// Final state of one field after the fill pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOutcome {
    pub index: usize,
    pub name: String,
    pub kind: String,
    pub state: FieldState,
}

/// A field that could not be filled, and why.
#[derive(Debug)]
pub struct FieldFailure {
    pub index: usize,
    pub field: Field,
    pub error: FieldFillError,
}

/// Everything the fill pass did.
#[derive(Debug)]
pub struct FillReport {
    pub outcomes: Vec<FieldOutcome>,
    pub failures: Vec<FieldFailure>,
    pub submission: Result<(), SubmissionError>,
}

impl FillReport {
    pub fn filled_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.state == FieldState::Filled)
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.state, FieldState::Skipped(_)))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    pub fn submitted(&self) -> bool {
        self.submission.is_ok()
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Trace context for the field currently being processed.
struct FieldStep<'t> {
    tracer: &'t TraceLogger,
    index: usize,
    field: &'t Field,
}

impl FieldStep<'_> {
    fn mark(&self, state: &FieldState) {
        self.tracer
            .log(&TraceEvent::for_field(self.index as u64, self.field, state));
    }

    fn located(&self, handle: &ElementHandle) {
        self.tracer.log(
            &TraceEvent::for_field(self.index as u64, self.field, &FieldState::Located)
                .with_selector(&handle.selector),
        );
    }
}

/// Performs one best-effort fill-and-submit pass over a value-populated schema.
pub struct FormDriver<'a> {
    config: &'a DriverConfig,
    uploads: &'a dyn UploadResolver,
}

impl<'a> FormDriver<'a> {
    pub fn new(config: &'a DriverConfig, uploads: &'a dyn UploadResolver) -> Self {
        Self { config, uploads }
    }

    /// Fill every field in schema order, then submit.
    ///
    /// Errors on one field are recorded and never stop the pass.
    pub fn fill(
        &self,
        page: &mut dyn FormPage,
        schema: &FieldSchema,
        tracer: &TraceLogger,
    ) -> FillReport {
        let mut outcomes = Vec::with_capacity(schema.len());
        let mut failures = Vec::new();

        for (index, field) in schema.iter().enumerate() {
            let step = FieldStep { tracer, index, field };
            step.mark(&FieldState::Pending);

            let state = match self.fill_field(page, field, &step) {
                Ok(state) => state,
                Err(error) => {
                    tracing::warn!(field = %field.display_name(), error = %error, "skipping field");
                    let reason = SkipReason::Failed(error.to_string());
                    failures.push(FieldFailure {
                        index,
                        field: field.clone(),
                        error,
                    });
                    FieldState::Skipped(reason)
                }
            };

            if state == FieldState::Skipped(SkipReason::UnhandledKind) {
                tracing::debug!(field = %field.display_name(), kind = field.kind.as_str(), "no fill strategy, skipping");
            }
            step.mark(&state);

            outcomes.push(FieldOutcome {
                index,
                name: field.display_name(),
                kind: field.kind.as_str().to_string(),
                state,
            });
        }

        let submission = self.submit(page, schema, tracer);
        match &submission {
            Ok(()) => tracing::info!("form submitted"),
            Err(e) => tracing::error!(error = %e, "form submission failed"),
        }

        FillReport {
            outcomes,
            failures,
            submission,
        }
    }

    fn fill_field(
        &self,
        page: &mut dyn FormPage,
        field: &Field,
        step: &FieldStep<'_>,
    ) -> Result<FieldState, FieldFillError> {
        match &field.kind {
            FieldKind::Text | FieldKind::Email | FieldKind::Textarea => {
                self.fill_text(page, field, step)
            }
            FieldKind::File => self.attach_file(page, field, step),
            FieldKind::Radio => self.select_radio(page, field, step),
            FieldKind::Tel => self.fill_tel(page, field, step),
            FieldKind::Checkbox | FieldKind::Dropdown | FieldKind::Other(_) => {
                Ok(FieldState::Skipped(SkipReason::UnhandledKind))
            }
        }
    }

    fn fill_text(
        &self,
        page: &mut dyn FormPage,
        field: &Field,
        step: &FieldStep<'_>,
    ) -> Result<FieldState, FieldFillError> {
        let value = value_of(field)?;
        let selector = primary_selector(field).ok_or(FieldFillError::MissingIdentifier("any"))?;

        if field.is_date_like() {
            // Date widgets commit typed input on Enter.
            let name = field
                .identifiers
                .name
                .as_deref()
                .ok_or(FieldFillError::MissingIdentifier("name"))?;
            let date_selector = date_input_selector(name);
            step.located(&await_element(page, &date_selector, WaitState::Attached, None)?);
            page.fill(&date_selector, value)?;
            page.press(&date_selector, "Enter")?;
            page.fill(&selector, value)?;
            return Ok(FieldState::Filled);
        }

        step.located(&locate(page, &selector)?);
        page.fill(&selector, value)?;
        Ok(FieldState::Filled)
    }

    fn attach_file(
        &self,
        page: &mut dyn FormPage,
        field: &Field,
        step: &FieldStep<'_>,
    ) -> Result<FieldState, FieldFillError> {
        let ui_tag = field
            .identifiers
            .ui_tag
            .as_deref()
            .ok_or(FieldFillError::MissingIdentifier("data-ui"))?;
        let path = self.uploads.resolve(field)?;
        let selector = file_input_selector(ui_tag);

        step.located(&locate(page, &selector)?);
        page.set_upload_files(&selector, &[path])?;
        Ok(FieldState::Filled)
    }

    fn select_radio(
        &self,
        page: &mut dyn FormPage,
        field: &Field,
        step: &FieldStep<'_>,
    ) -> Result<FieldState, FieldFillError> {
        let group = field
            .identifiers
            .name
            .as_deref()
            .ok_or(FieldFillError::MissingIdentifier("name"))?;
        let value = value_of(field)?;
        let selector = radio_option_selector(group, value);

        step.located(&await_element(
            page,
            &selector,
            WaitState::Visible,
            Some(self.config.radio_timeout_ms),
        )?);
        // Styled radio inputs are usually covered by a custom widget.
        page.click(&selector, ClickOptions::forced())?;
        Ok(FieldState::Filled)
    }

    fn fill_tel(
        &self,
        page: &mut dyn FormPage,
        field: &Field,
        step: &FieldStep<'_>,
    ) -> Result<FieldState, FieldFillError> {
        let value = value_of(field)?;
        let selector = primary_selector(field).ok_or(FieldFillError::MissingIdentifier("any"))?;

        step.located(&locate(page, &selector)?);
        page.fill(&selector, value)?;
        // A trailing key press fires the page's input-mask listeners.
        page.press(&selector, " ")?;
        Ok(FieldState::Filled)
    }

    /// Click submit, then tick the consent checkbox. No confirmation of
    /// server-side acceptance is attempted.
    fn submit(
        &self,
        page: &mut dyn FormPage,
        schema: &FieldSchema,
        tracer: &TraceLogger,
    ) -> Result<(), SubmissionError> {
        let step = schema.len() as u64;
        let selector = schema
            .submit
            .as_ref()
            .and_then(submit_selector)
            .unwrap_or_else(|| self.config.submit_selector.clone());

        page.click(&selector, ClickOptions::default())
            .map_err(|source| SubmissionError::Submit {
                selector: selector.clone(),
                source,
            })?;
        tracer.log(&TraceEvent::now(step, "submitted").with_selector(&selector));

        let Some(consent) = self.config.consent_selector.as_deref() else {
            return Ok(());
        };
        page.wait_for(consent, WaitState::Visible, None)
            .and_then(|()| page.click(consent, ClickOptions::default()))
            .map_err(|source| SubmissionError::Consent {
                selector: consent.to_string(),
                source,
            })?;
        tracer.log(&TraceEvent::now(step, "consented").with_selector(consent));
        Ok(())
    }
}

fn value_of(field: &Field) -> Result<&str, FieldFillError> {
    field.value.as_deref().ok_or(FieldFillError::MissingValue)
}

/// Immediate lookup; an element that is not attached yet gets the helper's
/// default wait before it counts as missing.
fn locate(page: &mut dyn FormPage, selector: &str) -> Result<ElementHandle, FieldFillError> {
    match page.locate(selector)? {
        Some(handle) => Ok(handle),
        None => await_element(page, selector, WaitState::Attached, None),
    }
}

/// Wait for `state`, then look the element up. A wait that times out means
/// the element was never located.
fn await_element(
    page: &mut dyn FormPage,
    selector: &str,
    state: WaitState,
    timeout_ms: Option<u64>,
) -> Result<ElementHandle, FieldFillError> {
    let not_found = || FieldFillError::NotFound {
        selector: selector.to_string(),
    };
    match page.wait_for(selector, state, timeout_ms) {
        Ok(()) => {}
        Err(BrowserError::Timeout { .. }) => return Err(not_found()),
        Err(e) => return Err(e.into()),
    }
    page.locate(selector)?.ok_or_else(not_found)
}
