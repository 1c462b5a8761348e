use std::path::PathBuf;

use form_autofill::driver::{
    form_driver::{DriverConfig, FieldState, FormDriver, SkipReason},
    page::WaitState,
    recording::{PageCall, RecordingPage},
    selectors::{css_string, primary_selector, radio_option_selector, submit_selector},
    uploads::{StaticUploads, UploadConfig, UploadResolver},
};
use form_autofill::error::{BrowserError, FieldFillError, SubmissionError};
use form_autofill::schema::field_model::{Field, FieldKind, FieldSchema, Identifiers, SubmitTarget};
use form_autofill::trace::logger::TraceLogger;

mod common;

fn uploads() -> StaticUploads {
    StaticUploads::new(Some(PathBuf::from("/tmp/cv.pdf")))
}

fn run(page: &mut RecordingPage, schema: &FieldSchema) -> form_autofill::driver::form_driver::FillReport {
    let config = DriverConfig::default();
    let resolver = uploads();
    FormDriver::new(&config, &resolver).fill(page, schema, &TraceLogger::disabled())
}

// =========================================================================
// Selectors
// =========================================================================

#[test]
fn primary_selector_follows_identifier_priority() {
    let field = Field::new(FieldKind::Text)
        .with_name("email")
        .with_id("mail")
        .with_ui_tag("email-input");
    assert_eq!(primary_selector(&field).unwrap(), "[data-ui='email-input']");

    let field = Field::new(FieldKind::Text).with_name("email").with_id("mail");
    assert_eq!(primary_selector(&field).unwrap(), "#mail");

    let field = Field::new(FieldKind::Text).with_id("1st").with_name("x");
    assert_eq!(primary_selector(&field).unwrap(), "[id='1st']");

    assert_eq!(primary_selector(&Field::new(FieldKind::Text)), None);
}

#[test]
fn selector_values_are_escaped() {
    assert_eq!(css_string(r"it's a\b"), r"it\'s a\\b");
    assert_eq!(
        radio_option_selector("q1", "I'm in"),
        r"input[name='q1'][value='I\'m in']"
    );
}

#[test]
fn submit_selector_falls_back_to_button_text() {
    let by_id = SubmitTarget {
        identifiers: Identifiers {
            ui_tag: Some("apply-button".into()),
            ..Default::default()
        },
        text: Some("Apply".into()),
    };
    assert_eq!(submit_selector(&by_id).unwrap(), "[data-ui='apply-button']");

    let by_text = SubmitTarget {
        identifiers: Identifiers::default(),
        text: Some("Send application".into()),
    };
    assert_eq!(
        submit_selector(&by_text).unwrap(),
        "button:has-text('Send application')"
    );
}

// =========================================================================
// Per-kind strategies
// =========================================================================

#[test]
fn text_email_and_textarea_fill_once() {
    let schema = FieldSchema::new(vec![
        Field::new(FieldKind::Text).with_ui_tag("first-name").with_value("Ada"),
        Field::new(FieldKind::Email).with_name("email").with_value("ada@example.com"),
        Field::new(FieldKind::Textarea).with_id("cover").with_value("Hello"),
    ]);
    let mut page = RecordingPage::new();
    let report = run(&mut page, &schema);

    assert_eq!(report.filled_count(), 3);
    assert_eq!(
        page.fills(),
        vec![
            ("[data-ui='first-name']", "Ada"),
            ("[name='email']", "ada@example.com"),
            ("#cover", "Hello"),
        ]
    );
}

#[test]
fn date_field_types_commits_then_fills() {
    let schema = FieldSchema::new(vec![
        Field::new(FieldKind::Text)
            .with_ui_tag("start")
            .with_name("startDate")
            .with_label("Start date")
            .with_value("2025-01-01"),
    ]);
    let mut page = RecordingPage::new();
    run(&mut page, &schema);

    let date = "input[name='startDate']".to_string();
    let calls = page.calls();
    assert_eq!(
        calls[0],
        PageCall::WaitFor {
            selector: date.clone(),
            state: WaitState::Attached,
            timeout_ms: None
        }
    );
    assert_eq!(calls[1], PageCall::Locate(date.clone()));
    assert_eq!(
        calls[2],
        PageCall::Fill {
            selector: date.clone(),
            text: "2025-01-01".into()
        }
    );
    assert_eq!(
        calls[3],
        PageCall::Press {
            selector: date,
            key: "Enter".into()
        }
    );
    assert_eq!(
        calls[4],
        PageCall::Fill {
            selector: "[data-ui='start']".into(),
            text: "2025-01-01".into()
        }
    );
}

#[test]
fn date_field_without_name_fails() {
    let schema = FieldSchema::new(vec![
        Field::new(FieldKind::Text).with_id("dob").with_label("Birth date").with_value("1990-05-01"),
    ]);
    let mut page = RecordingPage::new();
    let report = run(&mut page, &schema);
    assert!(matches!(
        report.failures[0].error,
        FieldFillError::MissingIdentifier("name")
    ));
}

#[test]
fn file_field_uploads_resolved_path() {
    let schema = FieldSchema::new(vec![
        Field::new(FieldKind::File).with_ui_tag("resume").with_label("Resume").with_value("ignored.pdf"),
    ]);
    let mut page = RecordingPage::new();
    run(&mut page, &schema);

    let uploads = page.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, "input[data-ui='resume']");
    assert_eq!(uploads[0].1, &[PathBuf::from("/tmp/cv.pdf")][..]);
}

#[test]
fn file_field_without_ui_tag_fails() {
    let schema = FieldSchema::new(vec![Field::new(FieldKind::File).with_name("cv")]);
    let mut page = RecordingPage::new();
    let report = run(&mut page, &schema);
    assert!(matches!(
        report.failures[0].error,
        FieldFillError::MissingIdentifier("data-ui")
    ));
    assert!(page.uploads().is_empty());
}

#[test]
fn radio_waits_then_force_clicks() {
    let schema = FieldSchema::new(vec![
        Field::new(FieldKind::Radio)
            .with_name("newsletter")
            .with_option("yes", "Yes")
            .with_option("no", "No")
            .with_value("no"),
    ]);
    let mut page = RecordingPage::new();
    let report = run(&mut page, &schema);

    let option = "input[name='newsletter'][value='no']".to_string();
    assert_eq!(report.filled_count(), 1);
    assert!(page.calls().contains(&PageCall::WaitFor {
        selector: option.clone(),
        state: WaitState::Visible,
        timeout_ms: Some(5000),
    }));
    assert_eq!(page.clicks()[0], (option.as_str(), true));
}

#[test]
fn radio_option_rendered_late_is_waited_for() {
    let option = "input[name='newsletter'][value='yes']";
    let schema = FieldSchema::new(vec![
        Field::new(FieldKind::Radio)
            .with_name("newsletter")
            .with_option("yes", "Yes")
            .with_value("yes"),
    ]);
    let mut page = RecordingPage::new().appearing_on_wait(option);
    let report = run(&mut page, &schema);

    assert!(report.failures.is_empty());
    assert_eq!(report.filled_count(), 1);
    assert_eq!(
        page.calls()[0],
        PageCall::WaitFor {
            selector: option.into(),
            state: WaitState::Visible,
            timeout_ms: Some(5000),
        }
    );
    assert_eq!(page.clicks()[0], (option, true));
}

#[test]
fn date_input_rendered_late_is_waited_for() {
    let schema = FieldSchema::new(vec![
        Field::new(FieldKind::Text)
            .with_ui_tag("start")
            .with_name("start")
            .with_label("Start Date")
            .with_value("2025-03-01"),
    ]);
    let mut page = RecordingPage::new().appearing_on_wait("input[name='start']");
    let report = run(&mut page, &schema);

    assert!(report.failures.is_empty());
    assert!(page.fills().contains(&("input[name='start']", "2025-03-01")));
}

#[test]
fn text_input_rendered_late_is_waited_for() {
    let schema = FieldSchema::new(vec![Field::new(FieldKind::Text).with_id("city").with_value("Paris")]);
    let mut page = RecordingPage::new().appearing_on_wait("#city");
    let report = run(&mut page, &schema);

    assert_eq!(report.filled_count(), 1);
    assert_eq!(
        page.calls()[..3],
        [
            PageCall::Locate("#city".into()),
            PageCall::WaitFor {
                selector: "#city".into(),
                state: WaitState::Attached,
                timeout_ms: None,
            },
            PageCall::Locate("#city".into()),
        ]
    );
    assert_eq!(page.fills(), vec![("#city", "Paris")]);
}

#[test]
fn radio_option_that_never_appears_times_out_as_not_found() {
    let option = "input[name='g'][value='a']";
    let schema = FieldSchema::new(vec![
        Field::new(FieldKind::Radio).with_name("g").with_option("a", "A").with_value("a"),
    ]);
    let mut page = RecordingPage::new().with_missing(option);
    let report = run(&mut page, &schema);

    assert!(matches!(
        &report.failures[0].error,
        FieldFillError::NotFound { selector } if selector == option
    ));
    assert!(page.calls().contains(&PageCall::WaitFor {
        selector: option.into(),
        state: WaitState::Visible,
        timeout_ms: Some(5000),
    }));
}

#[test]
fn tel_presses_space_after_fill() {
    let schema = FieldSchema::new(vec![Field::new(FieldKind::Tel).with_name("phone").with_value("+15551234567")]);
    let mut page = RecordingPage::new();
    run(&mut page, &schema);

    let calls = page.calls();
    assert_eq!(
        calls[1],
        PageCall::Fill {
            selector: "[name='phone']".into(),
            text: "+15551234567".into()
        }
    );
    assert_eq!(
        calls[2],
        PageCall::Press {
            selector: "[name='phone']".into(),
            key: " ".into()
        }
    );
}

#[test]
fn unhandled_kinds_are_skipped_without_failure() {
    let schema = FieldSchema::new(vec![
        Field::new(FieldKind::Checkbox).with_name("terms").with_option("on", "I agree").with_value("on"),
        Field::new(FieldKind::Dropdown).with_id("country").with_value("FR"),
        Field::new(FieldKind::Other("range".into())).with_id("salary").with_value("5"),
    ]);
    let mut page = RecordingPage::new();
    let report = run(&mut page, &schema);

    assert_eq!(report.skipped_count(), 3);
    assert_eq!(report.failed_count(), 0);
    assert!(report
        .outcomes
        .iter()
        .all(|o| o.state == FieldState::Skipped(SkipReason::UnhandledKind)));
    assert!(page.fills().is_empty());
}

// =========================================================================
// Fill isolation
// =========================================================================

#[test]
fn one_failing_field_does_not_stop_the_pass() {
    let schema = FieldSchema::new(vec![
        Field::new(FieldKind::Text).with_id("first").with_value("Ada"),
        Field::new(FieldKind::Text).with_id("ghost").with_value("Boo"),
        Field::new(FieldKind::Text).with_id("missing-value"),
        Field::new(FieldKind::Email).with_id("mail").with_value("ada@example.com"),
    ]);
    let mut page = RecordingPage::new().with_missing("#ghost");
    let report = run(&mut page, &schema);

    assert_eq!(report.filled_count(), 2);
    assert_eq!(report.failed_count(), 2);
    assert_eq!(report.failures[0].index, 1);
    assert!(matches!(
        &report.failures[0].error,
        FieldFillError::NotFound { selector } if selector == "#ghost"
    ));
    assert!(matches!(report.failures[1].error, FieldFillError::MissingValue));
    assert_eq!(report.outcomes[3].state, FieldState::Filled);
    assert!(report.submitted());
}

#[test]
fn browser_errors_are_contained() {
    let schema = FieldSchema::new(vec![
        Field::new(FieldKind::Text).with_id("broken").with_value("x"),
        Field::new(FieldKind::Text).with_id("fine").with_value("y"),
    ]);
    let mut page = RecordingPage::new().failing_on("#broken");
    let report = run(&mut page, &schema);

    assert!(matches!(
        report.failures[0].error,
        FieldFillError::Browser(BrowserError::Protocol { .. })
    ));
    assert_eq!(report.outcomes[1].state, FieldState::Filled);
    match &report.outcomes[0].state {
        FieldState::Skipped(SkipReason::Failed(msg)) => assert!(msg.contains("fill")),
        other => panic!("unexpected state: {other:?}"),
    }
}

#[test]
fn radio_click_failure_is_contained() {
    let option = "input[name='g'][value='a']";
    let schema = FieldSchema::new(vec![
        Field::new(FieldKind::Radio).with_name("g").with_option("a", "A").with_value("a"),
        Field::new(FieldKind::Text).with_id("after").with_value("ok"),
    ]);
    let mut page = RecordingPage::new().failing_on(option);
    let report = run(&mut page, &schema);

    assert_eq!(report.failed_count(), 1);
    assert!(matches!(
        &report.failures[0].error,
        FieldFillError::Browser(BrowserError::Protocol { command, .. }) if command == "click"
    ));
    assert_eq!(report.outcomes[0].state.label(), "skipped");
    assert_eq!(report.outcomes[1].state, FieldState::Filled);
}

#[test]
fn radio_option_missing_from_page_is_not_found() {
    let option = "input[name='g'][value='b']";
    let schema = FieldSchema::new(vec![
        Field::new(FieldKind::Radio).with_name("g").with_option("b", "B").with_value("b"),
    ]);
    let mut page = RecordingPage::new().with_missing(option);
    let report = run(&mut page, &schema);
    assert!(matches!(report.failures[0].error, FieldFillError::NotFound { .. }));
    assert!(page.clicks().iter().all(|(sel, _)| *sel != option));
}

// =========================================================================
// Submission
// =========================================================================

#[test]
fn submit_uses_marker_then_ticks_consent() {
    let schema = FieldSchema::new(vec![]).with_submit(SubmitTarget {
        identifiers: Identifiers {
            id: Some("send".into()),
            ..Default::default()
        },
        text: None,
    });
    let mut page = RecordingPage::new();
    let report = run(&mut page, &schema);

    assert!(report.submitted());
    assert_eq!(page.clicks(), vec![("#send", false), (common::CONSENT, false)]);
}

#[test]
fn submit_falls_back_to_configured_selector() {
    let mut page = RecordingPage::new();
    run(&mut page, &FieldSchema::default());
    assert_eq!(page.clicks()[0], ("button[data-ui='apply-button']", false));
}

#[test]
fn consent_step_can_be_disabled() {
    let config = DriverConfig {
        consent_selector: None,
        ..DriverConfig::default()
    };
    let resolver = uploads();
    let mut page = RecordingPage::new();
    let report = FormDriver::new(&config, &resolver).fill(&mut page, &FieldSchema::default(), &TraceLogger::disabled());

    assert!(report.submitted());
    assert_eq!(page.clicks().len(), 1);
}

#[test]
fn submit_failure_is_reported() {
    let mut page = RecordingPage::new().failing_on("button[data-ui='apply-button']");
    let report = run(&mut page, &FieldSchema::default());
    assert!(matches!(report.submission, Err(SubmissionError::Submit { .. })));
}

#[test]
fn missing_consent_checkbox_is_reported() {
    let mut page = RecordingPage::new().with_missing(common::CONSENT);
    let report = run(&mut page, &FieldSchema::default());
    match report.submission {
        Err(SubmissionError::Consent { source, .. }) => {
            assert!(matches!(source, BrowserError::Timeout { .. }))
        }
        other => panic!("unexpected submission result: {other:?}"),
    }
}

// =========================================================================
// Uploads
// =========================================================================

#[test]
fn keyword_uploads_match_label_and_tags() {
    let resolver = StaticUploads::new(Some(PathBuf::from("default.pdf")))
        .with_keyword("cover", "cover.pdf")
        .with_keyword("resume", "resume.pdf");

    let cover = Field::new(FieldKind::File).with_ui_tag("doc-2").with_label("Cover Letter");
    let resume = Field::new(FieldKind::File).with_ui_tag("resume-upload");
    let other = Field::new(FieldKind::File).with_ui_tag("portfolio");

    assert_eq!(resolver.resolve(&cover).unwrap(), PathBuf::from("cover.pdf"));
    assert_eq!(resolver.resolve(&resume).unwrap(), PathBuf::from("resume.pdf"));
    assert_eq!(resolver.resolve(&other).unwrap(), PathBuf::from("default.pdf"));
}

#[test]
fn unresolved_upload_is_unavailable() {
    let resolver = StaticUploads::new(None);
    let field = Field::new(FieldKind::File).with_ui_tag("resume");
    assert!(matches!(
        resolver.resolve(&field),
        Err(FieldFillError::UploadUnavailable { path: None, .. })
    ));
}

#[test]
fn nonexistent_upload_fails_when_required() {
    let config = UploadConfig {
        default: Some(PathBuf::from("/definitely/not/here.pdf")),
        require_exists: true,
        ..Default::default()
    };
    let resolver = StaticUploads::from_config(&config);
    let field = Field::new(FieldKind::File).with_ui_tag("resume");
    assert!(matches!(
        resolver.resolve(&field),
        Err(FieldFillError::UploadUnavailable { path: Some(_), .. })
    ));
}
