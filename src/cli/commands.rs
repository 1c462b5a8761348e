use std::io::BufRead;
use std::path::Path;
use std::time::Duration;

use serde_json::Value;

use crate::browser::session::{BrowserSession, open_application};
use crate::cli::config::AppConfig;
use crate::completion::client::CompletionClient;
use crate::completion::models::ModelCatalog;
use crate::completion::prompts::PromptRegistry;
use crate::completion::transport::{ChatTransport, HttpTransport, ScriptedTransport};
use crate::driver::form_driver::FieldState;
use crate::driver::page::FormPage;
use crate::driver::recording::RecordingPage;
use crate::driver::uploads::StaticUploads;
use crate::pipeline::extractor::SchemaExtractor;
use crate::pipeline::orchestrator::{Pipeline, PipelineOutcome};
use crate::profile::UserProfile;
use crate::trace::logger::TraceLogger;

type CmdResult<T> = Result<T, Box<dyn std::error::Error>>;

// ============================================================================
// run subcommand
// ============================================================================

/// Fill and submit a live application page. Returns whether submission succeeded.
pub fn cmd_run(config: &AppConfig, url: &str, profile_path: &Path, no_wait: bool) -> CmdResult<bool> {
    let profile = UserProfile::load(profile_path)?;
    let prompts = PromptRegistry::with_overrides(&config.prompts);
    let models = ModelCatalog::builtin().with_default(&config.completion.model)?;
    let client = build_client(config, http_transport(config)?, &prompts, &models);
    let uploads = StaticUploads::from_config(&config.uploads);
    let tracer = build_tracer(config);

    let mut session = BrowserSession::launch(&config.browser)?;
    let markup = open_application(&mut session, url, &config.browser)?;

    let outcome = Pipeline::new(&client, &config.driver, &uploads)
        .with_policy(config.value_policy)
        .run(&mut session, &markup, &profile, &tracer)?;
    print_outcome(&outcome);

    if !no_wait {
        eprintln!("Press Enter to close the browser...");
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
    }
    session.close()?;

    Ok(outcome.report.submitted())
}

// ============================================================================
// plan subcommand
// ============================================================================

/// Run the pipeline against saved markup and a recording page, then print
/// the page actions it would perform. Returns whether submission succeeded.
pub fn cmd_plan(
    config: &AppConfig,
    html_path: &Path,
    profile_path: &Path,
    replay: Option<&Path>,
) -> CmdResult<bool> {
    let markup = std::fs::read_to_string(html_path)?;
    let profile = UserProfile::load(profile_path)?;
    let prompts = PromptRegistry::with_overrides(&config.prompts);
    let models = ModelCatalog::builtin().with_default(&config.completion.model)?;
    let transport = match replay {
        Some(path) => Box::new(ScriptedTransport::new(load_replies(path)?)) as Box<dyn ChatTransport>,
        None => http_transport(config)?,
    };
    let client = build_client(config, transport, &prompts, &models);
    let uploads = StaticUploads::from_config(&config.uploads);

    let mut page = RecordingPage::new();
    let outcome = Pipeline::new(&client, &config.driver, &uploads)
        .with_policy(config.value_policy)
        .run(&mut page, &markup, &profile, &TraceLogger::disabled())?;

    println!("Planned actions:");
    for call in page.calls() {
        println!("  {}", call);
    }
    println!();
    print_outcome(&outcome);

    Ok(outcome.report.submitted())
}

// ============================================================================
// extract subcommand
// ============================================================================

/// Print the schema extracted from saved markup as JSON.
pub fn cmd_extract(config: &AppConfig, html_path: &Path, replay: Option<&Path>) -> CmdResult<()> {
    let markup = std::fs::read_to_string(html_path)?;
    let prompts = PromptRegistry::with_overrides(&config.prompts);
    let models = ModelCatalog::builtin().with_default(&config.completion.model)?;
    let transport = match replay {
        Some(path) => Box::new(ScriptedTransport::new(load_replies(path)?)) as Box<dyn ChatTransport>,
        None => http_transport(config)?,
    };
    let client = build_client(config, transport, &prompts, &models);

    let schema = SchemaExtractor::new(&client).extract(&markup)?;
    println!("{}", serde_json::to_string_pretty(&schema)?);
    eprintln!("fingerprint: {}", schema.fingerprint());
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn http_transport(config: &AppConfig) -> CmdResult<Box<dyn ChatTransport>> {
    let transport = HttpTransport::from_env(
        &config.completion.endpoint,
        &config.completion.api_key_env,
        Duration::from_secs(config.completion.timeout_secs),
    )?;
    Ok(Box::new(transport))
}

fn build_client<'a>(
    config: &AppConfig,
    transport: Box<dyn ChatTransport + 'a>,
    prompts: &'a PromptRegistry,
    models: &'a ModelCatalog,
) -> CompletionClient<'a> {
    CompletionClient::new(transport, prompts, models).with_temperature(config.completion.temperature)
}

fn build_tracer(config: &AppConfig) -> TraceLogger {
    match &config.trace.path {
        Some(path) => TraceLogger::new(path),
        None => TraceLogger::disabled(),
    }
}

/// Read canned completion replies: a JSON array whose string items are used
/// verbatim and whose other items are re-serialized.
pub fn load_replies(path: &Path) -> CmdResult<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    let items: Vec<Value> = serde_json::from_str(&content)?;
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            other => serde_json::to_string(&other).map_err(Into::into),
        })
        .collect()
}

fn print_outcome(outcome: &PipelineOutcome) {
    let report = &outcome.report;
    println!(
        "Schema {} ({} fields): {} filled, {} skipped",
        outcome.fingerprint,
        outcome.field_count,
        report.filled_count(),
        report.skipped_count()
    );

    for o in &report.outcomes {
        match &o.state {
            FieldState::Skipped(reason) => {
                println!("  [skipped] {} ({}): {}", o.name, o.kind, reason)
            }
            state => println!("  [{}] {} ({})", state.label(), o.name, o.kind),
        }
    }

    match &report.submission {
        Ok(()) => println!("Submitted."),
        Err(e) => println!("Submission failed: {}", e),
    }

    if let Some(cost) = outcome.total_cost_usd() {
        println!("Completion cost: ${:.6}", cost);
    }
}
