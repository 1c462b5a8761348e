use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::browser::session::BrowserConfig;
use crate::completion::client::DEFAULT_TEMPERATURE;
use crate::completion::models::DEFAULT_MODEL;
use crate::completion::prompts::PromptOverrides;
use crate::completion::transport::DEFAULT_ENDPOINT;
use crate::driver::form_driver::DriverConfig;
use crate::driver::uploads::UploadConfig;
use crate::error::ConfigError;
use crate::schema::domain::ValuePolicy;

pub const DEFAULT_CONFIG_FILE: &str = "form-autofill.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "form-autofill",
    version,
    about = "Fill and submit web application forms from a user profile"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: form-autofill.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Completion model, overriding the config file
    #[arg(long, global = true)]
    pub model: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open a live application page, fill it and submit it
    Run {
        /// Application page URL
        #[arg(long)]
        url: String,

        /// JSON file with the applicant's profile
        #[arg(long)]
        profile: PathBuf,

        /// Close the browser without waiting for Enter
        #[arg(long)]
        no_wait: bool,
    },

    /// Plan the fill offline against saved markup and print the page actions
    Plan {
        /// Saved form markup
        #[arg(long)]
        html: PathBuf,

        /// JSON file with the applicant's profile
        #[arg(long)]
        profile: PathBuf,

        /// JSON array of canned completion replies, used instead of the service
        #[arg(long)]
        replay: Option<PathBuf>,
    },

    /// Print the field schema extracted from saved markup
    Extract {
        /// Saved form markup
        #[arg(long)]
        html: PathBuf,

        /// JSON array of canned completion replies, used instead of the service
        #[arg(long)]
        replay: Option<PathBuf>,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `form-autofill.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub value_policy: ValuePolicy,
    #[serde(default)]
    pub prompts: PromptOverrides,
    #[serde(default)]
    pub trace: TraceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            temperature: DEFAULT_TEMPERATURE,
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceConfig {
    /// JSONL file for field events. Unset means no trace file is written.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// Serde default helpers
fn default_endpoint() -> String { DEFAULT_ENDPOINT.to_string() }
fn default_model() -> String { DEFAULT_MODEL.to_string() }
fn default_temperature() -> f32 { DEFAULT_TEMPERATURE }
fn default_api_key_env() -> String { "OPENAI_API_KEY".to_string() }
fn default_timeout_secs() -> u64 { 120 }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file.
///
/// A missing default file yields defaults; an explicitly named file must exist.
/// Malformed YAML is always an error.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let (config_path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    let content = match std::fs::read_to_string(&config_path) {
        Ok(content) => content,
        Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(AppConfig::default());
        }
        Err(e) => {
            return Err(ConfigError::Read {
                path: config_path,
                source: e,
            });
        }
    };

    parse_config(&content).map_err(|source| ConfigError::Yaml {
        path: config_path,
        source,
    })
}

/// Parse config YAML. An empty document yields defaults.
pub fn parse_config(content: &str) -> Result<AppConfig, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(content)
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

impl AppConfig {
    /// Apply command-line overrides on top of file values.
    pub fn with_cli_overrides(mut self, cli: &Cli) -> Self {
        if let Some(model) = &cli.model {
            self.completion.model = model.clone();
        }
        self
    }
}
