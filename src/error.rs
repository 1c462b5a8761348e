use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which language-model stage produced the text being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    Synthesis,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Extraction => write!(f, "extraction"),
            Stage::Synthesis => write!(f, "synthesis"),
        }
    }
}

/// The text-generation call could not be built or failed remotely.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("no API key: environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("failed to build completion request: {0}")]
    Request(String),

    #[error("completion transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed completion envelope: {0}")]
    Envelope(#[source] reqwest::Error),

    #[error("completion response has no choices[0].message.content")]
    EmptyContent,
}

/// The generated text is not a usable field schema.
#[derive(Debug, Error)]
pub enum SchemaParseError {
    #[error("no JSON object or array found in {stage} reply")]
    NoJson { stage: Stage },

    #[error("invalid JSON in {stage} reply: {source}")]
    Json {
        stage: Stage,
        #[source]
        source: serde_json::Error,
    },

    #[error("{stage} reply has no \"fields\" array")]
    MissingFields { stage: Stage },

    #[error("field #{index} in {stage} reply is malformed: {reason}")]
    Field {
        stage: Stage,
        index: usize,
        reason: String,
    },

    #[error("field '{field}' has value '{value}', which is not one of its options")]
    ValueOutOfDomain { field: String, value: String },
}

/// Failures talking to the browser helper process.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to spawn {script} (is Node.js installed?): {source}")]
    Spawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    #[error("browser session I/O: {0}")]
    Io(String),

    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialize error ({context}): {source}")]
    JsonSerialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("browser command '{command}' failed: {error}")]
    Protocol { command: String, error: String },

    #[error("timed out after {timeout_ms}ms waiting for {selector}")]
    Timeout { selector: String, timeout_ms: u64 },
}

/// One field could not be located or manipulated. Never fatal.
#[derive(Debug, Error)]
pub enum FieldFillError {
    #[error("no element matches {selector}")]
    NotFound { selector: String },

    #[error("field has no {0} identifier")]
    MissingIdentifier(&'static str),

    #[error("field has no synthesized value")]
    MissingValue,

    #[error("no upload resource for field '{field}'")]
    UploadUnavailable { field: String, path: Option<PathBuf> },

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// The final submit or consent step failed.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("could not click submit control {selector}: {source}")]
    Submit {
        selector: String,
        #[source]
        source: BrowserError,
    },

    #[error("consent checkbox {selector} did not respond: {source}")]
    Consent {
        selector: String,
        #[source]
        source: BrowserError,
    },
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("cannot read profile {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("profile {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("profile {0} must be a JSON object at the top level")]
    NotAnObject(PathBuf),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config {path} is not valid YAML: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unknown model '{name}' (known: {known})")]
    UnknownModel { name: String, known: String },
}

/// Fatal errors that end a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Schema(#[from] SchemaParseError),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("form markup not found: {0}")]
    FormNotFound(String),
}
