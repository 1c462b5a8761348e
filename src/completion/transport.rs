use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::completion::models::TokenUsage;
use crate::error::CompletionError;

// ============================================================================
// Wire types (OpenAI-compatible chat completions)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub response_format: ResponseFormat,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageRef },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRef {
    pub url: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            format_type: "json_object".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Content of the first choice, if any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first()?.message.content.as_deref()
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            choices: vec![ChatChoice {
                message: ChoiceMessage {
                    content: Some(text.to_string()),
                },
            }],
            usage: None,
        }
    }
}

// ============================================================================
// Transport seam
// ============================================================================

/// One request/response exchange with a chat completion service.
pub trait ChatTransport {
    fn send(&self, request: &ChatRequest) -> Result<ChatResponse, CompletionError>;
}

/// Blocking HTTP transport with bearer authentication.
pub struct HttpTransport {
    endpoint: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

impl HttpTransport {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self, CompletionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    /// Read the API key from the named environment variable.
    pub fn from_env(endpoint: &str, api_key_env: &str, timeout: Duration) -> Result<Self, CompletionError> {
        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CompletionError::MissingApiKey(api_key_env.to_string()))?;
        Self::new(endpoint, &api_key, timeout)
    }
}

impl ChatTransport for HttpTransport {
    fn send(&self, request: &ChatRequest) -> Result<ChatResponse, CompletionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: response.text()?,
            });
        }

        response.json().map_err(CompletionError::Envelope)
    }
}

/// Replays canned replies in order and records every request.
///
/// Used by tests and by the offline `plan --replay` command.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: RefCell<VecDeque<String>>,
    requests: RefCell<Vec<ChatRequest>>,
    served: Cell<usize>,
}

impl ScriptedTransport {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: RefCell::new(replies.into_iter().map(Into::into).collect()),
            requests: RefCell::new(Vec::new()),
            served: Cell::new(0),
        }
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl ChatTransport for ScriptedTransport {
    fn send(&self, request: &ChatRequest) -> Result<ChatResponse, CompletionError> {
        self.requests.borrow_mut().push(request.clone());
        let reply = self
            .replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| {
                CompletionError::Request(format!(
                    "scripted transport has no reply left (served {})",
                    self.served.get()
                ))
            })?;
        self.served.set(self.served.get() + 1);
        Ok(ChatResponse::from_text(&reply))
    }
}

impl<T: ChatTransport + ?Sized> ChatTransport for &T {
    fn send(&self, request: &ChatRequest) -> Result<ChatResponse, CompletionError> {
        (**self).send(request)
    }
}
