use crate::completion::models::{ModelCatalog, ModelSpec, TokenUsage};
use crate::completion::prompts::{PromptRegistry, PromptType, PromptVariables};
use crate::completion::transport::{
    ChatMessage, ChatRequest, ChatTransport, ContentPart, ImageRef, MessageContent, ResponseFormat,
};
use crate::error::CompletionError;

pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Text returned by one completion call, with accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
    pub cost_usd: Option<f64>,
}

/// Wraps one request/response cycle against a text-generation service.
///
/// Registries are borrowed: they are built once at startup and never mutated.
pub struct CompletionClient<'a> {
    transport: Box<dyn ChatTransport + 'a>,
    prompts: &'a PromptRegistry,
    models: &'a ModelCatalog,
    temperature: f32,
}

impl<'a> CompletionClient<'a> {
    pub fn new(
        transport: Box<dyn ChatTransport + 'a>,
        prompts: &'a PromptRegistry,
        models: &'a ModelCatalog,
    ) -> Self {
        Self {
            transport,
            prompts,
            models,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn models(&self) -> &ModelCatalog {
        self.models
    }

    /// Build the chat request for a prompt without sending it.
    pub fn build_request(
        &self,
        prompt: PromptType,
        variables: &PromptVariables,
        image_url: Option<&str>,
        model: &ModelSpec,
    ) -> ChatRequest {
        let template = self.prompts.template(prompt);
        let user_text = template.render_user(variables);

        let user_content = match image_url {
            None => MessageContent::Text(user_text),
            Some(url) => MessageContent::Parts(vec![
                ContentPart::Text { text: user_text },
                ContentPart::ImageUrl {
                    image_url: ImageRef {
                        url: url.to_string(),
                        detail: "high".into(),
                    },
                },
            ]),
        };

        ChatRequest {
            model: model.name.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: MessageContent::Text(template.system.clone()),
                },
                ChatMessage {
                    role: "user".into(),
                    content: user_content,
                },
            ],
            response_format: ResponseFormat::json_object(),
            temperature: self.temperature,
        }
    }

    /// Run a prompt against the catalog's default model.
    pub fn complete(
        &self,
        prompt: PromptType,
        variables: &PromptVariables,
        image_url: Option<&str>,
    ) -> Result<Completion, CompletionError> {
        self.complete_with_model(prompt, variables, image_url, self.models.default_model())
    }

    /// Run a prompt against an explicitly chosen model.
    ///
    /// The returned text is unvalidated model output.
    pub fn complete_with_model(
        &self,
        prompt: PromptType,
        variables: &PromptVariables,
        image_url: Option<&str>,
        model: &ModelSpec,
    ) -> Result<Completion, CompletionError> {
        let request = self.build_request(prompt, variables, image_url, model);
        tracing::debug!(prompt = prompt.as_str(), model = %model.name, "sending completion request");

        let response = self.transport.send(&request)?;
        let text = response
            .first_content()
            .filter(|t| !t.trim().is_empty())
            .ok_or(CompletionError::EmptyContent)?
            .to_string();

        let cost_usd = response.usage.as_ref().map(|u| model.cost_usd(u));
        if let (Some(usage), Some(cost)) = (response.usage.as_ref(), cost_usd) {
            tracing::info!(
                prompt = prompt.as_str(),
                model = %model.name,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                cost_usd = cost,
                "completion finished"
            );
        }

        Ok(Completion {
            text,
            model: model.name.clone(),
            usage: response.usage,
            cost_usd,
        })
    }
}
