use std::cell::RefCell;

use form_autofill::completion::{
    client::CompletionClient,
    models::{ModelCatalog, TokenUsage},
    prompts::{PromptOverrides, PromptRegistry, PromptTemplate, PromptType, PromptVariables, substitute},
    transport::{ChatChoice, ChatRequest, ChatResponse, ChatTransport, ChoiceMessage, ScriptedTransport},
};
use form_autofill::error::{CompletionError, ConfigError};

fn vars(pairs: &[(&str, &str)]) -> PromptVariables {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Transport that answers every request with fixed content and usage.
struct MeteredTransport {
    content: Option<String>,
    usage: TokenUsage,
    seen: RefCell<Vec<ChatRequest>>,
}

impl MeteredTransport {
    fn new(content: Option<&str>, prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            content: content.map(str::to_string),
            usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl ChatTransport for MeteredTransport {
    fn send(&self, request: &ChatRequest) -> Result<ChatResponse, CompletionError> {
        self.seen.borrow_mut().push(request.clone());
        Ok(ChatResponse {
            choices: vec![ChatChoice {
                message: ChoiceMessage {
                    content: self.content.clone(),
                },
            }],
            usage: Some(self.usage),
        })
    }
}

// =========================================================================
// Placeholder substitution
// =========================================================================

#[test]
fn substitute_replaces_known_tokens() {
    let out = substitute("Hello {name}, form: {html_form}", &vars(&[("name", "Ada"), ("html_form", "<form/>")]));
    assert_eq!(out, "Hello Ada, form: <form/>");
}

#[test]
fn substitute_never_rescans_inserted_text() {
    let out = substitute(
        "{html_form} / {user_meta_data}",
        &vars(&[("html_form", "{user_meta_data}"), ("user_meta_data", "PROFILE")]),
    );
    assert_eq!(out, "{user_meta_data} / PROFILE");
}

#[test]
fn substitute_keeps_unknown_tokens_and_stray_braces() {
    let out = substitute("{unknown} {\"a\": 1} {x", &vars(&[("x", "y")]));
    assert_eq!(out, "{unknown} {\"a\": 1} {x");
}

#[test]
fn builtin_templates_reference_their_variables() {
    let registry = PromptRegistry::builtin();
    assert!(registry.template(PromptType::ExtractFields).user.contains("{html_form}"));
    let synth = &registry.template(PromptType::SynthesizeValues).user;
    assert!(synth.contains("{input_fields}"));
    assert!(synth.contains("{user_meta_data}"));
}

#[test]
fn overrides_replace_only_the_named_template() {
    let overrides = PromptOverrides {
        extract_fields: Some(PromptTemplate::new("sys", "markup: {html_form}")),
        synthesize_values: None,
    };
    let registry = PromptRegistry::with_overrides(&overrides);
    assert_eq!(registry.template(PromptType::ExtractFields).system, "sys");
    assert_eq!(
        registry.template(PromptType::SynthesizeValues),
        PromptRegistry::builtin().template(PromptType::SynthesizeValues)
    );
}

// =========================================================================
// Models
// =========================================================================

#[test]
fn catalog_defaults_to_mini() {
    let catalog = ModelCatalog::builtin();
    assert_eq!(catalog.default_model().name, "gpt-4o-mini");
    assert_eq!(catalog.names().len(), 3);
}

#[test]
fn catalog_rejects_unknown_default() {
    let err = ModelCatalog::builtin().with_default("gpt-2").unwrap_err();
    match err {
        ConfigError::UnknownModel { name, known } => {
            assert_eq!(name, "gpt-2");
            assert!(known.contains("gpt-4o"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn cost_is_priced_per_million_tokens() {
    let catalog = ModelCatalog::builtin();
    let model = catalog.get("gpt-4o").unwrap();
    let usage = TokenUsage {
        prompt_tokens: 1_000_000,
        completion_tokens: 100_000,
        total_tokens: 1_100_000,
    };
    assert!((model.cost_usd(&usage) - 6.5).abs() < 1e-9);
}

// =========================================================================
// Client
// =========================================================================

#[test]
fn request_carries_system_and_user_messages() {
    let prompts = PromptRegistry::builtin();
    let models = ModelCatalog::builtin();
    let transport = ScriptedTransport::new([r#"{"fields": []}"#]);
    let client = CompletionClient::new(Box::new(&transport), &prompts, &models);

    let completion = client
        .complete(PromptType::ExtractFields, &vars(&[("html_form", "<form id='f'/>")]), None)
        .unwrap();
    assert_eq!(completion.text, r#"{"fields": []}"#);
    assert_eq!(completion.model, "gpt-4o-mini");
    assert_eq!(completion.cost_usd, None);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let body = serde_json::to_value(&requests[0]).unwrap();
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["temperature"], 0.5);
    assert_eq!(body["response_format"]["type"], "json_object");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
    assert!(body["messages"][1]["content"].as_str().unwrap().contains("<form id='f'/>"));
}

#[test]
fn image_url_adds_a_high_detail_image_part() {
    let prompts = PromptRegistry::builtin();
    let models = ModelCatalog::builtin();
    let transport = ScriptedTransport::new(["{}"]);
    let client = CompletionClient::new(Box::new(&transport), &prompts, &models);

    client
        .complete(
            PromptType::ExtractFields,
            &vars(&[("html_form", "<form/>")]),
            Some("https://example.com/shot.png"),
        )
        .unwrap();

    let body = serde_json::to_value(&transport.requests()[0]).unwrap();
    let parts = body["messages"][1]["content"].as_array().unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0]["type"], "text");
    assert_eq!(parts[1]["type"], "image_url");
    assert_eq!(parts[1]["image_url"]["url"], "https://example.com/shot.png");
    assert_eq!(parts[1]["image_url"]["detail"], "high");
}

#[test]
fn explicit_model_is_used_and_priced() {
    let prompts = PromptRegistry::builtin();
    let models = ModelCatalog::builtin();
    let transport = MeteredTransport::new(Some("{}"), 2_000, 1_000);
    let client = CompletionClient::new(Box::new(&transport), &prompts, &models);

    let model = models.get("gpt-4o").unwrap();
    let completion = client
        .complete_with_model(PromptType::SynthesizeValues, &PromptVariables::new(), None, model)
        .unwrap();

    assert_eq!(completion.model, "gpt-4o");
    assert_eq!(transport.seen.borrow()[0].model, "gpt-4o");
    // 2000 * 5 / 1e6 + 1000 * 15 / 1e6
    let cost = completion.cost_usd.unwrap();
    assert!((cost - 0.025).abs() < 1e-9);
}

#[test]
fn configured_default_model_is_used() {
    let prompts = PromptRegistry::builtin();
    let models = ModelCatalog::builtin().with_default("gpt-4o").unwrap();
    let transport = ScriptedTransport::new(["{}"]);
    let client = CompletionClient::new(Box::new(&transport), &prompts, &models).with_temperature(0.0);

    client
        .complete(PromptType::ExtractFields, &PromptVariables::new(), None)
        .unwrap();
    let request = &transport.requests()[0];
    assert_eq!(request.model, "gpt-4o");
    assert_eq!(request.temperature, 0.0);
}

#[test]
fn blank_content_is_an_error() {
    let prompts = PromptRegistry::builtin();
    let models = ModelCatalog::builtin();
    for content in [None, Some("   ")] {
        let transport = MeteredTransport::new(content, 10, 0);
        let client = CompletionClient::new(Box::new(&transport), &prompts, &models);
        let err = client
            .complete(PromptType::ExtractFields, &PromptVariables::new(), None)
            .unwrap_err();
        assert!(matches!(err, CompletionError::EmptyContent));
    }
}

#[test]
fn scripted_transport_reports_exhaustion() {
    let prompts = PromptRegistry::builtin();
    let models = ModelCatalog::builtin();
    let transport = ScriptedTransport::new(["{}"]);
    let client = CompletionClient::new(Box::new(&transport), &prompts, &models);

    client
        .complete(PromptType::ExtractFields, &PromptVariables::new(), None)
        .unwrap();
    let err = client
        .complete(PromptType::ExtractFields, &PromptVariables::new(), None)
        .unwrap_err();
    assert!(matches!(
        err,
        CompletionError::Request(ref msg) if msg.contains("no reply left (served 1)")
    ));
    assert_eq!(transport.remaining(), 0);
}

#[test]
fn chat_response_parses_openai_envelope() {
    let response: ChatResponse = serde_json::from_str(
        r#"{
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"fields\": []}"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#,
    )
    .unwrap();
    assert_eq!(response.first_content(), Some(r#"{"fields": []}"#));
    assert_eq!(response.usage.unwrap().total_tokens, 15);
}
