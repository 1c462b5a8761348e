use crate::completion::client::{Completion, CompletionClient};
use crate::completion::prompts::{PromptType, PromptVariables};
use crate::error::{CompletionError, PipelineError, Stage};
use crate::profile::UserProfile;
use crate::schema::field_model::FieldSchema;
use crate::schema::parse::parse_field_schema;

/// Fills an extracted schema with values derived from a user profile.
pub struct ValueSynthesizer<'c, 'a> {
    client: &'c CompletionClient<'a>,
}

impl<'c, 'a> ValueSynthesizer<'c, 'a> {
    pub fn new(client: &'c CompletionClient<'a>) -> Self {
        Self { client }
    }

    pub fn synthesize(
        &self,
        schema: &FieldSchema,
        profile: &UserProfile,
    ) -> Result<FieldSchema, PipelineError> {
        self.synthesize_with_cost(schema, profile)
            .map(|(schema, _)| schema)
    }

    /// The returned schema always has the input's structure; only values
    /// are taken from the reply.
    pub fn synthesize_with_cost(
        &self,
        schema: &FieldSchema,
        profile: &UserProfile,
    ) -> Result<(FieldSchema, Completion), PipelineError> {
        let fields_json = schema.to_prompt_json().map_err(|e| {
            CompletionError::Request(format!("cannot serialize field schema: {}", e))
        })?;
        let mut variables = PromptVariables::new();
        variables.insert("input_fields".into(), fields_json);
        variables.insert("user_meta_data".into(), profile.to_prompt_json());

        let completion = self
            .client
            .complete(PromptType::SynthesizeValues, &variables, None)?;
        let reply = parse_field_schema(&completion.text, Stage::Synthesis)?;

        let mut filled = schema.clone();
        let applied = filled.apply_values(&reply);
        tracing::info!(
            applied,
            fields = filled.len(),
            "synthesized field values"
        );
        Ok((filled, completion))
    }
}
