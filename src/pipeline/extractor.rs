use crate::completion::client::{Completion, CompletionClient};
use crate::completion::prompts::{PromptType, PromptVariables};
use crate::error::{PipelineError, Stage};
use crate::schema::field_model::FieldSchema;
use crate::schema::parse::parse_field_schema;

/// Turns raw form markup into a value-free `FieldSchema`.
pub struct SchemaExtractor<'c, 'a> {
    client: &'c CompletionClient<'a>,
}

impl<'c, 'a> SchemaExtractor<'c, 'a> {
    pub fn new(client: &'c CompletionClient<'a>) -> Self {
        Self { client }
    }

    pub fn extract(&self, markup: &str) -> Result<FieldSchema, PipelineError> {
        self.extract_with_cost(markup).map(|(schema, _)| schema)
    }

    /// Like `extract`, also returning the completion that produced the schema.
    pub fn extract_with_cost(
        &self,
        markup: &str,
    ) -> Result<(FieldSchema, Completion), PipelineError> {
        let mut variables = PromptVariables::new();
        variables.insert("html_form".into(), markup.to_string());

        let completion = self
            .client
            .complete(PromptType::ExtractFields, &variables, None)?;
        let mut schema = parse_field_schema(&completion.text, Stage::Extraction)?;
        schema.clear_values();

        tracing::info!(
            fields = schema.len(),
            submit = schema.submit.is_some(),
            fingerprint = %schema.fingerprint(),
            "extracted field schema"
        );
        Ok((schema, completion))
    }
}
