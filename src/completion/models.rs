use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A hosted model and its per-million-token prices in USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub input_cost_per_million: f64,
    pub output_cost_per_million: f64,
}

impl ModelSpec {
    pub fn new(name: &str, input_cost_per_million: f64, output_cost_per_million: f64) -> Self {
        Self {
            name: name.to_string(),
            input_cost_per_million,
            output_cost_per_million,
        }
    }

    pub fn cost_usd(&self, usage: &TokenUsage) -> f64 {
        usage.prompt_tokens as f64 * self.input_cost_per_million / 1_000_000.0
            + usage.completion_tokens as f64 * self.output_cost_per_million / 1_000_000.0
    }
}

/// Token counters reported by the completion service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Fixed catalog of selectable models with one default.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCatalog {
    models: Vec<ModelSpec>,
    default_index: usize,
}

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelCatalog {
    pub fn builtin() -> Self {
        let models = vec![
            ModelSpec::new("gpt-4o", 5.0, 15.0),
            ModelSpec::new("gpt-4o-mini", 0.15, 0.6),
            ModelSpec::new("gpt-4o-mini-realtime-preview", 0.60, 2.4),
        ];
        let default_index = models
            .iter()
            .position(|m| m.name == DEFAULT_MODEL)
            .unwrap_or(0);
        Self {
            models,
            default_index,
        }
    }

    /// Same catalog with a different default, chosen by name.
    pub fn with_default(mut self, name: &str) -> Result<Self, ConfigError> {
        let index = self
            .models
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| ConfigError::UnknownModel {
                name: name.to_string(),
                known: self.names().join(", "),
            })?;
        self.default_index = index;
        Ok(self)
    }

    pub fn default_model(&self) -> &ModelSpec {
        &self.models[self.default_index]
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }
}
