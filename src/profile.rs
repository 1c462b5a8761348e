use std::path::Path;

use serde_json::{Map, Value};

use crate::error::ProfileError;

/// User facts consumed by the synthesis stage. Open schema, read-only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    data: Map<String, Value>,
}

impl UserProfile {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// Build from any JSON value; the top level must be an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(data) => Some(Self { data }),
            _ => None,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let content = std::fs::read_to_string(path).map_err(|source| ProfileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|source| ProfileError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_value(value).ok_or_else(|| ProfileError::NotAnObject(path.to_path_buf()))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Compact JSON for the synthesis prompt.
    pub fn to_prompt_json(&self) -> String {
        Value::Object(self.data.clone()).to_string()
    }
}
