use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::FieldFillError;
use crate::schema::field_model::Field;

/// Chooses the local file to attach to a file field.
pub trait UploadResolver {
    fn resolve(&self, field: &Field) -> Result<PathBuf, FieldFillError>;
}

/// `uploads:` section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Used when no keyword matches.
    #[serde(default)]
    pub default: Option<PathBuf>,

    /// Keyword (matched against label, ui-tag and name) -> file.
    #[serde(default)]
    pub by_keyword: BTreeMap<String, PathBuf>,

    /// Fail the field when the resolved file does not exist.
    #[serde(default)]
    pub require_exists: bool,
}

/// Keyword table with a fallback path.
#[derive(Debug, Clone, Default)]
pub struct StaticUploads {
    default: Option<PathBuf>,
    by_keyword: Vec<(String, PathBuf)>,
    require_exists: bool,
}

impl StaticUploads {
    pub fn new(default: Option<PathBuf>) -> Self {
        Self {
            default,
            by_keyword: Vec::new(),
            require_exists: false,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            default: config.default.clone(),
            by_keyword: config
                .by_keyword
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.clone()))
                .collect(),
            require_exists: config.require_exists,
        }
    }

    pub fn with_keyword(mut self, keyword: &str, path: impl Into<PathBuf>) -> Self {
        self.by_keyword.push((keyword.to_lowercase(), path.into()));
        self
    }

    pub fn requiring_existing_files(mut self) -> Self {
        self.require_exists = true;
        self
    }
}

impl UploadResolver for StaticUploads {
    fn resolve(&self, field: &Field) -> Result<PathBuf, FieldFillError> {
        let haystack = [
            field.label.as_deref(),
            field.identifiers.ui_tag.as_deref(),
            field.identifiers.name.as_deref(),
        ]
        .iter()
        .flatten()
        .map(|s| s.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

        let path = self
            .by_keyword
            .iter()
            .find(|(keyword, _)| haystack.contains(keyword.as_str()))
            .map(|(_, path)| path.clone())
            .or_else(|| self.default.clone())
            .ok_or_else(|| FieldFillError::UploadUnavailable {
                field: field.display_name(),
                path: None,
            })?;

        if self.require_exists && !path.exists() {
            return Err(FieldFillError::UploadUnavailable {
                field: field.display_name(),
                path: Some(path),
            });
        }
        Ok(path)
    }
}
