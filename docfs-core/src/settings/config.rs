use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::restore::SourceDescriptor;
use crate::settings::glob::{GlobConfig, GlobError};

/// Docset configuration as far as file access is concerned.
///
/// Loaded from `docfs.toml`:
///
/// ```toml
/// [dependencies._themes]
/// url = "https://github.com/org/theme"
/// branch = "main"
///
/// [template]
/// url = "https://github.com/org/template"
///
/// [[file_metadata.ms_author]]
/// files = ["docs/**"]
/// value = "docs-team"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Dependency repositories by name. The name is also the docset path
    /// prefix of the dependency's files.
    #[serde(default)]
    pub dependencies: BTreeMap<String, SourceDescriptor>,

    /// The template repository, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<SourceDescriptor>,

    /// Per-file metadata: for each key, entries are tried in order and the
    /// last one that applies to a file provides its value.
    #[serde(default)]
    pub file_metadata: BTreeMap<String, Vec<GlobConfig<toml::Value>>>,
}

impl Config {
    pub const FILE_NAME: &str = "docfs.toml";

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {path:?}"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config from {path:?}"))
    }

    /// Load `docfs.toml` from the docset root, or defaults when there is none.
    pub fn load_from_docset(docset_path: &Path) -> Result<Self> {
        let path = docset_path.join(Self::FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn dependency(&self, name: &str) -> Option<&SourceDescriptor> {
        self.dependencies.get(name)
    }

    /// Metadata values that apply to `file_path`, by key.
    pub fn file_metadata_for(
        &self,
        file_path: &str,
    ) -> Result<BTreeMap<String, toml::Value>, GlobError> {
        let mut values = BTreeMap::new();
        for (key, entries) in &self.file_metadata {
            if let Some(value) = GlobConfig::last_match(entries, file_path)? {
                values.insert(key.clone(), value.clone());
            }
        }
        Ok(values)
    }
}
