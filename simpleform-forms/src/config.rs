//! Form configuration loaded with Figment
//!
//! Sources are merged in precedence order (later sources override earlier
//! ones):
//! 1. Built-in defaults
//! 2. An optional configuration file (TOML, YAML or JSON by extension)
//! 3. Environment variables with the `SIMPLEFORM_` prefix

use std::path::Path;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use simpleform_rules::DEFAULT_CONFIRMATION_SUFFIX;
use tracing::{debug, trace};

use crate::error::Result;

/// Prefix for environment overrides, e.g. `SIMPLEFORM_FORM_SUFFIX`.
pub const ENV_PREFIX: &str = "SIMPLEFORM_";

/// Naming and rendering knobs of the form host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Appended to the model name when a form has no explicit name
    pub form_suffix: String,
    /// Name given to a control with neither a name nor a model path
    pub unnamed_field: String,
    /// Appended to a field name to find its `confirmation` sibling
    pub confirmation_suffix: String,
    /// Prefix of the class emitted for a passing constraint
    pub valid_class_prefix: String,
    /// Prefix of the class emitted for a failing constraint
    pub invalid_class_prefix: String,
    /// Joins constraint names in the `validates` attribute
    pub attribute_separator: String,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            form_suffix: "Form".to_string(),
            unnamed_field: "unnamedInput".to_string(),
            confirmation_suffix: DEFAULT_CONFIRMATION_SUFFIX.to_string(),
            valid_class_prefix: "ng-valid-".to_string(),
            invalid_class_prefix: "ng-invalid-".to_string(),
            attribute_separator: ",".to_string(),
        }
    }
}

impl FormConfig {
    /// Load defaults overridden by `SIMPLEFORM_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::extract(Self::figment())
    }

    /// Load defaults, then `path`, then environment variables.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(file_provider(path))
            .merge(env_provider());
        Self::extract(figment)
    }

    /// The default figment: built-in values and environment overrides.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(env_provider())
    }

    /// Extract a config from any figment.
    pub fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        debug!(?config, "loaded form configuration");
        Ok(config)
    }
}

fn file_provider(path: &Path) -> Figment {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    trace!(path = %path.display(), ?extension, "loading form config file");
    match extension.as_deref() {
        Some("yaml") | Some("yml") => Figment::from(Yaml::file(path)),
        Some("json") => Figment::from(Json::file(path)),
        _ => Figment::from(Toml::file(path)),
    }
}

fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().into())
}
