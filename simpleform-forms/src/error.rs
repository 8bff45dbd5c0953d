//! Error types for the form host

use std::path::PathBuf;

use simpleform_rules::RulesError;
use thiserror::Error;

/// Result type for form operations
pub type Result<T> = std::result::Result<T, FormError>;

/// Errors that can occur while loading schemas or driving a form
#[derive(Debug, Error)]
pub enum FormError {
    /// A control tried to register under a name the form reserves
    #[error("{name} is not a valid field name")]
    ReservedName { name: String },

    /// A value arrived for a control the form does not hold
    #[error("field not found: {name}")]
    UnknownField { name: String },

    /// The model schema document is missing a model name
    #[error("model schema has no model name")]
    MissingModel,

    /// Error from the rule compiler
    #[error(transparent)]
    Rules(#[from] RulesError),

    /// Configuration could not be extracted
    #[error("failed to load configuration: {source}")]
    Config {
        #[from]
        source: figment::Error,
    },

    /// Schema file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
