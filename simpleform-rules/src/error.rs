//! Error types for the rule compiler

use thiserror::Error;

/// Result type for rule compiler operations
pub type Result<T> = std::result::Result<T, RulesError>;

/// Errors that can occur while decoding, compiling or evaluating rules.
///
/// Decoding errors never abort a whole field: the normalizer logs them and
/// drops the offending constraint. Predicate errors never escape the engine:
/// the failing constraint is recorded as invalid.
#[derive(Debug, Error)]
pub enum RulesError {
    /// The spec for a constraint kind has a shape no decoder recognizes
    #[error("unrecognized spec for constraint '{kind}': {reason}")]
    UnrecognizedShape { kind: String, reason: String },

    /// A `regex` or `ignore` pattern failed to compile
    #[error("invalid pattern for constraint '{kind}': {source}")]
    InvalidPattern {
        kind: String,
        #[source]
        source: regex::Error,
    },

    /// A `[predicate, message]` pair named a predicate the registry does not hold
    #[error("unknown predicate '{name}' for constraint '{kind}'")]
    UnknownPredicate { kind: String, name: String },

    /// A field schema document was not a mapping
    #[error("field schema must be a mapping, got {found}")]
    SchemaNotMapping { found: &'static str },

    /// A predicate reported a failure instead of a verdict
    #[error("predicate for constraint '{kind}' failed: {message}")]
    PredicateFailed { kind: String, message: String },

    /// A value change arrived for a field the engine never compiled
    #[error("field not registered: {name}")]
    FieldNotRegistered { name: String },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl RulesError {
    /// Shorthand used by predicates that need to bail out with a reason.
    pub fn predicate_failed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PredicateFailed {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub(crate) fn unrecognized(kind: &str, reason: impl Into<String>) -> Self {
        Self::UnrecognizedShape {
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }
}
