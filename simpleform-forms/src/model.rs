//! Model schema documents
//!
//! A model schema names a model and declares the rules of each of its
//! attributes:
//!
//! ```yaml
//! model: user
//! validates:
//!   name: { presence: true }
//!   email: { presence: true, format: { email: true } }
//! ```
//!
//! Rules stay as raw values until a form decodes them against its registry,
//! so named predicates registered by the host resolve at field registration.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use simpleform_rules::{FieldSchema, ValidatorRegistry};

use crate::error::{FormError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub validates: IndexMap<String, Value>,
}

impl ModelSchema {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            validates: IndexMap::new(),
        }
    }

    /// Declare the raw rules of one attribute.
    pub fn with_rules(mut self, attribute: impl Into<String>, rules: Value) -> Self {
        self.validates.insert(attribute.into(), rules);
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let schema: Self = serde_yaml::from_str(yaml)?;
        schema.checked()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let schema: Self = serde_json::from_str(json)?;
        schema.checked()
    }

    /// Read a schema document, choosing the format by extension.
    /// Anything other than `.json` is read as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| FormError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded model schema");
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    /// Raw rules declared for `attribute`.
    pub fn rules(&self, attribute: &str) -> Option<&Value> {
        self.validates.get(attribute)
    }

    /// Attributes with declared rules, in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.validates.keys().map(String::as_str)
    }

    /// Decode the rules of `attribute`. An attribute without rules gets an
    /// empty schema.
    pub fn field_schema(&self, attribute: &str, registry: &ValidatorRegistry) -> Result<FieldSchema> {
        match self.rules(attribute) {
            Some(raw) => Ok(FieldSchema::from_value(raw, registry)?),
            None => Ok(FieldSchema::new()),
        }
    }

    fn checked(self) -> Result<Self> {
        if self.model.trim().is_empty() {
            return Err(FormError::MissingModel);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use simpleform_rules::RulesError;

    const USER: &str = r#"
model: user
validates:
  name: { presence: true }
  email:
    presence: true
    format: { email: true }
  termsOfService: { acceptance: true }
"#;

    #[test]
    fn test_yaml_document_keeps_attribute_order() {
        let schema = ModelSchema::from_yaml_str(USER).unwrap();
        assert_eq!(schema.model, "user");
        assert_eq!(
            schema.attributes().collect::<Vec<_>>(),
            vec!["name", "email", "termsOfService"]
        );
        assert_eq!(
            schema.rules("email"),
            Some(&json!({"presence": true, "format": {"email": true}}))
        );
    }

    #[test]
    fn test_json_document() {
        let schema =
            ModelSchema::from_json_str(r#"{"model": "shirt", "validates": {"size": {"inclusion": {"in": ["S", "M"]}}}}"#)
                .unwrap();
        let field = schema
            .field_schema("size", &ValidatorRegistry::builtin())
            .unwrap();
        assert_eq!(field.kinds().collect::<Vec<_>>(), vec!["inclusion"]);
    }

    #[test]
    fn test_missing_model_name_is_rejected() {
        let err = ModelSchema::from_yaml_str("validates: {}\n").unwrap_err();
        assert!(matches!(err, FormError::MissingModel));
    }

    #[test]
    fn test_attribute_without_rules_gets_empty_schema() {
        let schema = ModelSchema::new("user");
        let field = schema
            .field_schema("nickname", &ValidatorRegistry::builtin())
            .unwrap();
        assert!(field.is_empty());
    }

    #[test]
    fn test_non_mapping_rules_surface_as_rules_error() {
        let schema = ModelSchema::new("user").with_rules("name", json!(true));
        let err = schema
            .field_schema("name", &ValidatorRegistry::builtin())
            .unwrap_err();
        assert!(matches!(
            err,
            FormError::Rules(RulesError::SchemaNotMapping { found: "boolean" })
        ));
    }

    #[test]
    fn test_from_path_reads_by_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        let yaml = dir.path().join("user.yaml");
        std::fs::write(&yaml, USER).unwrap();
        assert_eq!(ModelSchema::from_path(&yaml).unwrap().model, "user");

        let json = dir.path().join("user.json");
        std::fs::write(&json, r#"{"model": "user"}"#).unwrap();
        assert!(ModelSchema::from_path(&json).unwrap().validates.is_empty());

        let err = ModelSchema::from_path(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, FormError::Read { .. }));
    }
}
