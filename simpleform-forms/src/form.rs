//! The host form
//!
//! A [`Form`] binds controls to model attributes, commits their values and
//! drives the validity engine. It owns everything the rule compiler leaves
//! to its host: naming defaults, the committed value map, the record
//! collections, dependent re-evaluation and the rendered attribute and
//! class strings.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value;
use simpleform_rules::{
    FieldPath, FieldSchema, FieldValidityState, FormContext, ValidatorRegistry, ValidityEngine,
};
use tracing::{debug, trace};

use crate::config::FormConfig;
use crate::error::{FormError, Result};
use crate::model::ModelSchema;

/// A control name no field may take.
pub const RESERVED_NAME: &str = "hasOwnProperty";

/// How a control attaches to the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldBinding {
    /// Model path the control edits, e.g. `user.name`
    pub model_path: Option<String>,
    /// Explicit control name
    pub name: Option<String>,
}

impl FieldBinding {
    /// Bind to a model path; the control takes the path as its name.
    pub fn model(path: impl Into<String>) -> Self {
        Self {
            model_path: Some(path.into()),
            name: None,
        }
    }

    /// Override the control name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Explicit name, else model path, else the configured default.
    pub fn control_name(&self, config: &FormConfig) -> String {
        [self.name.as_deref(), self.model_path.as_deref()]
            .into_iter()
            .flatten()
            .find(|n| !n.is_empty())
            .unwrap_or(config.unnamed_field.as_str())
            .to_string()
    }
}

/// Committed values keyed by field path, plus record collections by model.
#[derive(Debug, Default)]
struct FormState {
    values: HashMap<String, Value>,
    records: HashMap<String, Vec<Value>>,
}

impl FormContext for FormState {
    fn field_value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    fn records(&self, model: &str) -> &[Value] {
        self.records.get(model).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub struct Form {
    name: String,
    model: ModelSchema,
    config: FormConfig,
    engine: ValidityEngine,
    fields: IndexMap<String, FieldPath>,
    state: FormState,
}

impl Form {
    /// A form with default configuration and the built-in validators.
    pub fn new(model: ModelSchema) -> Self {
        Self::with_config(model, FormConfig::default())
    }

    /// The built-in validators, with confirmation following
    /// `config.confirmation_suffix`.
    pub fn with_config(model: ModelSchema, config: FormConfig) -> Self {
        let registry = ValidatorRegistry::builtin().with_confirmation_suffix(&config.confirmation_suffix);
        Self::with_registry(model, config, registry)
    }

    /// A form whose rules resolve against a host-supplied registry.
    pub fn with_registry(model: ModelSchema, config: FormConfig, registry: ValidatorRegistry) -> Self {
        let name = if model.model.is_empty() {
            String::new()
        } else {
            format!("{}{}", model.model, config.form_suffix)
        };
        debug!(form = %name, model = %model.model, "created form");
        Self {
            name,
            model,
            config,
            engine: ValidityEngine::new(registry),
            fields: IndexMap::new(),
            state: FormState::default(),
        }
    }

    /// Replace the default name: `<model>Form`, or empty for an unnamed
    /// model.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &ModelSchema {
        &self.model
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    /// Register a control with the rules its model declares for it.
    /// Returns the control name.
    pub fn add_field(&mut self, binding: FieldBinding) -> Result<String> {
        let path = self.path_for(&binding);
        let schema = self
            .model
            .field_schema(path.attribute(), self.engine.registry())?;
        self.insert_field(binding, path, &schema)
    }

    /// Register a control with an explicit schema, ignoring the model's
    /// declaration. Use this for rules built in code.
    pub fn add_field_with(&mut self, binding: FieldBinding, schema: &FieldSchema) -> Result<String> {
        let path = self.path_for(&binding);
        self.insert_field(binding, path, schema)
    }

    fn path_for(&self, binding: &FieldBinding) -> FieldPath {
        match &binding.model_path {
            Some(model_path) => FieldPath::parse(model_path),
            None => FieldPath::new(None, binding.control_name(&self.config)),
        }
    }

    fn insert_field(&mut self, binding: FieldBinding, path: FieldPath, schema: &FieldSchema) -> Result<String> {
        let name = binding.control_name(&self.config);
        if name == RESERVED_NAME {
            return Err(FormError::ReservedName { name });
        }
        debug!(form = %self.name, field = %name, path = %path, "registering field");
        self.engine.register(name.clone(), path.clone(), schema);
        self.fields.insert(name.clone(), path);
        Ok(name)
    }

    /// Commit a value, evaluate the field, then re-evaluate every field
    /// whose confirmation depends on it.
    pub fn set_value(&mut self, name: &str, value: Value) -> Result<&FieldValidityState> {
        let key = self.committed_key(name)?;
        trace!(form = %self.name, field = %name, ?value, "committing value");
        self.state.values.insert(key.clone(), value.clone());
        self.engine.on_value_change(name, &value, &self.state)?;

        for dependent in self.dependents_of(name, &key) {
            let Some(current) = self.value(&dependent).cloned() else {
                continue;
            };
            debug!(field = %dependent, changed = %name, "re-evaluating dependent field");
            self.engine.on_value_change(&dependent, &current, &self.state)?;
        }

        self.engine
            .state(name)
            .ok_or_else(|| FormError::UnknownField { name: name.to_string() })
    }

    fn committed_key(&self, name: &str) -> Result<String> {
        self.fields
            .get(name)
            .map(FieldPath::to_string)
            .ok_or_else(|| FormError::UnknownField { name: name.to_string() })
    }

    /// Fields with a confirmation constraint pointing at `key` that already
    /// hold a committed value.
    fn dependents_of(&self, name: &str, key: &str) -> Vec<String> {
        let suffix = self.engine.registry().confirmation_suffix();
        self.fields
            .iter()
            .filter(|(other, _)| other.as_str() != name)
            .filter(|(_, path)| path.confirmation_name(suffix) == key)
            .filter(|(_, path)| self.state.values.contains_key(&path.to_string()))
            .filter(|(other, _)| {
                self.engine
                    .compiled(other)
                    .is_some_and(|c| c.has_constraint("confirmation"))
            })
            .map(|(other, _)| other.clone())
            .collect()
    }

    /// Replace the records `uniqueness` checks against. Takes effect on the
    /// next evaluation.
    pub fn set_records(&mut self, model: impl Into<String>, records: Vec<Value>) {
        self.state.records.insert(model.into(), records);
    }

    /// Last committed value of a control.
    pub fn value(&self, name: &str) -> Option<&Value> {
        let path = self.fields.get(name)?;
        self.state.values.get(&path.to_string())
    }

    pub fn validity(&self, name: &str) -> Option<&FieldValidityState> {
        self.engine.state(name)
    }

    /// `None` until the field has been evaluated once.
    pub fn is_valid(&self, name: &str) -> Option<bool> {
        self.engine.is_valid(name)
    }

    /// Every evaluated field is valid. Fields never touched do not count.
    pub fn is_form_valid(&self) -> bool {
        self.fields
            .keys()
            .filter_map(|name| self.engine.is_valid(name))
            .all(|valid| valid)
    }

    /// Constraint names joined for the control's `validates` attribute.
    pub fn validates_attribute(&self, name: &str) -> Option<String> {
        self.engine
            .constraint_names(name)
            .map(|names| names.join(self.config.attribute_separator.as_str()))
    }

    /// One state class per constraint, e.g. `ng-valid-zip`. Empty before
    /// the first evaluation.
    pub fn state_classes(&self, name: &str) -> Vec<String> {
        let Some(state) = self.engine.state(name) else {
            return Vec::new();
        };
        state
            .iter()
            .map(|(kind, valid)| {
                let prefix = if valid {
                    &self.config.valid_class_prefix
                } else {
                    &self.config.invalid_class_prefix
                };
                format!("{prefix}{kind}")
            })
            .collect()
    }

    /// Rules the model declares for the control's attribute, as written.
    pub fn declared_rules(&self, name: &str) -> Option<&Value> {
        let path = self.fields.get(name)?;
        self.model.rules(path.attribute())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Control names in registration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("name", &self.name)
            .field("model", &self.model.model)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use simpleform_rules::ConstraintSpec;

    fn user_form() -> Form {
        let model = ModelSchema::new("user")
            .with_rules("password", json!({"confirmation": true}))
            .with_rules("passwordConfirmation", json!({"presence": true}));
        let mut form = Form::new(model);
        form.add_field(FieldBinding::model("user.password")).unwrap();
        form.add_field(FieldBinding::model("user.passwordConfirmation"))
            .unwrap();
        form
    }

    #[test]
    fn test_control_name_defaults() {
        let config = FormConfig::default();
        assert_eq!(FieldBinding::model("user.name").control_name(&config), "user.name");
        assert_eq!(
            FieldBinding::model("user.name").named("username").control_name(&config),
            "username"
        );
        assert_eq!(FieldBinding::default().control_name(&config), "unnamedInput");
    }

    #[test]
    fn test_unnamed_model_gives_unnamed_form() {
        assert_eq!(Form::new(ModelSchema::new("")).name(), "");
        assert_eq!(Form::new(ModelSchema::new("user")).name(), "userForm");
    }

    #[test]
    fn test_reserved_name_is_rejected() {
        let mut form = Form::new(ModelSchema::new("user"));
        let err = form
            .add_field(FieldBinding::model("user.x").named("hasOwnProperty"))
            .unwrap_err();
        assert!(matches!(err, FormError::ReservedName { .. }));
        assert!(!form.contains("hasOwnProperty"));
    }

    #[test]
    fn test_unknown_field_value_is_an_error() {
        let mut form = Form::new(ModelSchema::new("user"));
        let err = form.set_value("user.ghost", json!("boo")).unwrap_err();
        assert!(matches!(err, FormError::UnknownField { .. }));
    }

    #[test]
    fn test_dependents_only_once_they_hold_a_value() {
        let mut form = user_form();
        assert!(form.dependents_of("user.passwordConfirmation", "user.passwordConfirmation").is_empty());

        form.set_value("user.password", json!("secret")).unwrap();
        assert_eq!(
            form.dependents_of("user.passwordConfirmation", "user.passwordConfirmation"),
            vec!["user.password".to_string()]
        );
    }

    #[test]
    fn test_confirmation_follows_sibling_change() {
        let mut form = user_form();
        assert!(!form.set_value("user.password", json!("secret")).unwrap().is_valid());

        form.set_value("user.passwordConfirmation", json!("secret"))
            .unwrap();
        assert_eq!(form.is_valid("user.password"), Some(true));

        form.set_value("user.passwordConfirmation", json!("other"))
            .unwrap();
        assert_eq!(form.is_valid("user.password"), Some(false));
    }

    #[test]
    fn test_values_are_keyed_by_model_path() {
        let mut form = Form::new(ModelSchema::new("user"));
        form.add_field(FieldBinding::model("user.name").named("username"))
            .unwrap();
        form.set_value("username", json!("porky")).unwrap();
        assert_eq!(form.value("username"), Some(&json!("porky")));
        assert_eq!(form.state.field_value("user.name"), Some(&json!("porky")));
    }

    #[test]
    fn test_schema_built_in_code() {
        let mut form = Form::new(ModelSchema::new("user"));
        let schema = FieldSchema::new().with("presence", ConstraintSpec::Flag(true));
        form.add_field_with(FieldBinding::model("user.nickname"), &schema)
            .unwrap();
        assert_eq!(form.validates_attribute("user.nickname").as_deref(), Some("presence"));
        assert!(!form.set_value("user.nickname", json!("")).unwrap().is_valid());
    }
}
