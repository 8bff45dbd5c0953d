//! Read-only evaluation context.
//!
//! Predicates that look across fields (`confirmation`, `uniqueness`) never
//! walk a scope tree. The host hands the engine a [`FormContext`] on every
//! evaluation call and the engine wraps it, together with the path of the
//! field under evaluation, in an [`EvalContext`].

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

/// Capability the host form exposes to predicates.
///
/// Implementations return the last committed value of a field. The engine
/// only reads through this trait and never stores the reference.
pub trait FormContext {
    /// Current committed value of the named field, if such a field exists.
    fn field_value(&self, name: &str) -> Option<&Value>;

    /// Every known record of a model, used by `uniqueness`.
    fn records(&self, model: &str) -> &[Value];
}

/// Qualified name of a field: an optional model namespace and an attribute.
///
/// `user.password` has model `user` and attribute `password`. A bare name
/// has no model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    model: Option<String>,
    attribute: String,
}

impl FieldPath {
    pub fn new(model: Option<&str>, attribute: impl Into<String>) -> Self {
        Self {
            model: model.filter(|m| !m.is_empty()).map(str::to_string),
            attribute: attribute.into(),
        }
    }

    /// Split `model.attribute` on the first dot.
    pub fn parse(qualified: &str) -> Self {
        match qualified.split_once('.') {
            Some((model, attribute)) => Self::new(Some(model), attribute),
            None => Self::new(None, qualified),
        }
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Name of the sibling that confirms this field, e.g.
    /// `user.passwordConfirmation` for `user.password`.
    pub fn confirmation_name(&self, suffix: &str) -> String {
        match &self.model {
            Some(model) => format!("{model}.{}{suffix}", self.attribute),
            None => format!("{}{suffix}", self.attribute),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.model {
            Some(model) => write!(f, "{model}.{}", self.attribute),
            None => write!(f, "{}", self.attribute),
        }
    }
}

/// Everything a predicate may consult besides the value itself.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    field: &'a FieldPath,
    form: &'a dyn FormContext,
}

impl<'a> EvalContext<'a> {
    pub fn new(field: &'a FieldPath, form: &'a dyn FormContext) -> Self {
        Self { field, form }
    }

    /// Path of the field being evaluated.
    pub fn field(&self) -> &'a FieldPath {
        self.field
    }

    /// Committed value of another field.
    pub fn sibling_value(&self, name: &str) -> Option<&'a Value> {
        self.form.field_value(name)
    }

    /// Records of the model this field belongs to.
    pub fn records(&self) -> &'a [Value] {
        self.form.records(self.field.model().unwrap_or_default())
    }
}

impl fmt::Debug for EvalContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalContext")
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}

/// A context with no siblings and no records.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyContext;

impl FormContext for EmptyContext {
    fn field_value(&self, _name: &str) -> Option<&Value> {
        None
    }

    fn records(&self, _model: &str) -> &[Value] {
        &[]
    }
}

/// In-memory context, handy for hosts without their own form state and
/// for tests.
#[derive(Debug, Default, Clone)]
pub struct StaticContext {
    values: HashMap<String, Value>,
    records: HashMap<String, Vec<Value>>,
}

impl StaticContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field's committed value.
    pub fn with_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Replace the record collection of a model.
    pub fn with_records(mut self, model: impl Into<String>, records: Vec<Value>) -> Self {
        self.records.insert(model.into(), records);
        self
    }

    pub fn set_value(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }
}

impl FormContext for StaticContext {
    fn field_value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    fn records(&self, model: &str) -> &[Value] {
        self.records.get(model).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_path_parse() {
        let path = FieldPath::parse("user.password");
        assert_eq!(path.model(), Some("user"));
        assert_eq!(path.attribute(), "password");
        assert_eq!(path.to_string(), "user.password");

        let bare = FieldPath::parse("password");
        assert_eq!(bare.model(), None);
        assert_eq!(bare.to_string(), "password");
    }

    #[test]
    fn test_nested_path_keeps_rest_as_attribute() {
        let path = FieldPath::parse("user.address.city");
        assert_eq!(path.model(), Some("user"));
        assert_eq!(path.attribute(), "address.city");
    }

    #[test]
    fn test_confirmation_name() {
        let path = FieldPath::parse("user.password");
        assert_eq!(
            path.confirmation_name("Confirmation"),
            "user.passwordConfirmation"
        );
        assert_eq!(
            FieldPath::parse("email").confirmation_name("Confirmation"),
            "emailConfirmation"
        );
    }

    #[test]
    fn test_static_context_lookups() {
        let ctx = StaticContext::new()
            .with_value("user.name", json!("porky"))
            .with_records("user", vec![json!({"name": "a"})]);
        let path = FieldPath::parse("user.name");
        let eval = EvalContext::new(&path, &ctx);

        assert_eq!(eval.sibling_value("user.name"), Some(&json!("porky")));
        assert_eq!(eval.sibling_value("user.email"), None);
        assert_eq!(eval.records().len(), 1);
    }

    #[test]
    fn test_records_for_unscoped_field() {
        let ctx = StaticContext::new().with_records("", vec![json!({"name": "a"})]);
        let path = FieldPath::parse("name");
        assert_eq!(EvalContext::new(&path, &ctx).records().len(), 1);
        assert!(EvalContext::new(&path, &EmptyContext).records().is_empty());
    }
}
