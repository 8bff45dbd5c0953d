//! Validity engine.
//!
//! A [`CompiledField`] evaluates every descriptor on every value change and
//! records one boolean per constraint-kind. The [`ValidityEngine`] keeps the
//! latest [`FieldValidityState`] of each registered field so later reads see
//! the most recent evaluation.
//!
//! A predicate that errors or panics marks only its own constraint invalid.

use std::panic::{self, AssertUnwindSafe};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::context::{EvalContext, FieldPath, FormContext};
use crate::error::{Result, RulesError};
use crate::normalize::{normalize, ConstraintDescriptor};
use crate::registry::ValidatorRegistry;
use crate::spec::FieldSchema;

/// Per-kind verdicts from one evaluation, in descriptor order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldValidityState {
    entries: IndexMap<String, bool>,
}

impl FieldValidityState {
    /// Verdict for one constraint-kind.
    pub fn get(&self, kind: &str) -> Option<bool> {
        self.entries.get(kind).copied()
    }

    /// Aggregate validity: every constraint passes. A field with no
    /// constraints is valid.
    pub fn is_valid(&self) -> bool {
        self.entries.values().all(|ok| *ok)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Kinds whose constraint failed, in order.
    pub fn failing(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|(_, ok)| !ok).map(|(kind, _)| kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn record(&mut self, kind: &str, valid: bool) {
        self.entries.insert(kind.to_string(), valid);
    }
}

/// A field's schema compiled against a registry.
#[derive(Debug, Clone)]
pub struct CompiledField {
    path: FieldPath,
    descriptors: Vec<ConstraintDescriptor>,
}

impl CompiledField {
    /// Normalize `schema` for the field at `path`.
    pub fn compile(path: FieldPath, schema: &FieldSchema, registry: &ValidatorRegistry) -> Self {
        let descriptors = normalize(schema, registry);
        debug!(
            field = %path,
            declared = schema.len(),
            compiled = descriptors.len(),
            "compiled field"
        );
        Self { path, descriptors }
    }

    /// Build directly from descriptors.
    pub fn from_descriptors(path: FieldPath, descriptors: Vec<ConstraintDescriptor>) -> Self {
        Self { path, descriptors }
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn descriptors(&self) -> &[ConstraintDescriptor] {
        &self.descriptors
    }

    /// Constraint names in declaration order.
    pub fn constraint_names(&self) -> Vec<&str> {
        self.descriptors.iter().map(ConstraintDescriptor::kind).collect()
    }

    pub fn has_constraint(&self, kind: &str) -> bool {
        self.descriptors.iter().any(|d| d.kind() == kind)
    }

    /// Evaluate every descriptor against `value`. Pure: nothing is stored.
    pub fn evaluate(&self, value: &Value, form: &dyn FormContext) -> FieldValidityState {
        let ctx = EvalContext::new(&self.path, form);
        let mut state = FieldValidityState::default();
        for descriptor in &self.descriptors {
            let valid = run_guarded(descriptor, value, &ctx);
            state.record(descriptor.kind(), valid);
        }
        trace!(field = %self.path, valid = state.is_valid(), "evaluated field");
        state
    }
}

/// Run one predicate, turning errors and panics into an invalid verdict.
fn run_guarded(descriptor: &ConstraintDescriptor, value: &Value, ctx: &EvalContext<'_>) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| descriptor.test(value, ctx))) {
        Ok(Ok(valid)) => valid,
        Ok(Err(e)) => {
            warn!(
                field = %ctx.field(),
                kind = descriptor.kind(),
                %e,
                "predicate failed, marking constraint invalid"
            );
            false
        }
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(
                field = %ctx.field(),
                kind = descriptor.kind(),
                %reason,
                "predicate panicked, marking constraint invalid"
            );
            false
        }
    }
}

struct TrackedField {
    compiled: CompiledField,
    state: Option<FieldValidityState>,
}

/// Tracks compiled fields and their latest validity.
pub struct ValidityEngine {
    registry: ValidatorRegistry,
    fields: IndexMap<String, TrackedField>,
}

impl ValidityEngine {
    pub fn new(registry: ValidatorRegistry) -> Self {
        Self {
            registry,
            fields: IndexMap::new(),
        }
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    /// Compile and track a field under `name`.
    ///
    /// Registering a name again recompiles it and discards its old state.
    pub fn register(&mut self, name: impl Into<String>, path: FieldPath, schema: &FieldSchema) {
        let compiled = CompiledField::compile(path, schema, &self.registry);
        self.insert(name, compiled);
    }

    /// Track an already compiled field.
    pub fn insert(&mut self, name: impl Into<String>, compiled: CompiledField) {
        self.fields.insert(
            name.into(),
            TrackedField {
                compiled,
                state: None,
            },
        );
    }

    /// Re-evaluate `name` for a new value and keep the result.
    pub fn on_value_change(
        &mut self,
        name: &str,
        value: &Value,
        form: &dyn FormContext,
    ) -> Result<&FieldValidityState> {
        let tracked = self
            .fields
            .get_mut(name)
            .ok_or_else(|| RulesError::FieldNotRegistered {
                name: name.to_string(),
            })?;
        let state = tracked.compiled.evaluate(value, form);
        Ok(&*tracked.state.insert(state))
    }

    /// Latest state, or `None` before the first evaluation.
    pub fn state(&self, name: &str) -> Option<&FieldValidityState> {
        self.fields.get(name).and_then(|f| f.state.as_ref())
    }

    /// Latest aggregate validity, or `None` before the first evaluation.
    pub fn is_valid(&self, name: &str) -> Option<bool> {
        self.state(name).map(FieldValidityState::is_valid)
    }

    pub fn compiled(&self, name: &str) -> Option<&CompiledField> {
        self.fields.get(name).map(|f| &f.compiled)
    }

    pub fn constraint_names(&self, name: &str) -> Option<Vec<&str>> {
        self.compiled(name).map(CompiledField::constraint_names)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl Default for ValidityEngine {
    fn default() -> Self {
        Self::new(ValidatorRegistry::builtin())
    }
}
