//! Rule normalizer: decoded specs in, ordered descriptors out.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::builtins;
use crate::context::EvalContext;
use crate::error::Result;
use crate::registry::{predicate, Predicate, ValidatorRegistry};
use crate::spec::{ConstraintSpec, FieldSchema, Modifier};

/// A normalized, directly callable constraint for one field.
#[derive(Clone)]
pub struct ConstraintDescriptor {
    kind: String,
    rule: String,
    test: Predicate,
    message: Option<String>,
}

impl ConstraintDescriptor {
    pub fn new(kind: impl Into<String>, test: Predicate) -> Self {
        let kind = kind.into();
        Self {
            rule: kind.clone(),
            kind,
            test,
            message: None,
        }
    }

    /// Diagnostic label, e.g. `format.email`.
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = rule.into();
        self
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    /// The constraint-kind this descriptor reports validity under.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Run the predicate. Errors are returned as-is; the engine decides
    /// what a failure means.
    pub fn test(&self, value: &Value, ctx: &EvalContext<'_>) -> Result<bool> {
        (self.test)(value, ctx)
    }
}

impl fmt::Debug for ConstraintDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintDescriptor")
            .field("kind", &self.kind)
            .field("rule", &self.rule)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Expand a field schema into descriptors, in declaration order.
///
/// Entries that resolve to nothing (a disabled flag, a flag with no
/// built-in, nested keys the registry does not know) emit no descriptor.
pub fn normalize(schema: &FieldSchema, registry: &ValidatorRegistry) -> Vec<ConstraintDescriptor> {
    schema
        .iter()
        .filter_map(|(kind, spec)| {
            let descriptor = describe(kind, spec, registry);
            if descriptor.is_none() {
                debug!(kind, "no descriptor for constraint");
            }
            descriptor
        })
        .collect()
}

fn describe(
    kind: &str,
    spec: &ConstraintSpec,
    registry: &ValidatorRegistry,
) -> Option<ConstraintDescriptor> {
    match spec {
        ConstraintSpec::Flag(false) => None,
        ConstraintSpec::Flag(true) => registry
            .lookup(kind, None)
            .map(|p| ConstraintDescriptor::new(kind, p.clone())),
        ConstraintSpec::Custom { predicate, message } => Some(
            ConstraintDescriptor::new(kind, predicate.clone()).with_message(message.clone()),
        ),
        ConstraintSpec::Modifier { modifier, message } => {
            let (rule, test) = describe_modifier(kind, modifier, registry)?;
            Some(
                ConstraintDescriptor::new(kind, test)
                    .with_rule(rule)
                    .with_message(message.clone()),
            )
        }
    }
}

fn describe_modifier(
    kind: &str,
    modifier: &Modifier,
    registry: &ValidatorRegistry,
) -> Option<(String, Predicate)> {
    let built = match modifier {
        Modifier::Format(re) => (format!("{kind}.regex"), builtins::format_regex(re.clone())),
        Modifier::Inclusion(set) => (format!("{kind}.in"), builtins::inclusion(set.clone())),
        Modifier::Exclusion(set) => (format!("{kind}.from"), builtins::exclusion(set.clone())),
        Modifier::Length(rule) => (kind.to_string(), builtins::length(*rule)),
        Modifier::Numericality(rule) => (kind.to_string(), builtins::numericality(rule.clone())),
        Modifier::Builtin(keys) => return describe_nested(kind, keys, registry),
    };
    Some(built)
}

/// Nested built-ins under one kind share a single validity entry, so
/// several enabled keys are conjoined.
fn describe_nested(
    kind: &str,
    keys: &[String],
    registry: &ValidatorRegistry,
) -> Option<(String, Predicate)> {
    let found: Vec<(&str, Predicate)> = keys
        .iter()
        .filter_map(|key| {
            let p = registry.lookup(kind, Some(key)).cloned();
            if p.is_none() {
                debug!(kind, sub_kind = %key, "unknown nested built-in");
            }
            p.map(|p| (key.as_str(), p))
        })
        .collect();

    match found.as_slice() {
        [] => None,
        [(key, p)] => Some((format!("{kind}.{key}"), p.clone())),
        many => {
            let label = many
                .iter()
                .map(|(key, _)| format!("{kind}.{key}"))
                .collect::<Vec<_>>()
                .join("+");
            let parts: Vec<Predicate> = many.iter().map(|(_, p)| p.clone()).collect();
            let all = predicate(move |value, ctx| {
                for part in &parts {
                    if !part(value, ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            });
            Some((label, all))
        }
    }
}
