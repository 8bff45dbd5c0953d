//! Constraint specs: the decoded form of one field's rule schema.
//!
//! Schema documents are loosely typed. A constraint may be a boolean, a
//! `[predicate, message]` pair, or an object whose keys depend on the
//! kind. Each entry is decoded once into a [`ConstraintSpec`] so nothing
//! downstream probes shapes again.
//!
//! ```yaml
//! presence: true
//! format: { email: true }
//! zip: [zip_code, "Must contain a valid zip code"]
//! length: { min: 1, max: 10 }
//! size: { in: [small, medium, large], message: "pick a size" }
//! ```

use std::fmt;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{Result, RulesError};
use crate::registry::{Predicate, ValidatorRegistry};
use crate::value::type_name;

/// Bounds accepted by a `length` constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthRule {
    /// `in: [min, max]`, inclusive on both ends
    Range { min: usize, max: usize },
    /// `min` and/or `max`, inclusive
    Bounds { min: Option<usize>, max: Option<usize> },
    /// `is: n`
    Exact(usize),
}

impl LengthRule {
    pub fn accepts(&self, len: usize) -> bool {
        match *self {
            LengthRule::Range { min, max } => (min..=max).contains(&len),
            LengthRule::Bounds { min, max } => {
                min.is_none_or(|min| len >= min) && max.is_none_or(|max| len <= max)
            }
            LengthRule::Exact(n) => len == n,
        }
    }
}

/// Parameters of a `numericality` constraint.
#[derive(Debug, Clone, Default)]
pub struct NumericRule {
    /// Characters matching this pattern are removed before parsing
    pub ignore: Option<Regex>,
    /// Reject a fractional part
    pub only_integer: bool,
}

/// Kind-specific parameters of an object-shaped spec.
#[derive(Debug, Clone)]
pub enum Modifier {
    /// `{regex: pattern}`
    Format(Regex),
    /// `{in: [...]}`
    Inclusion(Vec<Value>),
    /// `{from: [...]}`
    Exclusion(Vec<Value>),
    /// `length: {...}`
    Length(LengthRule),
    /// `numericality: {...}`
    Numericality(NumericRule),
    /// Any other keys, looked up as `(kind, key)` in the registry.
    /// Only keys set to `true` are kept.
    Builtin(Vec<String>),
}

/// One decoded constraint.
#[derive(Clone)]
pub enum ConstraintSpec {
    /// Turn the kind's built-in predicate on or off
    Flag(bool),
    /// A host-supplied predicate and its message
    Custom {
        predicate: Predicate,
        message: Option<String>,
    },
    /// Kind-specific parameters with an optional message
    Modifier {
        modifier: Modifier,
        message: Option<String>,
    },
}

impl ConstraintSpec {
    /// A custom predicate with a message.
    pub fn custom(predicate: Predicate, message: impl Into<String>) -> Self {
        Self::Custom {
            predicate,
            message: Some(message.into()),
        }
    }

    /// A modifier without a message.
    pub fn modifier(modifier: Modifier) -> Self {
        Self::Modifier {
            modifier,
            message: None,
        }
    }

    /// Decode the spec written for `kind`.
    ///
    /// Pairs resolve their predicate name against `registry`.
    pub fn decode(kind: &str, raw: &Value, registry: &ValidatorRegistry) -> Result<Self> {
        match raw {
            Value::Bool(enabled) => Ok(Self::Flag(*enabled)),
            Value::Array(items) => decode_pair(kind, items, registry),
            Value::Object(map) => decode_object(kind, map),
            other => Err(RulesError::unrecognized(
                kind,
                format!("expected boolean, pair or object, got {}", type_name(other)),
            )),
        }
    }
}

impl fmt::Debug for ConstraintSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(enabled) => f.debug_tuple("Flag").field(enabled).finish(),
            Self::Custom { message, .. } => f
                .debug_struct("Custom")
                .field("message", message)
                .finish_non_exhaustive(),
            Self::Modifier { modifier, message } => f
                .debug_struct("Modifier")
                .field("modifier", modifier)
                .field("message", message)
                .finish(),
        }
    }
}

fn decode_pair(kind: &str, items: &[Value], registry: &ValidatorRegistry) -> Result<ConstraintSpec> {
    let [name, message] = items else {
        return Err(RulesError::unrecognized(
            kind,
            format!("pair must have 2 elements, got {}", items.len()),
        ));
    };
    let Some(name) = name.as_str() else {
        return Err(RulesError::unrecognized(kind, "pair must start with a predicate name"));
    };
    let predicate = registry
        .named(name)
        .cloned()
        .ok_or_else(|| RulesError::UnknownPredicate {
            kind: kind.to_string(),
            name: name.to_string(),
        })?;
    Ok(ConstraintSpec::Custom {
        predicate,
        message: message.as_str().map(str::to_string),
    })
}

fn decode_object(kind: &str, map: &Map<String, Value>) -> Result<ConstraintSpec> {
    let message = map.get("message").and_then(Value::as_str).map(str::to_string);
    let modifier = match kind {
        "length" => Modifier::Length(decode_length(kind, map)?),
        "numericality" => Modifier::Numericality(decode_numeric(kind, map)?),
        _ if map.contains_key("regex") => Modifier::Format(compile(kind, &map["regex"])?),
        _ if map.contains_key("in") => Modifier::Inclusion(decode_set(kind, "in", &map["in"])?),
        _ if map.contains_key("from") => {
            Modifier::Exclusion(decode_set(kind, "from", &map["from"])?)
        }
        _ => {
            let keys: Vec<String> = map
                .iter()
                .filter(|(key, _)| key.as_str() != "message")
                .filter(|(_, enabled)| matches!(enabled, Value::Bool(true)))
                .map(|(key, _)| key.clone())
                .collect();
            if keys.is_empty() {
                return Err(RulesError::unrecognized(kind, "no enabled sub-validator"));
            }
            Modifier::Builtin(keys)
        }
    };
    Ok(ConstraintSpec::Modifier { modifier, message })
}

fn decode_length(kind: &str, map: &Map<String, Value>) -> Result<LengthRule> {
    let bound = |key: &str| -> Result<Option<usize>> {
        match map.get(key) {
            None => Ok(None),
            Some(v) => as_usize(v)
                .map(Some)
                .ok_or_else(|| RulesError::unrecognized(kind, format!("'{key}' must be a non-negative integer"))),
        }
    };

    if let Some(range) = map.get("in") {
        return match range.as_array().map(Vec::as_slice) {
            Some([lo, hi]) => match (as_usize(lo), as_usize(hi)) {
                (Some(min), Some(max)) if min <= max => Ok(LengthRule::Range { min, max }),
                _ => Err(RulesError::unrecognized(kind, "'in' must be an ascending integer pair")),
            },
            _ => Err(RulesError::unrecognized(kind, "'in' must be a [min, max] pair")),
        };
    }
    if let Some(exact) = bound("is")? {
        return Ok(LengthRule::Exact(exact));
    }
    let (min, max) = (bound("min")?, bound("max")?);
    if min.is_none() && max.is_none() {
        return Err(RulesError::unrecognized(kind, "expected 'in', 'is', 'min' or 'max'"));
    }
    Ok(LengthRule::Bounds { min, max })
}

fn decode_numeric(kind: &str, map: &Map<String, Value>) -> Result<NumericRule> {
    let ignore = map.get("ignore").map(|raw| compile(kind, raw)).transpose()?;
    let only_integer = map
        .get("only_integer")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    Ok(NumericRule {
        ignore,
        only_integer,
    })
}

fn decode_set(kind: &str, key: &str, raw: &Value) -> Result<Vec<Value>> {
    raw.as_array()
        .cloned()
        .ok_or_else(|| RulesError::unrecognized(kind, format!("'{key}' must be a list")))
}

fn compile(kind: &str, raw: &Value) -> Result<Regex> {
    let pattern = raw
        .as_str()
        .ok_or_else(|| RulesError::unrecognized(kind, "pattern must be a string"))?;
    Regex::new(pattern).map_err(|source| RulesError::InvalidPattern {
        kind: kind.to_string(),
        source,
    })
}

fn as_usize(value: &Value) -> Option<usize> {
    value.as_u64().and_then(|n| usize::try_from(n).ok())
}

/// The ordered rule set declared for one field.
#[derive(Debug, Clone, Default)]
pub struct FieldSchema {
    constraints: IndexMap<String, ConstraintSpec>,
}

impl FieldSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a constraint. Re-declaring a kind replaces its spec in place.
    pub fn with(mut self, kind: impl Into<String>, spec: ConstraintSpec) -> Self {
        self.constraints.insert(kind.into(), spec);
        self
    }

    /// Decode a mapping of kind → raw spec.
    ///
    /// Entries that fail to decode are dropped with a warning; the rest of
    /// the field still compiles.
    pub fn from_value(raw: &Value, registry: &ValidatorRegistry) -> Result<Self> {
        let Value::Object(map) = raw else {
            return Err(RulesError::SchemaNotMapping {
                found: type_name(raw),
            });
        };
        let mut schema = Self::new();
        for (kind, spec) in map {
            match ConstraintSpec::decode(kind, spec, registry) {
                Ok(decoded) => {
                    schema.constraints.insert(kind.clone(), decoded);
                }
                Err(e) => {
                    tracing::warn!(kind = %kind, %e, "skipping constraint");
                }
            }
        }
        Ok(schema)
    }

    /// Decode a field schema written as YAML.
    pub fn from_yaml_str(yaml: &str, registry: &ValidatorRegistry) -> Result<Self> {
        let raw: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(&raw, registry)
    }

    /// Decode a field schema written as JSON.
    pub fn from_json_str(json: &str, registry: &ValidatorRegistry) -> Result<Self> {
        let raw: Value = serde_json::from_str(json)?;
        Self::from_value(&raw, registry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConstraintSpec)> {
        self.constraints.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Declared kinds, in declaration order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.constraints.keys().map(String::as_str)
    }

    pub fn get(&self, kind: &str) -> Option<&ConstraintSpec> {
        self.constraints.get(kind)
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}
