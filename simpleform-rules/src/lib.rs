//! Declarative validation-rule compiler
//!
//! `simpleform-rules` turns a loosely typed per-field rule schema into an
//! ordered list of validator functions and tracks a live validity verdict
//! per constraint as field values change. It knows nothing about forms,
//! DOM or rendering; a host supplies values and a read-only [`FormContext`].
//!
//! # Architecture
//!
//! - **Decode once**: each schema entry becomes a [`ConstraintSpec`] (flag,
//!   custom pair, or kind-specific modifier)
//! - **Explicit registry**: built-ins live in a [`ValidatorRegistry`] keyed
//!   by `(kind, sub_kind)`; hosts add their own without touching this crate
//! - **Ordered output**: descriptors and validity entries keep schema
//!   declaration order, so hosts can render constraint names deterministically
//! - **Isolated failures**: a predicate that errors or panics invalidates
//!   only its own constraint
//!
//! ```
//! use serde_json::json;
//! use simpleform_rules::{CompiledField, EmptyContext, FieldPath, FieldSchema, ValidatorRegistry};
//!
//! let registry = ValidatorRegistry::builtin();
//! let schema = FieldSchema::from_yaml_str("presence: true\nformat:\n  email: true\n", &registry)?;
//! let field = CompiledField::compile(FieldPath::parse("user.email"), &schema, &registry);
//!
//! let state = field.evaluate(&json!("porky"), &EmptyContext);
//! assert_eq!(state.get("presence"), Some(true));
//! assert_eq!(state.get("format"), Some(false));
//! assert!(!state.is_valid());
//! # Ok::<(), simpleform_rules::RulesError>(())
//! ```

pub mod builtins;
pub mod context;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod registry;
pub mod spec;
pub mod value;

pub use context::{EmptyContext, EvalContext, FieldPath, FormContext, StaticContext};
pub use engine::{CompiledField, FieldValidityState, ValidityEngine};
pub use error::{Result, RulesError};
pub use normalize::{normalize, ConstraintDescriptor};
pub use registry::{
    predicate, simple, Predicate, ValidatorRegistry, DEFAULT_CONFIRMATION_SUFFIX,
};
pub use spec::{ConstraintSpec, FieldSchema, LengthRule, Modifier, NumericRule};

/// Compile a field schema with the built-in registry.
pub fn compile(path: FieldPath, schema: &FieldSchema) -> CompiledField {
    CompiledField::compile(path, schema, &ValidatorRegistry::builtin())
}
