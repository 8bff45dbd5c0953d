//! Predicate registry.
//!
//! Built-in predicates are looked up by `(kind, sub_kind)`: `presence` is
//! `("presence", None)`, `format: {email: true}` is `("format",
//! Some("email"))`. Named predicates back the `[name, message]` pair form in
//! schema documents. Hosts extend either table without touching the core.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::builtins;
use crate::context::EvalContext;
use crate::error::Result;

/// Default suffix of the sibling field checked by `confirmation`.
pub const DEFAULT_CONFIRMATION_SUFFIX: &str = "Confirmation";

/// A compiled validator: returns the verdict for one value, or an error
/// when it could not decide.
pub type Predicate = Arc<dyn Fn(&Value, &EvalContext<'_>) -> Result<bool> + Send + Sync>;

/// Wrap a closure as a [`Predicate`].
pub fn predicate<F>(f: F) -> Predicate
where
    F: Fn(&Value, &EvalContext<'_>) -> Result<bool> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap an infallible, context-free check as a [`Predicate`].
pub fn simple<F>(f: F) -> Predicate
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    Arc::new(move |value, _ctx| Ok(f(value)))
}

type BuiltinKey = (String, Option<String>);

/// Lookup table of built-in and host-named predicates.
#[derive(Clone)]
pub struct ValidatorRegistry {
    builtins: HashMap<BuiltinKey, Predicate>,
    named: HashMap<String, Predicate>,
    confirmation_suffix: String,
}

impl ValidatorRegistry {
    /// An empty registry: every flag and nested lookup is skipped.
    pub fn empty() -> Self {
        Self {
            builtins: HashMap::new(),
            named: HashMap::new(),
            confirmation_suffix: DEFAULT_CONFIRMATION_SUFFIX.to_string(),
        }
    }

    /// Registry seeded with the standard built-ins.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        builtins::install(&mut registry);
        registry
    }

    /// Change the suffix `confirmation` appends to find its sibling.
    ///
    /// Only rebinds `confirmation` if the registry already carries it.
    pub fn with_confirmation_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        if self.contains("confirmation", None) {
            let rebound = builtins::confirmation(&suffix);
            self.register("confirmation", None, rebound);
        }
        self.confirmation_suffix = suffix;
        self
    }

    pub fn confirmation_suffix(&self) -> &str {
        &self.confirmation_suffix
    }

    /// Register (or replace) a built-in under `kind` and optional `sub_kind`.
    pub fn register(&mut self, kind: &str, sub_kind: Option<&str>, predicate: Predicate) {
        self.builtins
            .insert((kind.to_string(), sub_kind.map(str::to_string)), predicate);
    }

    /// Register a predicate that schema documents can name in a pair.
    pub fn register_named(&mut self, name: impl Into<String>, predicate: Predicate) {
        self.named.insert(name.into(), predicate);
    }

    /// Look up a built-in.
    pub fn lookup(&self, kind: &str, sub_kind: Option<&str>) -> Option<&Predicate> {
        self.builtins
            .get(&(kind.to_string(), sub_kind.map(str::to_string)))
    }

    /// Look up a named predicate.
    pub fn named(&self, name: &str) -> Option<&Predicate> {
        self.named.get(name)
    }

    pub fn contains(&self, kind: &str, sub_kind: Option<&str>) -> bool {
        self.lookup(kind, sub_kind).is_some()
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builtins: Vec<String> = self
            .builtins
            .keys()
            .map(|(kind, sub)| match sub {
                Some(sub) => format!("{kind}.{sub}"),
                None => kind.clone(),
            })
            .collect();
        builtins.sort();
        let mut named: Vec<&String> = self.named.keys().collect();
        named.sort();
        f.debug_struct("ValidatorRegistry")
            .field("builtins", &builtins)
            .field("named", &named)
            .field("confirmation_suffix", &self.confirmation_suffix)
            .finish()
    }
}
