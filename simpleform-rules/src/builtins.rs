//! Built-in predicate library.
//!
//! Every predicate except `presence`, `absence` and `acceptance` passes a
//! falsy value (blank, `false` or zero): a vacuous pass that leaves the
//! empty/non-empty decision to a separate `presence` constraint.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::registry::{predicate, simple, Predicate, ValidatorRegistry, DEFAULT_CONFIRMATION_SUFFIX};
use crate::spec::{LengthRule, NumericRule};
use crate::value::{as_text, is_blank, is_falsy, length_of, loose_eq};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,6}$").expect("email pattern")
});

static ZIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^\d{5}$)|(^\d{5}-?\d{4}$)").expect("zip pattern"));

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d+)?|\.\d+)$").expect("number pattern"));

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+$").expect("integer pattern"));

/// Seed a registry with the standard built-ins.
pub(crate) fn install(registry: &mut ValidatorRegistry) {
    registry.register("presence", None, simple(presence));
    registry.register("absence", None, simple(is_blank));
    registry.register("acceptance", None, simple(acceptance));
    registry.register("confirmation", None, confirmation(DEFAULT_CONFIRMATION_SUFFIX));
    registry.register("uniqueness", None, uniqueness());
    registry.register("numericality", None, numericality(NumericRule::default()));
    registry.register("format", Some("email"), pattern(&EMAIL));
    registry.register("format", Some("zip"), pattern(&ZIP));
}

fn presence(value: &Value) -> bool {
    !is_blank(value)
}

fn acceptance(value: &Value) -> bool {
    matches!(value, Value::Bool(true))
}

fn pattern(re: &'static Lazy<Regex>) -> Predicate {
    simple(move |value| matches_text(re, value))
}

fn matches_text(re: &Regex, value: &Value) -> bool {
    if is_falsy(value) {
        return true;
    }
    as_text(value).is_some_and(|text| re.is_match(&text))
}

/// `confirmation`: the value must loosely equal the committed value of
/// the `<attribute><suffix>` sibling.
///
/// A missing sibling fails unless the value itself is falsy. Two empty
/// values confirm each other.
pub fn confirmation(suffix: &str) -> Predicate {
    let suffix = suffix.to_string();
    predicate(move |value, ctx| {
        let sibling_name = ctx.field().confirmation_name(&suffix);
        let verdict = match ctx.sibling_value(&sibling_name) {
            None => is_falsy(value),
            Some(sibling) if is_blank(value) && is_blank(sibling) => true,
            Some(sibling) => loose_eq(value, sibling),
        };
        tracing::trace!(field = %ctx.field(), sibling = %sibling_name, verdict, "confirmation");
        Ok(verdict)
    })
}

/// `uniqueness`: no record of the field's model may hold the same
/// attribute value. Records are compared by value only.
///
/// A dotted attribute such as `address.city` is followed through nested
/// objects.
pub fn uniqueness() -> Predicate {
    predicate(|value, ctx| {
        if is_falsy(value) {
            return Ok(true);
        }
        let attribute = ctx.field().attribute();
        let taken = ctx
            .records()
            .iter()
            .filter_map(|record| attribute_of(record, attribute))
            .any(|existing| loose_eq(existing, value));
        Ok(!taken)
    })
}

fn attribute_of<'v>(record: &'v Value, attribute: &str) -> Option<&'v Value> {
    record
        .get(attribute)
        .or_else(|| attribute.split('.').try_fold(record, |node, key| node.get(key)))
}

/// Format-by-pattern: passes when the pattern finds a match anywhere in
/// the value's text. Anchor the pattern to require a whole match.
pub fn format_regex(re: Regex) -> Predicate {
    simple(move |value| matches_text(&re, value))
}

/// Inclusion: the value must loosely equal one member of the set.
pub fn inclusion(set: Vec<Value>) -> Predicate {
    simple(move |value| is_falsy(value) || set.iter().any(|member| loose_eq(member, value)))
}

/// Exclusion: the value must not loosely equal any member of the set.
pub fn exclusion(set: Vec<Value>) -> Predicate {
    simple(move |value| is_falsy(value) || !set.iter().any(|member| loose_eq(member, value)))
}

pub fn length(rule: LengthRule) -> Predicate {
    simple(move |value| is_falsy(value) || rule.accepts(length_of(value)))
}

/// Numericality: strip whatever `ignore` matches, then parse what is left.
pub fn numericality(rule: NumericRule) -> Predicate {
    simple(move |value| is_numeric(&rule, value))
}

fn is_numeric(rule: &NumericRule, value: &Value) -> bool {
    if is_falsy(value) {
        return true;
    }
    match value {
        Value::Number(n) => !rule.only_integer || n.is_i64() || n.is_u64(),
        Value::String(text) => {
            let stripped = match &rule.ignore {
                Some(ignore) => ignore.replace_all(text, ""),
                None => text.as_str().into(),
            };
            let grammar: &Regex = if rule.only_integer { &INTEGER } else { &NUMBER };
            grammar.is_match(&stripped)
        }
        _ => false,
    }
}
