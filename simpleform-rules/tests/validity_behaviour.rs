//! End-to-end checks of the rule compiler: schema document in, validity out.

use rstest::rstest;
use serde_json::{json, Value};
use simpleform_rules::{
    simple, CompiledField, EmptyContext, FieldPath, FieldSchema, StaticContext, ValidatorRegistry,
};

fn compile_yaml(path: &str, yaml: &str) -> CompiledField {
    let registry = zip_registry();
    let schema = FieldSchema::from_yaml_str(yaml, &registry).expect("schema should decode");
    CompiledField::compile(FieldPath::parse(path), &schema, &registry)
}

fn zip_registry() -> ValidatorRegistry {
    let mut registry = ValidatorRegistry::builtin();
    registry.register_named(
        "zip_code",
        simple(|value| {
            value.as_str().is_none_or(|zip| {
                zip.is_empty()
                    || (zip.len() == 5 || zip.len() == 10) && zip.chars().take(5).all(|c| c.is_ascii_digit())
            })
        }),
    );
    registry
}

fn verdict(field: &CompiledField, value: Value) -> bool {
    field.evaluate(&value, &EmptyContext).is_valid()
}

#[rstest]
#[case(json!("porky"), false)]
#[case(json!("porky@pig.net"), true)]
#[case(json!(""), true)]
fn email_format(#[case] value: Value, #[case] expected: bool) {
    let field = compile_yaml("user.email", "format:\n  email: true\n");
    assert_eq!(verdict(&field, value), expected);
}

#[rstest]
#[case("format: { email: true }\n", json!(false))]
#[case("format: { email: true }\n", json!(0))]
#[case("inclusion: { in: [small] }\n", json!(false))]
#[case("inclusion: { in: [small] }\n", json!(0))]
#[case("length: { min: 2 }\n", json!(false))]
#[case("length: { min: 2 }\n", json!(0))]
fn falsy_values_pass_vacuously(#[case] yaml: &str, #[case] value: Value) {
    let field = compile_yaml("user.field", yaml);
    assert!(verdict(&field, value));
}

#[rstest]
#[case(json!("11111"), true)]
#[case(json!("11111-1111"), true)]
#[case(json!("abcdefg"), false)]
fn zip_format(#[case] value: Value, #[case] expected: bool) {
    let field = compile_yaml("user.zip", "format: { zip: true }\n");
    assert_eq!(verdict(&field, value), expected);
}

#[rstest]
#[case(json!("a"), true)]
#[case(json!("abcdefghi"), true)]
#[case(json!("abcdefghijk"), false)]
#[case(json!(null), true)]
fn length_bounds(#[case] value: Value, #[case] expected: bool) {
    let field = compile_yaml("user.name", "length: { min: 1, max: 10 }\n");
    assert_eq!(verdict(&field, value), expected);
}

#[test]
fn length_combined_with_presence_rejects_empty() {
    let field = compile_yaml("user.name", "presence: true\nlength: { min: 1, max: 10 }\n");
    let state = field.evaluate(&json!(null), &EmptyContext);
    assert_eq!(state.get("presence"), Some(false));
    assert_eq!(state.get("length"), Some(true));
    assert!(!state.is_valid());
}

#[test]
fn inclusion_and_exclusion() {
    let size = compile_yaml("shirt.size", "inclusion: { in: [small, medium, large] }\n");
    assert!(verdict(&size, json!("small")));
    assert!(!verdict(&size, json!("hefty")));

    let not_big = compile_yaml("shirt.size", "exclusion: { from: [XL, XXL] }\n");
    assert!(verdict(&not_big, json!("small")));
    assert!(!verdict(&not_big, json!("XL")));
}

#[test]
fn format_regex_matches_partially_unless_anchored() {
    let loose = compile_yaml("user.code", "format: { regex: 'ab' }\n");
    assert!(verdict(&loose, json!("xxabxx")));
    let anchored = compile_yaml("user.code", "format: { regex: '^ab$' }\n");
    assert!(!verdict(&anchored, json!("xxabxx")));
    assert!(verdict(&anchored, json!("ab")));
}

#[test]
fn numericality_with_ignore() {
    let field = compile_yaml("order.total", "numericality: { ignore: '[$,]' }\n");
    assert!(verdict(&field, json!("$1,200.50")));
    assert!(!verdict(&field, json!("twelve")));
    assert!(verdict(&field, json!("")));
}

#[test]
fn confirmation_waits_for_sibling() {
    let field = compile_yaml("user.password", "confirmation: true\n");
    let mut form = StaticContext::new()
        .with_value("user.password", json!("myPassword"))
        .with_value("user.passwordConfirmation", json!(""));

    assert!(!field.evaluate(&json!("myPassword"), &form).is_valid());

    form.set_value("user.passwordConfirmation", json!("myPassword"));
    assert!(field.evaluate(&json!("myPassword"), &form).is_valid());
}

#[test]
fn confirmation_with_missing_sibling_fails_quietly() {
    let field = compile_yaml("user.password", "confirmation: true\n");
    assert!(!verdict(&field, json!("myPassword")));
}

#[test]
fn custom_confirmation_suffix() {
    let registry = ValidatorRegistry::builtin().with_confirmation_suffix("Again");
    let schema = FieldSchema::from_yaml_str("confirmation: true\n", &registry).unwrap();
    let field = CompiledField::compile(FieldPath::parse("user.email"), &schema, &registry);
    let form = StaticContext::new().with_value("user.emailAgain", json!("a@b.co"));
    assert!(field.evaluate(&json!("a@b.co"), &form).is_valid());
}

#[rstest]
#[case("a", false)]
#[case("b", false)]
#[case("c", true)]
fn uniqueness_against_records(#[case] username: &str, #[case] expected: bool) {
    let field = compile_yaml("user.username", "uniqueness: true\n");
    let form = StaticContext::new().with_records(
        "user",
        vec![json!({"username": "a"}), json!({"username": "b"})],
    );
    assert_eq!(field.evaluate(&json!(username), &form).is_valid(), expected);
}

#[test]
fn descriptor_order_matches_declaration() {
    let field = compile_yaml(
        "user.zip",
        "presence: true\nzip: [zip_code, \"Must contain a valid zip code\"]\n",
    );
    assert_eq!(field.constraint_names(), vec!["presence", "zip"]);
    assert_eq!(
        field.descriptors()[1].message(),
        Some("Must contain a valid zip code")
    );
}

#[test]
fn unknown_kinds_and_shapes_are_skipped() {
    let field = compile_yaml(
        "user.name",
        "presence: true\nsparkle: true\nlength: 12\nformat: { regex: '(' }\nabsence: false\n",
    );
    assert_eq!(field.constraint_names(), vec!["presence"]);
    assert!(verdict(&field, json!("porky")));
}

#[test]
fn acceptance_requires_true() {
    let field = compile_yaml("user.termsOfService", "acceptance: true\n");
    assert!(verdict(&field, json!(true)));
    assert!(!verdict(&field, json!(false)));
    assert!(!verdict(&field, json!("yes")));
}

#[test]
fn absence_requires_empty() {
    let field = compile_yaml("user.honeypot", "absence: true\n");
    assert!(verdict(&field, json!("")));
    assert!(!verdict(&field, json!("spam")));
}
