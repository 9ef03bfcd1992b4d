use std::collections::BTreeMap;

use serde_json::{Value, json};
use tablestore::predicate::compile;

fn attrs(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

#[test]
fn scalar_means_equality() {
    let compiled = compile(&attrs(&[("key", json!("foo"))])).unwrap();
    assert_eq!(compiled.clause, "\"key\" = ?");
    assert_eq!(compiled.params, vec![json!("foo")]);
}

#[test]
fn between_is_inclusive_on_both_ends() {
    let compiled = compile(&attrs(&[
        ("key", json!("foo")),
        ("ts", json!({ "between": [1, 2] })),
    ]))
    .unwrap();
    assert_eq!(
        compiled.clause,
        "\"key\" = ? AND \"ts\" >= ? AND \"ts\" <= ?"
    );
    assert_eq!(compiled.params, vec![json!("foo"), json!(1), json!(2)]);
}

#[test]
fn comparison_operators_translate() {
    let compiled = compile(&attrs(&[
        ("a", json!({ "lt": 5 })),
        ("b", json!({ "ge": 7 })),
        ("c", json!({ "ne": "x" })),
    ]))
    .unwrap();
    assert_eq!(
        compiled.clause,
        "\"a\" < ? AND \"b\" >= ? AND \"c\" != ?"
    );
    assert_eq!(compiled.params, vec![json!(5), json!(7), json!("x")]);
}

#[test]
fn operators_are_case_insensitive() {
    let compiled = compile(&attrs(&[("a", json!({ "GT": 1 }))])).unwrap();
    assert_eq!(compiled.clause, "\"a\" > ?");
}

#[test]
fn unknown_operator_fails() {
    assert!(compile(&attrs(&[("a", json!({ "like": "x" }))])).is_err());
}

#[test]
fn multi_key_operator_object_fails() {
    assert!(compile(&attrs(&[("a", json!({ "lt": 5, "gt": 1 }))])).is_err());
}

#[test]
fn between_requires_two_bounds() {
    assert!(compile(&attrs(&[("a", json!({ "between": [1] }))])).is_err());
    assert!(compile(&attrs(&[("a", json!({ "between": [1, 2, 3] }))])).is_err());
    assert!(compile(&attrs(&[("a", json!({ "between": 1 }))])).is_err());
}

#[test]
fn quotes_in_attribute_names_cannot_break_out() {
    let compiled = compile(&attrs(&[("a\" = ? OR \"1\"=\"1", json!(1))])).unwrap();
    // The embedded quotes are doubled, so the whole name stays one
    // identifier.
    assert_eq!(
        compiled.clause,
        "\"a\"\" = ? OR \"\"1\"\"=\"\"1\" = ?"
    );
    assert_eq!(compiled.params, vec![json!(1)]);
}

#[test]
fn placeholders_match_params_and_values_never_leak() {
    let compiled = compile(&attrs(&[
        ("key", json!("user's input")),
        ("ts", json!({ "between": [10, 20] })),
        ("rev", json!({ "le": 99 })),
    ]))
    .unwrap();
    let placeholders = compiled.clause.matches('?').count();
    assert_eq!(placeholders, compiled.params.len());
    assert!(!compiled.clause.contains("user's input"));
    assert!(!compiled.clause.contains("99"));
}
