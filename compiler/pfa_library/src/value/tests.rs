#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use std::cmp::Ordering;
use std::sync::Arc;

use indexmap::IndexMap;
use pfa_types::Type;
use pretty_assertions::assert_eq;

use super::*;

#[test]
fn numbers_compare_across_widths() {
    assert_eq!(compare(&Value::Int(3), &Value::Long(3)), Ordering::Equal);
    assert_eq!(compare(&Value::Int(2), &Value::Double(2.5)), Ordering::Less);
    assert_eq!(compare(&Value::Float(1.0), &Value::Int(0)), Ordering::Greater);
}

#[test]
fn nan_sorts_above_numbers() {
    assert_eq!(
        compare(&Value::Double(f64::NAN), &Value::Double(f64::INFINITY)),
        Ordering::Greater
    );
    assert!(values_equal(&Value::Double(0.0), &Value::Double(-0.0)));
}

#[test]
fn arrays_compare_lexicographically() {
    let a = Value::array(vec![Value::Int(1), Value::Int(2)]);
    let b = Value::array(vec![Value::Int(1), Value::Int(2), Value::Int(0)]);
    let c = Value::array(vec![Value::Int(1), Value::Int(3)]);
    assert_eq!(compare(&a, &b), Ordering::Less);
    assert_eq!(compare(&b, &c), Ordering::Less);
}

#[test]
fn maps_ignore_insertion_order() {
    let mut x = IndexMap::new();
    x.insert("a".to_string(), Value::Int(1));
    x.insert("b".to_string(), Value::Int(2));
    let mut y = IndexMap::new();
    y.insert("b".to_string(), Value::Int(2));
    y.insert("a".to_string(), Value::Int(1));
    assert!(values_equal(&Value::map(x), &Value::map(y)));
}

#[test]
fn enums_compare_by_symbol_position() {
    let Type::Enum(ty) = Type::enumeration("Color", &["red", "green", "blue"]) else {
        unreachable!()
    };
    let red = Value::enum_symbol(&ty, "red").unwrap();
    let blue = Value::enum_symbol(&ty, "blue").unwrap();
    assert_eq!(compare(&red, &blue), Ordering::Less);
    assert!(Value::enum_symbol(&ty, "purple").is_none());
}

#[test]
fn fill_interleaves_with_remaining_args() {
    let f = FcnValue {
        target: FcnTarget::User(0),
        captures: Arc::from(Vec::new()),
        fill: Arc::from(vec![(1, Value::Int(10))]),
    };
    assert_eq!(
        f.full_args(vec![Value::Int(1), Value::Int(2)]),
        vec![Value::Int(1), Value::Int(10), Value::Int(2)]
    );
}

#[test]
fn display_record() {
    let Type::Record(ty) = Type::record("P", vec![("x", Type::Int), ("s", Type::String)]) else {
        unreachable!()
    };
    let v = Value::record(ty, vec![Value::Int(1), Value::string("a")]);
    assert_eq!(v.to_string(), r#"P {x: 1, s: "a"}"#);
}
