#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;

fn point() -> Type {
    Type::Record(Arc::new(pfa_types::RecordType {
        name: "Point".to_string(),
        fields: vec![
            pfa_types::Field {
                name: "x".to_string(),
                ty: Type::Double,
                default: None,
            },
            pfa_types::Field {
                name: "label".to_string(),
                ty: Type::String,
                default: Some(json!("none")),
            },
            pfa_types::Field {
                name: "weight".to_string(),
                ty: Type::nullable(Type::Double),
                default: None,
            },
        ],
    }))
}

#[test]
fn record_fills_defaults_and_nulls() {
    let v = decode(&json!({"x": 1}), &point()).unwrap();
    let Value::Record { fields, .. } = &v else {
        panic!("expected record, got {v:?}")
    };
    assert_eq!(
        fields.as_slice(),
        &[Value::Double(1.0), Value::string("none"), Value::Null]
    );
}

#[test]
fn record_requires_non_nullable_fields() {
    let err = decode(&json!({"label": "a"}), &point()).unwrap_err();
    assert_eq!(err.path, r#"["x"]"#);
    assert_eq!(err.message, "missing required field");
}

#[test]
fn record_rejects_unknown_fields() {
    let err = decode(&json!({"x": 1, "z": 2}), &point()).unwrap_err();
    assert_eq!(err.message, r#"Point has no field "z""#);
}

#[test]
fn unions_are_tagged_by_branch() {
    let u = Type::nullable(Type::Int);
    assert_eq!(decode(&json!(null), &u).unwrap(), Value::Null);
    assert_eq!(decode(&json!({"int": 5}), &u).unwrap(), Value::Int(5));
    assert!(decode(&json!(5), &u).is_err());
    assert_eq!(encode(&Value::Int(5), &u).unwrap(), json!({"int": 5}));
    assert_eq!(encode(&Value::Null, &u).unwrap(), json!(null));
}

#[test]
fn named_branches_use_full_names() {
    let u = Type::Union(Arc::from(vec![Type::Null, point()]));
    let v = decode(&json!({"Point": {"x": 2.5}}), &u).unwrap();
    assert_eq!(
        encode(&v, &u).unwrap(),
        json!({"Point": {"x": 2.5, "label": "none", "weight": null}})
    );
}

#[test]
fn bytes_are_code_points() {
    let v = decode(&json!("a\u{00ff}"), &Type::Bytes).unwrap();
    assert_eq!(v, Value::bytes([0x61, 0xff]));
    assert_eq!(encode(&v, &Type::Bytes).unwrap(), json!("a\u{00ff}"));
    assert!(decode(&json!("\u{0100}"), &Type::Bytes).is_err());
}

#[test]
fn fixed_checks_size() {
    let ty = Type::fixed("Hash", 2);
    assert!(decode(&json!("ab"), &ty).is_ok());
    let err = decode(&json!("abc"), &ty).unwrap_err();
    assert_eq!(err.message, "Hash needs 2 bytes, found 3");
}

#[test]
fn int_range_is_checked() {
    assert!(decode(&json!(2_147_483_648_i64), &Type::Int).is_err());
    assert_eq!(
        decode(&json!(2_147_483_648_i64), &Type::Long).unwrap(),
        Value::Long(2_147_483_648)
    );
}

#[test]
fn non_finite_doubles_use_strings() {
    assert_eq!(encode(&Value::Double(f64::NAN), &Type::Double).unwrap(), json!("NaN"));
    assert_eq!(
        encode(&Value::Double(f64::NEG_INFINITY), &Type::Double).unwrap(),
        json!("-Infinity")
    );
    assert_eq!(
        decode(&json!("Infinity"), &Type::Double).unwrap(),
        Value::Double(f64::INFINITY)
    );
}

#[test]
fn error_path_points_into_containers() {
    let ty = Type::map(Type::array(Type::Int));
    let err = decode(&json!({"a": [1, "two"]}), &ty).unwrap_err();
    assert_eq!(err.path, r#"["a"][1]"#);
    assert_eq!(err.to_string(), r#"expected int, found string at ["a"][1]"#);
}

#[test]
fn enum_symbols() {
    let ty = Type::enumeration("Color", &["red", "green"]);
    let v = decode(&json!("green"), &ty).unwrap();
    assert_eq!(encode(&v, &ty).unwrap(), json!("green"));
    assert!(decode(&json!("blue"), &ty).is_err());
}
