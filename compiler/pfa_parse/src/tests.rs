#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use pfa_diagnostic::ErrorCode;
use pfa_ir::{ExprKind, Literal, Method, NewItems};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::parse;

#[test]
fn test_minimal_document() {
    let doc = parse(&json!({"input": "int", "output": "int", "action": "input"})).unwrap();
    assert_eq!(doc.method, Method::Map);
    assert_eq!(doc.action.len(), 1);
    assert_eq!(doc.arena.kind(doc.action[0]), &ExprKind::Ref("input".into()));
    assert_eq!(doc.input.pos.as_str(), "input");
}

#[test]
fn test_missing_required_fields() {
    let errors = parse(&json!({"input": "int"})).unwrap_err();
    let codes: Vec<ErrorCode> = errors.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![ErrorCode::E1002, ErrorCode::E1002]);
}

#[test]
fn test_not_an_object() {
    let errors = parse(&json!([1, 2])).unwrap_err();
    assert_eq!(errors[0].code, ErrorCode::E1001);
}

#[test]
fn test_unknown_top_level_field() {
    let errors =
        parse(&json!({"input": "int", "output": "int", "action": 1, "actoin": 2})).unwrap_err();
    assert_eq!(errors[0].code, ErrorCode::E1003);
    assert_eq!(errors[0].pos.as_str(), "actoin");
}

#[test]
fn test_literals() {
    let doc = parse(&json!({
        "input": "null",
        "output": "null",
        "action": [
            null, true, 7, 3000000000_i64, 2.5,
            {"int": 1}, {"long": 2}, {"float": 0.5}, {"double": 1.5},
            ["text"], {"string": "s"}, {"base64": "AQI="}
        ]
    }))
    .unwrap();
    let literals: Vec<Literal> = doc
        .action
        .iter()
        .map(|id| match doc.arena.kind(*id) {
            ExprKind::Literal(l) => l.clone(),
            other => panic!("expected literal, got {other:?}"),
        })
        .collect();
    assert_eq!(
        literals,
        vec![
            Literal::Null,
            Literal::Boolean(true),
            Literal::Int(7),
            Literal::Long(3_000_000_000),
            Literal::Double(2.5),
            Literal::Int(1),
            Literal::Long(2),
            Literal::Float(0.5),
            Literal::Double(1.5),
            Literal::String("text".into()),
            Literal::String("s".into()),
            Literal::Bytes(vec![1, 2]),
        ]
    );
}

#[test]
fn test_int_literal_out_of_range() {
    let errors =
        parse(&json!({"input": "int", "output": "int", "action": {"int": 3000000000_i64}}))
            .unwrap_err();
    assert_eq!(errors[0].code, ErrorCode::E1006);
}

#[test]
fn test_call_and_positions() {
    let doc = parse(&json!({
        "input": "int",
        "output": "int",
        "action": [{"+": ["input", {"u.double": "input"}]}]
    }))
    .unwrap();
    let ExprKind::Call { name, args } = doc.arena.kind(doc.action[0]) else {
        panic!("expected call");
    };
    assert_eq!(name.as_str(), "+");
    assert_eq!(args.len(), 2);
    assert_eq!(doc.arena.pos(args[1]).as_str(), "action[0][\"+\"][1]");
    let ExprKind::Call { name, args } = doc.arena.kind(args[1]) else {
        panic!("expected nested call");
    };
    assert_eq!(name.as_str(), "u.double");
    assert_eq!(args.len(), 1);
}

#[test]
fn test_attr_shorthand() {
    let doc = parse(&json!({"input": "int", "output": "int", "action": "input.point.0"})).unwrap();
    let ExprKind::Attr { expr, path, to } = doc.arena.kind(doc.action[0]) else {
        panic!("expected attr");
    };
    assert!(to.is_none());
    assert_eq!(doc.arena.kind(*expr), &ExprKind::Ref("input".into()));
    assert_eq!(
        doc.arena.kind(path[0]),
        &ExprKind::Literal(Literal::String("point".into()))
    );
    assert_eq!(doc.arena.kind(path[1]), &ExprKind::Literal(Literal::Int(0)));
}

#[test]
fn test_new_record_and_array() {
    let doc = parse(&json!({
        "input": "int",
        "output": "int",
        "action": [
            {"new": {"x": 1, "y": 2}, "type": "P"},
            {"new": [1, 2, 3], "type": {"type": "array", "items": "int"}}
        ]
    }))
    .unwrap();
    let ExprKind::New { items: NewItems::Fields(fields), .. } = doc.arena.kind(doc.action[0]) else {
        panic!("expected record construction");
    };
    assert_eq!(fields.len(), 2);
    let ExprKind::New { items: NewItems::Items(items), .. } = doc.arena.kind(doc.action[1]) else {
        panic!("expected array construction");
    };
    assert_eq!(items.len(), 3);
}

#[test]
fn test_cells_pools_and_fcns() {
    let doc = parse(&json!({
        "input": "int",
        "output": "int",
        "cells": {"counter": {"type": "int", "init": 0, "shared": true}},
        "pools": {"tally": {"type": "long", "init": {"a": 1}}},
        "fcns": {"inc": {"params": [{"v": "int"}], "ret": "int", "do": {"+": ["v", 1]}}},
        "action": {"cell": "counter"}
    }))
    .unwrap();
    assert_eq!(doc.cells.len(), 1);
    assert!(doc.cells[0].shared);
    assert_eq!(doc.pools[0].init.len(), 1);
    assert!(!doc.pools[0].shared);
    assert_eq!(doc.fcns[0].name.as_str(), "inc");
    assert_eq!(doc.fcns[0].def.params[0].name.as_str(), "v");
}

#[test]
fn test_control_flow_forms() {
    let doc = parse(&json!({
        "input": "int",
        "output": "int",
        "action": [
            {"let": {"i": 0}},
            {"while": {"<": ["i", 3]}, "do": {"set": {"i": {"+": ["i", 1]}}}},
            {"do": [1], "until": true},
            {"for": {"j": 0}, "while": {"<": ["j", 2]}, "step": {"j": {"+": ["j", 1]}}, "do": []},
            {"foreach": "x", "in": {"new": [], "type": {"type": "array", "items": "int"}}, "do": "x", "seq": true},
            {"cond": [{"if": true, "then": 1}], "else": 2},
            {"if": false, "then": 1},
            {"doc": "commentary"},
            "i"
        ]
    }))
    .unwrap();
    assert!(matches!(doc.arena.kind(doc.action[1]), ExprKind::While { .. }));
    assert!(matches!(doc.arena.kind(doc.action[2]), ExprKind::DoUntil { .. }));
    assert!(matches!(doc.arena.kind(doc.action[3]), ExprKind::For { .. }));
    assert!(matches!(doc.arena.kind(doc.action[4]), ExprKind::Foreach { seq: true, .. }));
    assert!(matches!(doc.arena.kind(doc.action[5]), ExprKind::Cond { .. }));
    assert!(matches!(doc.arena.kind(doc.action[6]), ExprKind::If { else_: None, .. }));
    assert!(matches!(doc.arena.kind(doc.action[7]), ExprKind::Doc(_)));
}

#[test]
fn test_cast_form() {
    let doc = parse(&json!({
        "input": ["int", "string"],
        "output": "int",
        "action": {"cast": "input", "cases": [
            {"as": "int", "named": "i", "do": "i"},
            {"as": "string", "named": "s", "do": {"s.len": "s"}}
        ]}
    }))
    .unwrap();
    let ExprKind::Cast { cases, partial, .. } = doc.arena.kind(doc.action[0]) else {
        panic!("expected cast");
    };
    assert!(!partial);
    assert_eq!(cases.len(), 2);
    assert_eq!(cases[1].named.as_str(), "s");
}

#[test]
fn test_unexpected_field_in_form() {
    let errors = parse(&json!({
        "input": "int",
        "output": "int",
        "action": {"if": true, "then": 1, "otherwise": 2}
    }))
    .unwrap_err();
    assert_eq!(errors[0].code, ErrorCode::E1005);
    assert_eq!(errors[0].pos.as_str(), "action.otherwise");
}

#[test]
fn test_bare_string_is_not_a_literal() {
    let errors =
        parse(&json!({"input": "int", "output": "int", "action": "hello world"})).unwrap_err();
    assert_eq!(errors[0].code, ErrorCode::E1004);
}

#[test]
fn test_errors_are_collected() {
    let errors = parse(&json!({
        "input": "int",
        "output": "int",
        "method": "reduce",
        "action": [[1, 2], {"emit": [1, 2]}]
    }))
    .unwrap_err();
    assert_eq!(errors.len(), 3);
}

#[test]
fn test_fcn_ref_with_fill() {
    let doc = parse(&json!({
        "input": "int",
        "output": "int",
        "action": {"fcn": "u.add", "fill": {"y": 1}}
    }))
    .unwrap();
    let ExprKind::FcnRef { name, fill } = doc.arena.kind(doc.action[0]) else {
        panic!("expected fcn ref");
    };
    assert_eq!(name.as_str(), "u.add");
    assert_eq!(fill.len(), 1);
}

#[test]
fn test_randseed_must_be_an_integer() {
    let seeded = json!({"input": "int", "output": "int", "action": "input", "randseed": 7});
    assert_eq!(parse(&seeded).unwrap().randseed, Some(7));

    let fractional = json!({"input": "int", "output": "int", "action": "input", "randseed": 1.5});
    let errors = parse(&fractional).unwrap_err();
    assert_eq!(errors[0].code, ErrorCode::E4002);
    assert_eq!(errors[0].pos.as_str(), "randseed");
}
