//! Expressions, control flow and functions.

use pfa_ir::Pos;
use pfa_library::errors::CALL_DEPTH_LIMIT;
use pfa_library::RuntimeErrorKind;
use pretty_assertions::assert_eq;
use serde_json::json;

use super::{failure, output, outputs, runtime_code, runtime_kind};

#[test]
fn test_addition_and_overflow() {
    let doc = json!({
        "input": {"type": "record", "name": "Pair", "fields": [
            {"name": "x", "type": "int"}, {"name": "y", "type": "int"}
        ]},
        "output": "int",
        "action": {"+": ["input.x", "input.y"]}
    });
    assert_eq!(output(&doc, json!({"x": 3, "y": 4})), json!(7));
    let err = failure(&doc, json!({"x": 2_147_483_647, "y": 1}));
    assert_eq!(runtime_kind(&err), Some(RuntimeErrorKind::Overflow));
}

#[test]
fn test_action_value_widens_to_output() {
    let doc = json!({"input": "int", "output": "double", "action": {"+": ["input", 1]}});
    assert_eq!(output(&doc, json!(2)), json!(3.0));
}

#[test]
fn test_while_loop_with_locals() {
    let doc = json!({
        "input": "int", "output": "int",
        "action": [
            {"let": {"i": 0, "total": 0}},
            {"while": {"<": ["i", "input"]}, "do": [
                {"set": {"i": {"+": ["i", 1]}}},
                {"set": {"total": {"+": ["total", "i"]}}}
            ]},
            "total"
        ]
    });
    assert_eq!(outputs(&doc, &[json!(4), json!(0)]), vec![json!(10), json!(0)]);
}

#[test]
fn test_for_and_until_loops() {
    let doc = json!({
        "input": "int", "output": "int",
        "action": [
            {"let": {"acc": 0}},
            {"for": {"i": 0}, "while": {"<": ["i", "input"]}, "step": {"i": {"+": ["i", 1]}},
             "do": [{"set": {"acc": {"+": ["acc", "i"]}}}]},
            {"do": [{"set": {"acc": {"*": ["acc", 2]}}}], "until": {">": ["acc", 100]}},
            "acc"
        ]
    });
    // 0 + 1 + 2 + 3 = 6, doubled until above 100.
    assert_eq!(output(&doc, json!(4)), json!(192));
}

#[test]
fn test_foreach_and_forkey() {
    let doc = json!({
        "input": {"type": "map", "values": {"type": "array", "items": "int"}},
        "output": "string",
        "action": [
            {"let": {"out": [""]}},
            {"forkey": "k", "forval": "xs", "in": "input", "do": [
                {"set": {"out": {"s.concat": ["out", "k"]}}},
                {"foreach": "x", "in": "xs", "do": [
                    {"set": {"out": {"s.concat": ["out", ["+"]]}}}
                ]}
            ]},
            "out"
        ]
    });
    assert_eq!(output(&doc, json!({"a": [1, 2], "b": [3]})), json!("a++b+"));
}

#[test]
fn test_if_without_else_is_null_and_cond_picks_first_arm() {
    let doc = json!({
        "input": "int", "output": "string",
        "action": [
            {"if": true, "then": [["ignored"]]},
            {"cond": [
                {"if": {"<": ["input", 0]}, "then": [["negative"]]},
                {"if": {"<": ["input", 10]}, "then": [["small"]]}
            ], "else": [["large"]]}
        ]
    });
    assert_eq!(
        outputs(&doc, &[json!(-1), json!(3), json!(30)]),
        vec![json!("negative"), json!("small"), json!("large")]
    );
}

#[test]
fn test_short_circuit_skips_right_operand() {
    let doc = json!({
        "input": "int", "output": "boolean",
        "action": {"||": [{">": ["input", 0]}, {"==": [{"//": [1, "input"]}, 1]}]}
    });
    // With input 5 the division by zero never runs; with 0 it does.
    assert_eq!(output(&doc, json!(5)), json!(true));
    let err = failure(&doc, json!(0));
    assert_eq!(runtime_kind(&err), Some(RuntimeErrorKind::Domain));
}

#[test]
fn test_recursive_user_function() {
    let doc = json!({
        "input": "int", "output": "long",
        "fcns": {"fact": {"params": [{"n": "int"}], "ret": "long", "do": [
            {"if": {"<=": ["n", 1]}, "then": [1],
             "else": [{"*": ["n", {"u.fact": [{"-": ["n", 1]}]}]}]}
        ]}},
        "action": {"u.fact": ["input"]}
    });
    assert_eq!(output(&doc, json!(10)), json!(3_628_800));
}

#[test]
fn test_unbounded_recursion_hits_depth_limit() {
    let doc = json!({
        "input": "int", "output": "int",
        "fcns": {"down": {"params": [{"n": "int"}], "ret": "int", "do": [{"u.down": ["n"]}]}},
        "action": {"u.down": ["input"]}
    });
    let err = failure(&doc, json!(1));
    assert_eq!(runtime_code(&err), Some(CALL_DEPTH_LIMIT));
}

#[test]
fn test_callee_cannot_see_caller_locals() {
    let doc = json!({
        "input": "int", "output": "int",
        "fcns": {"twice": {"params": [{"x": "int"}], "ret": "int", "do": [
            {"let": {"y": {"*": ["x", 2]}}}, "y"
        ]}},
        "action": [{"let": {"y": 100}}, {"+": ["y", {"u.twice": ["input"]}]}]
    });
    assert_eq!(output(&doc, json!(3)), json!(106));
}

#[test]
fn test_inline_function_captures_by_value() {
    let doc = json!({
        "input": {"type": "array", "items": "int"},
        "output": {"type": "array", "items": "int"},
        "action": [
            {"let": {"k": 10}},
            {"let": {"f": {"params": [{"x": "int"}], "ret": "int", "do": [{"+": ["x", "k"]}]}}},
            {"set": {"k": 1000}},
            {"a.map": ["input", "f"]}
        ]
    });
    assert_eq!(output(&doc, json!([1, 2])), json!([11, 12]));
}

#[test]
fn test_function_reference_with_fill() {
    let doc = json!({
        "input": {"type": "array", "items": "int"},
        "output": {"type": "array", "items": "int"},
        "fcns": {"add": {"params": [{"x": "int"}, {"y": "int"}], "ret": "int", "do": [{"+": ["x", "y"]}]}},
        "action": {"a.map": ["input", {"fcn": "u.add", "fill": {"y": 100}}]}
    });
    assert_eq!(output(&doc, json!([1, 2])), json!([101, 102]));
}

#[test]
fn test_calling_a_function_value_widens_arguments() {
    let doc = json!({
        "input": "int", "output": "double",
        "action": [
            {"let": {"half": {"params": [{"x": "double"}], "ret": "double", "do": [{"/": ["x", 2]}]}}},
            {"half": ["input"]}
        ]
    });
    assert_eq!(output(&doc, json!(3)), json!(1.5));
}

#[test]
fn test_cast_dispatches_on_union_member() {
    let doc = json!({
        "input": ["int", "string"], "output": "string",
        "action": {"cast": "input", "cases": [
            {"as": "int", "named": "i", "do": [["an int"]]},
            {"as": "string", "named": "s", "do": ["s"]}
        ]}
    });
    assert_eq!(
        outputs(&doc, &[json!({"int": 3}), json!({"string": "hi"})]),
        vec![json!("an int"), json!("hi")]
    );
}

#[test]
fn test_partial_cast_yields_null() {
    let doc = json!({
        "input": ["int", "string"], "output": "int",
        "action": [
            {"let": {"seen": 0}},
            {"cast": "input", "partial": true, "cases": [
                {"as": "int", "named": "i", "do": [{"set": {"seen": "i"}}]}
            ]},
            "seen"
        ]
    });
    assert_eq!(
        outputs(&doc, &[json!({"int": 7}), json!({"string": "x"})]),
        vec![json!(7), json!(0)]
    );
}

#[test]
fn test_ifnotnull_binds_stripped_value() {
    let doc = json!({
        "input": ["null", "int"], "output": "int",
        "action": {"ifnotnull": {"x": "input"}, "then": [{"*": ["x", 2]}], "else": [-1]}
    });
    assert_eq!(outputs(&doc, &[json!(null), json!({"int": 4})]), vec![json!(-1), json!(8)]);
}

#[test]
fn test_impute_error_on_null() {
    let doc = json!({
        "input": ["int", "null"], "output": "int",
        "action": {"impute.errorOnNull": ["input"]}
    });
    assert_eq!(output(&doc, json!({"int": 5})), json!(5));
    let err = failure(&doc, json!(null));
    assert_eq!(runtime_kind(&err), Some(RuntimeErrorKind::Null));
    assert!(err.to_string().contains("encountered null"));
}

#[test]
fn test_record_construction_and_attr_update() {
    let point = json!({"type": "record", "name": "Point", "fields": [
        {"name": "x", "type": "int"}, {"name": "y", "type": "double"}
    ]});
    let doc = json!({
        "input": point.clone(), "output": "Point",
        "action": [
            {"let": {"p": {"new": {"x": "input.x", "y": 0.5}, "type": "Point"}}},
            {"attr": "p", "path": [["y"]], "to": {"+": ["input.y", 1]}}
        ]
    });
    assert_eq!(output(&doc, json!({"x": 1, "y": 2.0})), json!({"x": 1, "y": 3.0}));
}

#[test]
fn test_array_path_out_of_range() {
    let doc = json!({
        "input": {"type": "array", "items": "int"}, "output": "int",
        "action": {"attr": "input", "path": [2]}
    });
    assert_eq!(output(&doc, json!([5, 6, 7])), json!(7));
    let err = failure(&doc, json!([5]));
    assert_eq!(runtime_code(&err), Some(pfa_library::errors::INDEX_OUT_OF_RANGE));
}

#[test]
fn test_user_error_carries_code_and_position() {
    let doc = json!({
        "input": "int", "output": "int",
        "action": [{"if": {">": ["input", 0]}, "then": [{"error": "too big", "code": -7}]}, "input"]
    });
    assert_eq!(output(&doc, json!(0)), json!(0));
    let err = failure(&doc, json!(1));
    let runtime = err.as_runtime().unwrap();
    assert_eq!(runtime.kind, RuntimeErrorKind::User);
    assert_eq!(runtime.code, Some(-7));
    assert_eq!(
        runtime.pos,
        Some(Pos::root().key("action").index(0).key("then").index(0))
    );
}

#[test]
fn test_nearest_neighbors_are_stable_on_ties() {
    let doc = json!({
        "input": {"type": "array", "items": "double"},
        "output": {"type": "array", "items": {"type": "array", "items": "double"}},
        "cells": {"codebook": {
            "type": {"type": "array", "items": {"type": "array", "items": "double"}},
            "init": [[1.0, 1.0], [0.0, 0.0], [-1.0, -1.0], [5.0, 5.0], [1.0, -1.0]]
        }},
        "action": {"model.neighbor.nearestK": [3, "input", {"cell": "codebook"}]}
    });
    // The three non-zero entries near the origin tie; codebook order breaks it.
    assert_eq!(
        output(&doc, json!([0.0, 0.0])),
        json!([[0.0, 0.0], [1.0, 1.0], [-1.0, -1.0]])
    );
}
