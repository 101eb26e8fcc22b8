//! The interpreter and the compiled backend must agree on outputs, errors
//! and the final state of every cell and pool.

use pfac::{Backend, Program, Value};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value as Json};

use crate::common::compile_on;

type Trace = (Vec<Result<Json, String>>, Vec<Option<Value>>, Result<(), String>);

/// Run `inputs`, then close, recording everything observable.
fn trace(program: &Program, inputs: &[Json]) -> Trace {
    let mut instance = program.instantiate().unwrap();
    let outputs = inputs
        .iter()
        .map(|input| instance.action_json(input).map_err(|e| e.to_string()))
        .collect();
    let closed = instance.close().map_err(|e| e.to_string());
    let typed = program.typed();
    let mut state: Vec<Option<Value>> =
        typed.cells.iter().map(|c| instance.cell(&c.name)).collect();
    state.extend(typed.pools.iter().map(|p| instance.pool(&p.name).map(Value::map)));
    (outputs, state, closed)
}

fn assert_backends_agree(doc: &Json, inputs: &[Json]) {
    let interpreted = trace(&compile_on(doc, Backend::Interpreter), inputs);
    let compiled = trace(&compile_on(doc, Backend::Compiled), inputs);
    assert_eq!(interpreted, compiled, "{doc}");
}

fn corpus() -> Vec<(Json, Vec<Json>)> {
    vec![
        (
            json!({
                "input": "double", "output": "double",
                "action": {"m.round": [{"*": [{"m.sqrt": [{"m.abs": ["input"]}]}, 100]}]}
            }),
            vec![json!(2.0), json!(-9.0), json!(0.0)],
        ),
        (
            json!({
                "input": "int", "output": "int",
                "fcns": {"fib": {"params": [{"n": "int"}], "ret": "int", "do": [
                    {"if": {"<": ["n", 2]}, "then": ["n"],
                     "else": [{"+": [{"u.fib": [{"-": ["n", 1]}]}, {"u.fib": [{"-": ["n", 2]}]}]}]}
                ]}},
                "action": {"u.fib": ["input"]}
            }),
            vec![json!(0), json!(1), json!(15), json!(20)],
        ),
        (
            json!({
                "input": "int", "output": "int",
                "action": [
                    {"let": {"a": 0, "b": 1}},
                    {"for": {"i": 0}, "while": {"<": ["i", "input"]}, "step": {"i": {"+": ["i", 1]}},
                     "do": [{"let": {"next": {"+": ["a", "b"]}}}, {"set": {"a": "b", "b": "next"}}]},
                    "a"
                ]
            }),
            vec![json!(10), json!(46), json!(47)],
        ),
        (
            json!({
                "input": {"type": "array", "items": "string"}, "output": {"type": "map", "values": "int"},
                "pools": {"words": {"type": "int"}},
                "action": [
                    {"foreach": "w", "in": "input", "do": [
                        {"pool": "words", "path": [{"s.lower": ["w"]}], "to": {"params": [{"n": "int"}], "ret": "int", "do": [{"+": ["n", 1]}]}, "init": 0}
                    ]},
                    {"let": {"out": {"type": {"type": "map", "values": "int"}, "value": {}}}},
                    {"foreach": "w", "in": "input", "do": [
                        {"set": {"out": {"map.add": ["out", "w", {"pool": "words", "path": [{"s.lower": ["w"]}]}]}}}
                    ]},
                    "out"
                ]
            }),
            vec![json!(["A", "b", "a"]), json!([]), json!(["B"])],
        ),
        (
            json!({
                "input": ["null", "int", "string"], "output": "string",
                "cells": {"seen": {"type": "int", "init": 0}},
                "action": [
                    {"set": {"seen": {"+": [{"cell": "seen"}, 1]}}},
                    {"cast": "input", "cases": [
                        {"as": "null", "named": "n", "do": [["null"]]},
                        {"as": "int", "named": "i", "do": [{"if": {">": ["i", 10]}, "then": [{"error": "too big", "code": -3}], "else": [["small"]]}]},
                        {"as": "string", "named": "s", "do": [{"s.upper": ["s"]}]}
                    ]}
                ]
            }),
            vec![json!(null), json!({"int": 4}), json!({"int": 40}), json!({"string": "ok"})],
        ),
        (
            json!({
                "input": {"type": "array", "items": "double"}, "output": "double",
                "action": [
                    {"let": {"xs": {"a.filter": ["input", {"params": [{"x": "double"}], "ret": "boolean", "do": [{">": ["x", 0]}]}]}}},
                    {"a.mean": [{"a.sort": ["xs"]}]}
                ]
            }),
            vec![json!([1.0, -2.0, 3.0]), json!([-1.0])],
        ),
        (
            json!({
                "input": "string", "output": "int",
                "cells": {"log": {"type": {"type": "array", "items": "string"}, "init": []}},
                "begin": [{"set": {"log": {"a.append": [{"cell": "log"}, ["begin"]]}}}],
                "action": [
                    {"set": {"log": {"a.append": [{"cell": "log"}, "input"]}}},
                    {"s.len": [{"s.substr": ["input", 1, 3]}]}
                ],
                "end": [{"set": {"log": {"a.append": [{"cell": "log"}, ["end"]]}}}]
            }),
            vec![json!("hello"), json!("x")],
        ),
        (
            json!({
                "input": "long", "output": "long", "method": "fold", "zero": 1,
                "action": {"*": ["tally", "input"]},
                "merge": {"*": ["tallyOne", "tallyTwo"]}
            }),
            vec![json!(2), json!(3), json!(4_611_686_018_427_387_904_i64)],
        ),
        (
            json!({
                "input": "int", "output": "int",
                "action": [
                    {"let": {"acc": 0, "i": 0}},
                    {"do": [{"set": {"i": {"+": ["i", 1]}}}, {"set": {"acc": {"+": ["acc", {"%": ["i", 3]}]}}}],
                     "until": {">=": ["i", "input"]}},
                    {"for": {"j": 0}, "while": {"<": ["j", 3]}, "step": {"j": {"+": ["j", 1]}},
                     "do": [{"set": {"acc": {"-": ["acc", "j"]}}}]},
                    "acc"
                ]
            }),
            vec![json!(1), json!(10), json!(-5)],
        ),
    ]
}

#[test]
fn backends_agree_on_corpus() {
    for (doc, inputs) in corpus() {
        assert_backends_agree(&doc, &inputs);
    }
}

proptest! {
    #[test]
    fn backends_agree_on_checked_arithmetic(a in any::<i32>(), b in any::<i32>()) {
        let doc = json!({
            "input": {"type": "record", "name": "P", "fields": [
                {"name": "a", "type": "int"}, {"name": "b", "type": "int"}
            ]},
            "output": "int",
            "action": {"+": [{"*": ["input.a", 3]}, {"//": ["input.b", {"-": ["input.a", 7]}]}]}
        });
        let inputs = [json!({"a": a, "b": b})];
        let interpreted = trace(&compile_on(&doc, Backend::Interpreter), &inputs);
        let compiled = trace(&compile_on(&doc, Backend::Compiled), &inputs);
        prop_assert_eq!(interpreted, compiled);
    }
}
