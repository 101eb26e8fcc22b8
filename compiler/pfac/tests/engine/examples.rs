//! The worked examples, each on both backends.

use std::sync::Arc;

use pfa_library::errors::encountered_null;
use pfa_library::{Builtin, CallContext, CallInfo, EvalError, FunctionRegistry, Value};
use pfa_types::{Pattern, Sig, SignatureSet};
use pfac::{compile, compile_str, CompileOptions, ErrorCode, ErrorKind, RuntimeErrorKind};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{compile_err, compile_on, score, BACKENDS};

#[test]
fn example_a_record_addition_and_overflow() {
    let doc = json!({
        "input": {"type": "record", "name": "Pair", "fields": [
            {"name": "x", "type": "int"}, {"name": "y", "type": "int"}
        ]},
        "output": "int",
        "action": {"+": ["input.x", "input.y"]}
    });
    for backend in BACKENDS {
        let program = compile_on(&doc, backend);
        let inputs = [json!({"x": 3, "y": 4}), json!({"x": 2_147_483_647, "y": 1})];
        let results = score(&program, &inputs);
        assert_eq!(results[0], Ok(json!(7)));
        let err = results[1].as_ref().unwrap_err();
        assert_eq!(err.as_runtime().map(|e| e.kind), Some(RuntimeErrorKind::Overflow));
    }
}

#[test]
fn example_b_cell_counter() {
    let doc = json!({
        "input": "null", "output": "int",
        "cells": {"count": {"type": "int", "init": 0}},
        "action": [
            {"cell": "count", "to": {"params": [{"v": "int"}], "ret": "int", "do": [{"+": ["v", 1]}]}},
            {"cell": "count"}
        ]
    });
    for backend in BACKENDS {
        let program = compile_on(&doc, backend);
        assert_eq!(
            score(&program, &[json!(null), json!(null), json!(null)]),
            vec![Ok(json!(1)), Ok(json!(2)), Ok(json!(3))]
        );
        assert_eq!(score(&program, &[json!(null)]), vec![Ok(json!(1))]);
    }
}

#[test]
fn example_c_error_on_null() {
    let doc = json!({
        "input": ["int", "null"], "output": "int",
        "action": {"impute.errorOnNull": ["input"]}
    });
    for backend in BACKENDS {
        let program = compile_on(&doc, backend);
        let results = score(&program, &[json!(null), json!({"int": 5})]);
        let err = results[0].as_ref().unwrap_err().as_runtime().unwrap();
        assert_eq!(err.kind, RuntimeErrorKind::Null);
        assert_eq!(err.message, encountered_null(0).message);
        assert_eq!(results[1], Ok(json!(5)));
    }
}

fn doubled(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Result<Value, EvalError> {
    Ok(match args {
        [Value::Int(x)] => Value::Int(x.wrapping_mul(2)),
        [Value::Long(x)] => Value::Long(x.wrapping_mul(2)),
        _ => Value::Null,
    })
}

fn int_or_long_registry() -> Arc<FunctionRegistry> {
    let mut registry = FunctionRegistry::with_builtins();
    registry.register(Arc::new(Builtin::new(
        "doubled",
        SignatureSet::new(vec![
            Sig::new(vec![("x", Pattern::int())], Pattern::int()),
            Sig::new(vec![("x", Pattern::long())], Pattern::long()),
        ]),
        doubled,
    )));
    Arc::new(registry)
}

#[test]
fn example_d_no_alternative_accepts_float() {
    let options = CompileOptions::default().with_registry(int_or_long_registry());
    let rejected = json!({"input": "float", "output": "double", "action": {"doubled": ["input"]}});
    let err = compile(&rejected, &options).err().unwrap();
    assert_eq!(err.kind(), Some(ErrorKind::Semantic));
    assert_eq!(err.codes(), vec![ErrorCode::E3003]);
    assert_eq!(err.diagnostics()[0].pos.as_str(), "action");

    let accepted = json!({"input": "int", "output": "long", "action": {"doubled": ["input"]}});
    for backend in BACKENDS {
        let program = compile(&accepted, &options.clone().with_backend(backend)).unwrap();
        assert_eq!(score(&program, &[json!(21)]), vec![Ok(json!(42))]);
    }
}

#[test]
fn example_e_nearest_neighbors() {
    let doc = json!({
        "input": {"type": "array", "items": "double"},
        "output": {"type": "array", "items": {"type": "array", "items": "double"}},
        "cells": {"points": {
            "type": {"type": "array", "items": {"type": "array", "items": "double"}},
            "init": [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [3.0, 3.0], [-1.0, 0.0]]
        }},
        "action": {"model.neighbor.nearestK": [2, "input", {"cell": "points"}]}
    });
    for backend in BACKENDS {
        let program = compile_on(&doc, backend);
        // [1, 0], [0, 1] and [-1, 0] tie for second place at the origin;
        // codebook order decides.
        assert_eq!(
            score(&program, &[json!([0.0, 0.0]), json!([0.1, 0.0])]),
            vec![
                Ok(json!([[0.0, 0.0], [1.0, 0.0]])),
                Ok(json!([[0.0, 0.0], [1.0, 0.0]])),
            ]
        );
    }
}

#[test]
fn yaml_documents_compile() {
    let text = "
input: {type: record, name: Pair, fields: [{name: x, type: int}, {name: y, type: int}]}
output: int
action:
  - {+: [input.x, input.y]}
";
    let program = compile_str(text, &CompileOptions::default()).unwrap();
    let mut instance = program.instantiate().unwrap();
    assert_eq!(instance.action_json(&json!({"x": 1, "y": 2})).unwrap(), json!(3));
}

#[test]
fn construction_errors_by_kind() {
    let cases = [
        (json!([1]), ErrorKind::Syntax),
        (json!({"input": {"type": "nope"}, "output": "int", "action": 1}), ErrorKind::Schema),
        (json!({"input": "int", "output": "int", "action": "missing"}), ErrorKind::Semantic),
        (
            json!({
                "input": "int", "output": "int", "action": "input",
                "options": {"timeout": "x"}
            }),
            ErrorKind::Initialization,
        ),
    ];
    for (doc, kind) in cases {
        assert_eq!(compile_err(&doc).kind(), Some(kind), "{doc}");
    }
}

#[test]
fn every_error_is_reported_at_once() {
    let doc = json!({
        "input": "int", "output": "int",
        "fcns": {"f": {"params": [{"x": "int"}], "ret": "int", "do": ["y"]}},
        "action": [{"+": ["input", "z"]}]
    });
    assert_eq!(compile_err(&doc).diagnostics().len(), 2);
}
