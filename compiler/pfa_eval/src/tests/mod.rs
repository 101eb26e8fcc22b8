//! Engine tests.
//!
//! Every document runs on both backends; helpers assert the backends agree
//! before handing back the interpreter's results.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

mod semantics;

use pfa_library::{EvalError, FunctionRegistry, RuntimeErrorKind};
use pretty_assertions::assert_eq;
use serde_json::Value as Json;

use crate::{Backend, EngineError, EngineOptions, Program};

const BACKENDS: [Backend; 2] = [Backend::Interpreter, Backend::Compiled];

fn program_with(doc: &Json, backend: Backend, options: EngineOptions) -> Program {
    let parsed = pfa_parse::parse(doc).expect("document parses");
    let typed = match pfa_typeck::check(&parsed, &FunctionRegistry::with_builtins()) {
        Ok(typed) => typed,
        Err(errors) => panic!("document rejected: {errors:#?}"),
    };
    Program::new(typed, backend, options)
}

fn program(doc: &Json, backend: Backend) -> Program {
    program_with(doc, backend, EngineOptions::default())
}

/// Run `inputs` through one fresh instance per backend.
fn actions(doc: &Json, inputs: &[Json]) -> Vec<Result<Json, EngineError>> {
    let [first, second] = BACKENDS.map(|backend| {
        let mut instance = program(doc, backend).instantiate().unwrap();
        inputs
            .iter()
            .map(|input| instance.action_json(input))
            .collect::<Vec<_>>()
    });
    assert_eq!(first, second, "backends disagree");
    first
}

fn outputs(doc: &Json, inputs: &[Json]) -> Vec<Json> {
    actions(doc, inputs)
        .into_iter()
        .map(|r| r.unwrap_or_else(|e| panic!("action failed: {e}")))
        .collect()
}

fn output(doc: &Json, input: Json) -> Json {
    outputs(doc, &[input]).remove(0)
}

fn failure(doc: &Json, input: Json) -> EngineError {
    match actions(doc, &[input]).remove(0) {
        Ok(value) => panic!("action succeeded with {value}"),
        Err(e) => e,
    }
}

fn runtime_code(err: &EngineError) -> Option<i32> {
    err.as_runtime().and_then(|e| e.code)
}

fn runtime_kind(err: &EngineError) -> Option<RuntimeErrorKind> {
    err.as_runtime().map(|e| e.kind)
}

#[test]
fn test_timeout_is_not_a_runtime_error() {
    let a = EngineError::Eval(EvalError::Timeout {
        phase: "action",
        limit_ms: 1,
    });
    assert!(a.is_timeout());
    assert_eq!(a.as_runtime(), None);
}
