//! Shared helpers for engine tests.

use pfac::{compile, Backend, CompileError, CompileOptions, EngineError, Program};
use serde_json::Value as Json;

pub const BACKENDS: [Backend; 2] = [Backend::Interpreter, Backend::Compiled];

/// Compile with the built-in catalog on `backend`.
pub fn compile_on(doc: &Json, backend: Backend) -> Program {
    match compile(doc, &CompileOptions::default().with_backend(backend)) {
        Ok(program) => program,
        Err(err) => panic!("document rejected:\n{err}"),
    }
}

pub fn compile_err(doc: &Json) -> CompileError {
    match compile(doc, &CompileOptions::default()) {
        Ok(_) => panic!("document compiled"),
        Err(err) => err,
    }
}

/// Feed `inputs` to one fresh instance.
pub fn score(program: &Program, inputs: &[Json]) -> Vec<Result<Json, EngineError>> {
    let mut instance = program.instantiate().unwrap();
    inputs.iter().map(|input| instance.action_json(input)).collect()
}

/// Score on the default backend, expecting every action to succeed.
pub fn score_ok(doc: &Json, inputs: &[Json]) -> Vec<Json> {
    score(&compile_on(doc, Backend::Interpreter), inputs)
        .into_iter()
        .map(|r| r.unwrap_or_else(|e| panic!("action failed: {e}")))
        .collect()
}
