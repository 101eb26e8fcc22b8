//! Options, emit sinks, fold and merge, and closing, through the driver.

use std::sync::Arc;

use parking_lot::Mutex;
use pfa_library::errors::LOOP_LIMIT;
use pfac::{compile, CompileOptions, EngineError, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{compile_on, score, score_ok, BACKENDS};

fn busy_loop(options: serde_json::Value) -> serde_json::Value {
    json!({
        "input": "null", "output": "long",
        "options": options,
        "action": [
            {"let": {"n": {"long": 0}}},
            {"while": true, "do": [{"set": {"n": {"+": ["n", 1]}}}]},
            "n"
        ]
    })
}

#[test]
fn document_timeout_stops_a_runaway_action() {
    let doc = busy_loop(json!({"timeout.action": 20}));
    for backend in BACKENDS {
        let results = score(&compile_on(&doc, backend), &[json!(null)]);
        assert!(results[0].as_ref().unwrap_err().is_timeout(), "{backend:?}");
    }
}

#[test]
fn host_option_overrides_the_document() {
    let doc = busy_loop(json!({"timeout.action": 60_000}));
    let options = CompileOptions::default().with_option("timeout.action", json!(20));
    let program = compile(&doc, &options).unwrap();
    assert_eq!(program.options().timeout_action.map(|d| d.as_millis()), Some(20));
    let results = score(&program, &[json!(null)]);
    assert!(results[0].as_ref().unwrap_err().is_timeout());
}

#[test]
fn loop_limit_from_options() {
    let doc = json!({
        "input": "int", "output": "int",
        "options": {"loop.limit": 3},
        "action": [
            {"let": {"i": 0}},
            {"while": {"<": ["i", "input"]}, "do": [{"set": {"i": {"+": ["i", 1]}}}]},
            "i"
        ]
    });
    for backend in BACKENDS {
        let results = score(&compile_on(&doc, backend), &[json!(3), json!(4)]);
        assert_eq!(results[0], Ok(json!(3)));
        let err = results[1].as_ref().unwrap_err().as_runtime().unwrap();
        assert_eq!(err.code, Some(LOOP_LIMIT));
    }
}

#[test]
fn emit_reaches_a_host_callback() {
    let doc = json!({
        "input": {"type": "array", "items": "int"}, "output": "int", "method": "emit",
        "action": [
            {"foreach": "x", "in": "input", "do": [
                {"if": {"==": [{"%": ["x", 2]}, 0]}, "then": [{"emit": "x"}]}
            ]}
        ]
    });
    for backend in BACKENDS {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let program = compile_on(&doc, backend);
        let mut instance = program
            .instantiate_with(move |i| i.register_emit(move |v| sink.lock().push(v.clone())))
            .unwrap();
        assert_eq!(instance.action_json(&json!([1, 2, 3, 4])).unwrap(), json!(null));
        assert_eq!(instance.action_json(&json!([6])).unwrap(), json!(null));
        assert_eq!(*seen.lock(), vec![Value::Int(2), Value::Int(4), Value::Int(6)]);
    }
}

#[test]
fn fold_reports_the_running_tally() {
    let doc = json!({
        "input": "string", "output": {"type": "array", "items": "string"},
        "method": "fold", "zero": [],
        "action": {"a.append": ["tally", "input"]},
        "merge": {"a.append": ["tallyOne", {"s.concat": [["+"], {"s.concat": [["n="], ["2"]]}]}]}
    });
    assert_eq!(
        score_ok(&doc, &[json!("a"), json!("b")]),
        vec![json!(["a"]), json!(["a", "b"])]
    );
    let program = compile_on(&doc, pfac::Backend::Compiled);
    let mut instance = program.instantiate().unwrap();
    let one = Value::array(vec![Value::string("x")]);
    let merged = instance.merge(one, Value::array(Vec::new())).unwrap();
    assert_eq!(merged, Value::array(vec![Value::string("x"), Value::string("+n=2")]));
}

#[test]
fn map_documents_cannot_merge() {
    let doc = json!({"input": "int", "output": "int", "action": "input"});
    let program = compile_on(&doc, pfac::Backend::Interpreter);
    let mut instance = program.instantiate().unwrap();
    assert_eq!(
        instance.merge(Value::Int(1), Value::Int(2)),
        Err(EngineError::MergeUnavailable)
    );
}

#[test]
fn closed_instances_reject_every_call() {
    let doc = json!({
        "input": "int", "output": "int", "method": "fold", "zero": 0,
        "action": {"+": ["tally", "input"]},
        "merge": {"+": ["tallyOne", "tallyTwo"]}
    });
    for backend in BACKENDS {
        let program = compile_on(&doc, backend);
        let mut instance = program.instantiate().unwrap();
        instance.action_json(&json!(1)).unwrap();
        instance.close().unwrap();
        assert!(instance.is_closed());
        assert_eq!(instance.action_json(&json!(1)), Err(EngineError::Closed));
        assert_eq!(instance.merge(Value::Int(1), Value::Int(1)), Err(EngineError::Closed));
        assert_eq!(instance.close(), Err(EngineError::Closed));
        assert_eq!(instance.tally(), Value::Int(1));
    }
}

#[test]
fn log_lines_reach_a_host_callback() {
    let doc = json!({
        "input": "int", "output": "int",
        "action": [{"log": ["input"], "namespace": "score"}, "input"]
    });
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);
    let program = compile_on(&doc, pfac::Backend::Compiled);
    let mut instance = program.instantiate().unwrap();
    instance.register_log(move |ns, line| {
        sink.lock().push((ns.map(str::to_string), line.to_string()));
    });
    instance.action_json(&json!(7)).unwrap();
    assert_eq!(*lines.lock(), vec![(Some("score".to_string()), "7".to_string())]);
}
