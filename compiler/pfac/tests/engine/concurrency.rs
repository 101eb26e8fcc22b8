//! Many instances of one program, scored in parallel.

use pfac::{Backend, Value};
use pretty_assertions::assert_eq;
use rayon::prelude::*;
use serde_json::json;

use crate::common::{compile_on, score_ok, BACKENDS};

#[test]
fn private_cells_are_isolated_across_threads() {
    let doc = json!({
        "input": "int", "output": "int",
        "cells": {"sum": {"type": "int", "init": 0}},
        "action": [
            {"set": {"sum": {"+": [{"cell": "sum"}, "input"]}}},
            {"cell": "sum"}
        ]
    });
    for backend in BACKENDS {
        let program = compile_on(&doc, backend);
        let sums: Vec<i32> = (0..16)
            .into_par_iter()
            .map(|_| {
                let mut instance = program.instantiate().unwrap();
                let mut last = json!(null);
                for n in 1..=100 {
                    last = instance.action_json(&json!(n)).unwrap();
                }
                instance.close().unwrap();
                i32::try_from(last.as_i64().unwrap()).unwrap()
            })
            .collect();
        assert_eq!(sums, vec![5050; 16]);
    }
}

#[test]
fn shared_cell_updates_are_not_lost() {
    let doc = json!({
        "input": "null", "output": "long",
        "cells": {"hits": {"type": "long", "init": 0, "shared": true}},
        "action": [
            {"cell": "hits", "to": {"params": [{"n": "long"}], "ret": "long", "do": [{"+": ["n", 1]}]}}
        ]
    });
    for backend in BACKENDS {
        let program = compile_on(&doc, backend);
        (0..8).into_par_iter().for_each(|_| {
            let mut instance = program.instantiate().unwrap();
            for _ in 0..500 {
                instance.action_json(&json!(null)).unwrap();
            }
        });
        let observer = program.instantiate().unwrap();
        assert_eq!(observer.cell("hits"), Some(Value::Long(4000)));
    }
}

#[test]
fn shared_pool_collects_every_thread() {
    let doc = json!({
        "input": "string", "output": "int",
        "pools": {"seen": {"type": "int", "init": {}, "shared": true}},
        "action": [
            {"pool": "seen", "path": ["input"], "to": {"params": [{"n": "int"}], "ret": "int", "do": [{"+": ["n", 1]}]}, "init": 0}
        ]
    });
    let program = compile_on(&doc, Backend::Compiled);
    let keys = ["a", "b", "c", "d"];
    keys.par_iter().for_each(|key| {
        let mut instance = program.instantiate().unwrap();
        for _ in 0..50 {
            instance.action_json(&json!(key)).unwrap();
        }
    });
    let pool = program.instantiate().unwrap().pool("seen").unwrap();
    let mut counts: Vec<(String, Value)> = pool.into_iter().collect();
    counts.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        counts,
        keys.iter().map(|k| ((*k).to_string(), Value::Int(50))).collect::<Vec<_>>()
    );
}

#[test]
fn instance_indices_are_distinct() {
    let program = compile_on(
        &json!({"input": "null", "output": "int", "action": "instance"}),
        Backend::Interpreter,
    );
    let mut indices: Vec<i64> = (0..32)
        .into_par_iter()
        .map(|_| {
            let mut instance = program.instantiate().unwrap();
            instance.action_json(&json!(null)).unwrap().as_i64().unwrap()
        })
        .collect();
    indices.sort_unstable();
    assert_eq!(indices, (0..32).collect::<Vec<_>>());
}

#[test]
fn parallel_folds_merge_to_the_sequential_tally() {
    let doc = json!({
        "input": "long", "output": "long", "method": "fold", "zero": 0,
        "action": {"+": ["tally", "input"]},
        "merge": {"+": ["tallyOne", "tallyTwo"]}
    });
    let inputs: Vec<_> = (1..=1000).map(|n| json!(n)).collect();
    let sequential = score_ok(&doc, &inputs);

    let program = compile_on(&doc, Backend::Compiled);
    let tallies: Vec<Value> = inputs
        .par_chunks(97)
        .map(|chunk| {
            let mut instance = program.instantiate().unwrap();
            for input in chunk {
                instance.action_json(input).unwrap();
            }
            instance.tally()
        })
        .collect();
    let mut merger = program.instantiate().unwrap();
    let merged = tallies
        .into_iter()
        .reduce(|one, two| merger.merge(one, two).unwrap())
        .unwrap();
    assert_eq!(Some(merged), sequential.last().map(|j| Value::Long(j.as_i64().unwrap())));
}
