#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use pfa_diagnostic::{Diagnostic, ErrorCode};
use pfa_library::{FunctionRegistry, Value};
use pfa_types::Type;
use pretty_assertions::assert_eq;
use serde_json::{json, Value as Json};

use super::check;
use crate::ir::{FcnRefTarget, TKind, TypedProgram, Update};

fn compile(doc: &Json) -> Result<TypedProgram, Vec<Diagnostic>> {
    let doc = pfa_parse::parse(doc).expect("document parses");
    check(&doc, &FunctionRegistry::with_builtins())
}

fn ok(doc: &Json) -> TypedProgram {
    match compile(doc) {
        Ok(program) => program,
        Err(errors) => panic!("unexpected diagnostics: {errors:#?}"),
    }
}

fn codes(doc: &Json) -> Vec<ErrorCode> {
    match compile(doc) {
        Ok(_) => panic!("document was accepted"),
        Err(errors) => errors.iter().map(|d| d.code).collect(),
    }
}

fn last_action(program: &TypedProgram) -> (&TKind, &Type) {
    let last = *program.action.last().unwrap();
    (program.arena.kind(last), program.arena.ty(last))
}

// ============================================================================
// Declarations
// ============================================================================

#[test]
fn test_action_result_is_widened_to_output() {
    let program = ok(&json!({"input": "int", "output": "double", "action": "input"}));
    let (kind, ty) = last_action(&program);
    assert!(matches!(kind, TKind::Coerce(_)));
    assert_eq!(ty, &Type::Double);
    assert!(program.name.starts_with("Engine"));
}

#[test]
fn test_declared_name_is_kept() {
    let program = ok(&json!({
        "name": "scorer", "input": "int", "output": "int", "action": "input"
    }));
    assert_eq!(program.name, "scorer");
}

#[test]
fn test_cell_init_must_decode() {
    let doc = json!({
        "input": "int", "output": "int",
        "cells": {"c": {"type": "int", "init": "nope"}},
        "action": "input"
    });
    assert_eq!(codes(&doc), vec![ErrorCode::E3009]);
}

#[test]
fn test_cells_and_pools_decode_their_inits() {
    let program = ok(&json!({
        "input": "int", "output": "int",
        "cells": {"c": {"type": {"type": "array", "items": "int"}, "init": [1, 2]}},
        "pools": {"p": {"type": "double", "init": {"a": 1.5}, "shared": true}},
        "action": "input"
    }));
    assert_eq!(
        program.cells[0].init,
        Value::array(vec![Value::Int(1), Value::Int(2)])
    );
    assert_eq!(program.pools[0].init["a"], Value::Double(1.5));
    assert!(program.pools[0].shared);
}

#[test]
fn test_output_mismatch() {
    let doc = json!({"input": "string", "output": "int", "action": "input"});
    assert_eq!(codes(&doc), vec![ErrorCode::E3004]);
}

// ============================================================================
// Symbols and bindings
// ============================================================================

#[test]
fn test_unknown_symbol() {
    let doc = json!({"input": "int", "output": "int", "action": "nothing"});
    assert_eq!(codes(&doc), vec![ErrorCode::E3001]);
}

#[test]
fn test_input_is_not_visible_in_begin() {
    let doc = json!({"input": "int", "output": "int", "begin": "input", "action": "input"});
    assert_eq!(codes(&doc), vec![ErrorCode::E3012]);
}

#[test]
fn test_tally_requires_fold() {
    let doc = json!({"input": "int", "output": "int", "action": "tally"});
    assert_eq!(codes(&doc), vec![ErrorCode::E3012]);
}

#[test]
fn test_let_rules() {
    let shadow = json!({
        "input": "int", "output": "int",
        "action": [{"let": {"x": 1}}, {"let": {"x": 2}}, "x"]
    });
    assert_eq!(codes(&shadow), vec![ErrorCode::E3007]);

    let special = json!({"input": "int", "output": "int", "action": [{"let": {"input": 1}}, 1]});
    assert_eq!(codes(&special), vec![ErrorCode::E3008]);
}

#[test]
fn test_let_values_do_not_see_each_other() {
    let doc = json!({
        "input": "int", "output": "int",
        "action": [{"let": {"a": 1, "b": "a"}}, 1]
    });
    assert_eq!(codes(&doc), vec![ErrorCode::E3001]);
}

#[test]
fn test_set_widens_to_the_variable_type() {
    let program = ok(&json!({
        "input": "int", "output": "double",
        "action": [{"let": {"x": 0.5}}, {"set": {"x": "input"}}, "x"]
    }));
    let set = program.action[1];
    let TKind::Set(bindings) = program.arena.kind(set) else {
        panic!("expected set");
    };
    assert_eq!(program.arena.ty(bindings[0].1), &Type::Double);

    let narrowing = json!({
        "input": "int", "output": "int",
        "action": [{"let": {"x": 1}}, {"set": {"x": 0.5}}, "x"]
    });
    assert_eq!(codes(&narrowing), vec![ErrorCode::E3004]);
}

#[test]
fn test_set_on_read_only_and_captured_names() {
    let special = json!({"input": "int", "output": "int", "action": [{"set": {"input": 1}}, 1]});
    assert_eq!(codes(&special), vec![ErrorCode::E3008]);

    let captured = json!({
        "input": "int", "output": "int",
        "action": [
            {"let": {"x": 1}},
            {"let": {"f": {"params": [], "ret": "null", "do": [{"set": {"x": 2}}]}}},
            "x"
        ]
    });
    assert_eq!(codes(&captured), vec![ErrorCode::E3015]);
}

#[test]
fn test_set_on_cell_replaces_it() {
    let program = ok(&json!({
        "input": "int", "output": "int",
        "cells": {"c": {"type": "long", "init": 0}},
        "action": [{"set": {"c": "input"}}, "input"]
    }));
    let TKind::CellTo { path, to, .. } = program.arena.kind(program.action[0]) else {
        panic!("expected a cell update");
    };
    assert!(path.is_empty());
    assert!(matches!(to, Update::Value(_)));
}

// ============================================================================
// Calls
// ============================================================================

#[test]
fn test_library_call_picks_widened_signature() {
    let program = ok(&json!({"input": "int", "output": "double", "action": {"+": ["input", 2.5]}}));
    let (kind, ty) = last_action(&program);
    let TKind::CallLib { call, args } = kind else {
        panic!("expected a library call, got {kind:?}");
    };
    assert_eq!(call.fcn.name(), "+");
    assert_eq!(ty, &Type::Double);
    assert!(matches!(program.arena.kind(args[0]), TKind::Coerce(_)));
}

#[test]
fn test_no_matching_signature_lists_candidates() {
    let doc = json!({"input": "string", "output": "int", "action": {"+": ["input", 1]}});
    let errors = compile(&doc).unwrap_err();
    assert_eq!(errors[0].code, ErrorCode::E3003);
    assert!(!errors[0].notes.is_empty());
}

#[test]
fn test_unknown_function() {
    let doc = json!({"input": "int", "output": "int", "action": {"m.nope": ["input"]}});
    assert_eq!(codes(&doc), vec![ErrorCode::E3002]);
    let user = json!({"input": "int", "output": "int", "action": {"u.nope": ["input"]}});
    assert_eq!(codes(&user), vec![ErrorCode::E3002]);
}

#[test]
fn test_user_function_call() {
    let program = ok(&json!({
        "input": "int", "output": "double",
        "fcns": {"half": {"params": [{"x": "double"}], "ret": "double", "do": {"/": ["x", 2]}}},
        "action": {"u.half": ["input"]}
    }));
    assert_eq!(program.fcns.len(), 1);
    let (kind, _) = last_action(&program);
    assert!(matches!(kind, TKind::CallUser { .. }));
}

#[test]
fn test_user_function_sees_only_its_parameters() {
    let doc = json!({
        "input": "int", "output": "int",
        "fcns": {"f": {"params": [], "ret": "int", "do": "input"}},
        "action": {"u.f": []}
    });
    assert_eq!(codes(&doc), vec![ErrorCode::E3012]);
}

#[test]
fn test_user_function_arity() {
    let doc = json!({
        "input": "int", "output": "int",
        "fcns": {"f": {"params": [{"x": "int"}], "ret": "int", "do": "x"}},
        "action": {"u.f": [1, 2]}
    });
    assert_eq!(codes(&doc), vec![ErrorCode::E3003]);
}

#[test]
fn test_short_circuit_operators() {
    let program = ok(&json!({
        "input": "boolean", "output": "boolean",
        "action": {"&&": ["input", {"||": [false, "input"]}]}
    }));
    assert!(matches!(last_action(&program).0, TKind::And(..)));
}

#[test]
fn test_function_valued_local_is_callable() {
    let program = ok(&json!({
        "input": "int", "output": "int",
        "action": [
            {"let": {"inc": {"params": [{"x": "int"}], "ret": "int", "do": {"+": ["x", 1]}}}},
            {"inc": "input"}
        ]
    }));
    assert!(matches!(last_action(&program).0, TKind::CallValue { .. }));
}

// ============================================================================
// Function references
// ============================================================================

#[test]
fn test_fill_leaves_remaining_parameters() {
    let program = ok(&json!({
        "input": {"type": "array", "items": "double"}, "output": {"type": "array", "items": "double"},
        "fcns": {"scale": {
            "params": [{"k": "double"}, {"x": "double"}], "ret": "double", "do": {"*": ["k", "x"]}
        }},
        "action": {"a.map": ["input", {"fcn": "u.scale", "fill": {"k": 2}}]}
    }));
    let (TKind::CallLib { args, .. }, _) = last_action(&program) else {
        panic!("expected a library call");
    };
    let fcn = args[1];
    assert_eq!(program.arena.ty(fcn), &Type::fcn(vec![Type::Double], Type::Double));
    let TKind::MakeFcn { target, fill } = program.arena.kind(fcn) else {
        panic!("expected a function value");
    };
    assert!(matches!(target, FcnRefTarget::User(_)));
    assert_eq!(fill.len(), 1);
    assert_eq!(fill[0].0, 0);
}

#[test]
fn test_fill_of_unknown_parameter() {
    let doc = json!({
        "input": "double", "output": "double",
        "fcns": {"id": {"params": [{"x": "double"}], "ret": "double", "do": "x"}},
        "action": [{"let": {"f": {"fcn": "u.id", "fill": {"y": 1.0}}}}, "input"]
    });
    assert_eq!(codes(&doc), vec![ErrorCode::E3014]);
}

#[test]
fn test_generic_library_function_cannot_be_referenced() {
    let doc = json!({
        "input": "double", "output": "double",
        "action": [{"let": {"f": {"fcn": "+"}}}, "input"]
    });
    assert_eq!(codes(&doc), vec![ErrorCode::E3014]);
    ok(&json!({
        "input": "double", "output": "double",
        "action": [{"let": {"f": {"fcn": "m.sqrt"}}}, {"f": "input"}]
    }));
}

#[test]
fn test_inline_function_records_captures() {
    let program = ok(&json!({
        "input": {"type": "array", "items": "int"}, "output": {"type": "array", "items": "int"},
        "action": [
            {"let": {"offset": 10}},
            {"a.map": ["input", {"params": [{"x": "int"}], "ret": "int", "do": {"+": ["x", "offset"]}}]}
        ]
    }));
    assert_eq!(program.inline.len(), 1);
    assert_eq!(program.inline[0].captures, vec![pfa_ir::Name::new("offset")]);
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_if_branches_join() {
    let program = ok(&json!({
        "input": "boolean", "output": "double",
        "action": {"if": "input", "then": 1, "else": 2.5}
    }));
    let (kind, ty) = last_action(&program);
    assert!(matches!(kind, TKind::If { .. }));
    assert_eq!(ty, &Type::Double);

    let mixed = ok(&json!({
        "input": "boolean", "output": ["int", "string"],
        "action": {"if": "input", "then": 1, "else": [["one"]]}
    }));
    assert!(last_action(&mixed).1.is_union());
}

#[test]
fn test_if_without_else_is_null() {
    let program = ok(&json!({
        "input": "boolean", "output": "null",
        "action": {"if": "input", "then": 1}
    }));
    assert_eq!(last_action(&program).1, &Type::Null);
}

#[test]
fn test_raising_branch_does_not_widen_the_join() {
    let program = ok(&json!({
        "input": "boolean", "output": "int",
        "action": {"if": "input", "then": 1, "else": {"error": "bad"}}
    }));
    assert_eq!(last_action(&program).1, &Type::Int);
}

#[test]
fn test_condition_must_be_boolean() {
    let doc = json!({"input": "int", "output": "null", "action": {"while": "input", "do": []}});
    assert_eq!(codes(&doc), vec![ErrorCode::E3004]);
}

#[test]
fn test_loops_bind_fresh_names() {
    ok(&json!({
        "input": {"type": "map", "values": "int"}, "output": "int",
        "action": [
            {"let": {"total": 0}},
            {"forkey": "k", "forval": "v", "in": "input", "do": {"set": {"total": {"+": ["total", "v"]}}}},
            {"for": {"i": 0}, "while": {"<": ["i", 3]}, "step": {"i": {"+": ["i", 1]}}, "do": []},
            "total"
        ]
    }));
    let reuse = json!({
        "input": {"type": "array", "items": "int"}, "output": "int",
        "action": [{"let": {"x": 0}}, {"foreach": "x", "in": "input", "do": []}, "x"]
    });
    assert_eq!(codes(&reuse), vec![ErrorCode::E3007]);
}

#[test]
fn test_cast_must_cover_every_member() {
    let doc = json!({
        "input": ["int", "string", "null"], "output": "int",
        "action": {"cast": "input", "cases": [
            {"as": "int", "named": "i", "do": "i"},
            {"as": "string", "named": "s", "do": {"s.len": "s"}}
        ]}
    });
    assert_eq!(codes(&doc), vec![ErrorCode::E3011]);
}

#[test]
fn test_cast_cases() {
    let program = ok(&json!({
        "input": ["int", "string"], "output": "int",
        "action": {"cast": "input", "cases": [
            {"as": "int", "named": "i", "do": "i"},
            {"as": "string", "named": "s", "do": {"s.len": "s"}}
        ]}
    }));
    let (TKind::Cast { cases, .. }, ty) = last_action(&program) else {
        panic!("expected a cast");
    };
    assert_eq!(cases.len(), 2);
    assert_eq!(ty, &Type::Int);

    let partial = ok(&json!({
        "input": ["int", "string"], "output": "null",
        "action": {"cast": "input", "partial": true, "cases": [{"as": "int", "named": "i", "do": "i"}]}
    }));
    assert_eq!(last_action(&partial).1, &Type::Null);

    let not_member = json!({
        "input": ["int", "string"], "output": "null",
        "action": {"cast": "input", "partial": true, "cases": [{"as": "double", "named": "d", "do": "d"}]}
    });
    assert_eq!(codes(&not_member), vec![ErrorCode::E3011]);
}

#[test]
fn test_ifnotnull_strips_null() {
    let program = ok(&json!({
        "input": ["double", "null"], "output": "double",
        "action": {"ifnotnull": {"x": "input"}, "then": "x", "else": 0.0}
    }));
    assert_eq!(last_action(&program).1, &Type::Double);

    let not_nullable = json!({
        "input": "double", "output": "null",
        "action": {"ifnotnull": {"x": "input"}, "then": "x"}
    });
    assert_eq!(codes(&not_nullable), vec![ErrorCode::E3004]);
}

// ============================================================================
// Cells, pools and paths
// ============================================================================

#[test]
fn test_record_paths() {
    let input = json!({"type": "record", "name": "Point", "fields": [
        {"name": "x", "type": "double"}, {"name": "y", "type": "double"}
    ]});
    let program = ok(&json!({"input": input.clone(), "output": "double", "action": "input.y"}));
    let (TKind::Attr { path, .. }, _) = last_action(&program) else {
        panic!("expected attr");
    };
    assert!(matches!(path[0], crate::ir::PathStep::Field(1)));

    let missing = json!({"input": input, "output": "double", "action": "input.z"});
    assert_eq!(codes(&missing), vec![ErrorCode::E3006]);
}

#[test]
fn test_pool_key_must_be_a_string() {
    let doc = json!({
        "input": "int", "output": "double",
        "pools": {"p": {"type": "double"}},
        "action": {"pool": "p", "path": ["input"]}
    });
    assert_eq!(codes(&doc), vec![ErrorCode::E3006]);
}

#[test]
fn test_pool_init_requires_to() {
    let doc = json!({
        "input": "string", "output": "double",
        "pools": {"p": {"type": "double"}},
        "action": {"pool": "p", "path": ["input"], "init": 0.0}
    });
    assert_eq!(codes(&doc), vec![ErrorCode::E3006]);
}

#[test]
fn test_unknown_cell() {
    let doc = json!({"input": "int", "output": "int", "action": {"cell": "missing"}});
    assert_eq!(codes(&doc), vec![ErrorCode::E3005]);
}

#[test]
fn test_update_function_may_not_touch_state() {
    let direct = json!({
        "input": "int", "output": "int",
        "cells": {"a": {"type": "int", "init": 0}, "b": {"type": "int", "init": 0}},
        "action": [
            {"cell": "a", "to": {"params": [{"old": "int"}], "ret": "int", "do": {"cell": "b"}}},
            "input"
        ]
    });
    assert_eq!(codes(&direct), vec![ErrorCode::E3010]);

    let indirect = json!({
        "input": "int", "output": "int",
        "cells": {"a": {"type": "int", "init": 0}, "b": {"type": "int", "init": 0}},
        "fcns": {
            "peek": {"params": [], "ret": "int", "do": {"cell": "b"}},
            "bump": {"params": [{"old": "int"}], "ret": "int", "do": {"+": ["old", {"u.peek": []}]}}
        },
        "action": [{"cell": "a", "to": {"fcn": "u.bump"}}, "input"]
    });
    assert_eq!(codes(&indirect), vec![ErrorCode::E3010]);
}

#[test]
fn test_pure_update_function() {
    let program = ok(&json!({
        "input": "int", "output": "int",
        "cells": {"count": {"type": "int", "init": 0}},
        "fcns": {"inc": {"params": [{"old": "int"}], "ret": "int", "do": {"+": ["old", 1]}}},
        "action": {"cell": "count", "to": {"fcn": "u.inc"}}
    }));
    let (TKind::CellTo { to, .. }, ty) = last_action(&program) else {
        panic!("expected a cell update");
    };
    assert!(matches!(to, Update::Fcn(_)));
    assert_eq!(ty, &Type::Int);
}

// ============================================================================
// Methods
// ============================================================================

#[test]
fn test_fold_requires_zero_and_merge() {
    let doc = json!({
        "input": "int", "output": "int", "method": "fold",
        "action": {"+": ["tally", "input"]}
    });
    assert_eq!(codes(&doc), vec![ErrorCode::E3012, ErrorCode::E3012]);

    let program = ok(&json!({
        "input": "int", "output": "int", "method": "fold", "zero": 0,
        "action": {"+": ["tally", "input"]},
        "merge": {"+": ["tallyOne", "tallyTwo"]}
    }));
    assert_eq!(program.zero, Some(Value::Int(0)));
    assert!(program.merge.is_some());
}

#[test]
fn test_zero_outside_fold() {
    let doc = json!({"input": "int", "output": "int", "zero": 0, "action": "input"});
    assert_eq!(codes(&doc), vec![ErrorCode::E3012]);
}

#[test]
fn test_emit_requires_emit_method() {
    let doc = json!({"input": "int", "output": "int", "action": {"emit": "input"}});
    assert_eq!(codes(&doc), vec![ErrorCode::E3012]);

    let program = ok(&json!({
        "input": "int", "output": "double", "method": "emit",
        "action": {"emit": "input"}
    }));
    let (TKind::Emit(value), _) = last_action(&program) else {
        panic!("expected emit");
    };
    assert_eq!(program.arena.ty(*value), &Type::Double);
}

#[test]
fn test_errors_accumulate() {
    let doc = json!({
        "input": "int", "output": "int",
        "begin": ["nope"],
        "action": [{"m.nope": []}, "input"],
        "end": [{"cell": "nope"}]
    });
    assert_eq!(codes(&doc), vec![ErrorCode::E3001, ErrorCode::E3002, ErrorCode::E3005]);
}
