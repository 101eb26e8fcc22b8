//! The built-in function catalog.
//!
//! One module per namespace. Each `register` adds its functions with their
//! signatures; bodies are plain functions matched on argument values that
//! the engine has already widened to the resolved parameter types.

mod array;
mod cast;
mod impute;
mod map;
mod math;
mod metric;
mod neighbor;
mod operators;
mod rand;
mod string;

use std::sync::Arc;

use pfa_types::{Pattern, Sig, SignatureSet};

use crate::errors::{bad_arguments, integer_overflow};
use crate::{Builtin, BuiltinFn, EvalError, FcnValue, FunctionRegistry, Value};

type Out = Result<Value, EvalError>;

/// Register every built-in.
pub(crate) fn register_all(registry: &mut FunctionRegistry) {
    operators::register(registry);
    math::register(registry);
    cast::register(registry);
    impute::register(registry);
    array::register(registry);
    string::register(registry);
    map::register(registry);
    rand::register(registry);
    metric::register(registry);
    neighbor::register(registry);
}

fn define(
    registry: &mut FunctionRegistry,
    name: &'static str,
    alternatives: Vec<Sig>,
    body: BuiltinFn,
) {
    registry.register(Arc::new(Builtin::new(
        name,
        SignatureSet::new(alternatives),
        body,
    )));
}

fn sig(params: Vec<(&'static str, Pattern)>, ret: Pattern) -> Sig {
    Sig::new(params, ret)
}

// ============================================================================
// Argument access
// ============================================================================

fn bad(args: &[Value]) -> EvalError {
    bad_arguments(args).into()
}

/// Map a checked integer result, raising overflow with `code` on `None`.
#[inline]
fn checked<T>(result: Option<T>, wrap: fn(T) -> Value, code: i32) -> Out {
    result.map(wrap).ok_or_else(|| integer_overflow(code).into())
}

fn array_arg<'a>(args: &'a [Value], i: usize) -> Result<&'a [Value], EvalError> {
    args.get(i).and_then(Value::as_array).ok_or_else(|| bad(args))
}

fn str_arg<'a>(args: &'a [Value], i: usize) -> Result<&'a str, EvalError> {
    args.get(i).and_then(Value::as_str).ok_or_else(|| bad(args))
}

fn int_arg(args: &[Value], i: usize) -> Result<i32, EvalError> {
    match args.get(i) {
        Some(Value::Int(n)) => Ok(*n),
        _ => Err(bad(args)),
    }
}

fn double_arg(args: &[Value], i: usize) -> Result<f64, EvalError> {
    match args.get(i) {
        Some(Value::Double(x)) => Ok(*x),
        _ => Err(bad(args)),
    }
}

fn fcn_arg(args: &[Value], i: usize) -> Result<&FcnValue, EvalError> {
    match args.get(i) {
        Some(Value::Fcn(f)) => Ok(f),
        _ => Err(bad(args)),
    }
}

fn doubles(items: &[Value]) -> Result<Vec<f64>, EvalError> {
    items
        .iter()
        .map(|v| match v {
            Value::Double(x) => Ok(*x),
            _ => Err(bad(items)),
        })
        .collect()
}

/// Python-style slice bounds: negative indexes count from the end, then clamp.
fn slice_bounds(len: usize, start: i32, end: i32) -> (usize, usize) {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let norm = |i: i32| {
        let i = i64::from(i);
        let i = if i < 0 { i + len_i } else { i };
        usize::try_from(i.clamp(0, len_i)).unwrap_or(0)
    };
    let (start, end) = (norm(start), norm(end));
    (start, end.max(start))
}

fn len_value(len: usize) -> Value {
    Value::Int(i32::try_from(len).unwrap_or(i32::MAX))
}
