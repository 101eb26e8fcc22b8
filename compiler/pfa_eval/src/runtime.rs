//! Semantics shared by both backends.
//!
//! Anything that does not depend on how a body is represented lives here:
//! argument widening for function values, library dispatch, `to` updates
//! of cells, pools and locals, union dispatch and log formatting. Both
//! backends calling the same helpers keeps their observable behavior
//! identical.

use std::sync::Arc;

use pfa_library::errors::{bad_arguments, key_not_found};
use pfa_library::json;
use pfa_library::{
    coerce, conforms, CallContext, CallInfo, EvalError, EvalResult, FcnTarget, FcnValue, LibFcn,
    Rng, Value,
};
use pfa_typeck::{CellId, FcnId, InlineId, LibCall, PathStep, PoolId, TypedProgram};
use pfa_types::Type;

use crate::path::{self, Step};
use crate::state::ExecState;

/// Calls a function value with the backend's body representation.
pub(crate) trait Invoke {
    fn invoke(&self, state: &mut ExecState, fcn: &FcnValue, args: Vec<Value>) -> EvalResult;
}

/// The engine as seen by a library function.
pub(crate) struct Ctx<'a, B: ?Sized> {
    pub backend: &'a B,
    pub state: &'a mut ExecState,
}

impl<B: Invoke + ?Sized> CallContext for Ctx<'_, B> {
    fn call(&mut self, fcn: &FcnValue, args: Vec<Value>) -> Result<Value, EvalError> {
        self.backend.invoke(self.state, fcn, args)
    }

    fn rng(&mut self) -> &mut Rng {
        &mut self.state.rng
    }

    fn check_deadline(&mut self) -> Result<(), EvalError> {
        self.state.check_deadline()
    }
}

// ============================================================================
// Calls
// ============================================================================

pub(crate) fn call_lib<B: Invoke + ?Sized>(
    backend: &B,
    state: &mut ExecState,
    call: &LibCall,
    args: &[Value],
) -> EvalResult {
    apply_lib(backend, state, &*call.fcn, call.index, &call.params, &call.ret, args)
}

pub(crate) fn apply_lib<B: Invoke + ?Sized>(
    backend: &B,
    state: &mut ExecState,
    fcn: &dyn LibFcn,
    index: usize,
    params: &[Type],
    ret: &Type,
    args: &[Value],
) -> EvalResult {
    let info = CallInfo { index, params, ret };
    fcn.apply(args, &info, &mut Ctx { backend, state })
}

pub(crate) fn lib_target(call: &LibCall) -> FcnTarget {
    FcnTarget::Lib {
        fcn: Arc::clone(&call.fcn),
        index: call.index,
        params: Arc::clone(&call.params),
        ret: call.ret.clone(),
    }
}

/// Interleave the filled arguments and widen everything to the target's
/// declared parameter types.
pub(crate) fn full_args(program: &TypedProgram, fcn: &FcnValue, args: Vec<Value>) -> Vec<Value> {
    let args = fcn.full_args(args);
    match &fcn.target {
        FcnTarget::User(i) => {
            let params = &program.fcn(FcnId::new(*i)).params;
            widen_all(args, params.iter().map(|(_, t)| t))
        }
        FcnTarget::Inline(i) => {
            let params = &program.inline_fcn(InlineId::new(*i)).params;
            widen_all(args, params.iter().map(|(_, t)| t))
        }
        FcnTarget::Lib { params, .. } => widen_all(args, params.iter()),
    }
}

fn widen_all<'t>(args: Vec<Value>, params: impl Iterator<Item = &'t Type>) -> Vec<Value> {
    args.into_iter()
        .zip(params)
        .map(|(v, ty)| coerce(v, ty))
        .collect()
}

pub(crate) fn make_fcn(
    target: FcnTarget,
    captures: Vec<Value>,
    fill: Vec<(usize, Value)>,
) -> Value {
    Value::Fcn(FcnValue {
        target,
        captures: Arc::from(captures),
        fill: Arc::from(fill),
    })
}

pub(crate) fn expect_fcn(value: Value) -> Result<FcnValue, EvalError> {
    match value {
        Value::Fcn(f) => Ok(f),
        other => Err(bad_arguments(&[other]).into()),
    }
}

// ============================================================================
// Paths and updates
// ============================================================================

/// Type at the end of a typed path.
pub(crate) fn slot_type(base: &Type, path: &[PathStep]) -> Type {
    let mut ty = base;
    for step in path {
        ty = match (step, ty) {
            (PathStep::Field(i), Type::Record(r)) => match r.fields.get(*i) {
                Some(field) => &field.ty,
                None => return ty.clone(),
            },
            (PathStep::Index(_), Type::Array(items)) => items,
            (PathStep::Key(_), Type::Map(values)) => values,
            _ => return ty.clone(),
        };
    }
    ty.clone()
}

/// Evaluated replacement of a `to` clause.
pub(crate) enum Replacement {
    Value(Value),
    /// Called with the old value; the result is widened to the slot type.
    Fcn { fcn: FcnValue, slot: Type },
}

impl Replacement {
    fn apply<B: Invoke + ?Sized>(
        self,
        backend: &B,
        state: &mut ExecState,
        old: Value,
    ) -> EvalResult {
        match self {
            Replacement::Value(v) => Ok(v),
            Replacement::Fcn { fcn, slot } => {
                let new = backend.invoke(state, &fcn, vec![old])?;
                Ok(coerce(new, &slot))
            }
        }
    }
}

/// Copy of `base` with the value at `steps` replaced.
pub(crate) fn update_value<B: Invoke + ?Sized>(
    backend: &B,
    state: &mut ExecState,
    base: Value,
    steps: &[Step],
    replacement: Replacement,
) -> EvalResult {
    let mut replacement = Some(replacement);
    path::update(base, steps, &mut |old| match replacement.take() {
        Some(r) => r.apply(backend, state, old),
        None => Ok(old),
    })
}

pub(crate) fn cell_get(state: &ExecState, cell: CellId, steps: &[Step]) -> EvalResult {
    state.read_cell(cell, |v| path::get(v, steps))
}

pub(crate) fn cell_to<B: Invoke + ?Sized>(
    backend: &B,
    state: &mut ExecState,
    cell: CellId,
    steps: &[Step],
    replacement: Replacement,
) -> EvalResult {
    state.update_cell(cell, |state, old| {
        update_value(backend, state, old, steps, replacement)
    })
}

pub(crate) fn pool_get(state: &ExecState, pool: PoolId, key: &str, steps: &[Step]) -> EvalResult {
    let entry = state.pool_entry(pool, key)?;
    path::get(&entry, steps)
}

/// Update one pool entry. An absent entry starts from `init`; without one,
/// only a whole-entry replacement value may create it.
pub(crate) fn pool_to<B: Invoke + ?Sized>(
    backend: &B,
    state: &mut ExecState,
    pool: PoolId,
    key: &str,
    steps: &[Step],
    replacement: Replacement,
    init: Option<Value>,
) -> EvalResult {
    state.update_pool(pool, key, |state, old| {
        let old = match (old.or(init), steps, &replacement) {
            (Some(old), _, _) => old,
            (None, [], Replacement::Value(_)) => Value::Null,
            (None, _, _) => return Err(key_not_found(key).into()),
        };
        update_value(backend, state, old, steps, replacement)
    })
}

pub(crate) fn pool_key(value: &Value) -> Result<Arc<str>, EvalError> {
    match value {
        Value::String(s) => Ok(Arc::clone(s)),
        other => Err(bad_arguments(std::slice::from_ref(other)).into()),
    }
}

/// Entries of a `set` on a pool, widened to the entry type.
pub(crate) fn pool_entries(value: Value) -> indexmap::IndexMap<String, Value> {
    match value {
        Value::Map(entries) => Arc::try_unwrap(entries).unwrap_or_else(|shared| (*shared).clone()),
        _ => indexmap::IndexMap::new(),
    }
}

// ============================================================================
// Control
// ============================================================================

pub(crate) fn truthy(value: &Value) -> bool {
    matches!(value, Value::Boolean(true))
}

/// A node of type `null` evaluates to `null` whatever its branch produced.
pub(crate) fn branch_value(ty: &Type, value: Value) -> Value {
    if *ty == Type::Null {
        Value::Null
    } else {
        value
    }
}

/// The case handling a value of a union, if any.
pub(crate) fn select_case<'t>(
    value: &Value,
    members: impl IntoIterator<Item = &'t Type>,
) -> Option<usize> {
    members.into_iter().position(|member| conforms(value, member))
}

/// Log line: each argument as Avro-JSON, separated by spaces.
pub(crate) fn log_message(parts: &[(Value, &Type)]) -> String {
    parts
        .iter()
        .map(|(value, ty)| match json::encode(value, ty) {
            Ok(encoded) => encoded.to_string(),
            Err(_) => value.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
