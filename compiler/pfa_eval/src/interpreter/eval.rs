//! Typed node dispatch.
//!
//! Handles every `TKind` variant exhaustively. No `_ =>` catch-all.

use std::sync::Arc;

use indexmap::IndexMap;
use pfa_library::errors::{bad_arguments, user_error};
use pfa_library::{coerce, EvalError, EvalResult, FcnTarget, Value};
use pfa_typeck::{FcnRefTarget, PathStep, TCastCase, TExprId, TKind, Update};
use pfa_types::Type;
use smallvec::SmallVec;

use super::Interpreter;
use crate::errors::unbound_variable;
use crate::path::{self, Step};
use crate::runtime::{self, Replacement};
use crate::stack::ensure_sufficient_stack;
use crate::state::ExecState;

type Args = SmallVec<[Value; 4]>;

impl Interpreter {
    /// Evaluate one node with stack safety.
    pub(super) fn eval(&self, state: &mut ExecState, id: TExprId) -> EvalResult {
        ensure_sufficient_stack(|| self.eval_inner(state, id))
            .map_err(|e| e.at(self.program.arena.pos(id)))
    }

    fn eval_all(&self, state: &mut ExecState, ids: &[TExprId]) -> Result<Args, EvalError> {
        ids.iter().map(|&id| self.eval(state, id)).collect()
    }

    fn eval_inner(&self, state: &mut ExecState, id: TExprId) -> EvalResult {
        let arena = &self.program.arena;
        let ty = arena.ty(id);
        match arena.kind(id) {
            TKind::Literal(v) => Ok(v.clone()),
            TKind::Local(name) => state
                .env
                .lookup(name)
                .cloned()
                .ok_or_else(|| unbound_variable(name)),
            TKind::Special(special) => Ok(state.special(*special)),

            // Constructors
            TKind::NewRecord(ids) => {
                let Type::Record(record) = ty else {
                    return Err(bad_arguments(&[]).into());
                };
                let fields = self.eval_all(state, ids)?;
                Ok(Value::record(Arc::clone(record), fields.into_vec()))
            }
            TKind::NewMap(entries) => {
                let mut out = IndexMap::with_capacity(entries.len());
                for (key, id) in entries {
                    out.insert(key.clone(), self.eval(state, *id)?);
                }
                Ok(Value::map(out))
            }
            TKind::NewArray(ids) => Ok(Value::array(self.eval_all(state, ids)?.into_vec())),

            // Locals
            TKind::Do(body) => self.body(state, body),
            TKind::Let(bindings) => {
                let values = self.bind_values(state, bindings)?;
                for ((name, _), value) in bindings.iter().zip(values) {
                    state.env.define(name.clone(), value);
                }
                Ok(Value::Null)
            }
            TKind::Set(bindings) => {
                let values = self.bind_values(state, bindings)?;
                for ((name, _), value) in bindings.iter().zip(values) {
                    if !state.env.assign(name, value) {
                        return Err(unbound_variable(name));
                    }
                }
                Ok(Value::Null)
            }

            // State
            TKind::Attr { base, path, to } => {
                let value = self.eval(state, *base)?;
                let steps = self.steps(state, path)?;
                match to {
                    None => path::get(&value, &steps),
                    Some(to) => {
                        let slot = runtime::slot_type(arena.ty(*base), path);
                        let replacement = self.replacement(state, to, slot)?;
                        runtime::update_value(self, state, value, &steps, replacement)
                    }
                }
            }
            TKind::CellGet { cell, path } => {
                let steps = self.steps(state, path)?;
                runtime::cell_get(state, *cell, &steps)
            }
            TKind::CellTo { cell, path, to } => {
                let steps = self.steps(state, path)?;
                let slot = runtime::slot_type(&self.program.cell(*cell).ty, path);
                let replacement = self.replacement(state, to, slot)?;
                runtime::cell_to(self, state, *cell, &steps, replacement)
            }
            TKind::PoolGet { pool, key, path } => {
                let key = runtime::pool_key(&self.eval(state, *key)?)?;
                let steps = self.steps(state, path)?;
                runtime::pool_get(state, *pool, &key, &steps)
            }
            TKind::PoolTo {
                pool,
                key,
                path,
                to,
                init,
            } => {
                let key = runtime::pool_key(&self.eval(state, *key)?)?;
                let steps = self.steps(state, path)?;
                let slot = runtime::slot_type(&self.program.pool(*pool).ty, path);
                let replacement = self.replacement(state, to, slot)?;
                let init = init.map(|init| self.eval(state, init)).transpose()?;
                runtime::pool_to(self, state, *pool, &key, &steps, replacement, init)
            }
            TKind::PoolDel { pool, key } => {
                let key = runtime::pool_key(&self.eval(state, *key)?)?;
                state.delete_pool_entry(*pool, &key);
                Ok(Value::Null)
            }
            TKind::PoolReplace { pool, value } => {
                let value = self.eval(state, *value)?;
                state.replace_pool(*pool, runtime::pool_entries(value));
                Ok(Value::Null)
            }

            // Control
            TKind::If { cond, then, else_ } => {
                let value = if runtime::truthy(&self.eval(state, *cond)?) {
                    self.body(state, then)?
                } else if let Some(else_) = else_ {
                    self.body(state, else_)?
                } else {
                    Value::Null
                };
                Ok(runtime::branch_value(ty, value))
            }
            TKind::Cond { arms, else_ } => {
                for (cond, body) in arms {
                    if runtime::truthy(&self.eval(state, *cond)?) {
                        let value = self.body(state, body)?;
                        return Ok(runtime::branch_value(ty, value));
                    }
                }
                match else_ {
                    Some(body) => self.body(state, body),
                    None => Ok(Value::Null),
                }
            }
            TKind::While { cond, body } => {
                let mut iterations = 0;
                while runtime::truthy(&self.eval(state, *cond)?) {
                    state.tick_loop(&mut iterations)?;
                    self.body(state, body)?;
                }
                Ok(Value::Null)
            }
            TKind::DoUntil { body, cond } => {
                let mut iterations = 0;
                loop {
                    state.tick_loop(&mut iterations)?;
                    self.body(state, body)?;
                    if runtime::truthy(&self.eval(state, *cond)?) {
                        return Ok(Value::Null);
                    }
                }
            }
            TKind::For {
                init,
                cond,
                step,
                body,
            } => {
                let mark = state.env.enter();
                let result = self.for_loop(state, init, *cond, step, body);
                state.env.leave(mark);
                result
            }
            TKind::Foreach { var, array, body } => {
                let items = match self.eval(state, *array)? {
                    Value::Array(items) => items,
                    other => return Err(bad_arguments(&[other]).into()),
                };
                let mut iterations = 0;
                for item in items.iter() {
                    state.tick_loop(&mut iterations)?;
                    let mark = state.env.enter();
                    state.env.define(var.clone(), item.clone());
                    let result = self.seq(state, body);
                    state.env.leave(mark);
                    result?;
                }
                Ok(Value::Null)
            }
            TKind::Forkey {
                key,
                value,
                map,
                body,
            } => {
                let entries = match self.eval(state, *map)? {
                    Value::Map(entries) => entries,
                    other => return Err(bad_arguments(&[other]).into()),
                };
                let mut iterations = 0;
                for (k, v) in entries.iter() {
                    state.tick_loop(&mut iterations)?;
                    let mark = state.env.enter();
                    state.env.define(key.clone(), Value::string(k));
                    state.env.define(value.clone(), v.clone());
                    let result = self.seq(state, body);
                    state.env.leave(mark);
                    result?;
                }
                Ok(Value::Null)
            }
            TKind::Cast { expr, cases } => {
                let value = self.eval(state, *expr)?;
                let result = self.cast(state, value, cases)?;
                Ok(runtime::branch_value(ty, result))
            }
            TKind::IfNotNull {
                bindings,
                then,
                else_,
            } => {
                let values = self.bind_values(state, bindings)?;
                if values.iter().any(Value::is_null) {
                    return match else_ {
                        Some(body) => self.body(state, body),
                        None => Ok(Value::Null),
                    };
                }
                let mark = state.env.enter();
                for ((name, _), value) in bindings.iter().zip(values) {
                    state.env.define(name.clone(), value);
                }
                let result = self.seq(state, then);
                state.env.leave(mark);
                Ok(runtime::branch_value(ty, result?))
            }

            // Functions
            TKind::Coerce(inner) => Ok(coerce(self.eval(state, *inner)?, ty)),
            TKind::MakeFcn { target, fill } => {
                let (target, captures) = match target {
                    FcnRefTarget::User(fcn) => (FcnTarget::User(fcn.raw()), Vec::new()),
                    FcnRefTarget::Inline(inline) => {
                        let names = &self.program.inline_fcn(*inline).captures;
                        let captures = names
                            .iter()
                            .map(|n| {
                                state.env.lookup(n).cloned().ok_or_else(|| unbound_variable(n))
                            })
                            .collect::<Result<Vec<_>, _>>()?;
                        (FcnTarget::Inline(inline.raw()), captures)
                    }
                    FcnRefTarget::Lib(call) => (runtime::lib_target(call), Vec::new()),
                };
                let mut filled = Vec::with_capacity(fill.len());
                for (index, id) in fill {
                    filled.push((*index, self.eval(state, *id)?));
                }
                Ok(runtime::make_fcn(target, captures, filled))
            }
            TKind::CallUser { fcn, args } => {
                let args = self.eval_all(state, args)?;
                self.call_user(state, *fcn, args.into_vec())
            }
            TKind::CallLib { call, args } => {
                let args = self.eval_all(state, args)?;
                runtime::call_lib(self, state, call, &args)
            }
            TKind::CallValue { callee, args } => {
                let fcn = runtime::expect_fcn(self.eval(state, *callee)?)?;
                let args = self.eval_all(state, args)?;
                let result = runtime::Invoke::invoke(self, state, &fcn, args.into_vec())?;
                Ok(coerce(result, ty))
            }
            TKind::And(x, y) => {
                if runtime::truthy(&self.eval(state, *x)?) {
                    Ok(Value::Boolean(runtime::truthy(&self.eval(state, *y)?)))
                } else {
                    Ok(Value::Boolean(false))
                }
            }
            TKind::Or(x, y) => {
                if runtime::truthy(&self.eval(state, *x)?) {
                    Ok(Value::Boolean(true))
                } else {
                    Ok(Value::Boolean(runtime::truthy(&self.eval(state, *y)?)))
                }
            }

            // Effects
            TKind::Error { message, code } => Err(user_error(message.clone(), *code).into()),
            TKind::Log { args, namespace } => {
                let values = self.eval_all(state, args)?;
                let parts: Vec<(Value, &Type)> = values
                    .into_iter()
                    .zip(args.iter().map(|&a| arena.ty(a)))
                    .collect();
                state.log.log(namespace.as_deref(), &runtime::log_message(&parts));
                Ok(Value::Null)
            }
            TKind::Emit(value) => {
                let value = self.eval(state, *value)?;
                state.emit.emit(&value);
                Ok(Value::Null)
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Values of `let`, `set` and `ifnotnull` bindings, all evaluated before
    /// any is bound.
    fn bind_values(
        &self,
        state: &mut ExecState,
        bindings: &[(pfa_ir::Name, TExprId)],
    ) -> Result<Args, EvalError> {
        bindings.iter().map(|(_, id)| self.eval(state, *id)).collect()
    }

    fn steps(&self, state: &mut ExecState, path: &[PathStep]) -> Result<Vec<Step>, EvalError> {
        path.iter()
            .map(|step| match step {
                PathStep::Field(i) => Ok(Step::Field(*i)),
                PathStep::Index(id) | PathStep::Key(id) => Step::from_value(self.eval(state, *id)?),
            })
            .collect()
    }

    fn replacement(
        &self,
        state: &mut ExecState,
        to: &Update,
        slot: Type,
    ) -> Result<Replacement, EvalError> {
        match to {
            Update::Value(id) => Ok(Replacement::Value(self.eval(state, *id)?)),
            Update::Fcn(id) => Ok(Replacement::Fcn {
                fcn: runtime::expect_fcn(self.eval(state, *id)?)?,
                slot,
            }),
        }
    }

    fn for_loop(
        &self,
        state: &mut ExecState,
        init: &[(pfa_ir::Name, TExprId)],
        cond: TExprId,
        step: &[(pfa_ir::Name, TExprId)],
        body: &[TExprId],
    ) -> EvalResult {
        let values = self.bind_values(state, init)?;
        for ((name, _), value) in init.iter().zip(values) {
            state.env.define(name.clone(), value);
        }
        let mut iterations = 0;
        while runtime::truthy(&self.eval(state, cond)?) {
            state.tick_loop(&mut iterations)?;
            self.body(state, body)?;
            let values = self.bind_values(state, step)?;
            for ((name, _), value) in step.iter().zip(values) {
                if !state.env.assign(name, value) {
                    return Err(unbound_variable(name));
                }
            }
        }
        Ok(Value::Null)
    }

    fn cast(&self, state: &mut ExecState, value: Value, cases: &[TCastCase]) -> EvalResult {
        let Some(index) = runtime::select_case(&value, cases.iter().map(|c| &c.member)) else {
            return Ok(Value::Null);
        };
        let case = &cases[index];
        let mark = state.env.enter();
        state.env.define(case.named.clone(), value);
        let result = self.seq(state, &case.body);
        state.env.leave(mark);
        result
    }
}
