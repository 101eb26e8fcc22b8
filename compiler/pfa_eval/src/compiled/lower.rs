//! Lowering of typed nodes to closures.

use std::sync::Arc;

use indexmap::IndexMap;
use pfa_ir::{Name, Pos};
use pfa_library::errors::{bad_arguments, user_error};
use pfa_library::{coerce, EvalError, EvalResult, FcnTarget, Value};
use pfa_typeck::{FcnRefTarget, PathStep, TExprId, TKind, TypedProgram, Update};
use pfa_types::Type;

use super::{block, eval_all, seq, Code, CompiledProgram};
use crate::errors::unbound_variable;
use crate::path::{self, Step};
use crate::runtime::{self, Invoke, Replacement};
use crate::state::ExecState;

/// A path step whose index or key is computed.
enum LStep {
    Field(usize),
    Dynamic(Code),
}

enum LUpdate {
    Value(Code),
    Fcn { fcn: Code, slot: Type },
}

struct LCase {
    member: Type,
    named: Name,
    body: Vec<Code>,
}

/// Wrap a closure so errors carry the node position.
fn node<F>(pos: &Pos, f: F) -> Code
where
    F: Fn(&CompiledProgram, &mut ExecState) -> EvalResult + Send + Sync + 'static,
{
    let pos = pos.clone();
    Box::new(move |cp: &CompiledProgram, state: &mut ExecState| {
        f(cp, state).map_err(|e| e.at(&pos))
    })
}

/// Box a closure that cannot fail.
fn infallible<F>(f: F) -> Code
where
    F: Fn(&CompiledProgram, &mut ExecState) -> EvalResult + Send + Sync + 'static,
{
    Box::new(f)
}

fn steps(
    cp: &CompiledProgram,
    state: &mut ExecState,
    path: &[LStep],
) -> Result<Vec<Step>, EvalError> {
    path.iter()
        .map(|step| match step {
            LStep::Field(i) => Ok(Step::Field(*i)),
            LStep::Dynamic(code) => Step::from_value(code(cp, state)?),
        })
        .collect()
}

fn replacement(
    cp: &CompiledProgram,
    state: &mut ExecState,
    to: &LUpdate,
) -> Result<Replacement, EvalError> {
    match to {
        LUpdate::Value(code) => Ok(Replacement::Value(code(cp, state)?)),
        LUpdate::Fcn { fcn, slot } => Ok(Replacement::Fcn {
            fcn: runtime::expect_fcn(fcn(cp, state)?)?,
            slot: slot.clone(),
        }),
    }
}

fn bind(
    cp: &CompiledProgram,
    state: &mut ExecState,
    bindings: &[(Name, Code)],
) -> Result<Vec<Value>, EvalError> {
    bindings.iter().map(|(_, code)| code(cp, state)).collect()
}

pub(super) struct Lowerer<'p> {
    program: &'p TypedProgram,
}

impl<'p> Lowerer<'p> {
    pub fn new(program: &'p TypedProgram) -> Self {
        Lowerer { program }
    }

    pub fn all(&self, ids: &[TExprId]) -> Vec<Code> {
        ids.iter().map(|&id| self.lower(id)).collect()
    }

    fn bindings(&self, bindings: &[(Name, TExprId)]) -> Vec<(Name, Code)> {
        bindings
            .iter()
            .map(|(name, id)| (name.clone(), self.lower(*id)))
            .collect()
    }

    fn path(&self, path: &[PathStep]) -> Vec<LStep> {
        path.iter()
            .map(|step| match step {
                PathStep::Field(i) => LStep::Field(*i),
                PathStep::Index(id) | PathStep::Key(id) => LStep::Dynamic(self.lower(*id)),
            })
            .collect()
    }

    fn update(&self, to: &Update, slot: Type) -> LUpdate {
        match to {
            Update::Value(id) => LUpdate::Value(self.lower(*id)),
            Update::Fcn(id) => LUpdate::Fcn {
                fcn: self.lower(*id),
                slot,
            },
        }
    }

    fn lower(&self, id: TExprId) -> Code {
        let arena = &self.program.arena;
        let ty = arena.ty(id).clone();
        let pos = arena.pos(id);
        match arena.kind(id) {
            TKind::Literal(v) => {
                let v = v.clone();
                infallible(move |_, _| Ok(v.clone()))
            }
            TKind::Local(name) => {
                let name = name.clone();
                node(pos, move |_, state| {
                    state
                        .env
                        .lookup(&name)
                        .cloned()
                        .ok_or_else(|| unbound_variable(&name))
                })
            }
            TKind::Special(special) => {
                let special = *special;
                infallible(move |_, state| Ok(state.special(special)))
            }

            // Constructors
            TKind::NewRecord(ids) => {
                let fields = self.all(ids);
                let Type::Record(record) = ty else {
                    return node(pos, |_, _| Err(bad_arguments(&[]).into()));
                };
                node(pos, move |cp, state| {
                    let values = eval_all(cp, state, &fields)?;
                    Ok(Value::record(Arc::clone(&record), values.into_vec()))
                })
            }
            TKind::NewMap(entries) => {
                let entries: Vec<(String, Code)> = entries
                    .iter()
                    .map(|(key, id)| (key.clone(), self.lower(*id)))
                    .collect();
                node(pos, move |cp, state| {
                    let mut out = IndexMap::with_capacity(entries.len());
                    for (key, code) in &entries {
                        out.insert(key.clone(), code(cp, state)?);
                    }
                    Ok(Value::map(out))
                })
            }
            TKind::NewArray(ids) => {
                let items = self.all(ids);
                node(pos, move |cp, state| {
                    Ok(Value::array(eval_all(cp, state, &items)?.into_vec()))
                })
            }

            // Locals
            TKind::Do(body) => {
                let body = self.all(body);
                node(pos, move |cp, state| block(cp, state, &body))
            }
            TKind::Let(bindings) => {
                let bindings = self.bindings(bindings);
                node(pos, move |cp, state| {
                    let values = bind(cp, state, &bindings)?;
                    for ((name, _), value) in bindings.iter().zip(values) {
                        state.env.define(name.clone(), value);
                    }
                    Ok(Value::Null)
                })
            }
            TKind::Set(bindings) => {
                let bindings = self.bindings(bindings);
                node(pos, move |cp, state| {
                    let values = bind(cp, state, &bindings)?;
                    for ((name, _), value) in bindings.iter().zip(values) {
                        if !state.env.assign(name, value) {
                            return Err(unbound_variable(name));
                        }
                    }
                    Ok(Value::Null)
                })
            }

            // State
            TKind::Attr { base, path, to } => {
                let slot = runtime::slot_type(arena.ty(*base), path);
                let base = self.lower(*base);
                let path = self.path(path);
                let to = to.as_ref().map(|to| self.update(to, slot));
                node(pos, move |cp, state| {
                    let value = base(cp, state)?;
                    let steps = steps(cp, state, &path)?;
                    match &to {
                        None => path::get(&value, &steps),
                        Some(to) => {
                            let replacement = replacement(cp, state, to)?;
                            runtime::update_value(cp, state, value, &steps, replacement)
                        }
                    }
                })
            }
            TKind::CellGet { cell, path } => {
                let cell = *cell;
                let path = self.path(path);
                node(pos, move |cp, state| {
                    let steps = steps(cp, state, &path)?;
                    runtime::cell_get(state, cell, &steps)
                })
            }
            TKind::CellTo { cell, path, to } => {
                let slot = runtime::slot_type(&self.program.cell(*cell).ty, path);
                let cell = *cell;
                let path = self.path(path);
                let to = self.update(to, slot);
                node(pos, move |cp, state| {
                    let steps = steps(cp, state, &path)?;
                    let replacement = replacement(cp, state, &to)?;
                    runtime::cell_to(cp, state, cell, &steps, replacement)
                })
            }
            TKind::PoolGet { pool, key, path } => {
                let pool = *pool;
                let key = self.lower(*key);
                let path = self.path(path);
                node(pos, move |cp, state| {
                    let key = runtime::pool_key(&key(cp, state)?)?;
                    let steps = steps(cp, state, &path)?;
                    runtime::pool_get(state, pool, &key, &steps)
                })
            }
            TKind::PoolTo {
                pool,
                key,
                path,
                to,
                init,
            } => {
                let slot = runtime::slot_type(&self.program.pool(*pool).ty, path);
                let pool = *pool;
                let key = self.lower(*key);
                let path = self.path(path);
                let to = self.update(to, slot);
                let init = init.map(|init| self.lower(init));
                node(pos, move |cp, state| {
                    let key = runtime::pool_key(&key(cp, state)?)?;
                    let steps = steps(cp, state, &path)?;
                    let replacement = replacement(cp, state, &to)?;
                    let init = init.as_ref().map(|init| init(cp, state)).transpose()?;
                    runtime::pool_to(cp, state, pool, &key, &steps, replacement, init)
                })
            }
            TKind::PoolDel { pool, key } => {
                let pool = *pool;
                let key = self.lower(*key);
                node(pos, move |cp, state| {
                    let key = runtime::pool_key(&key(cp, state)?)?;
                    state.delete_pool_entry(pool, &key);
                    Ok(Value::Null)
                })
            }
            TKind::PoolReplace { pool, value } => {
                let pool = *pool;
                let value = self.lower(*value);
                node(pos, move |cp, state| {
                    let value = value(cp, state)?;
                    state.replace_pool(pool, runtime::pool_entries(value));
                    Ok(Value::Null)
                })
            }

            // Control
            TKind::If { cond, then, else_ } => {
                let cond = self.lower(*cond);
                let then = self.all(then);
                let else_ = else_.as_deref().map(|body| self.all(body));
                node(pos, move |cp, state| {
                    let value = if runtime::truthy(&cond(cp, state)?) {
                        block(cp, state, &then)?
                    } else if let Some(else_) = &else_ {
                        block(cp, state, else_)?
                    } else {
                        Value::Null
                    };
                    Ok(runtime::branch_value(&ty, value))
                })
            }
            TKind::Cond { arms, else_ } => {
                let arms: Vec<(Code, Vec<Code>)> = arms
                    .iter()
                    .map(|(cond, body)| (self.lower(*cond), self.all(body)))
                    .collect();
                let else_ = else_.as_deref().map(|body| self.all(body));
                node(pos, move |cp, state| {
                    for (cond, body) in &arms {
                        if runtime::truthy(&cond(cp, state)?) {
                            let value = block(cp, state, body)?;
                            return Ok(runtime::branch_value(&ty, value));
                        }
                    }
                    match &else_ {
                        Some(body) => block(cp, state, body),
                        None => Ok(Value::Null),
                    }
                })
            }
            TKind::While { cond, body } => {
                let cond = self.lower(*cond);
                let body = self.all(body);
                node(pos, move |cp, state| {
                    let mut iterations = 0;
                    while runtime::truthy(&cond(cp, state)?) {
                        state.tick_loop(&mut iterations)?;
                        block(cp, state, &body)?;
                    }
                    Ok(Value::Null)
                })
            }
            TKind::DoUntil { body, cond } => {
                let body = self.all(body);
                let cond = self.lower(*cond);
                node(pos, move |cp, state| {
                    let mut iterations = 0;
                    loop {
                        state.tick_loop(&mut iterations)?;
                        block(cp, state, &body)?;
                        if runtime::truthy(&cond(cp, state)?) {
                            return Ok(Value::Null);
                        }
                    }
                })
            }
            TKind::For {
                init,
                cond,
                step,
                body,
            } => {
                let init = self.bindings(init);
                let cond = self.lower(*cond);
                let step = self.bindings(step);
                let body = self.all(body);
                node(pos, move |cp, state| {
                    let mark = state.env.enter();
                    let result = for_loop(cp, state, &init, &cond, &step, &body);
                    state.env.leave(mark);
                    result
                })
            }
            TKind::Foreach { var, array, body } => {
                let var = var.clone();
                let array = self.lower(*array);
                let body = self.all(body);
                node(pos, move |cp, state| {
                    let items = match array(cp, state)? {
                        Value::Array(items) => items,
                        other => return Err(bad_arguments(&[other]).into()),
                    };
                    let mut iterations = 0;
                    for item in items.iter() {
                        state.tick_loop(&mut iterations)?;
                        let mark = state.env.enter();
                        state.env.define(var.clone(), item.clone());
                        let result = seq(cp, state, &body);
                        state.env.leave(mark);
                        result?;
                    }
                    Ok(Value::Null)
                })
            }
            TKind::Forkey {
                key,
                value,
                map,
                body,
            } => {
                let (key, value) = (key.clone(), value.clone());
                let map = self.lower(*map);
                let body = self.all(body);
                node(pos, move |cp, state| {
                    let entries = match map(cp, state)? {
                        Value::Map(entries) => entries,
                        other => return Err(bad_arguments(&[other]).into()),
                    };
                    let mut iterations = 0;
                    for (k, v) in entries.iter() {
                        state.tick_loop(&mut iterations)?;
                        let mark = state.env.enter();
                        state.env.define(key.clone(), Value::string(k));
                        state.env.define(value.clone(), v.clone());
                        let result = seq(cp, state, &body);
                        state.env.leave(mark);
                        result?;
                    }
                    Ok(Value::Null)
                })
            }
            TKind::Cast { expr, cases } => {
                let expr = self.lower(*expr);
                let cases: Vec<LCase> = cases
                    .iter()
                    .map(|case| LCase {
                        member: case.member.clone(),
                        named: case.named.clone(),
                        body: self.all(&case.body),
                    })
                    .collect();
                node(pos, move |cp, state| {
                    let value = expr(cp, state)?;
                    let Some(index) = runtime::select_case(&value, cases.iter().map(|c| &c.member))
                    else {
                        return Ok(Value::Null);
                    };
                    let case = &cases[index];
                    let mark = state.env.enter();
                    state.env.define(case.named.clone(), value);
                    let result = seq(cp, state, &case.body);
                    state.env.leave(mark);
                    Ok(runtime::branch_value(&ty, result?))
                })
            }
            TKind::IfNotNull {
                bindings,
                then,
                else_,
            } => {
                let bindings = self.bindings(bindings);
                let then = self.all(then);
                let else_ = else_.as_deref().map(|body| self.all(body));
                node(pos, move |cp, state| {
                    let values = bind(cp, state, &bindings)?;
                    if values.iter().any(Value::is_null) {
                        return match &else_ {
                            Some(body) => block(cp, state, body),
                            None => Ok(Value::Null),
                        };
                    }
                    let mark = state.env.enter();
                    for ((name, _), value) in bindings.iter().zip(values) {
                        state.env.define(name.clone(), value);
                    }
                    let result = seq(cp, state, &then);
                    state.env.leave(mark);
                    Ok(runtime::branch_value(&ty, result?))
                })
            }

            // Functions
            TKind::Coerce(inner) => {
                let inner = self.lower(*inner);
                node(pos, move |cp, state| Ok(coerce(inner(cp, state)?, &ty)))
            }
            TKind::MakeFcn { target, fill } => {
                let (target, captures): (FcnTarget, Vec<Name>) = match target {
                    FcnRefTarget::User(fcn) => (FcnTarget::User(fcn.raw()), Vec::new()),
                    FcnRefTarget::Inline(inline) => (
                        FcnTarget::Inline(inline.raw()),
                        self.program.inline_fcn(*inline).captures.clone(),
                    ),
                    FcnRefTarget::Lib(call) => (runtime::lib_target(call), Vec::new()),
                };
                let fill: Vec<(usize, Code)> = fill
                    .iter()
                    .map(|(index, id)| (*index, self.lower(*id)))
                    .collect();
                node(pos, move |cp, state| {
                    let captured = captures
                        .iter()
                        .map(|n| state.env.lookup(n).cloned().ok_or_else(|| unbound_variable(n)))
                        .collect::<Result<Vec<_>, _>>()?;
                    let mut filled = Vec::with_capacity(fill.len());
                    for (index, code) in &fill {
                        filled.push((*index, code(cp, state)?));
                    }
                    Ok(runtime::make_fcn(target.clone(), captured, filled))
                })
            }
            TKind::CallUser { fcn, args } => {
                let fcn = *fcn;
                let args = self.all(args);
                node(pos, move |cp, state| {
                    let args = eval_all(cp, state, &args)?;
                    cp.call_user(state, fcn, args.into_vec())
                })
            }
            TKind::CallLib { call, args } => {
                let call = call.clone();
                let args = self.all(args);
                node(pos, move |cp, state| {
                    let args = eval_all(cp, state, &args)?;
                    runtime::call_lib(cp, state, &call, &args)
                })
            }
            TKind::CallValue { callee, args } => {
                let callee = self.lower(*callee);
                let args = self.all(args);
                node(pos, move |cp, state| {
                    let fcn = runtime::expect_fcn(callee(cp, state)?)?;
                    let args = eval_all(cp, state, &args)?;
                    let result = cp.invoke(state, &fcn, args.into_vec())?;
                    Ok(coerce(result, &ty))
                })
            }
            TKind::And(x, y) => {
                let (x, y) = (self.lower(*x), self.lower(*y));
                node(pos, move |cp, state| {
                    if runtime::truthy(&x(cp, state)?) {
                        Ok(Value::Boolean(runtime::truthy(&y(cp, state)?)))
                    } else {
                        Ok(Value::Boolean(false))
                    }
                })
            }
            TKind::Or(x, y) => {
                let (x, y) = (self.lower(*x), self.lower(*y));
                node(pos, move |cp, state| {
                    if runtime::truthy(&x(cp, state)?) {
                        Ok(Value::Boolean(true))
                    } else {
                        Ok(Value::Boolean(runtime::truthy(&y(cp, state)?)))
                    }
                })
            }

            // Effects
            TKind::Error { message, code } => {
                let (message, code) = (message.clone(), *code);
                node(pos, move |_, _| Err(user_error(message.clone(), code).into()))
            }
            TKind::Log { args, namespace } => {
                let types: Vec<Type> = args.iter().map(|&a| arena.ty(a).clone()).collect();
                let args = self.all(args);
                let namespace = namespace.clone();
                node(pos, move |cp, state| {
                    let values = eval_all(cp, state, &args)?;
                    let parts: Vec<(Value, &Type)> = values.into_iter().zip(types.iter()).collect();
                    state.log.log(namespace.as_deref(), &runtime::log_message(&parts));
                    Ok(Value::Null)
                })
            }
            TKind::Emit(value) => {
                let value = self.lower(*value);
                node(pos, move |cp, state| {
                    let value = value(cp, state)?;
                    state.emit.emit(&value);
                    Ok(Value::Null)
                })
            }
        }
    }
}

fn for_loop(
    cp: &CompiledProgram,
    state: &mut ExecState,
    init: &[(Name, Code)],
    cond: &Code,
    step: &[(Name, Code)],
    body: &[Code],
) -> EvalResult {
    let values = bind(cp, state, init)?;
    for ((name, _), value) in init.iter().zip(values) {
        state.env.define(name.clone(), value);
    }
    let mut iterations = 0;
    while runtime::truthy(&cond(cp, state)?) {
        state.tick_loop(&mut iterations)?;
        block(cp, state, body)?;
        let values = bind(cp, state, step)?;
        for ((name, _), value) in step.iter().zip(values) {
            if !state.env.assign(name, value) {
                return Err(unbound_variable(name));
            }
        }
    }
    Ok(Value::Null)
}
