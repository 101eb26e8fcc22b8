//! Closure-compiled backend.
//!
//! Every typed node is lowered once, when the program is built, into a
//! boxed closure. Running a block is then a walk over closures with no
//! arena lookups or kind dispatch. Closures receive the [`CompiledProgram`]
//! itself, so calls to user functions (including recursive ones) resolve
//! through its function tables at run time.
//!
//! Observable behavior matches the interpreter exactly: both use the same
//! helpers in `crate::runtime` for calls, updates and union dispatch, and
//! stamp error positions at the same nodes.

mod lower;

use std::sync::Arc;

use pfa_library::{EvalError, EvalResult, FcnTarget, FcnValue, Value};
use pfa_typeck::{FcnId, InlineId, TypedProgram};
use smallvec::SmallVec;

use crate::runtime::{self, Invoke};
use crate::stack::ensure_sufficient_stack;
use crate::state::ExecState;
use crate::{Backend, Evaluator, Phase};

/// One lowered node.
pub(crate) type Code = Box<dyn Fn(&CompiledProgram, &mut ExecState) -> EvalResult + Send + Sync>;

pub(crate) type Args = SmallVec<[Value; 4]>;

pub struct CompiledProgram {
    program: Arc<TypedProgram>,
    fcns: Vec<Vec<Code>>,
    inline: Vec<Vec<Code>>,
    begin: Vec<Code>,
    action: Vec<Code>,
    end: Vec<Code>,
    merge: Vec<Code>,
}

impl CompiledProgram {
    #[tracing::instrument(level = "debug", skip_all, fields(nodes = program.arena.len()))]
    pub fn lower(program: Arc<TypedProgram>) -> Self {
        let lowerer = lower::Lowerer::new(&program);
        let fcns = program.fcns.iter().map(|f| lowerer.all(&f.body)).collect();
        let inline = program.inline.iter().map(|f| lowerer.all(&f.body)).collect();
        let begin = lowerer.all(&program.begin);
        let action = lowerer.all(&program.action);
        let end = lowerer.all(&program.end);
        let merge = program
            .merge
            .as_deref()
            .map(|body| lowerer.all(body))
            .unwrap_or_default();
        CompiledProgram {
            fcns,
            inline,
            begin,
            action,
            end,
            merge,
            program,
        }
    }

    fn call_user(&self, state: &mut ExecState, id: FcnId, args: Vec<Value>) -> EvalResult {
        let fcn = self.program.fcn(id);
        state.enter_call()?;
        let mark = state.env.enter_call();
        for ((name, _), value) in fcn.params.iter().zip(args) {
            state.env.define(name.clone(), value);
        }
        let result = ensure_sufficient_stack(|| seq(self, state, &self.fcns[id.index()]));
        state.env.leave(mark);
        state.leave_call();
        result
    }

    fn call_inline(
        &self,
        state: &mut ExecState,
        id: InlineId,
        captures: &[Value],
        args: Vec<Value>,
    ) -> EvalResult {
        let fcn = self.program.inline_fcn(id);
        state.enter_call()?;
        let mark = state.env.enter_call();
        for (name, value) in fcn.captures.iter().zip(captures) {
            state.env.define(name.clone(), value.clone());
        }
        for ((name, _), value) in fcn.params.iter().zip(args) {
            state.env.define(name.clone(), value);
        }
        let result = ensure_sufficient_stack(|| seq(self, state, &self.inline[id.index()]));
        state.env.leave(mark);
        state.leave_call();
        result
    }
}

impl Invoke for CompiledProgram {
    fn invoke(&self, state: &mut ExecState, fcn: &FcnValue, args: Vec<Value>) -> EvalResult {
        let args = runtime::full_args(&self.program, fcn, args);
        match &fcn.target {
            FcnTarget::User(i) => self.call_user(state, FcnId::new(*i), args),
            FcnTarget::Inline(i) => self.call_inline(state, InlineId::new(*i), &fcn.captures, args),
            FcnTarget::Lib {
                fcn,
                index,
                params,
                ret,
            } => runtime::apply_lib(self, state, &**fcn, *index, params, ret, &args),
        }
    }
}

impl Evaluator for CompiledProgram {
    fn backend(&self) -> Backend {
        Backend::Compiled
    }

    fn run(&self, phase: Phase, state: &mut ExecState) -> EvalResult {
        let body = match phase {
            Phase::Begin => &self.begin,
            Phase::Action => &self.action,
            Phase::End => &self.end,
            Phase::Merge => &self.merge,
        };
        block(self, state, body)
    }
}

// ============================================================================
// Running lowered code
// ============================================================================

/// Run codes in the current frame; the value is the last one.
fn seq(cp: &CompiledProgram, state: &mut ExecState, codes: &[Code]) -> EvalResult {
    let mut last = Value::Null;
    for code in codes {
        last = code(cp, state)?;
    }
    Ok(last)
}

/// Run codes in their own frame.
fn block(cp: &CompiledProgram, state: &mut ExecState, codes: &[Code]) -> EvalResult {
    let mark = state.env.enter();
    let result = seq(cp, state, codes);
    state.env.leave(mark);
    result
}

fn eval_all(
    cp: &CompiledProgram,
    state: &mut ExecState,
    codes: &[Code],
) -> Result<Args, EvalError> {
    codes.iter().map(|code| code(cp, state)).collect()
}
