//! Tree-walking interpreter over the typed arena.
//!
//! # Architecture
//!
//! The interpreter holds only the shared, immutable [`TypedProgram`]; every
//! method takes the instance's [`ExecState`] explicitly. Evaluation goes
//! through `eval(TExprId)` in `eval.rs`, which grows the native stack when
//! needed and stamps the node position on errors that have none yet.
//!
//! Function calls (user functions, inline functions, function values handed
//! to library functions) live in this file. Each call starts a fresh frame
//! chain, so a callee never sees its caller's locals.

mod eval;

use std::sync::Arc;

use pfa_library::{EvalResult, FcnTarget, FcnValue, Value};
use pfa_typeck::{FcnId, InlineId, TExprId, TypedProgram};

use crate::runtime::{self, Invoke};
use crate::state::ExecState;
use crate::{Backend, Evaluator, Phase};

pub struct Interpreter {
    program: Arc<TypedProgram>,
}

impl Interpreter {
    pub fn new(program: Arc<TypedProgram>) -> Self {
        Interpreter { program }
    }

    /// Evaluate a body in its own frame.
    fn body(&self, state: &mut ExecState, ids: &[TExprId]) -> EvalResult {
        let mark = state.env.enter();
        let result = self.seq(state, ids);
        state.env.leave(mark);
        result
    }

    /// Evaluate a body in the current frame; the value is the last one.
    fn seq(&self, state: &mut ExecState, ids: &[TExprId]) -> EvalResult {
        let mut last = Value::Null;
        for &id in ids {
            last = self.eval(state, id)?;
        }
        Ok(last)
    }

    fn call_user(&self, state: &mut ExecState, id: FcnId, args: Vec<Value>) -> EvalResult {
        let fcn = self.program.fcn(id);
        state.enter_call()?;
        let mark = state.env.enter_call();
        for ((name, _), value) in fcn.params.iter().zip(args) {
            state.env.define(name.clone(), value);
        }
        let result = self.seq(state, &fcn.body);
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
        let result = self.seq(state, &fcn.body);
        state.env.leave(mark);
        state.leave_call();
        result
    }
}

impl Invoke for Interpreter {
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

impl Evaluator for Interpreter {
    fn backend(&self) -> Backend {
        Backend::Interpreter
    }

    fn run(&self, phase: Phase, state: &mut ExecState) -> EvalResult {
        let program = &*self.program;
        let body: &[TExprId] = match phase {
            Phase::Begin => &program.begin,
            Phase::Action => &program.action,
            Phase::End => &program.end,
            Phase::Merge => program.merge.as_deref().unwrap_or_default(),
        };
        self.body(state, body)
    }
}
