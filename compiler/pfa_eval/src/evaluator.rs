//! The seam between an instance and an execution backend.

use std::fmt;
use std::sync::Arc;

use pfa_library::EvalResult;
use pfa_typeck::TypedProgram;

use crate::state::ExecState;

/// Top-level block of a document.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Begin,
    Action,
    End,
    Merge,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Begin => "begin",
            Phase::Action => "action",
            Phase::End => "end",
            Phase::Merge => "merge",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which backend executes a program.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Walks the typed tree directly.
    #[default]
    Interpreter,
    /// Lowers the typed tree to closures once, then runs those.
    Compiled,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Interpreter => "interpreter",
            Backend::Compiled => "compiled",
        }
    }
}

/// Runs the blocks of one checked program.
///
/// Implementations hold only immutable program data and are shared by
/// every instance; all mutable state lives in the [`ExecState`].
pub trait Evaluator: Send + Sync {
    fn backend(&self) -> Backend;

    /// Evaluate a block and return its last value; an absent block yields `null`.
    fn run(&self, phase: Phase, state: &mut ExecState) -> EvalResult;
}

/// Build the evaluator for `program`.
#[tracing::instrument(level = "debug", skip(program))]
pub fn build(program: Arc<TypedProgram>, backend: Backend) -> Arc<dyn Evaluator> {
    match backend {
        Backend::Interpreter => Arc::new(crate::interpreter::Interpreter::new(program)),
        Backend::Compiled => Arc::new(crate::compiled::CompiledProgram::lower(program)),
    }
}
