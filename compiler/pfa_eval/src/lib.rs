#![allow(
    clippy::result_large_err,
    reason = "EvalError is fundamental; boxing would add complexity across the crate"
)]
//! PFA Eval - execution engine for checked PFA programs.
//!
//! # Architecture
//!
//! - `Program`: immutable, `Send + Sync`; owns the typed tree, the
//!   evaluator, and the shared cells and pools
//! - `Instance`: one running copy with private cells, pools, frames and
//!   random source
//! - `Evaluator`: the backend seam, implemented by the tree-walking
//!   `Interpreter` and the closure-lowered `CompiledProgram`
//! - `Environment`: arena of frames with parent indices
//!
//! Both backends share `runtime` for everything that does not depend on
//! the body representation, so outputs, state and errors are identical.

mod compiled;
mod environment;
mod errors;
mod evaluator;
mod handlers;
mod interpreter;
mod options;
mod path;
mod program;
mod runtime;
mod shared;
mod stack;
mod state;

pub use compiled::CompiledProgram;
pub use errors::EngineError;
pub use evaluator::{build, Backend, Evaluator, Phase};
pub use handlers::{EmitFn, LogFn};
pub use interpreter::Interpreter;
pub use options::EngineOptions;
pub use program::{Instance, Program};
pub use stack::{ensure_sufficient_stack, MAX_CALL_DEPTH};
pub use state::ExecState;

#[cfg(test)]
mod tests;
