//! Engine-level errors.

use pfa_library::errors::{RuntimeError, RuntimeErrorKind};
use pfa_library::json::CodecError;
use pfa_library::EvalError;

/// Failure of an engine operation.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Eval(#[from] EvalError),
    /// The instance has already run `end`.
    #[error("the engine instance is closed")]
    Closed,
    #[error("input does not match the input type: {0}")]
    Decode(CodecError),
    #[error("output does not match the output type: {0}")]
    Encode(CodecError),
    /// `merge` needs the fold method.
    #[error("merge is only available with method fold")]
    MergeUnavailable,
}

impl EngineError {
    pub fn as_runtime(&self) -> Option<&RuntimeError> {
        match self {
            EngineError::Eval(e) => e.as_runtime(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, EngineError::Eval(EvalError::Timeout { .. }))
    }
}

/// A local the checker resolved is missing at run time.
#[cold]
pub(crate) fn unbound_variable(name: &str) -> EvalError {
    RuntimeError::new(RuntimeErrorKind::Domain, None, format!("unbound variable `{name}`")).into()
}
