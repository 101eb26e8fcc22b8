//! Runtime error types.
//!
//! Every library failure is a [`RuntimeError`] with a stable numeric code.
//! Factory functions below are the public way to build them; they fill in
//! kind, code and message together so codes stay consistent across call
//! sites. The engine attaches the function name and document position.

use std::fmt;

use pfa_ir::Pos;

use crate::Value;

/// Result of evaluation.
pub type EvalResult = Result<Value, EvalError>;

/// Category of a runtime failure.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    Overflow,
    Domain,
    OutOfRange,
    DimensionMismatch,
    /// Raised by an `error` form in the document.
    User,
    /// A null reached a place that disallows it.
    Null,
    /// A loop or call-depth limit was hit.
    Limit,
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuntimeErrorKind::Overflow => "overflow",
            RuntimeErrorKind::Domain => "domain error",
            RuntimeErrorKind::OutOfRange => "out of range",
            RuntimeErrorKind::DimensionMismatch => "dimension mismatch",
            RuntimeErrorKind::User => "user error",
            RuntimeErrorKind::Null => "null value",
            RuntimeErrorKind::Limit => "limit exceeded",
        })
    }
}

/// A failure raised while evaluating an expression.
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    /// Stable numeric code. `None` only for user errors raised without one.
    pub code: Option<i32>,
    pub message: String,
    /// Name of the library function that failed, if any.
    pub fcn: Option<String>,
    pub pos: Option<Pos>,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, code: Option<i32>, message: impl Into<String>) -> Self {
        RuntimeError {
            kind,
            code,
            message: message.into(),
            fcn: None,
            pos: None,
        }
    }

    /// Name the failing function unless an inner call already did.
    #[must_use]
    pub fn in_fcn(mut self, name: &str) -> Self {
        if self.fcn.is_none() {
            self.fcn = Some(name.to_string());
        }
        self
    }

    /// Attach a position unless a more precise one is already set.
    #[must_use]
    pub fn at(mut self, pos: &Pos) -> Self {
        if self.pos.is_none() {
            self.pos = Some(pos.clone());
        }
        self
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(fcn) = &self.fcn {
            write!(f, "{fcn}: ")?;
        }
        write!(f, "{}", self.message)?;
        if let Some(code) = self.code {
            write!(f, " (code {code})")?;
        }
        if let Some(pos) = &self.pos {
            write!(f, " at {pos}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

/// Anything that stops an evaluation.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    /// The wall-clock budget for a phase ran out.
    #[error("{phase} exceeded its time limit of {limit_ms} ms")]
    Timeout { phase: &'static str, limit_ms: u64 },
}

impl EvalError {
    pub fn as_runtime(&self) -> Option<&RuntimeError> {
        match self {
            EvalError::Runtime(e) => Some(e),
            EvalError::Timeout { .. } => None,
        }
    }

    /// Attach a position to a runtime error.
    #[must_use]
    pub fn at(self, pos: &Pos) -> Self {
        match self {
            EvalError::Runtime(e) => EvalError::Runtime(e.at(pos)),
            timeout @ EvalError::Timeout { .. } => timeout,
        }
    }

    #[must_use]
    pub fn in_fcn(self, name: &str) -> Self {
        match self {
            EvalError::Runtime(e) => EvalError::Runtime(e.in_fcn(name)),
            timeout @ EvalError::Timeout { .. } => timeout,
        }
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

#[cold]
pub fn integer_overflow(code: i32) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::Overflow, Some(code), "integer overflow")
}

#[cold]
pub fn division_by_zero(code: i32) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::Domain, Some(code), "integer division by zero")
}

#[cold]
pub fn domain_error(code: i32, message: impl Into<String>) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::Domain, Some(code), message)
}

#[cold]
pub fn cast_out_of_range(code: i32, target: &str) -> RuntimeError {
    RuntimeError::new(
        RuntimeErrorKind::Overflow,
        Some(code),
        format!("value out of range for {target}"),
    )
}

/// Arguments reached a built-in in a shape its resolved signature excludes.
#[cold]
pub fn bad_arguments(args: &[Value]) -> RuntimeError {
    let kinds: Vec<&str> = args.iter().map(Value::kind_name).collect();
    RuntimeError::new(
        RuntimeErrorKind::Domain,
        None,
        format!("unexpected argument kinds ({})", kinds.join(", ")),
    )
}

// ============================================================================
// Access
// ============================================================================

/// Array index out of range in a path.
pub const INDEX_OUT_OF_RANGE: i32 = 2000;
/// Map or pool key missing in a path.
pub const KEY_NOT_FOUND: i32 = 2001;

#[cold]
pub fn index_out_of_range(index: i64, len: usize) -> RuntimeError {
    RuntimeError::new(
        RuntimeErrorKind::OutOfRange,
        Some(INDEX_OUT_OF_RANGE),
        format!("array index {index} out of range for length {len}"),
    )
}

#[cold]
pub fn key_not_found(key: &str) -> RuntimeError {
    RuntimeError::new(
        RuntimeErrorKind::OutOfRange,
        Some(KEY_NOT_FOUND),
        format!("key {key:?} not found"),
    )
}

#[cold]
pub fn empty_array(code: i32) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::OutOfRange, Some(code), "empty array")
}

#[cold]
pub fn dimension_mismatch(code: i32) -> RuntimeError {
    RuntimeError::new(
        RuntimeErrorKind::DimensionMismatch,
        Some(code),
        "dimensions of vectors do not match",
    )
}

// ============================================================================
// Raised by documents
// ============================================================================

#[cold]
pub fn user_error(message: impl Into<String>, code: Option<i32>) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::User, code, message)
}

#[cold]
pub fn encountered_null(code: i32) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::Null, Some(code), "encountered null")
}

// ============================================================================
// Limits
// ============================================================================

/// Loop iteration limit exceeded.
pub const LOOP_LIMIT: i32 = 1000;
/// Call depth limit exceeded.
pub const CALL_DEPTH_LIMIT: i32 = 1001;

#[cold]
pub fn loop_limit_exceeded(limit: u64) -> RuntimeError {
    RuntimeError::new(
        RuntimeErrorKind::Limit,
        Some(LOOP_LIMIT),
        format!("loop exceeded {limit} iterations"),
    )
}

#[cold]
pub fn call_depth_exceeded(limit: usize) -> RuntimeError {
    RuntimeError::new(
        RuntimeErrorKind::Limit,
        Some(CALL_DEPTH_LIMIT),
        format!("maximum call depth of {limit} exceeded"),
    )
}
