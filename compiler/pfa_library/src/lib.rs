#![allow(
    clippy::result_large_err,
    reason = "EvalError is fundamental; boxing would add complexity across the crate"
)]
//! PFA Library - runtime values, errors and the function registry.
//!
//! This crate provides:
//! - Runtime value types (`Value`, `FcnValue`)
//! - Runtime error types (`RuntimeError`, `EvalError`) and their constructors
//! - The Avro-JSON value codec (`json`) and dynamic widening (`coerce`)
//! - The function registry contract (`LibFcn`, `Builtin`, `FunctionRegistry`)
//! - The built-in catalog (`builtins`)
//! - The per-instance random source (`Rng`)
//!
//! # Architecture
//!
//! Built-ins are opaque evaluators behind the `LibFcn` trait. Each one
//! declares its `SignatureSet` once at registration; the type checker
//! resolves call sites against it and the engine calls `apply` with
//! arguments already widened to the resolved parameter types.

pub mod builtins;
mod coerce;
pub mod errors;
pub mod json;
mod registry;
mod rng;
mod value;

pub use coerce::{coerce, conforms};
pub use errors::{EvalError, EvalResult, RuntimeError, RuntimeErrorKind};
pub use registry::{Builtin, BuiltinFn, CallContext, CallInfo, FunctionRegistry, LibFcn};
pub use rng::Rng;
pub use value::{compare, values_equal, FcnTarget, FcnValue, Value};
