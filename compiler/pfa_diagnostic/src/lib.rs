//! Diagnostic system for document compilation errors.
//!
//! - Error codes for searchability
//! - Clear messages (what went wrong)
//! - Document position (where it went wrong)
//! - Notes and suggestions (how to fix)
//!
//! Every construction-time failure is a [`Diagnostic`]; its [`ErrorKind`]
//! follows from the code's range.

mod diagnostic;
mod error_code;

pub use diagnostic::{
    invalid_value, malformed_form, missing_field, type_mismatch, unknown_symbol, Diagnostic,
};
pub use error_code::{ErrorCode, ErrorKind};
