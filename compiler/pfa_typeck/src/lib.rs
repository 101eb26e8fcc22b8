//! Type checking for PFA documents.
//!
//! [`check`] resolves every symbol, call and type in a parsed
//! [`Document`](pfa_ir::Document) and lowers it into a [`TypedProgram`]:
//! a second arena whose nodes carry concrete types and resolved targets.
//! Both execution backends consume only that form.
//!
//! # Architecture
//!
//! - `check`: the multi-pass checker (declarations, signatures, bodies, effects)
//! - `scope`: compile-time frames with capture tracking
//! - `effects`: cell and pool effects propagated over the user call graph
//! - [`ir`]: the typed program

#![allow(clippy::result_large_err, reason = "diagnostics are reported, not propagated")]

mod check;
mod effects;
pub mod ir;
mod scope;

pub use check::check;
pub use ir::{
    CellId, CellInfo, FcnId, FcnRefTarget, InlineFcn, InlineId, LibCall, PathStep, PoolId,
    PoolInfo, Special, TCastCase, TExprId, TKind, TypedArena, TypedProgram, Update, UserFcn,
};
