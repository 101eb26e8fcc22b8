//! Typed program representation.
//!
//! The checker lowers the raw `ExprArena` into a [`TypedArena`] whose nodes
//! carry their resolved type and resolved targets: cell and pool ids,
//! user function ids, library function handles, explicit coercions. Both
//! execution backends consume only this form.
//!
//! # Arena Layout
//!
//! Struct-of-arrays: parallel `kinds`, `types` and `positions` vectors
//! indexed by [`TExprId`].

mod arena;
mod program;

pub use arena::{TExprId, TypedArena};
pub use program::{
    CellId, CellInfo, FcnId, InlineFcn, InlineId, PoolId, PoolInfo, Special, TypedProgram,
    UserFcn,
};

use std::sync::Arc;

use pfa_ir::Name;
use pfa_library::{LibFcn, Value};
use pfa_types::Type;

/// One step of a nested access path.
#[derive(Clone, Debug)]
pub enum PathStep {
    /// Record field by declaration index.
    Field(usize),
    /// Array element; the expression is an `int`.
    Index(TExprId),
    /// Map entry; the expression is a `string`.
    Key(TExprId),
}

/// The new value of a `to` update.
#[derive(Clone, Debug)]
pub enum Update {
    /// Replacement value, already coerced to the slot type.
    Value(TExprId),
    /// Expression producing a function from the old value to the new one.
    Fcn(TExprId),
}

/// Library target of a call or function reference.
#[derive(Clone, Debug)]
pub struct LibCall {
    pub fcn: Arc<dyn LibFcn>,
    /// Matched signature alternative.
    pub index: usize,
    pub params: Arc<[Type]>,
    pub ret: Type,
}

/// Function a `MakeFcn` node refers to.
#[derive(Clone, Debug)]
pub enum FcnRefTarget {
    User(FcnId),
    Inline(InlineId),
    Lib(LibCall),
}

/// One resolved `cast` case.
#[derive(Clone, Debug)]
pub struct TCastCase {
    /// Union member this case handles.
    pub member: Type,
    pub named: Name,
    pub body: Vec<TExprId>,
}

/// Typed expression kinds.
#[derive(Clone, Debug)]
pub enum TKind {
    /// A constant, including decoded typed literals.
    Literal(Value),
    Local(Name),
    Special(Special),
    /// Field values in record declaration order.
    NewRecord(Vec<TExprId>),
    NewMap(Vec<(String, TExprId)>),
    NewArray(Vec<TExprId>),
    Do(Vec<TExprId>),
    Let(Vec<(Name, TExprId)>),
    Set(Vec<(Name, TExprId)>),
    Attr {
        base: TExprId,
        path: Vec<PathStep>,
        to: Option<Update>,
    },
    CellGet {
        cell: CellId,
        path: Vec<PathStep>,
    },
    CellTo {
        cell: CellId,
        path: Vec<PathStep>,
        to: Update,
    },
    PoolGet {
        pool: PoolId,
        key: TExprId,
        path: Vec<PathStep>,
    },
    PoolTo {
        pool: PoolId,
        key: TExprId,
        path: Vec<PathStep>,
        to: Update,
        /// Starting value when the key is absent.
        init: Option<TExprId>,
    },
    PoolDel {
        pool: PoolId,
        key: TExprId,
    },
    /// Replace every entry of a pool (`set` on a pool name).
    PoolReplace {
        pool: PoolId,
        value: TExprId,
    },
    If {
        cond: TExprId,
        then: Vec<TExprId>,
        else_: Option<Vec<TExprId>>,
    },
    Cond {
        arms: Vec<(TExprId, Vec<TExprId>)>,
        else_: Option<Vec<TExprId>>,
    },
    While {
        cond: TExprId,
        body: Vec<TExprId>,
    },
    DoUntil {
        body: Vec<TExprId>,
        cond: TExprId,
    },
    For {
        init: Vec<(Name, TExprId)>,
        cond: TExprId,
        step: Vec<(Name, TExprId)>,
        body: Vec<TExprId>,
    },
    Foreach {
        var: Name,
        array: TExprId,
        body: Vec<TExprId>,
    },
    Forkey {
        key: Name,
        value: Name,
        map: TExprId,
        body: Vec<TExprId>,
    },
    /// Union dispatch. A value matching no case yields `null` (partial casts only).
    Cast {
        expr: TExprId,
        cases: Vec<TCastCase>,
    },
    IfNotNull {
        bindings: Vec<(Name, TExprId)>,
        then: Vec<TExprId>,
        else_: Option<Vec<TExprId>>,
    },
    /// Widen the operand to this node's type.
    Coerce(TExprId),
    /// Create a function value; `fill` holds (parameter index, value) pairs.
    MakeFcn {
        target: FcnRefTarget,
        fill: Vec<(usize, TExprId)>,
    },
    CallUser {
        fcn: FcnId,
        args: Vec<TExprId>,
    },
    CallLib {
        call: LibCall,
        args: Vec<TExprId>,
    },
    /// Call a function value; the result is widened to this node's type.
    CallValue {
        callee: TExprId,
        args: Vec<TExprId>,
    },
    And(TExprId, TExprId),
    Or(TExprId, TExprId),
    Error {
        message: String,
        code: Option<i32>,
    },
    Log {
        args: Vec<TExprId>,
        namespace: Option<String>,
    },
    /// Value already coerced to the output type.
    Emit(TExprId),
}
