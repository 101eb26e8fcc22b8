//! Raw expression tree.
//!
//! This is what the document says, before any symbol or type is resolved.
//! Children are `ExprId` indices into an [`ExprArena`].
//!
//! # Arena Layout
//!
//! `ExprArena` uses struct-of-arrays layout: parallel `kinds` and `positions`
//! arrays indexed by [`ExprId`].

use crate::{ExprId, Name, Pos, TypeExpr};

/// Literal payloads.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
}

/// Payload of a `new` form: object form builds records and maps, array form
/// builds arrays.
#[derive(Clone, Debug, PartialEq)]
pub enum NewItems {
    Fields(Vec<(Name, ExprId)>),
    Items(Vec<ExprId>),
}

/// A declared function parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Name,
    pub ty: TypeExpr,
}

/// A function definition: named in `fcns` or written inline.
#[derive(Clone, Debug, PartialEq)]
pub struct FcnDef {
    pub params: Vec<Param>,
    pub ret: TypeExpr,
    pub body: Vec<ExprId>,
    pub pos: Pos,
}

/// One `as` case of a `cast` dispatch.
#[derive(Clone, Debug, PartialEq)]
pub struct CastCase {
    pub ty: TypeExpr,
    pub named: Name,
    pub body: Vec<ExprId>,
    pub pos: Pos,
}

/// Raw expression kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    /// Bare JSON literal or a typed-literal shorthand (`{"int": 1}`).
    Literal(Literal),
    /// `{"type": T, "value": v}`; the value is decoded once `T` is known.
    TypedLiteral {
        ty: TypeExpr,
        value: serde_json::Value,
    },
    /// Symbol reference.
    Ref(Name),
    New {
        items: NewItems,
        ty: TypeExpr,
    },
    Do(Vec<ExprId>),
    Let(Vec<(Name, ExprId)>),
    Set(Vec<(Name, ExprId)>),
    /// Nested read (`to` absent) or copy-with-update.
    Attr {
        expr: ExprId,
        path: Vec<ExprId>,
        to: Option<ExprId>,
    },
    Cell {
        name: Name,
        path: Vec<ExprId>,
        to: Option<ExprId>,
    },
    Pool {
        name: Name,
        path: Vec<ExprId>,
        to: Option<ExprId>,
        init: Option<ExprId>,
    },
    PoolDel {
        name: Name,
        key: ExprId,
    },
    If {
        cond: ExprId,
        then: Vec<ExprId>,
        else_: Option<Vec<ExprId>>,
    },
    Cond {
        arms: Vec<(ExprId, Vec<ExprId>)>,
        else_: Option<Vec<ExprId>>,
    },
    While {
        cond: ExprId,
        body: Vec<ExprId>,
    },
    DoUntil {
        body: Vec<ExprId>,
        cond: ExprId,
    },
    For {
        init: Vec<(Name, ExprId)>,
        cond: ExprId,
        step: Vec<(Name, ExprId)>,
        body: Vec<ExprId>,
    },
    Foreach {
        var: Name,
        array: ExprId,
        body: Vec<ExprId>,
        seq: bool,
    },
    Forkey {
        key: Name,
        value: Name,
        map: ExprId,
        body: Vec<ExprId>,
    },
    Cast {
        expr: ExprId,
        cases: Vec<CastCase>,
        partial: bool,
    },
    Upcast {
        expr: ExprId,
        ty: TypeExpr,
    },
    IfNotNull {
        bindings: Vec<(Name, ExprId)>,
        then: Vec<ExprId>,
        else_: Option<Vec<ExprId>>,
    },
    /// Inline function definition.
    FcnDef(FcnDef),
    /// `{"fcn": name}` with optional partial-application `fill`.
    FcnRef {
        name: Name,
        fill: Vec<(Name, ExprId)>,
    },
    /// Call by name: user function (`u.`), library function, or a local
    /// holding a function value.
    Call {
        name: Name,
        args: Vec<ExprId>,
    },
    Error {
        message: String,
        code: Option<i32>,
    },
    Log {
        args: Vec<ExprId>,
        namespace: Option<String>,
    },
    Emit(ExprId),
    Doc(String),
}

/// A raw expression node.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Pos,
}

impl Expr {
    pub fn new(kind: ExprKind, pos: Pos) -> Self {
        Expr { kind, pos }
    }
}

/// Arena holding every raw expression of one document.
#[derive(Clone, Debug, Default)]
pub struct ExprArena {
    kinds: Vec<ExprKind>,
    positions: Vec<Pos>,
}

impl ExprArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an expression, returning its ID.
    pub fn alloc(&mut self, expr: Expr) -> ExprId {
        let raw = u32::try_from(self.kinds.len()).unwrap_or(u32::MAX);
        self.kinds.push(expr.kind);
        self.positions.push(expr.pos);
        ExprId::new(raw)
    }

    /// Get the expression kind for a node.
    #[inline]
    pub fn kind(&self, id: ExprId) -> &ExprKind {
        &self.kinds[id.index()]
    }

    /// Get the document position of a node.
    #[inline]
    pub fn pos(&self, id: ExprId) -> &Pos {
        &self.positions[id.index()]
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
