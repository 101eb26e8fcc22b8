//! Document skeleton: everything outside the expression trees.

use indexmap::IndexMap;

use crate::{ExprArena, ExprId, FcnDef, Name, Pos};

/// An unresolved type expression: the Avro-JSON form plus where it was
/// written. Resolved by the schema codec during checking.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeExpr {
    pub json: serde_json::Value,
    pub pos: Pos,
}

impl TypeExpr {
    pub fn new(json: serde_json::Value, pos: Pos) -> Self {
        TypeExpr { json, pos }
    }
}

/// Scoring method of a document.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Method {
    /// One output per action.
    #[default]
    Map,
    /// Outputs are streamed through the emit callback.
    Emit,
    /// Outputs accumulate into `tally`.
    Fold,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Map => "map",
            Method::Emit => "emit",
            Method::Fold => "fold",
        }
    }
}

/// A `cells` entry.
#[derive(Clone, Debug, PartialEq)]
pub struct CellDecl {
    pub name: Name,
    pub ty: TypeExpr,
    pub init: serde_json::Value,
    pub shared: bool,
    pub pos: Pos,
}

/// A `pools` entry. `init` maps keys to JSON values of `ty`.
#[derive(Clone, Debug, PartialEq)]
pub struct PoolDecl {
    pub name: Name,
    pub ty: TypeExpr,
    pub init: IndexMap<String, serde_json::Value>,
    pub shared: bool,
    pub pos: Pos,
}

/// A `fcns` entry. `name` excludes the `u.` prefix used at call sites.
#[derive(Clone, Debug, PartialEq)]
pub struct FcnDecl {
    pub name: Name,
    pub def: FcnDef,
}

/// One `options` entry, in document order.
#[derive(Clone, Debug, PartialEq)]
pub struct OptionEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub pos: Pos,
}

/// A parsed scoring document.
#[derive(Clone, Debug)]
pub struct Document {
    pub name: Option<String>,
    pub version: Option<i32>,
    pub doc: Option<String>,
    pub metadata: IndexMap<String, String>,
    pub method: Method,
    pub input: TypeExpr,
    pub output: TypeExpr,
    pub begin: Vec<ExprId>,
    pub action: Vec<ExprId>,
    pub end: Vec<ExprId>,
    pub fcns: Vec<FcnDecl>,
    pub cells: Vec<CellDecl>,
    pub pools: Vec<PoolDecl>,
    /// Initial tally for the fold method.
    pub zero: Option<(serde_json::Value, Pos)>,
    /// Fold merge expression over `tallyOne` and `tallyTwo`.
    pub merge: Option<Vec<ExprId>>,
    pub randseed: Option<i64>,
    pub options: Vec<OptionEntry>,
    pub arena: ExprArena,
}
