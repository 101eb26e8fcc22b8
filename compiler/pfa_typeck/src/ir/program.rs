//! The checked program: declarations plus typed bodies.

use indexmap::IndexMap;
use pfa_ir::{Method, Name, OptionEntry, Pos};
use pfa_library::Value;
use pfa_types::Type;

use super::{TExprId, TypedArena};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(raw: u32) -> Self {
                $name(raw)
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            pub(crate) fn from_index(index: usize) -> Self {
                $name(u32::try_from(index).unwrap_or(u32::MAX))
            }
        }
    };
}

define_id!(
    /// Index into [`TypedProgram::cells`].
    CellId
);
define_id!(
    /// Index into [`TypedProgram::pools`].
    PoolId
);
define_id!(
    /// Index into [`TypedProgram::fcns`].
    FcnId
);
define_id!(
    /// Index into [`TypedProgram::inline`].
    InlineId
);

/// Read-only symbols supplied by the engine.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Special {
    Input,
    Tally,
    Name,
    Instance,
    Version,
    ActionsStarted,
    ActionsFinished,
    /// First argument of `merge`.
    TallyOne,
    /// Second argument of `merge`.
    TallyTwo,
}

impl Special {
    pub const ALL: [Special; 9] = [
        Special::Input,
        Special::Tally,
        Special::Name,
        Special::Instance,
        Special::Version,
        Special::ActionsStarted,
        Special::ActionsFinished,
        Special::TallyOne,
        Special::TallyTwo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Special::Input => "input",
            Special::Tally => "tally",
            Special::Name => "name",
            Special::Instance => "instance",
            Special::Version => "version",
            Special::ActionsStarted => "actionsStarted",
            Special::ActionsFinished => "actionsFinished",
            Special::TallyOne => "tallyOne",
            Special::TallyTwo => "tallyTwo",
        }
    }

    pub fn from_name(name: &str) -> Option<Special> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }
}

#[derive(Clone, Debug)]
pub struct CellInfo {
    pub name: Name,
    pub ty: Type,
    pub init: Value,
    pub shared: bool,
}

#[derive(Clone, Debug)]
pub struct PoolInfo {
    pub name: Name,
    /// Type of each entry.
    pub ty: Type,
    pub init: IndexMap<String, Value>,
    pub shared: bool,
}

/// A function declared in `fcns`.
#[derive(Clone, Debug)]
pub struct UserFcn {
    pub name: Name,
    pub params: Vec<(Name, Type)>,
    pub ret: Type,
    /// Last expression already widened to `ret`.
    pub body: Vec<TExprId>,
    pub pos: Pos,
}

/// An inline function definition.
#[derive(Clone, Debug)]
pub struct InlineFcn {
    pub params: Vec<(Name, Type)>,
    pub ret: Type,
    pub body: Vec<TExprId>,
    /// Enclosing locals the body reads, copied when the function value is created.
    pub captures: Vec<Name>,
    pub pos: Pos,
}

/// A fully checked document, ready to execute.
#[derive(Clone, Debug)]
pub struct TypedProgram {
    pub name: String,
    pub version: Option<i32>,
    pub doc: Option<String>,
    pub metadata: IndexMap<String, String>,
    pub method: Method,
    pub input: Type,
    pub output: Type,
    pub cells: Vec<CellInfo>,
    pub pools: Vec<PoolInfo>,
    pub fcns: Vec<UserFcn>,
    pub inline: Vec<InlineFcn>,
    pub begin: Vec<TExprId>,
    /// For `map` and `fold`, the last expression is widened to `output`.
    pub action: Vec<TExprId>,
    pub end: Vec<TExprId>,
    /// Initial tally (`fold` only).
    pub zero: Option<Value>,
    /// Merge body over `tallyOne` and `tallyTwo`, widened to `output`.
    pub merge: Option<Vec<TExprId>>,
    pub randseed: Option<i64>,
    /// Document options, validated by the driver.
    pub options: Vec<OptionEntry>,
    pub arena: TypedArena,
}

impl TypedProgram {
    pub fn cell(&self, id: CellId) -> &CellInfo {
        &self.cells[id.index()]
    }

    pub fn pool(&self, id: PoolId) -> &PoolInfo {
        &self.pools[id.index()]
    }

    pub fn fcn(&self, id: FcnId) -> &UserFcn {
        &self.fcns[id.index()]
    }

    pub fn inline_fcn(&self, id: InlineId) -> &InlineFcn {
        &self.inline[id.index()]
    }

    pub fn cell_id(&self, name: &str) -> Option<CellId> {
        self.cells
            .iter()
            .position(|c| c.name.as_str() == name)
            .map(CellId::from_index)
    }

    pub fn pool_id(&self, name: &str) -> Option<PoolId> {
        self.pools
            .iter()
            .position(|p| p.name.as_str() == name)
            .map(PoolId::from_index)
    }
}
