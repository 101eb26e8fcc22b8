use std::fmt;

use pfa_ir::Pos;
use pfa_types::Type;

use super::TKind;

/// Index of a node in a [`TypedArena`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TExprId(u32);

impl TExprId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        TExprId(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TExprId({})", self.0)
    }
}

/// Arena of typed nodes.
#[derive(Clone, Debug, Default)]
pub struct TypedArena {
    kinds: Vec<TKind>,
    types: Vec<Type>,
    positions: Vec<Pos>,
}

impl TypedArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: TKind, ty: Type, pos: Pos) -> TExprId {
        let raw = u32::try_from(self.kinds.len()).unwrap_or(u32::MAX);
        self.kinds.push(kind);
        self.types.push(ty);
        self.positions.push(pos);
        TExprId::new(raw)
    }

    #[inline]
    pub fn kind(&self, id: TExprId) -> &TKind {
        &self.kinds[id.index()]
    }

    #[inline]
    pub fn ty(&self, id: TExprId) -> &Type {
        &self.types[id.index()]
    }

    #[inline]
    pub fn pos(&self, id: TExprId) -> &Pos {
        &self.positions[id.index()]
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
