//! Compile-time scopes.
//!
//! A stack of frames mirrors the runtime `Environment`. Inline function
//! definitions push a boundary: a name found below the innermost boundary
//! is an enclosing local, recorded as a capture of every boundary it
//! crosses.

use pfa_ir::Name;
use pfa_types::Type;
use rustc_hash::FxHashMap;

use crate::ir::Special;

#[derive(Clone, Debug)]
pub(crate) enum VarKind {
    Local,
    Special(Special),
}

#[derive(Clone, Debug)]
pub(crate) struct Var {
    pub ty: Type,
    pub kind: VarKind,
}

/// Result of a successful lookup.
#[derive(Clone, Debug)]
pub(crate) struct Found {
    pub var: Var,
    /// Defined outside the innermost inline function.
    pub captured: bool,
}

struct Boundary {
    start: usize,
    captures: Vec<Name>,
}

#[derive(Default)]
pub(crate) struct Scope {
    frames: Vec<FxHashMap<Name, Var>>,
    boundaries: Vec<Boundary>,
}

impl Scope {
    /// A scope with one frame holding the given special symbols.
    pub fn with_specials(specials: impl IntoIterator<Item = (Special, Type)>) -> Self {
        let mut root = FxHashMap::default();
        for (special, ty) in specials {
            root.insert(
                Name::new(special.as_str()),
                Var {
                    ty,
                    kind: VarKind::Special(special),
                },
            );
        }
        Scope {
            frames: vec![root],
            boundaries: Vec::new(),
        }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    pub fn declare(&mut self, name: Name, ty: Type) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name, Var { ty, kind: VarKind::Local });
        }
    }

    /// Any frame of the current chain defines `name`.
    pub fn is_visible(&self, name: &str) -> bool {
        self.frames.iter().any(|f| f.contains_key(name))
    }

    /// Look up `name`, recording captures across inline function boundaries.
    pub fn lookup(&mut self, name: &str) -> Option<Found> {
        let (depth, var) = self
            .frames
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, f)| f.get(name).map(|v| (i, v.clone())))?;
        let mut captured = false;
        if matches!(var.kind, VarKind::Local) {
            for boundary in self.boundaries.iter_mut().rev() {
                if boundary.start <= depth {
                    break;
                }
                captured = true;
                if !boundary.captures.iter().any(|c| c.as_str() == name) {
                    boundary.captures.push(Name::new(name));
                }
            }
        }
        Some(Found { var, captured })
    }

    /// Start an inline function body; its frames follow.
    pub fn enter_fcn(&mut self) {
        self.boundaries.push(Boundary {
            start: self.frames.len(),
            captures: Vec::new(),
        });
        self.push_frame();
    }

    /// End an inline function body, returning the names it captured.
    pub fn exit_fcn(&mut self) -> Vec<Name> {
        let Some(boundary) = self.boundaries.pop() else {
            return Vec::new();
        };
        self.frames.truncate(boundary.start);
        boundary.captures
    }
}
