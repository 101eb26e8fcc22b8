//! Runtime variable scopes.
//!
//! An arena of frames with parent indices. Frames are created and
//! destroyed in stack order, so leaving a scope truncates the arena.
//! A function call starts a new chain with no parent: callees never see
//! the caller's locals. Inline functions get their captured values
//! defined in the first frame of their chain.

use pfa_ir::Name;
use pfa_library::Value;
use smallvec::SmallVec;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FrameId(u32);

impl FrameId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
struct Frame {
    parent: Option<FrameId>,
    bindings: SmallVec<[(Name, Value); 4]>,
}

/// Marker returned by [`Environment::enter`]; pass it back to leave.
#[must_use = "a scope must be left with the mark it was entered with"]
#[derive(Copy, Clone, Debug)]
pub struct Mark {
    len: usize,
    current: Option<FrameId>,
}

#[derive(Clone, Debug, Default)]
pub struct Environment {
    frames: Vec<Frame>,
    current: Option<FrameId>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, parent: Option<FrameId>) -> Mark {
        let mark = Mark {
            len: self.frames.len(),
            current: self.current,
        };
        let id = FrameId(u32::try_from(self.frames.len()).unwrap_or(u32::MAX));
        self.frames.push(Frame {
            parent,
            bindings: SmallVec::new(),
        });
        self.current = Some(id);
        mark
    }

    /// Open a nested scope of the current one.
    #[inline]
    pub fn enter(&mut self) -> Mark {
        self.push(self.current)
    }

    /// Open the root scope of a function call.
    #[inline]
    pub fn enter_call(&mut self) -> Mark {
        self.push(None)
    }

    /// Close every scope opened since `mark`.
    #[inline]
    pub fn leave(&mut self, mark: Mark) {
        self.frames.truncate(mark.len);
        self.current = mark.current;
    }

    /// Bind `name` in the current scope.
    pub fn define(&mut self, name: Name, value: Value) {
        let Some(current) = self.current else {
            let _root = self.push(None);
            return self.define(name, value);
        };
        let frame = &mut self.frames[current.index()];
        match frame.bindings.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => frame.bindings.push((name, value)),
        }
    }

    /// Find the innermost binding of `name` along the current chain.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        let mut frame = self.current;
        while let Some(id) = frame {
            let f = &self.frames[id.index()];
            if let Some((_, v)) = f.bindings.iter().rev().find(|(n, _)| n.as_str() == name) {
                return Some(v);
            }
            frame = f.parent;
        }
        None
    }

    /// Overwrite the innermost binding of `name`. Returns `false` when unbound.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        let mut frame = self.current;
        while let Some(id) = frame {
            let f = &mut self.frames[id.index()];
            if let Some((_, slot)) = f.bindings.iter_mut().find(|(n, _)| n.as_str() == name) {
                *slot = value;
                return true;
            }
            frame = f.parent;
        }
        false
    }

    /// Drop every frame.
    pub fn reset(&mut self) {
        self.frames.clear();
        self.current = None;
    }
}
