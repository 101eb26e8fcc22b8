//! Cells and pools shared by every instance of a program.
//!
//! Each shared item sits behind its own `parking_lot::Mutex` inside an
//! `Arc`. A program owns one [`SharedStore`]; instances clone the handles
//! into their slots, so all of them mutate the same values.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use pfa_library::Value;
use pfa_typeck::TypedProgram;

pub(crate) type SharedCell = Arc<Mutex<Value>>;
pub(crate) type SharedPool = Arc<Mutex<IndexMap<String, Value>>>;

/// Storage for one cell or pool of an instance.
pub(crate) enum Slot<T> {
    Local(T),
    Shared(Arc<Mutex<T>>),
}

impl<T: Clone> Slot<T> {
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self {
            Slot::Local(v) => f(v),
            Slot::Shared(m) => f(&m.lock()),
        }
    }

    pub fn snapshot(&self) -> T {
        self.read(T::clone)
    }

    pub fn write<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> R {
        match self {
            Slot::Local(v) => f(v),
            Slot::Shared(m) => f(&mut m.lock()),
        }
    }

    /// The lock handle of a shared slot.
    pub fn handle(&self) -> Option<Arc<Mutex<T>>> {
        match self {
            Slot::Local(_) => None,
            Slot::Shared(m) => Some(Arc::clone(m)),
        }
    }
}

/// Shared cells and pools of one program; `None` for private items.
#[derive(Default)]
pub(crate) struct SharedStore {
    cells: Vec<Option<SharedCell>>,
    pools: Vec<Option<SharedPool>>,
}

impl SharedStore {
    pub fn new(program: &TypedProgram) -> Self {
        SharedStore {
            cells: program
                .cells
                .iter()
                .map(|c| c.shared.then(|| Arc::new(Mutex::new(c.init.clone()))))
                .collect(),
            pools: program
                .pools
                .iter()
                .map(|p| p.shared.then(|| Arc::new(Mutex::new(p.init.clone()))))
                .collect(),
        }
    }

    /// Slots for a new instance: shared handles, or fresh copies of the init.
    pub fn cell_slots(&self, program: &TypedProgram) -> Vec<Slot<Value>> {
        program
            .cells
            .iter()
            .zip(&self.cells)
            .map(|(info, shared)| match shared {
                Some(m) => Slot::Shared(Arc::clone(m)),
                None => Slot::Local(info.init.clone()),
            })
            .collect()
    }

    pub fn pool_slots(&self, program: &TypedProgram) -> Vec<Slot<IndexMap<String, Value>>> {
        program
            .pools
            .iter()
            .zip(&self.pools)
            .map(|(info, shared)| match shared {
                Some(m) => Slot::Shared(Arc::clone(m)),
                None => Slot::Local(info.init.clone()),
            })
            .collect()
    }
}
