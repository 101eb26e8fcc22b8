//! Cell and pool effects of user functions.
//!
//! Each user function records the effects its own body has and the user
//! functions it calls or references. [`EffectGraph::closure`] propagates
//! effects along those edges until nothing changes.

use bitflags::bitflags;
use rustc_hash::FxHashSet;

use crate::ir::FcnId;

bitflags! {
    /// What a function body may do to engine state.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct Effects: u8 {
        const READS_CELL = 1 << 0;
        const WRITES_CELL = 1 << 1;
        const READS_POOL = 1 << 2;
        const WRITES_POOL = 1 << 3;
        const EMITS = 1 << 4;

        /// Touches any cell or pool.
        const STATE = Self::READS_CELL.bits()
            | Self::WRITES_CELL.bits()
            | Self::READS_POOL.bits()
            | Self::WRITES_POOL.bits();
    }
}

#[derive(Default)]
pub(crate) struct EffectGraph {
    direct: Vec<Effects>,
    edges: Vec<FxHashSet<FcnId>>,
}

impl EffectGraph {
    pub fn with_fcns(count: usize) -> Self {
        EffectGraph {
            direct: vec![Effects::empty(); count],
            edges: vec![FxHashSet::default(); count],
        }
    }

    pub fn add(&mut self, fcn: FcnId, effects: Effects) {
        if let Some(e) = self.direct.get_mut(fcn.index()) {
            *e |= effects;
        }
    }

    pub fn edge(&mut self, from: FcnId, to: FcnId) {
        if let Some(e) = self.edges.get_mut(from.index()) {
            e.insert(to);
        }
    }

    /// Transitive effects of every function.
    pub fn closure(&self) -> Vec<Effects> {
        let mut total = self.direct.clone();
        let mut changed = true;
        while changed {
            changed = false;
            for (i, edges) in self.edges.iter().enumerate() {
                let inherited = edges
                    .iter()
                    .fold(Effects::empty(), |acc, callee| acc | total[callee.index()]);
                if !total[i].contains(inherited) {
                    total[i] |= inherited;
                    changed = true;
                }
            }
        }
        total
    }
}
