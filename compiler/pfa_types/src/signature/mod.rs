//! Declarative signatures and call-site resolution.
//!
//! A [`SignatureSet`] is an ordered list of alternatives. Resolution walks
//! the alternatives in declared order and returns the first one whose
//! parameters accept the argument types under a consistent wildcard binding.
//! There is no ranking across alternatives.

mod bind;

use std::fmt;

use crate::{Pattern, Type};
use bind::Binder;

/// One accepted parameter/return shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Sig {
    pub params: Vec<(&'static str, Pattern)>,
    /// May only mention wildcards bound by `params`.
    pub ret: Pattern,
}

impl Sig {
    pub fn new(params: Vec<(&'static str, Pattern)>, ret: Pattern) -> Self {
        Sig { params, ret }
    }

    /// Resolve this alternative against concrete argument types.
    fn resolve(&self, args: &[Type]) -> Option<(Vec<Type>, Type)> {
        if args.len() != self.params.len() {
            return None;
        }
        let mut binder = Binder::default();
        for ((_, pattern), arg) in self.params.iter().zip(args) {
            if !binder.collect(pattern, arg) {
                return None;
            }
        }
        let bindings = binder.finish()?;
        let params: Vec<Type> = self
            .params
            .iter()
            .map(|(_, p)| bind::instantiate(p, &bindings))
            .collect::<Option<_>>()?;
        if !params.iter().zip(args).all(|(p, a)| p.accepts(a)) {
            return None;
        }
        let ret = bind::instantiate(&self.ret, &bindings)?;
        Some((params, ret))
    }
}

impl fmt::Display for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, (name, p)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {p}")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

/// Result of resolving a call site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    /// Index of the selected alternative.
    pub index: usize,
    /// Parameter types after binding; arguments are coerced to these.
    pub params: Vec<Type>,
    pub ret: Type,
}

/// Ordered signature alternatives of one function.
#[derive(Clone, Debug, PartialEq)]
pub struct SignatureSet {
    alternatives: Vec<Sig>,
}

impl SignatureSet {
    pub fn new(alternatives: Vec<Sig>) -> Self {
        SignatureSet { alternatives }
    }

    pub fn single(sig: Sig) -> Self {
        SignatureSet {
            alternatives: vec![sig],
        }
    }

    pub fn alternatives(&self) -> &[Sig] {
        &self.alternatives
    }

    /// Select the first alternative matching `args`.
    pub fn resolve(&self, args: &[Type]) -> Option<Resolved> {
        self.alternatives
            .iter()
            .enumerate()
            .find_map(|(index, sig)| {
                sig.resolve(args)
                    .map(|(params, ret)| Resolved { index, params, ret })
            })
    }

    /// The only alternative, when it has no wildcards.
    ///
    /// Such functions can be used as first-class function values.
    pub fn monomorphic(&self) -> Option<(Vec<Type>, Type)> {
        match self.alternatives.as_slice() {
            [sig] => {
                let params = sig
                    .params
                    .iter()
                    .map(|(_, p)| match p {
                        Pattern::Exact(t) => Some(t.clone()),
                        _ => None,
                    })
                    .collect::<Option<Vec<_>>>()?;
                match &sig.ret {
                    Pattern::Exact(ret) => Some((params, ret.clone())),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests;
