//! Wildcard binding for one signature alternative.
//!
//! Binding runs in two phases. `collect` walks each (pattern, argument)
//! pair, checking concrete structure and recording every type offered to
//! each wildcard. `finish` then picks, per wildcard, the widest offered type
//! along `accepts`, failing if two offers are mutually unacceptable or the
//! result is outside the wildcard's allowed set.

use rustc_hash::FxHashMap;

use crate::{Pattern, Type, WildId};

#[derive(Clone, Default)]
pub(super) struct Binder {
    offers: FxHashMap<WildId, Vec<Type>>,
    allowed: FxHashMap<WildId, Vec<Type>>,
}

pub(super) type Bindings = FxHashMap<WildId, Type>;

impl Binder {
    fn offer(&mut self, id: WildId, ty: Type) {
        self.offers.entry(id).or_default().push(ty);
    }

    /// Match `pattern` against `ty`, recording wildcard offers.
    pub(super) fn collect(&mut self, pattern: &Pattern, ty: &Type) -> bool {
        match pattern {
            Pattern::Exact(required) => required.accepts(ty),
            Pattern::Array(items) => match ty {
                Type::Array(it) => self.collect(items, it),
                _ => false,
            },
            Pattern::Map(values) => match ty {
                Type::Map(vt) => self.collect(values, vt),
                _ => false,
            },
            Pattern::Wild { id, allowed } => {
                if let Some(allowed) = allowed {
                    self.allowed.insert(*id, allowed.clone());
                }
                self.offer(*id, ty.clone());
                true
            }
            Pattern::WildRecord { id, fields } => match ty {
                Type::Record(record) => {
                    let ok = fields.iter().all(|(name, fp)| {
                        record.field(name).is_some_and(|f| self.collect(fp, &f.ty))
                    });
                    if ok {
                        self.offer(*id, ty.clone());
                    }
                    ok
                }
                _ => false,
            },
            Pattern::WildEnum(id) => match ty {
                Type::Enum(_) => {
                    self.offer(*id, ty.clone());
                    true
                }
                _ => false,
            },
            Pattern::WildFixed(id) => match ty {
                Type::Fixed(_) => {
                    self.offer(*id, ty.clone());
                    true
                }
                _ => false,
            },
            Pattern::Fcn(params, ret) => match ty {
                Type::Fcn(fcn) if fcn.params.len() == params.len() => {
                    params.iter().zip(&fcn.params).all(|(p, t)| self.collect(p, t))
                        && self.collect(ret, &fcn.ret)
                }
                _ => false,
            },
            Pattern::Union(members) => self.collect_union(members, ty),
        }
    }

    /// Each argument member must be covered by a non-wildcard pattern
    /// member; whatever is left binds the bare wildcard member, if any.
    fn collect_union(&mut self, members: &[Pattern], ty: &Type) -> bool {
        let wild = members.iter().find(|m| m.bare_wild().is_some());
        let mut leftovers = Vec::new();
        for member in ty.members() {
            let mut covered = false;
            for concrete in members.iter().filter(|m| m.bare_wild().is_none()) {
                let snapshot = self.clone();
                if self.collect(concrete, member) {
                    covered = true;
                    break;
                }
                *self = snapshot;
            }
            if !covered {
                leftovers.push(member.clone());
            }
        }
        if leftovers.is_empty() {
            return true;
        }
        let Some(wild) = wild else {
            return false;
        };
        let rest = if leftovers.len() == 1 {
            leftovers.swap_remove(0)
        } else {
            match Type::union_of(leftovers) {
                Ok(ty) => ty,
                Err(_) => return false,
            }
        };
        self.collect(wild, &rest)
    }

    /// Choose one type per wildcard.
    pub(super) fn finish(self) -> Option<Bindings> {
        let mut bindings = Bindings::default();
        for (id, offers) in self.offers {
            let mut iter = offers.into_iter();
            let mut bound = iter.next()?;
            for offer in iter {
                if bound.accepts(&offer) {
                    continue;
                }
                if offer.accepts(&bound) {
                    bound = offer;
                } else {
                    return None;
                }
            }
            if let Some(allowed) = self.allowed.get(id) {
                if !allowed.contains(&bound) {
                    return None;
                }
            }
            bindings.insert(id, bound);
        }
        Some(bindings)
    }
}

/// Substitute bindings into a pattern.
pub(super) fn instantiate(pattern: &Pattern, bindings: &Bindings) -> Option<Type> {
    Some(match pattern {
        Pattern::Exact(ty) => ty.clone(),
        Pattern::Array(items) => Type::array(instantiate(items, bindings)?),
        Pattern::Map(values) => Type::map(instantiate(values, bindings)?),
        Pattern::Fcn(params, ret) => Type::fcn(
            params
                .iter()
                .map(|p| instantiate(p, bindings))
                .collect::<Option<_>>()?,
            instantiate(ret, bindings)?,
        ),
        Pattern::Union(members) => {
            let mut flat: Vec<Type> = Vec::new();
            for m in members {
                for t in instantiate(m, bindings)?.members() {
                    if !flat.contains(t) {
                        flat.push(t.clone());
                    }
                }
            }
            if flat.len() == 1 {
                flat.swap_remove(0)
            } else {
                Type::union_of(flat).ok()?
            }
        }
        Pattern::Wild { id, .. }
        | Pattern::WildRecord { id, .. }
        | Pattern::WildEnum(id)
        | Pattern::WildFixed(id) => bindings.get(id)?.clone(),
    })
}
