//! Compatibility relation and branch merging.

use std::sync::Arc;

use crate::Type;

impl Type {
    /// Whether a value of `candidate` may be used where `self` is required.
    ///
    /// Reflexive and transitive along `int -> long -> float -> double`;
    /// never symmetric for distinct types.
    pub fn accepts(&self, candidate: &Type) -> bool {
        match (self, candidate) {
            (Type::Union(required), Type::Union(offered)) => offered
                .iter()
                .all(|c| required.iter().any(|r| r.accepts(c))),
            (Type::Union(required), c) => required.iter().any(|r| r.accepts(c)),
            (r, Type::Union(offered)) => offered.iter().all(|c| r.accepts(c)),

            (Type::Null, Type::Null)
            | (Type::Boolean, Type::Boolean)
            | (Type::Bytes, Type::Bytes)
            | (Type::String, Type::String)
            | (Type::Int, Type::Int)
            | (Type::Long, Type::Int | Type::Long)
            | (Type::Float, Type::Int | Type::Long | Type::Float)
            | (Type::Double, Type::Int | Type::Long | Type::Float | Type::Double) => true,

            (Type::Array(r), Type::Array(c)) | (Type::Map(r), Type::Map(c)) => r.accepts(c),

            (Type::Fixed(r), Type::Fixed(c)) => r.name == c.name && r.size == c.size,
            (Type::Enum(r), Type::Enum(c)) => r.name == c.name && r.symbols == c.symbols,
            (Type::Record(r), Type::Record(c)) => r.name == c.name,

            (Type::Fcn(r), Type::Fcn(c)) => {
                r.params.len() == c.params.len()
                    && r.params.iter().zip(&c.params).all(|(rp, cp)| cp.accepts(rp))
                    && r.ret.accepts(&c.ret)
            }

            _ => false,
        }
    }

    /// Least upper bound of two branch types.
    ///
    /// If one side accepts the other it wins; otherwise the result is the
    /// union of both sides' members with members accepted by another member
    /// dropped. Fails when that union is not a valid union.
    pub fn lub(&self, other: &Type) -> Result<Type, String> {
        if self.accepts(other) {
            return Ok(self.clone());
        }
        if other.accepts(self) {
            return Ok(other.clone());
        }
        Type::union_flat(self.members().iter().chain(other.members()).cloned())
    }

    /// Build a union from possibly overlapping types.
    ///
    /// Nested unions are flattened and a member accepted by another member is
    /// absorbed by it. A single surviving member is returned as itself.
    pub fn union_flat(types: impl IntoIterator<Item = Type>) -> Result<Type, String> {
        let mut members: Vec<Type> = Vec::new();
        for ty in types {
            for m in ty.members() {
                if members.iter().any(|e| e.accepts(m)) {
                    continue;
                }
                members.retain(|e| !m.accepts(e));
                members.push(m.clone());
            }
        }
        match members.len() {
            0 => Err("empty union".to_string()),
            1 => Ok(members.swap_remove(0)),
            _ => Type::union_of(members),
        }
    }

    /// Build a union from explicit members, enforcing the union rules: no
    /// nested unions, no duplicates, at most one array and one map, named
    /// members unique by name.
    pub fn union_of(members: Vec<Type>) -> Result<Type, String> {
        if members.is_empty() {
            return Err("a union must have at least one member".to_string());
        }
        for (i, m) in members.iter().enumerate() {
            if m.is_union() {
                return Err(format!("union member {m} is itself a union"));
            }
            if matches!(m, Type::Fcn(_)) {
                return Err("a union may not contain a function type".to_string());
            }
            for prior in &members[..i] {
                let clash = match (prior, m) {
                    (Type::Array(_), Type::Array(_)) => Some("more than one array"),
                    (Type::Map(_), Type::Map(_)) => Some("more than one map"),
                    (a, b) if a.type_name().is_some() && a.type_name() == b.type_name() => {
                        Some("duplicate named type")
                    }
                    (a, b) if a == b => Some("duplicate member"),
                    _ => None,
                };
                if let Some(reason) = clash {
                    return Err(format!("invalid union: {reason} ({m})"));
                }
            }
        }
        Ok(Type::Union(Arc::from(members)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests can panic")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_widening_chain() {
        assert!(Type::Long.accepts(&Type::Int));
        assert!(Type::Float.accepts(&Type::Long));
        assert!(Type::Double.accepts(&Type::Int));
        assert!(!Type::Int.accepts(&Type::Long));
        assert!(!Type::Float.accepts(&Type::Double));
    }

    #[test]
    fn test_union_acceptance() {
        let opt_int = Type::nullable(Type::Int);
        let opt_double = Type::nullable(Type::Double);
        assert!(opt_int.accepts(&Type::Null));
        assert!(opt_int.accepts(&Type::Int));
        assert!(opt_double.accepts(&opt_int));
        assert!(!opt_int.accepts(&opt_double));
        assert!(!Type::Int.accepts(&opt_int));
        let int_or_float = Type::union_of(vec![Type::Int, Type::Float]).unwrap();
        assert!(Type::Double.accepts(&int_or_float));
    }

    #[test]
    fn test_records_by_name() {
        let a = Type::record("Point", vec![("x", Type::Int)]);
        let b = Type::record("Point", vec![("x", Type::Int)]);
        let c = Type::record("Other", vec![("x", Type::Int)]);
        assert!(a.accepts(&b));
        assert!(!a.accepts(&c));
    }

    #[test]
    fn test_enum_requires_same_symbols() {
        let a = Type::enumeration("Color", &["RED", "GREEN"]);
        let b = Type::enumeration("Color", &["RED", "BLUE"]);
        assert!(a.accepts(&a.clone()));
        assert!(!a.accepts(&b));
    }

    #[test]
    fn test_fcn_variance() {
        let takes_double = Type::fcn(vec![Type::Double], Type::Int);
        let takes_int = Type::fcn(vec![Type::Int], Type::Int);
        // A function that takes doubles can stand in for one that takes ints.
        assert!(takes_int.accepts(&takes_double));
        assert!(!takes_double.accepts(&takes_int));
    }

    #[test]
    fn test_lub() {
        assert_eq!(Type::Int.lub(&Type::Double), Ok(Type::Double));
        assert_eq!(
            Type::Int.lub(&Type::String),
            Type::union_of(vec![Type::Int, Type::String])
        );
        assert_eq!(
            Type::nullable(Type::Int).lub(&Type::Double),
            Type::union_of(vec![Type::Null, Type::Double])
        );
    }

    #[test]
    fn test_lub_of_two_arrays_fails() {
        let a = Type::array(Type::Int);
        let b = Type::array(Type::String);
        assert!(a.lub(&b).is_err());
    }

    #[test]
    fn test_union_rules() {
        assert!(Type::union_of(vec![Type::Int, Type::Int]).is_err());
        assert!(Type::union_of(vec![Type::map(Type::Int), Type::map(Type::Long)]).is_err());
        assert!(Type::union_of(vec![Type::nullable(Type::Int), Type::String]).is_err());
        assert!(Type::union_of(vec![Type::Int, Type::Double]).is_ok());
    }
}
