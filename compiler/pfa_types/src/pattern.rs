//! Signature patterns: types with wildcard placeholders.

use std::fmt;

use crate::Type;

/// Label of a wildcard within one signature (`"A"`, `"B"`, ...).
pub type WildId = &'static str;

/// A parameter or return descriptor in a library signature.
#[derive(Clone, Debug, PartialEq)]
pub enum Pattern {
    /// A concrete type, matched with [`Type::accepts`].
    Exact(Type),
    Array(Box<Pattern>),
    Map(Box<Pattern>),
    /// Union of patterns; at most one member may be a bare wildcard, which
    /// binds to the argument members the other members do not cover.
    Union(Vec<Pattern>),
    Fcn(Vec<Pattern>, Box<Pattern>),
    /// Any type, optionally limited to an allowed set.
    Wild { id: WildId, allowed: Option<Vec<Type>> },
    /// Any record having at least these fields.
    WildRecord { id: WildId, fields: Vec<(&'static str, Pattern)> },
    WildEnum(WildId),
    WildFixed(WildId),
}

impl Pattern {
    pub fn null() -> Pattern {
        Pattern::Exact(Type::Null)
    }
    pub fn boolean() -> Pattern {
        Pattern::Exact(Type::Boolean)
    }
    pub fn int() -> Pattern {
        Pattern::Exact(Type::Int)
    }
    pub fn long() -> Pattern {
        Pattern::Exact(Type::Long)
    }
    pub fn float() -> Pattern {
        Pattern::Exact(Type::Float)
    }
    pub fn double() -> Pattern {
        Pattern::Exact(Type::Double)
    }
    pub fn string() -> Pattern {
        Pattern::Exact(Type::String)
    }
    pub fn bytes() -> Pattern {
        Pattern::Exact(Type::Bytes)
    }

    pub fn array(items: Pattern) -> Pattern {
        Pattern::Array(Box::new(items))
    }

    pub fn map(values: Pattern) -> Pattern {
        Pattern::Map(Box::new(values))
    }

    pub fn fcn(params: Vec<Pattern>, ret: Pattern) -> Pattern {
        Pattern::Fcn(params, Box::new(ret))
    }

    pub fn union(members: Vec<Pattern>) -> Pattern {
        Pattern::Union(members)
    }

    /// Unconstrained wildcard.
    pub fn wild(id: WildId) -> Pattern {
        Pattern::Wild { id, allowed: None }
    }

    /// Wildcard limited to the given types.
    pub fn wild_of(id: WildId, allowed: Vec<Type>) -> Pattern {
        Pattern::Wild {
            id,
            allowed: Some(allowed),
        }
    }

    /// Wildcard over `int`, `long`, `float` and `double`.
    pub fn numeric(id: WildId) -> Pattern {
        Pattern::wild_of(id, vec![Type::Int, Type::Long, Type::Float, Type::Double])
    }

    pub fn wild_record(id: WildId, fields: Vec<(&'static str, Pattern)>) -> Pattern {
        Pattern::WildRecord { id, fields }
    }

    /// Whether this pattern binds the wildcard directly (not nested).
    pub(crate) fn bare_wild(&self) -> Option<WildId> {
        match self {
            Pattern::Wild { id, .. } => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Exact(ty) => write!(f, "{ty}"),
            Pattern::Array(items) => write!(f, "array({items})"),
            Pattern::Map(values) => write!(f, "map({values})"),
            Pattern::Union(members) => {
                write!(f, "union(")?;
                write_list(f, members)?;
                write!(f, ")")
            }
            Pattern::Fcn(params, ret) => {
                write!(f, "fcn(")?;
                write_list(f, params)?;
                write!(f, " -> {ret})")
            }
            Pattern::Wild { id, allowed: None } => write!(f, "any {id}"),
            Pattern::Wild {
                id,
                allowed: Some(allowed),
            } => {
                write!(f, "any {id} of {{")?;
                for (i, t) in allowed.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, "}}")
            }
            Pattern::WildRecord { id, fields } => {
                write!(f, "any record {id}")?;
                if !fields.is_empty() {
                    write!(f, " with {{")?;
                    for (i, (name, p)) in fields.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{name}: {p}")?;
                    }
                    write!(f, "}}")?;
                }
                Ok(())
            }
            Pattern::WildEnum(id) => write!(f, "any enum {id}"),
            Pattern::WildFixed(id) => write!(f, "any fixed {id}"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Pattern]) -> fmt::Result {
    for (i, p) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{p}")?;
    }
    Ok(())
}
