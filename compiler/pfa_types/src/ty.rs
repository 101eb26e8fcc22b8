//! Concrete types.

use std::fmt;
use std::sync::Arc;

/// A concrete type.
///
/// Cheap to clone: compound payloads sit behind `Arc`. Named types carry
/// their full name (`namespace.name`); two named types with the same full
/// name in one program are the same definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Array(Arc<Type>),
    Map(Arc<Type>),
    Fixed(Arc<FixedType>),
    Enum(Arc<EnumType>),
    Record(Arc<RecordType>),
    /// Members are never unions themselves.
    Union(Arc<[Type]>),
    /// First-class function; only valid as a parameter or argument type.
    Fcn(Arc<FcnType>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedType {
    pub name: String,
    pub size: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumType {
    pub name: String,
    pub symbols: Vec<String>,
}

impl EnumType {
    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    /// Avro-JSON default used when the field is missing from an input.
    pub default: Option<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordType {
    pub name: String,
    pub fields: Vec<Field>,
}

impl RecordType {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FcnType {
    pub params: Vec<Type>,
    pub ret: Type,
}

impl Type {
    pub fn array(items: Type) -> Type {
        Type::Array(Arc::new(items))
    }

    pub fn map(values: Type) -> Type {
        Type::Map(Arc::new(values))
    }

    pub fn fcn(params: Vec<Type>, ret: Type) -> Type {
        Type::Fcn(Arc::new(FcnType { params, ret }))
    }

    pub fn record(name: impl Into<String>, fields: Vec<(&str, Type)>) -> Type {
        Type::Record(Arc::new(RecordType {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(name, ty)| Field {
                    name: name.to_string(),
                    ty,
                    default: None,
                })
                .collect(),
        }))
    }

    pub fn enumeration(name: impl Into<String>, symbols: &[&str]) -> Type {
        Type::Enum(Arc::new(EnumType {
            name: name.into(),
            symbols: symbols.iter().map(ToString::to_string).collect(),
        }))
    }

    pub fn fixed(name: impl Into<String>, size: usize) -> Type {
        Type::Fixed(Arc::new(FixedType {
            name: name.into(),
            size,
        }))
    }

    /// `union(ty, null)`.
    pub fn nullable(ty: Type) -> Type {
        Type::Union(Arc::from(vec![ty, Type::Null]))
    }

    /// Union members, or the type itself for a non-union.
    pub fn members(&self) -> &[Type] {
        match self {
            Type::Union(members) => members,
            other => std::slice::from_ref(other),
        }
    }

    pub fn is_union(&self) -> bool {
        matches!(self, Type::Union(_))
    }

    pub fn is_nullable(&self) -> bool {
        self.members().iter().any(|m| matches!(m, Type::Null))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Long | Type::Float | Type::Double)
    }

    /// Full name of a named type.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Type::Fixed(f) => Some(&f.name),
            Type::Enum(e) => Some(&e.name),
            Type::Record(r) => Some(&r.name),
            _ => None,
        }
    }

    /// Name used for this type as a union branch in Avro-JSON.
    pub fn branch_name(&self) -> &str {
        match self {
            Type::Null => "null",
            Type::Boolean => "boolean",
            Type::Int => "int",
            Type::Long => "long",
            Type::Float => "float",
            Type::Double => "double",
            Type::Bytes => "bytes",
            Type::String => "string",
            Type::Array(_) => "array",
            Type::Map(_) => "map",
            Type::Union(_) => "union",
            Type::Fcn(_) => "function",
            Type::Fixed(f) => &f.name,
            Type::Enum(e) => &e.name,
            Type::Record(r) => &r.name,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Array(items) => write!(f, "array({items})"),
            Type::Map(values) => write!(f, "map({values})"),
            Type::Union(members) => {
                write!(f, "union(")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{m}")?;
                }
                write!(f, ")")
            }
            Type::Fcn(fcn) => {
                write!(f, "fcn(")?;
                for (i, p) in fcn.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, " -> {})", fcn.ret)
            }
            other => f.write_str(other.branch_name()),
        }
    }
}
