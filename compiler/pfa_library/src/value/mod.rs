//! Runtime values.
//!
//! Compound payloads sit behind `Arc`, so cloning a value is O(1) and
//! copy-with-update builds a new container rather than mutating a shared one.

mod compare;

pub use compare::{compare, values_equal};

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use pfa_types::{EnumType, FixedType, RecordType, Type};

use crate::LibFcn;

/// A runtime value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Arc<[u8]>),
    String(Arc<str>),
    Array(Arc<Vec<Value>>),
    Map(Arc<IndexMap<String, Value>>),
    Fixed {
        ty: Arc<FixedType>,
        bytes: Arc<[u8]>,
    },
    Enum {
        ty: Arc<EnumType>,
        index: usize,
    },
    /// Field values in declaration order.
    Record {
        ty: Arc<RecordType>,
        fields: Arc<Vec<Value>>,
    },
    Fcn(FcnValue),
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Value {
        Value::String(Arc::from(s.as_ref()))
    }

    pub fn bytes(b: impl AsRef<[u8]>) -> Value {
        Value::Bytes(Arc::from(b.as_ref()))
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Arc::new(items))
    }

    pub fn map(entries: IndexMap<String, Value>) -> Value {
        Value::Map(Arc::new(entries))
    }

    pub fn record(ty: Arc<RecordType>, fields: Vec<Value>) -> Value {
        Value::Record {
            ty,
            fields: Arc::new(fields),
        }
    }

    /// Enum value by symbol, if the symbol exists.
    pub fn enum_symbol(ty: &Arc<EnumType>, symbol: &str) -> Option<Value> {
        ty.index_of(symbol).map(|index| Value::Enum {
            ty: Arc::clone(ty),
            index,
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Integer payload of an `int` or `long`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(i64::from(*i)),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Numeric payload widened to `f64`.
    #[allow(clippy::cast_precision_loss, reason = "long to double is a declared widening")]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(f64::from(*i)),
            Value::Long(l) => Some(*l as f64),
            Value::Float(f) => Some(f64::from(*f)),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Short kind name for error messages.
    pub fn kind_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Fixed { ty, .. } => &ty.name,
            Value::Enum { ty, .. } => &ty.name,
            Value::Record { ty, .. } => &ty.name,
            Value::Fcn(_) => "function",
        }
    }
}

/// What a function value calls.
#[derive(Clone, Debug)]
pub enum FcnTarget {
    /// Index into the program's user function table.
    User(u32),
    /// Index into the program's inline function table.
    Inline(u32),
    /// A library function at one resolved signature.
    Lib {
        fcn: Arc<dyn LibFcn>,
        /// Matched signature alternative.
        index: usize,
        params: Arc<[Type]>,
        ret: Type,
    },
}

/// A first-class function value.
#[derive(Clone, Debug)]
pub struct FcnValue {
    pub target: FcnTarget,
    /// Enclosing locals captured by value when an inline function is created.
    pub captures: Arc<[Value]>,
    /// Partially applied arguments as (parameter index, value), sorted by index.
    pub fill: Arc<[(usize, Value)]>,
}

impl FcnValue {
    pub fn new(target: FcnTarget) -> Self {
        FcnValue {
            target,
            captures: Arc::from(Vec::new()),
            fill: Arc::from(Vec::new()),
        }
    }

    /// Merge the remaining call arguments with the filled ones.
    pub fn full_args(&self, args: Vec<Value>) -> Vec<Value> {
        if self.fill.is_empty() {
            return args;
        }
        let mut out = Vec::with_capacity(args.len() + self.fill.len());
        let mut rest = args.into_iter();
        let mut fill = self.fill.iter().peekable();
        loop {
            if let Some((_, v)) = fill.next_if(|(i, _)| *i == out.len()) {
                out.push(v.clone());
            } else if let Some(v) = rest.next() {
                out.push(v);
            } else {
                break;
            }
        }
        out
    }
}

impl PartialEq for FcnTarget {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FcnTarget::User(a), FcnTarget::User(b))
            | (FcnTarget::Inline(a), FcnTarget::Inline(b)) => a == b,
            (
                FcnTarget::Lib { fcn: a, index: ia, .. },
                FcnTarget::Lib { fcn: b, index: ib, .. },
            ) => Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>() && ia == ib,
            _ => false,
        }
    }
}

impl PartialEq for FcnValue {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target && self.captures == other.captures && self.fill == other.fill
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Long(l) => write!(f, "{l}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Double(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Bytes(b) | Value::Fixed { bytes: b, .. } => write!(f, "{b:?}"),
            Value::Enum { ty, index } => {
                write!(f, "{}", ty.symbols.get(*index).map_or("?", String::as_str))
            }
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Record { ty, fields } => {
                write!(f, "{} {{", ty.name)?;
                for (i, (field, v)) in ty.fields.iter().zip(fields.iter()).enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {v}", field.name)?;
                }
                write!(f, "}}")
            }
            Value::Fcn(_) => write!(f, "<function>"),
        }
    }
}

#[cfg(test)]
mod tests;
