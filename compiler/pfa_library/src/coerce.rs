//! Dynamic widening of checked values.
//!
//! The checker only lets a value reach a slot whose type accepts the
//! value's static type, so widening here never fails: it converts numbers
//! up the chain `int -> long -> float -> double`, rebuilds containers whose
//! element type widened, and picks the union member a value lands in.

use std::sync::Arc;

use pfa_types::Type;

use crate::Value;

/// Whether `value` is a direct inhabitant of `ty`, without widening.
///
/// Shallow for containers: at most one array and one map can be members of
/// a union, so the outer shape is enough to pick a branch.
pub fn conforms(value: &Value, ty: &Type) -> bool {
    match (value, ty) {
        (Value::Null, Type::Null)
        | (Value::Boolean(_), Type::Boolean)
        | (Value::Int(_), Type::Int)
        | (Value::Long(_), Type::Long)
        | (Value::Float(_), Type::Float)
        | (Value::Double(_), Type::Double)
        | (Value::Bytes(_), Type::Bytes)
        | (Value::String(_), Type::String)
        | (Value::Array(_), Type::Array(_))
        | (Value::Map(_), Type::Map(_))
        | (Value::Fcn(_), Type::Fcn(_)) => true,
        (Value::Fixed { ty: a, .. }, Type::Fixed(b)) => a.name == b.name,
        (Value::Enum { ty: a, .. }, Type::Enum(b)) => a.name == b.name,
        (Value::Record { ty: a, .. }, Type::Record(b)) => a.name == b.name,
        (_, Type::Union(members)) => members.iter().any(|m| conforms(value, m)),
        _ => false,
    }
}

/// Widen `value` to `to`.
#[allow(clippy::cast_precision_loss, reason = "the widening chain is lossy by definition")]
pub fn coerce(value: Value, to: &Type) -> Value {
    match (value, to) {
        (Value::Int(i), Type::Long) => Value::Long(i64::from(i)),
        (Value::Int(i), Type::Float) => Value::Float(i as f32),
        (Value::Long(l), Type::Float) => Value::Float(l as f32),
        (Value::Int(i), Type::Double) => Value::Double(f64::from(i)),
        (Value::Long(l), Type::Double) => Value::Double(l as f64),
        (Value::Float(x), Type::Double) => Value::Double(f64::from(x)),
        (Value::Array(items), Type::Array(item_ty)) => {
            if items.iter().all(|v| already(v, item_ty)) {
                return Value::Array(items);
            }
            let items = unwrap_or_clone(items);
            Value::array(items.into_iter().map(|v| coerce(v, item_ty)).collect())
        }
        (Value::Map(entries), Type::Map(value_ty)) => {
            if entries.values().all(|v| already(v, value_ty)) {
                return Value::Map(entries);
            }
            let entries = unwrap_or_clone(entries);
            Value::map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, coerce(v, value_ty)))
                    .collect(),
            )
        }
        (value, Type::Union(members)) => match union_target(&value, members) {
            Some(member) => coerce(value, member),
            None => value,
        },
        (value, _) => value,
    }
}

/// The member of a union that `value` is stored as.
///
/// An exact branch wins; otherwise the first member accepting the value
/// by numeric widening.
fn union_target<'a>(value: &Value, members: &'a [Type]) -> Option<&'a Type> {
    members
        .iter()
        .find(|m| conforms(value, m))
        .or_else(|| members.iter().find(|m| widens_to(value, m)))
}

fn widens_to(value: &Value, ty: &Type) -> bool {
    matches!(
        (value, ty),
        (Value::Int(_), Type::Long | Type::Float | Type::Double)
            | (Value::Long(_), Type::Float | Type::Double)
            | (Value::Float(_), Type::Double)
    )
}

/// True when `coerce(value, ty)` would return `value` unchanged.
fn already(value: &Value, ty: &Type) -> bool {
    match (value, ty) {
        (Value::Array(items), Type::Array(item_ty)) => items.iter().all(|v| already(v, item_ty)),
        (Value::Map(entries), Type::Map(value_ty)) => {
            entries.values().all(|v| already(v, value_ty))
        }
        (_, Type::Union(members)) => match union_target(value, members) {
            Some(member) => conforms(value, member) && already(value, member),
            None => true,
        },
        (
            Value::Int(_) | Value::Long(_) | Value::Float(_),
            Type::Long | Type::Float | Type::Double,
        ) => conforms(value, ty),
        _ => true,
    }
}

fn unwrap_or_clone<T: Clone>(arc: Arc<T>) -> T {
    Arc::try_unwrap(arc).unwrap_or_else(|shared| (*shared).clone())
}
