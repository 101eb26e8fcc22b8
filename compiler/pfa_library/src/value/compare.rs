//! Total ordering over values of one type.
//!
//! Numbers compare by magnitude across widths, NaN sorting above every
//! other number. Maps compare by their entries in key order, so two maps
//! built in different insertion orders are equal.

use std::cmp::Ordering;

use super::Value;

/// Compare two values of the same type.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bytes(x), Value::Bytes(y)) => x.cmp(y),
        (Value::Fixed { bytes: x, .. }, Value::Fixed { bytes: y, .. }) => x.cmp(y),
        (Value::Enum { index: x, .. }, Value::Enum { index: y, .. }) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => compare_seq(x, y),
        (Value::Record { fields: x, .. }, Value::Record { fields: y, .. }) => compare_seq(x, y),
        (Value::Map(x), Value::Map(y)) => {
            let mut xs: Vec<_> = x.iter().collect();
            let mut ys: Vec<_> = y.iter().collect();
            xs.sort_by(|l, r| l.0.cmp(r.0));
            ys.sort_by(|l, r| l.0.cmp(r.0));
            for ((kx, vx), (ky, vy)) in xs.iter().zip(&ys) {
                let ord = kx.cmp(ky).then_with(|| compare(vx, vy));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            xs.len().cmp(&ys.len())
        }
        _ => compare_numeric(a, b).unwrap_or_else(|| rank(a).cmp(&rank(b))),
    }
}

/// Structural equality under [`compare`].
pub fn values_equal(a: &Value, b: &Value) -> bool {
    compare(a, b) == Ordering::Equal
}

fn compare_seq(x: &[Value], y: &[Value]) -> Ordering {
    for (l, r) in x.iter().zip(y) {
        let ord = compare(l, r);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    x.len().cmp(&y.len())
}

fn compare_numeric(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    let (x, y) = (a.as_f64()?, b.as_f64()?);
    Some(
        x.partial_cmp(&y)
            .unwrap_or_else(|| x.is_nan().cmp(&y.is_nan())),
    )
}

/// Fallback order between values of different kinds (union members).
fn rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Boolean(_) => 1,
        Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_) => 2,
        Value::Bytes(_) => 3,
        Value::Fixed { .. } => 4,
        Value::String(_) => 5,
        Value::Enum { .. } => 6,
        Value::Array(_) => 7,
        Value::Map(_) => 8,
        Value::Record { .. } => 9,
        Value::Fcn(_) => 10,
    }
}
