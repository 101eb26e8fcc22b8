//! `cast.*`: explicit numeric conversions.
//!
//! Narrowing casts truncate toward zero and fail when the value is out of
//! range or not finite.

use pfa_types::Pattern;

use super::{bad, define, sig, Out};
use crate::errors::cast_out_of_range;
use crate::{CallContext, CallInfo, EvalError, FunctionRegistry, Value};

const TO_INT: i32 = 17000;
const TO_LONG: i32 = 17010;

/// 2^31 and 2^63 as doubles: the exclusive upper bounds of int and long.
const INT_BOUND: f64 = 2_147_483_648.0;
const LONG_BOUND: f64 = 9_223_372_036_854_775_808.0;

pub(super) fn register(registry: &mut FunctionRegistry) {
    let from_numeric = |ret| vec![sig(vec![("x", Pattern::numeric("A"))], ret)];
    define(registry, "cast.int", from_numeric(Pattern::int()), to_int);
    define(registry, "cast.long", from_numeric(Pattern::long()), to_long);
    define(registry, "cast.float", from_numeric(Pattern::float()), to_float);
    define(registry, "cast.double", from_numeric(Pattern::double()), to_double);
}

fn to_int(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    let fail = || -> EvalError { cast_out_of_range(TO_INT, "int").into() };
    match args {
        [Value::Int(x)] => Ok(Value::Int(*x)),
        [Value::Long(x)] => i32::try_from(*x).map(Value::Int).map_err(|_| fail()),
        [v @ (Value::Float(_) | Value::Double(_))] => {
            let x = v.as_f64().unwrap_or(f64::NAN).trunc();
            if x.is_finite() && (-INT_BOUND..INT_BOUND).contains(&x) {
                #[allow(clippy::cast_possible_truncation, reason = "range checked above")]
                Ok(Value::Int(x as i32))
            } else {
                Err(fail())
            }
        }
        _ => Err(bad(args)),
    }
}

fn to_long(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    match args {
        [Value::Int(x)] => Ok(Value::Long(i64::from(*x))),
        [Value::Long(x)] => Ok(Value::Long(*x)),
        [v @ (Value::Float(_) | Value::Double(_))] => {
            let x = v.as_f64().unwrap_or(f64::NAN).trunc();
            if x.is_finite() && (-LONG_BOUND..LONG_BOUND).contains(&x) {
                #[allow(clippy::cast_possible_truncation, reason = "range checked above")]
                Ok(Value::Long(x as i64))
            } else {
                Err(cast_out_of_range(TO_LONG, "long").into())
            }
        }
        _ => Err(bad(args)),
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, reason = "float is lossy")]
fn to_float(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    match args {
        [Value::Int(x)] => Ok(Value::Float(*x as f32)),
        [Value::Long(x)] => Ok(Value::Float(*x as f32)),
        [Value::Float(x)] => Ok(Value::Float(*x)),
        [Value::Double(x)] => Ok(Value::Float(*x as f32)),
        _ => Err(bad(args)),
    }
}

fn to_double(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    match args {
        [x] => x.as_f64().map(Value::Double).ok_or_else(|| bad(args)),
        _ => Err(bad(args)),
    }
}
