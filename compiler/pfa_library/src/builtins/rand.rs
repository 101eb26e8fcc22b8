//! `rand.*`: draws from the instance random source.

use pfa_types::Pattern;

use super::{bad, define, sig, Out};
use crate::errors::domain_error;
use crate::{CallContext, CallInfo, FunctionRegistry, Value};

const INT_RANGE: i32 = 34000;
const DOUBLE_RANGE: i32 = 34010;

pub(super) fn register(registry: &mut FunctionRegistry) {
    define(
        registry,
        "rand.int",
        vec![
            sig(vec![], Pattern::int()),
            sig(vec![("low", Pattern::int()), ("high", Pattern::int())], Pattern::int()),
        ],
        int,
    );
    define(
        registry,
        "rand.double",
        vec![
            sig(vec![], Pattern::double()),
            sig(
                vec![("low", Pattern::double()), ("high", Pattern::double())],
                Pattern::double(),
            ),
        ],
        double,
    );
}

#[allow(clippy::cast_possible_truncation, reason = "keeps the low 32 bits of a uniform draw")]
fn int(args: &[Value], _: &CallInfo<'_>, ctx: &mut dyn CallContext) -> Out {
    match args {
        [] => Ok(Value::Int(ctx.rng().next_u64() as i32)),
        [Value::Int(low), Value::Int(high)] if low >= high => Err(domain_error(
            INT_RANGE,
            format!("high ({high}) must be greater than low ({low})"),
        )
        .into()),
        [Value::Int(low), Value::Int(high)] => {
            let x = ctx.rng().range_i64(i64::from(*low), i64::from(*high));
            Ok(Value::Int(i32::try_from(x).map_err(|_| bad(args))?))
        }
        _ => Err(bad(args)),
    }
}

fn double(args: &[Value], _: &CallInfo<'_>, ctx: &mut dyn CallContext) -> Out {
    match args {
        [] => Ok(Value::Double(ctx.rng().uniform())),
        [Value::Double(low), Value::Double(high)] if low >= high || !(high - low).is_finite() => {
            Err(domain_error(
                DOUBLE_RANGE,
                format!("high ({high}) must be greater than low ({low})"),
            )
            .into())
        }
        [Value::Double(low), Value::Double(high)] => {
            Ok(Value::Double(low + (high - low) * ctx.rng().uniform()))
        }
        _ => Err(bad(args)),
    }
}
