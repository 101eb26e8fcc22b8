//! `m.*`: elementary math.

use pfa_types::Pattern;

use super::{bad, checked, define, double_arg, sig, Out};
use crate::{CallContext, CallInfo, FunctionRegistry, Value};

const ABS: i32 = 27020;

pub(super) fn register(registry: &mut FunctionRegistry) {
    define(
        registry,
        "m.abs",
        vec![sig(vec![("x", Pattern::numeric("A"))], Pattern::wild("A"))],
        abs,
    );
    let unary = || vec![sig(vec![("x", Pattern::double())], Pattern::double())];
    define(registry, "m.sqrt", unary(), |a, _, _| double1(a, f64::sqrt));
    define(registry, "m.exp", unary(), |a, _, _| double1(a, f64::exp));
    define(registry, "m.ln", unary(), |a, _, _| double1(a, f64::ln));
    define(registry, "m.floor", unary(), |a, _, _| double1(a, f64::floor));
    define(registry, "m.ceil", unary(), |a, _, _| double1(a, f64::ceil));
    // Halves round away from zero.
    define(registry, "m.round", unary(), |a, _, _| double1(a, f64::round));
}

fn abs(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    match args {
        [Value::Int(x)] => checked(x.checked_abs(), Value::Int, ABS),
        [Value::Long(x)] => checked(x.checked_abs(), Value::Long, ABS + 1),
        [Value::Float(x)] => Ok(Value::Float(x.abs())),
        [Value::Double(x)] => Ok(Value::Double(x.abs())),
        _ => Err(bad(args)),
    }
}

fn double1(args: &[Value], op: fn(f64) -> f64) -> Out {
    double_arg(args, 0).map(|x| Value::Double(op(x)))
}
