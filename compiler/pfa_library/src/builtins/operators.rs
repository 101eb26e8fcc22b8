//! Core operators: arithmetic, comparison, logic.
//!
//! Integer arithmetic is checked; `int` and `long` overflow raise distinct
//! codes (`long` is the `int` code plus one).

use std::cmp::Ordering;

use pfa_types::Pattern;

use super::{bad, checked, define, sig, Out};
use crate::errors::{division_by_zero, domain_error};
use crate::{compare, CallContext, CallInfo, EvalError, FunctionRegistry, Value};

const PLUS: i32 = 18000;
const MINUS: i32 = 18010;
const TIMES: i32 = 18020;
const FLOOR_DIV: i32 = 18040;
const NEGATE: i32 = 18050;
const MODULO: i32 = 18060;
const REMAINDER: i32 = 18070;
const POWER: i32 = 18080;

pub(super) fn register(registry: &mut FunctionRegistry) {
    let binary = || {
        vec![sig(
            vec![("x", Pattern::numeric("A")), ("y", Pattern::numeric("A"))],
            Pattern::wild("A"),
        )]
    };
    define(registry, "+", binary(), plus);
    define(registry, "-", binary(), minus);
    define(registry, "*", binary(), times);
    define(registry, "%", binary(), modulo);
    define(registry, "%%", binary(), remainder);
    define(registry, "**", binary(), power);
    define(
        registry,
        "/",
        vec![sig(vec![("x", Pattern::double()), ("y", Pattern::double())], Pattern::double())],
        divide,
    );
    define(
        registry,
        "//",
        vec![
            sig(vec![("x", Pattern::int()), ("y", Pattern::int())], Pattern::int()),
            sig(vec![("x", Pattern::long()), ("y", Pattern::long())], Pattern::long()),
        ],
        floor_divide,
    );
    define(
        registry,
        "u-",
        vec![sig(vec![("x", Pattern::numeric("A"))], Pattern::wild("A"))],
        negate,
    );

    let comparison = || {
        vec![sig(
            vec![("x", Pattern::wild("A")), ("y", Pattern::wild("A"))],
            Pattern::boolean(),
        )]
    };
    define(registry, "==", comparison(), |a, _, _| ordered(a, Ordering::is_eq));
    define(registry, "!=", comparison(), |a, _, _| ordered(a, Ordering::is_ne));
    define(registry, "<", comparison(), |a, _, _| ordered(a, Ordering::is_lt));
    define(registry, "<=", comparison(), |a, _, _| ordered(a, Ordering::is_le));
    define(registry, ">", comparison(), |a, _, _| ordered(a, Ordering::is_gt));
    define(registry, ">=", comparison(), |a, _, _| ordered(a, Ordering::is_ge));

    let extremum = || {
        vec![sig(
            vec![("x", Pattern::wild("A")), ("y", Pattern::wild("A"))],
            Pattern::wild("A"),
        )]
    };
    define(registry, "max", extremum(), |a, _, _| pick(a, Ordering::Less));
    define(registry, "min", extremum(), |a, _, _| pick(a, Ordering::Greater));

    let logic = || {
        vec![sig(
            vec![("x", Pattern::boolean()), ("y", Pattern::boolean())],
            Pattern::boolean(),
        )]
    };
    define(registry, "&&", logic(), |a, _, _| logic2(a, |x, y| x && y));
    define(registry, "||", logic(), |a, _, _| logic2(a, |x, y| x || y));
    define(registry, "^^", logic(), |a, _, _| logic2(a, |x, y| x != y));
    define(
        registry,
        "!",
        vec![sig(vec![("x", Pattern::boolean())], Pattern::boolean())],
        |a, _, _| match a {
            [Value::Boolean(x)] => Ok(Value::Boolean(!x)),
            _ => Err(bad(a)),
        },
    );
}

// ============================================================================
// Arithmetic
// ============================================================================

fn plus(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    match args {
        [Value::Int(x), Value::Int(y)] => checked(x.checked_add(*y), Value::Int, PLUS),
        [Value::Long(x), Value::Long(y)] => checked(x.checked_add(*y), Value::Long, PLUS + 1),
        [Value::Float(x), Value::Float(y)] => Ok(Value::Float(x + y)),
        [Value::Double(x), Value::Double(y)] => Ok(Value::Double(x + y)),
        _ => Err(bad(args)),
    }
}

fn minus(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    match args {
        [Value::Int(x), Value::Int(y)] => checked(x.checked_sub(*y), Value::Int, MINUS),
        [Value::Long(x), Value::Long(y)] => checked(x.checked_sub(*y), Value::Long, MINUS + 1),
        [Value::Float(x), Value::Float(y)] => Ok(Value::Float(x - y)),
        [Value::Double(x), Value::Double(y)] => Ok(Value::Double(x - y)),
        _ => Err(bad(args)),
    }
}

fn times(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    match args {
        [Value::Int(x), Value::Int(y)] => checked(x.checked_mul(*y), Value::Int, TIMES),
        [Value::Long(x), Value::Long(y)] => checked(x.checked_mul(*y), Value::Long, TIMES + 1),
        [Value::Float(x), Value::Float(y)] => Ok(Value::Float(x * y)),
        [Value::Double(x), Value::Double(y)] => Ok(Value::Double(x * y)),
        _ => Err(bad(args)),
    }
}

fn divide(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    match args {
        [Value::Double(x), Value::Double(y)] => Ok(Value::Double(x / y)),
        _ => Err(bad(args)),
    }
}

/// Integer division rounding toward negative infinity.
fn floor_div(x: i64, y: i64) -> Option<i64> {
    let q = x.checked_div(y)?;
    if x % y != 0 && ((x < 0) != (y < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

fn floor_divide(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    match args {
        [Value::Int(_), Value::Int(0)] => Err(division_by_zero(FLOOR_DIV).into()),
        [Value::Long(_), Value::Long(0)] => Err(division_by_zero(FLOOR_DIV + 1).into()),
        [Value::Int(x), Value::Int(y)] => checked(
            floor_div(i64::from(*x), i64::from(*y)).and_then(|q| i32::try_from(q).ok()),
            Value::Int,
            FLOOR_DIV,
        ),
        [Value::Long(x), Value::Long(y)] => checked(floor_div(*x, *y), Value::Long, FLOOR_DIV + 1),
        _ => Err(bad(args)),
    }
}

fn negate(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    match args {
        [Value::Int(x)] => checked(x.checked_neg(), Value::Int, NEGATE),
        [Value::Long(x)] => checked(x.checked_neg(), Value::Long, NEGATE + 1),
        [Value::Float(x)] => Ok(Value::Float(-x)),
        [Value::Double(x)] => Ok(Value::Double(-x)),
        _ => Err(bad(args)),
    }
}

/// Modulo taking the sign of the divisor.
fn modulo(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    fn floored<T>(r: T, n: T, zero: T) -> T
    where
        T: PartialOrd + Copy + std::ops::Add<Output = T>,
    {
        if r != zero && ((r < zero) != (n < zero)) {
            r + n
        } else {
            r
        }
    }
    match args {
        [Value::Int(_), Value::Int(0)] => Err(division_by_zero(MODULO).into()),
        [Value::Long(_), Value::Long(0)] => Err(division_by_zero(MODULO + 1).into()),
        [Value::Int(k), Value::Int(n)] => Ok(Value::Int(floored(k.wrapping_rem(*n), *n, 0))),
        [Value::Long(k), Value::Long(n)] => Ok(Value::Long(floored(k.wrapping_rem(*n), *n, 0))),
        [Value::Float(k), Value::Float(n)] => Ok(Value::Float(floored(k % n, *n, 0.0))),
        [Value::Double(k), Value::Double(n)] => Ok(Value::Double(floored(k % n, *n, 0.0))),
        _ => Err(bad(args)),
    }
}

/// Remainder taking the sign of the dividend.
fn remainder(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    match args {
        [Value::Int(_), Value::Int(0)] => Err(division_by_zero(REMAINDER).into()),
        [Value::Long(_), Value::Long(0)] => Err(division_by_zero(REMAINDER + 1).into()),
        [Value::Int(k), Value::Int(n)] => Ok(Value::Int(k.wrapping_rem(*n))),
        [Value::Long(k), Value::Long(n)] => Ok(Value::Long(k.wrapping_rem(*n))),
        [Value::Float(k), Value::Float(n)] => Ok(Value::Float(k % n)),
        [Value::Double(k), Value::Double(n)] => Ok(Value::Double(k % n)),
        _ => Err(bad(args)),
    }
}

fn power(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    let negative = |code| -> EvalError {
        domain_error(code, "negative exponent for an integer power").into()
    };
    match args {
        [Value::Int(_), Value::Int(y)] if *y < 0 => Err(negative(POWER)),
        [Value::Long(_), Value::Long(y)] if *y < 0 => Err(negative(POWER + 1)),
        [Value::Int(x), Value::Int(y)] => checked(
            u32::try_from(*y).ok().and_then(|y| x.checked_pow(y)),
            Value::Int,
            POWER,
        ),
        [Value::Long(x), Value::Long(y)] => checked(
            u32::try_from(*y).ok().and_then(|y| x.checked_pow(y)),
            Value::Long,
            POWER + 1,
        ),
        [Value::Float(x), Value::Float(y)] => Ok(Value::Float(x.powf(*y))),
        [Value::Double(x), Value::Double(y)] => Ok(Value::Double(x.powf(*y))),
        _ => Err(bad(args)),
    }
}

// ============================================================================
// Comparison and logic
// ============================================================================

fn ordered(args: &[Value], test: fn(Ordering) -> bool) -> Out {
    match args {
        [x, y] => Ok(Value::Boolean(test(compare(x, y)))),
        _ => Err(bad(args)),
    }
}

/// Keep `x` unless it compares as `lose` against `y`.
fn pick(args: &[Value], lose: Ordering) -> Out {
    match args {
        [x, y] if compare(x, y) == lose => Ok(y.clone()),
        [x, _] => Ok(x.clone()),
        _ => Err(bad(args)),
    }
}

fn logic2(args: &[Value], op: fn(bool, bool) -> bool) -> Out {
    match args {
        [Value::Boolean(x), Value::Boolean(y)] => Ok(Value::Boolean(op(*x, *y))),
        _ => Err(bad(args)),
    }
}
