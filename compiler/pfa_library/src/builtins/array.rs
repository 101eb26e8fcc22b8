//! `a.*`: array functions.
//!
//! Arrays are immutable; every update returns a new array.

use pfa_types::{Pattern, Type};

use super::{
    array_arg, bad, define, doubles, fcn_arg, int_arg, len_value, sig, slice_bounds, Out,
};
use crate::errors::{empty_array, integer_overflow};
use crate::{compare, CallContext, CallInfo, FunctionRegistry, Value};

const SUM: i32 = 15410;
const ARGMAX: i32 = 15440;

pub(super) fn register(registry: &mut FunctionRegistry) {
    let a = || Pattern::array(Pattern::wild("A"));
    define(registry, "a.len", vec![sig(vec![("a", a())], Pattern::int())], |args, _, _| {
        array_arg(args, 0).map(|items| len_value(items.len()))
    });
    define(
        registry,
        "a.subseq",
        vec![sig(
            vec![("a", a()), ("start", Pattern::int()), ("end", Pattern::int())],
            a(),
        )],
        subseq,
    );
    define(
        registry,
        "a.append",
        vec![sig(vec![("a", a()), ("item", Pattern::wild("A"))], a())],
        append,
    );
    define(
        registry,
        "a.map",
        vec![sig(
            vec![
                ("a", a()),
                ("fcn", Pattern::fcn(vec![Pattern::wild("A")], Pattern::wild("B"))),
            ],
            Pattern::array(Pattern::wild("B")),
        )],
        map,
    );
    define(
        registry,
        "a.filter",
        vec![sig(
            vec![
                ("a", a()),
                ("fcn", Pattern::fcn(vec![Pattern::wild("A")], Pattern::boolean())),
            ],
            a(),
        )],
        filter,
    );
    define(
        registry,
        "a.sum",
        vec![sig(
            vec![("a", Pattern::array(Pattern::numeric("A")))],
            Pattern::wild("A"),
        )],
        sum,
    );
    define(
        registry,
        "a.mean",
        vec![sig(vec![("a", Pattern::array(Pattern::double()))], Pattern::double())],
        mean,
    );
    define(registry, "a.sort", vec![sig(vec![("a", a())], a())], sort);
    define(registry, "a.argmax", vec![sig(vec![("a", a())], Pattern::int())], argmax);
}

fn subseq(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    let items = array_arg(args, 0)?;
    let (start, end) = slice_bounds(items.len(), int_arg(args, 1)?, int_arg(args, 2)?);
    Ok(Value::array(items[start..end].to_vec()))
}

fn append(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    let items = array_arg(args, 0)?;
    let item = args.get(1).ok_or_else(|| bad(args))?;
    let mut out = Vec::with_capacity(items.len() + 1);
    out.extend_from_slice(items);
    out.push(item.clone());
    Ok(Value::array(out))
}

fn map(args: &[Value], _: &CallInfo<'_>, ctx: &mut dyn CallContext) -> Out {
    let items = array_arg(args, 0)?;
    let f = fcn_arg(args, 1)?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        ctx.check_deadline()?;
        out.push(ctx.call(f, vec![item.clone()])?);
    }
    Ok(Value::array(out))
}

fn filter(args: &[Value], _: &CallInfo<'_>, ctx: &mut dyn CallContext) -> Out {
    let items = array_arg(args, 0)?;
    let f = fcn_arg(args, 1)?;
    let mut out = Vec::new();
    for item in items {
        ctx.check_deadline()?;
        if ctx.call(f, vec![item.clone()])?.as_bool() == Some(true) {
            out.push(item.clone());
        }
    }
    Ok(Value::array(out))
}

fn sum(args: &[Value], call: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    let items = array_arg(args, 0)?;
    match call.ret {
        Type::Int => {
            let mut total = 0i32;
            for v in items {
                let Value::Int(x) = v else { return Err(bad(items)) };
                total = total.checked_add(*x).ok_or_else(|| integer_overflow(SUM))?;
            }
            Ok(Value::Int(total))
        }
        Type::Long => {
            let mut total = 0i64;
            for v in items {
                let Value::Long(x) = v else { return Err(bad(items)) };
                total = total.checked_add(*x).ok_or_else(|| integer_overflow(SUM + 1))?;
            }
            Ok(Value::Long(total))
        }
        Type::Float => {
            let mut total = 0f32;
            for v in items {
                let Value::Float(x) = v else { return Err(bad(items)) };
                total += x;
            }
            Ok(Value::Float(total))
        }
        _ => Ok(Value::Double(doubles(items)?.iter().sum())),
    }
}

#[allow(clippy::cast_precision_loss, reason = "array lengths fit a double's mantissa")]
fn mean(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    let xs = doubles(array_arg(args, 0)?)?;
    if xs.is_empty() {
        return Ok(Value::Double(f64::NAN));
    }
    Ok(Value::Double(xs.iter().sum::<f64>() / xs.len() as f64))
}

fn sort(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    let mut items = array_arg(args, 0)?.to_vec();
    items.sort_by(compare);
    Ok(Value::array(items))
}

/// Index of the first maximal element.
fn argmax(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    let items = array_arg(args, 0)?;
    let mut best: Option<(usize, &Value)> = None;
    for (i, v) in items.iter().enumerate() {
        if best.map_or(true, |(_, b)| compare(v, b).is_gt()) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| len_value(i))
        .ok_or_else(|| empty_array(ARGMAX).into())
}
