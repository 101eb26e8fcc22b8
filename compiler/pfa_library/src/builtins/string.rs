//! `s.*`: string functions. Lengths and indexes count characters.

use pfa_types::Pattern;

use super::{define, int_arg, len_value, sig, slice_bounds, str_arg, Out};
use crate::{CallContext, CallInfo, FunctionRegistry, Value};

pub(super) fn register(registry: &mut FunctionRegistry) {
    let s = || ("s", Pattern::string());
    define(registry, "s.len", vec![sig(vec![s()], Pattern::int())], |args, _, _| {
        str_arg(args, 0).map(|s| len_value(s.chars().count()))
    });
    define(
        registry,
        "s.concat",
        vec![sig(
            vec![("x", Pattern::string()), ("y", Pattern::string())],
            Pattern::string(),
        )],
        |args, _, _| Ok(Value::string(format!("{}{}", str_arg(args, 0)?, str_arg(args, 1)?))),
    );
    define(
        registry,
        "s.substr",
        vec![sig(
            vec![s(), ("start", Pattern::int()), ("end", Pattern::int())],
            Pattern::string(),
        )],
        substr,
    );
    define(registry, "s.upper", vec![sig(vec![s()], Pattern::string())], |args, _, _| {
        str_arg(args, 0).map(|s| Value::string(s.to_uppercase()))
    });
    define(registry, "s.lower", vec![sig(vec![s()], Pattern::string())], |args, _, _| {
        str_arg(args, 0).map(|s| Value::string(s.to_lowercase()))
    });
}

fn substr(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    let s = str_arg(args, 0)?;
    let (start, end) = slice_bounds(s.chars().count(), int_arg(args, 1)?, int_arg(args, 2)?);
    Ok(Value::string(
        s.chars().skip(start).take(end - start).collect::<String>(),
    ))
}
