//! `map.*`: string-keyed map functions.

use pfa_types::Pattern;

use super::{bad, define, sig, str_arg, Out};
use crate::{CallContext, CallInfo, FunctionRegistry, Value};

pub(super) fn register(registry: &mut FunctionRegistry) {
    let m = || ("m", Pattern::map(Pattern::wild("A")));
    define(
        registry,
        "map.containsKey",
        vec![sig(vec![m(), ("key", Pattern::string())], Pattern::boolean())],
        contains_key,
    );
    define(
        registry,
        "map.keys",
        vec![sig(vec![m()], Pattern::array(Pattern::string()))],
        keys,
    );
    define(
        registry,
        "map.add",
        vec![sig(
            vec![m(), ("key", Pattern::string()), ("value", Pattern::wild("A"))],
            Pattern::map(Pattern::wild("A")),
        )],
        add,
    );
}

fn contains_key(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    let entries = args.first().and_then(Value::as_map).ok_or_else(|| bad(args))?;
    Ok(Value::Boolean(entries.contains_key(str_arg(args, 1)?)))
}

/// Keys in insertion order.
fn keys(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    let entries = args.first().and_then(Value::as_map).ok_or_else(|| bad(args))?;
    Ok(Value::array(entries.keys().map(Value::string).collect()))
}

fn add(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    let entries = args.first().and_then(Value::as_map).ok_or_else(|| bad(args))?;
    let key = str_arg(args, 1)?;
    let value = args.get(2).ok_or_else(|| bad(args))?;
    let mut out = entries.clone();
    out.insert(key.to_string(), value.clone());
    Ok(Value::map(out))
}
