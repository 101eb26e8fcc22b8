//! `impute.*`: null handling.

use pfa_types::Pattern;

use super::{bad, define, sig, Out};
use crate::errors::encountered_null;
use crate::{CallContext, CallInfo, FunctionRegistry, Value};

const ERROR_ON_NULL: i32 = 21000;

pub(super) fn register(registry: &mut FunctionRegistry) {
    let nullable = || Pattern::union(vec![Pattern::wild("A"), Pattern::null()]);
    define(
        registry,
        "impute.errorOnNull",
        vec![sig(vec![("x", nullable())], Pattern::wild("A"))],
        error_on_null,
    );
    define(
        registry,
        "impute.defaultOnNull",
        vec![sig(
            vec![("x", nullable()), ("default", Pattern::wild("A"))],
            Pattern::wild("A"),
        )],
        default_on_null,
    );
}

fn error_on_null(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    match args {
        [Value::Null] => Err(encountered_null(ERROR_ON_NULL).into()),
        [x] => Ok(x.clone()),
        _ => Err(bad(args)),
    }
}

fn default_on_null(args: &[Value], call: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    match args {
        [Value::Null, default] => Ok(default.clone()),
        [x, _] => Ok(crate::coerce(x.clone(), call.ret)),
        _ => Err(bad(args)),
    }
}
