//! `metric.*`: distance functions.

use pfa_types::Pattern;

use super::{array_arg, define, doubles, sig, Out};
use crate::errors::dimension_mismatch;
use crate::{CallContext, CallInfo, EvalError, FunctionRegistry, Value};

const SIMPLE_EUCLIDEAN: i32 = 28000;

pub(super) fn register(registry: &mut FunctionRegistry) {
    let v = || Pattern::array(Pattern::double());
    define(
        registry,
        "metric.simpleEuclidean",
        vec![sig(vec![("x", v()), ("y", v())], Pattern::double())],
        simple_euclidean,
    );
}

fn simple_euclidean(args: &[Value], _: &CallInfo<'_>, _: &mut dyn CallContext) -> Out {
    let x = doubles(array_arg(args, 0)?)?;
    let y = doubles(array_arg(args, 1)?)?;
    euclidean(&x, &y, SIMPLE_EUCLIDEAN).map(Value::Double)
}

/// Euclidean distance, failing with `code` when the lengths differ.
pub(super) fn euclidean(x: &[f64], y: &[f64], code: i32) -> Result<f64, EvalError> {
    if x.len() != y.len() {
        return Err(dimension_mismatch(code).into());
    }
    Ok(x.iter().zip(y).map(|(a, b)| (a - b) * (a - b)).sum::<f64>().sqrt())
}
