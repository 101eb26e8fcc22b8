//! Nested access into records, arrays and maps.
//!
//! Paths are evaluated to [`Step`]s before any cell or pool is touched,
//! then applied here. Updates rebuild the containers along the path and
//! leave every other reference to the old value intact.

use std::sync::Arc;

use pfa_library::errors::{bad_arguments, index_out_of_range, key_not_found};
use pfa_library::{EvalError, EvalResult, Value};

/// One evaluated path step.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Step {
    Field(usize),
    Index(i32),
    Key(Arc<str>),
}

impl Step {
    /// Step from an evaluated index or key expression.
    pub fn from_value(value: Value) -> Result<Step, EvalError> {
        match value {
            Value::Int(i) => Ok(Step::Index(i)),
            Value::String(s) => Ok(Step::Key(s)),
            other => Err(bad_arguments(&[other]).into()),
        }
    }
}

fn slot_index(index: i32, len: usize) -> Result<usize, EvalError> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| index_out_of_range(i64::from(index), len).into())
}

/// The value at the end of `steps`.
pub(crate) fn get(value: &Value, steps: &[Step]) -> EvalResult {
    let mut current = value;
    for step in steps {
        current = match (step, current) {
            (Step::Field(i), Value::Record { fields, .. }) => fields
                .get(*i)
                .ok_or_else(|| bad_arguments(std::slice::from_ref(current)))?,
            (Step::Index(i), Value::Array(items)) => &items[slot_index(*i, items.len())?],
            (Step::Key(k), Value::Map(entries)) => {
                entries.get(&**k).ok_or_else(|| key_not_found(k))?
            }
            _ => return Err(bad_arguments(std::slice::from_ref(current)).into()),
        };
    }
    Ok(current.clone())
}

/// Replace the value at the end of `steps` with `f(old)`.
pub(crate) fn update(
    value: Value,
    steps: &[Step],
    f: &mut dyn FnMut(Value) -> EvalResult,
) -> EvalResult {
    let Some((step, rest)) = steps.split_first() else {
        return f(value);
    };
    match (step, value) {
        (Step::Field(i), Value::Record { ty, mut fields }) => {
            let old = fields
                .get(*i)
                .cloned()
                .ok_or_else(|| bad_arguments(&[]))?;
            let new = update(old, rest, f)?;
            Arc::make_mut(&mut fields)[*i] = new;
            Ok(Value::Record { ty, fields })
        }
        (Step::Index(i), Value::Array(mut items)) => {
            let at = slot_index(*i, items.len())?;
            let new = update(items[at].clone(), rest, f)?;
            Arc::make_mut(&mut items)[at] = new;
            Ok(Value::Array(items))
        }
        (Step::Key(k), Value::Map(mut entries)) => {
            let old = entries.get(&**k).cloned().ok_or_else(|| key_not_found(k))?;
            let new = update(old, rest, f)?;
            Arc::make_mut(&mut entries).insert(k.to_string(), new);
            Ok(Value::Map(entries))
        }
        (_, other) => Err(bad_arguments(&[other]).into()),
    }
}
