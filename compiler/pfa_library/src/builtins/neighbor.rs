//! `model.neighbor.*`: nearest-neighbor search over a codebook.

use pfa_types::Pattern;

use super::metric::euclidean;
use super::{array_arg, bad, define, doubles, fcn_arg, int_arg, sig, Out};
use crate::errors::domain_error;
use crate::{CallContext, CallInfo, FunctionRegistry, Value};

const NEGATIVE_K: i32 = 30010;
const DIMENSIONS: i32 = 30011;

pub(super) fn register(registry: &mut FunctionRegistry) {
    define(
        registry,
        "model.neighbor.nearestK",
        vec![
            sig(
                vec![
                    ("k", Pattern::int()),
                    ("datum", Pattern::array(Pattern::double())),
                    ("codebook", Pattern::array(Pattern::array(Pattern::double()))),
                ],
                Pattern::array(Pattern::array(Pattern::double())),
            ),
            sig(
                vec![
                    ("k", Pattern::int()),
                    ("datum", Pattern::wild("A")),
                    ("codebook", Pattern::array(Pattern::wild("A"))),
                    (
                        "metric",
                        Pattern::fcn(
                            vec![Pattern::wild("A"), Pattern::wild("A")],
                            Pattern::double(),
                        ),
                    ),
                ],
                Pattern::array(Pattern::wild("A")),
            ),
        ],
        nearest_k,
    );
}

/// The `k` codebook entries closest to `datum`, nearest first.
///
/// Equal distances keep codebook order.
fn nearest_k(args: &[Value], call: &CallInfo<'_>, ctx: &mut dyn CallContext) -> Out {
    let k = int_arg(args, 0)?;
    let k = usize::try_from(k).map_err(|_| {
        domain_error(NEGATIVE_K, format!("k must be non-negative, found {k}"))
    })?;
    let datum = args.get(1).ok_or_else(|| bad(args))?;
    let codebook = array_arg(args, 2)?;

    let mut scored = Vec::with_capacity(codebook.len());
    if call.index == 0 {
        let x = doubles(datum.as_array().ok_or_else(|| bad(args))?)?;
        for (i, entry) in codebook.iter().enumerate() {
            ctx.check_deadline()?;
            let y = doubles(entry.as_array().ok_or_else(|| bad(args))?)?;
            scored.push((euclidean(&x, &y, DIMENSIONS)?, i));
        }
    } else {
        let metric = fcn_arg(args, 3)?;
        for (i, entry) in codebook.iter().enumerate() {
            ctx.check_deadline()?;
            let d = ctx.call(metric, vec![datum.clone(), entry.clone()])?;
            scored.push((d.as_f64().ok_or_else(|| bad(args))?, i));
        }
    }
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(Value::array(
        scored
            .into_iter()
            .take(k)
            .map(|(_, i)| codebook[i].clone())
            .collect(),
    ))
}
