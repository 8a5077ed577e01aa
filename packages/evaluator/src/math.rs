//! `min()`, `max()` and `clamp()` folding.

use crate::error::{ReduceError, ReduceResult};
use crate::units::{compatible, convert, round_to};
use kiln_ast::{Expr, MathCall, MathFn, Numeric};

/// Fold a math call whose arguments are already reduced. When the
/// arguments are not all compatible numbers the call is kept as written,
/// or rejected when a concrete value is required.
pub fn reduce_math(
    function: MathFn,
    args: Vec<Expr>,
    must_reduce: bool,
    precision: u32,
) -> ReduceResult<Expr> {
    if function == MathFn::Clamp {
        check_clamp_arity(args.len())?;
    } else if args.is_empty() {
        return Err(ReduceError::arity("Missing argument $number"));
    }
    match fold(function, &args, precision) {
        Some(result) => Ok(Expr::Number(result)),
        None => {
            let call = Expr::Math(MathCall { function, args });
            if must_reduce {
                Err(ReduceError::type_error(format!(
                    "{} cannot reduce without calc()",
                    call
                )))
            } else {
                Ok(call)
            }
        }
    }
}

fn check_clamp_arity(count: usize) -> ReduceResult<()> {
    const NAMES: [&str; 3] = ["min", "value", "max"];
    if count > 3 {
        return Err(ReduceError::arity(format!(
            "Only 3 arguments allowed, but {} were passed",
            count
        )));
    }
    match NAMES.get(count) {
        Some(missing) => Err(ReduceError::arity(format!("Missing argument ${}", missing))),
        None => Ok(()),
    }
}

fn numbers(args: &[Expr]) -> Option<Vec<&Numeric>> {
    let numbers = args
        .iter()
        .map(|a| match a {
            Expr::Number(n) => Some(n),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    let all_compatible = numbers.iter().all(|a| {
        numbers
            .iter()
            .all(|b| compatible(a.unit.as_deref(), b.unit.as_deref()))
    });
    all_compatible.then_some(numbers)
}

fn fold(function: MathFn, args: &[Expr], precision: u32) -> Option<Numeric> {
    let numbers = numbers(args)?;
    let unit = numbers
        .first()
        .and_then(|n| n.unit.clone())
        .or_else(|| numbers.iter().find_map(|n| n.unit.clone()));
    let values = numbers
        .iter()
        .map(|n| convert(n.value, n.unit.as_deref(), unit.as_deref()))
        .collect::<Option<Vec<f64>>>()?;
    let value = match function {
        MathFn::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        MathFn::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        // clamp(min, val, max) = max(min(max, val), min)
        MathFn::Clamp => f64::max(f64::min(values[2], values[1]), values[0]),
    };
    Some(Numeric {
        value: round_to(value, precision),
        unit,
    })
}
