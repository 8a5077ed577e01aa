use super::native;
use crate::args::BoundArgs;
use crate::arithmetic::Calculator;
use crate::error::{ReduceError, ReduceResult};
use crate::math::reduce_math;
use crate::units::{compatible, round_to};
use kiln_ast::{Expr, MathFn, Numeric, ParameterList};

pub(super) fn functions() -> Vec<crate::scope::NativeFunction> {
    let number = || ParameterList::positional(&["number"]);
    vec![
        native("round", number(), round),
        native("ceil", number(), ceil),
        native("floor", number(), floor),
        native("abs", number(), abs),
        native("sqrt", number(), sqrt),
        native("percentage", number(), percentage),
        native("unit", number(), unit),
        native("is-unitless", number(), is_unitless),
        native("pow", ParameterList::positional(&["base", "exponent"]), pow),
        native("div", ParameterList::positional(&["number1", "number2"]), div),
        native("compatible", ParameterList::positional(&["number1", "number2"]), compatible_units),
        native("min", ParameterList::default().with_rest("numbers"), min),
        native("max", ParameterList::default().with_rest("numbers"), max),
        native("clamp", ParameterList::positional(&["min", "number", "max"]), clamp),
    ]
}

fn map_value(calc: &Calculator, args: &BoundArgs, f: fn(f64) -> f64) -> ReduceResult<Expr> {
    let n = args.number("number")?;
    Ok(Expr::Number(Numeric {
        value: round_to(f(n.value), calc.precision()),
        unit: n.unit.clone(),
    }))
}

fn round(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    map_value(calc, args, f64::round)
}

fn ceil(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    map_value(calc, args, f64::ceil)
}

fn floor(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    map_value(calc, args, f64::floor)
}

fn abs(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    map_value(calc, args, f64::abs)
}

fn unitless<'a>(args: &'a BoundArgs, name: &str) -> ReduceResult<&'a Numeric> {
    let n = args.number(name)?;
    if n.unit.is_some() {
        return Err(ReduceError::type_error(format!("${}: {} is not unitless", name, n)));
    }
    Ok(n)
}

fn sqrt(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let n = unitless(args, "number")?;
    Ok(Expr::number(round_to(n.value.sqrt(), calc.precision())))
}

fn percentage(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let n = unitless(args, "number")?;
    Ok(Expr::Number(Numeric::with_unit(
        round_to(n.value * 100.0, calc.precision()),
        "%",
    )))
}

fn unit(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let n = args.number("number")?;
    Ok(Expr::quoted(n.unit.clone().unwrap_or_default()))
}

fn is_unitless(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    Ok(Expr::Boolean(args.number("number")?.unit.is_none()))
}

fn pow(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    calc.power(args.get("base")?, args.get("exponent")?)
}

fn div(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    calc.divide(args.get("number1")?, args.get("number2")?, true)
}

fn compatible_units(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let a = args.number("number1")?;
    let b = args.number("number2")?;
    Ok(Expr::Boolean(compatible(a.unit.as_deref(), b.unit.as_deref())))
}

fn min(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    reduce_math(MathFn::Min, args.rest().to_vec(), true, calc.precision())
}

fn max(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    reduce_math(MathFn::Max, args.rest().to_vec(), true, calc.precision())
}

fn clamp(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let values = vec![
        args.get("min")?.clone(),
        args.get("number")?.clone(),
        args.get("max")?.clone(),
    ];
    reduce_math(MathFn::Clamp, values, true, calc.precision())
}
