use super::native;
use crate::args::BoundArgs;
use crate::arithmetic::Calculator;
use crate::color::{adjust_lightness, from_hsl, mix as mix_colors, to_hsl};
use crate::error::{ReduceError, ReduceResult};
use crate::units::round_to;
use kiln_ast::{Color, Expr, Numeric, Parameter, ParameterList};

pub(super) fn functions() -> Vec<crate::scope::NativeFunction> {
    let color = || ParameterList::positional(&["color"]);
    let amount = || ParameterList::positional(&["color", "amount"]);
    vec![
        native("red", color(), red),
        native("green", color(), green),
        native("blue", color(), blue),
        native("alpha", color(), alpha),
        native("hue", color(), hue),
        native("saturation", color(), saturation),
        native("lightness", color(), lightness),
        native("lighten", amount(), lighten),
        native("darken", amount(), darken),
        native("rgba", ParameterList::positional(&["color", "alpha"]), rgba),
        native(
            "hsl",
            ParameterList::new(
                vec![
                    Parameter::required("hue"),
                    Parameter::required("saturation"),
                    Parameter::required("lightness"),
                    Parameter::optional("alpha", Expr::number(1.0)),
                ],
                None,
            ),
            hsl,
        ),
        native(
            "mix",
            ParameterList::new(
                vec![
                    Parameter::required("color1"),
                    Parameter::required("color2"),
                    Parameter::optional("weight", Expr::dimension(50.0, "%")),
                ],
                None,
            ),
            mix,
        ),
    ]
}

fn channel(calc: &Calculator, value: f64) -> Expr {
    Expr::number(round_to(value, calc.precision()))
}

fn red(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    Ok(channel(calc, args.color("color")?.red.round()))
}

fn green(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    Ok(channel(calc, args.color("color")?.green.round()))
}

fn blue(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    Ok(channel(calc, args.color("color")?.blue.round()))
}

fn alpha(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    Ok(channel(calc, args.color("color")?.alpha))
}

fn hue(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let (h, _, _) = to_hsl(args.color("color")?);
    Ok(Expr::Number(Numeric::with_unit(round_to(h, calc.precision()), "deg")))
}

fn saturation(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let (_, s, _) = to_hsl(args.color("color")?);
    Ok(Expr::Number(Numeric::with_unit(round_to(s, calc.precision()), "%")))
}

fn lightness(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let (_, _, l) = to_hsl(args.color("color")?);
    Ok(Expr::Number(Numeric::with_unit(round_to(l, calc.precision()), "%")))
}

/// A percentage amount, `10%` or a bare `10`.
fn percent(args: &BoundArgs, name: &str) -> ReduceResult<f64> {
    let n = args.number(name)?;
    match n.unit.as_deref() {
        None | Some("%") => Ok(n.value),
        Some(_) => Err(ReduceError::type_error(format!(
            "${}: {} is not a percentage",
            name, n
        ))),
    }
}

fn lighten(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let amount = percent(args, "amount")?;
    Ok(Expr::Color(adjust_lightness(args.color("color")?, amount)))
}

fn darken(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let amount = percent(args, "amount")?;
    Ok(Expr::Color(adjust_lightness(args.color("color")?, -amount)))
}

fn rgba(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let color = args.color("color")?;
    let alpha = args.number("alpha")?;
    let alpha = match alpha.unit.as_deref() {
        Some("%") => alpha.value / 100.0,
        _ => alpha.value,
    };
    Ok(Expr::Color(Color::rgba(
        color.red,
        color.green,
        color.blue,
        alpha.clamp(0.0, 1.0),
    )))
}

fn hsl(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let hue = args.number("hue")?.value;
    let saturation = percent(args, "saturation")?;
    let lightness = percent(args, "lightness")?;
    let alpha = args.number("alpha")?.value.clamp(0.0, 1.0);
    Ok(Expr::Color(from_hsl(hue, saturation, lightness, alpha)))
}

fn mix(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let weight = percent(args, "weight")?;
    Ok(Expr::Color(mix_colors(
        args.color("color1")?,
        args.color("color2")?,
        (weight / 100.0).clamp(0.0, 1.0),
    )))
}
