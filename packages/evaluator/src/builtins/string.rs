use super::native;
use crate::args::BoundArgs;
use crate::arithmetic::Calculator;
use crate::error::{ReduceError, ReduceResult};
use kiln_ast::{Expr, Parameter, ParameterList, Str};

pub(super) fn functions() -> Vec<crate::scope::NativeFunction> {
    let string = || ParameterList::positional(&["string"]);
    vec![
        native("quote", string(), quote),
        native("unquote", string(), unquote),
        native("length", string(), length),
        native("to-upper-case", string(), to_upper_case),
        native("to-lower-case", string(), to_lower_case),
        native("index", ParameterList::positional(&["string", "substring"]), index),
        native(
            "slice",
            ParameterList::new(
                vec![
                    Parameter::required("string"),
                    Parameter::required("start-at"),
                    Parameter::optional("end-at", Expr::number(-1.0)),
                ],
                None,
            ),
            slice,
        ),
    ]
}

fn with_quoting(value: String, quoted: bool) -> Expr {
    Expr::Str(Str { value, quoted })
}

fn quote(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let (text, _) = args.string("string")?;
    Ok(Expr::quoted(text))
}

fn unquote(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let (text, _) = args.string("string")?;
    Ok(Expr::unquoted(text))
}

fn length(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let (text, _) = args.string("string")?;
    Ok(Expr::number(text.chars().count() as f64))
}

fn to_upper_case(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let (text, quoted) = args.string("string")?;
    Ok(with_quoting(text.to_uppercase(), quoted))
}

fn to_lower_case(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let (text, quoted) = args.string("string")?;
    Ok(with_quoting(text.to_lowercase(), quoted))
}

/// 1-based character position of `substring`, or null.
fn index(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let (text, _) = args.string("string")?;
    let (needle, _) = args.string("substring")?;
    Ok(match text.find(&needle) {
        Some(byte) => Expr::number((text[..byte].chars().count() + 1) as f64),
        None => Expr::Null,
    })
}

fn integer(args: &BoundArgs, name: &str) -> ReduceResult<i64> {
    let n = args.number(name)?;
    if n.unit.is_some() || n.value.fract() != 0.0 {
        return Err(ReduceError::type_error(format!("${}: {} is not an int", name, n)));
    }
    Ok(n.value as i64)
}

/// 1-based, inclusive; negative positions count from the end.
fn slice(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let (text, quoted) = args.string("string")?;
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len() as i64;
    let position = |p: i64| if p < 0 { len + p + 1 } else { p };
    let start = position(integer(args, "start-at")?).max(1);
    let end = position(integer(args, "end-at")?).min(len);
    let sliced: String = if start > end {
        String::new()
    } else {
        chars[(start - 1) as usize..end as usize].iter().collect()
    };
    Ok(with_quoting(sliced, quoted))
}
