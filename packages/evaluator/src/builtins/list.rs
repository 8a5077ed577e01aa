use super::native;
use crate::args::BoundArgs;
use crate::arithmetic::Calculator;
use crate::error::{ReduceError, ReduceResult};
use crate::values::as_list;
use kiln_ast::{Expr, ListSeparator, Parameter, ParameterList};

pub(super) fn functions() -> Vec<crate::scope::NativeFunction> {
    let auto = || Parameter::optional("separator", Expr::ident("auto"));
    vec![
        native("list", ParameterList::default().with_rest("args"), list),
        native("length", ParameterList::positional(&["list"]), length),
        native("nth", ParameterList::positional(&["list", "n"]), nth),
        native("separator", ParameterList::positional(&["list"]), separator),
        native(
            "join",
            ParameterList::new(
                vec![Parameter::required("list1"), Parameter::required("list2"), auto()],
                None,
            ),
            join,
        ),
        native(
            "append",
            ParameterList::new(
                vec![Parameter::required("list"), Parameter::required("val"), auto()],
                None,
            ),
            append,
        ),
    ]
}

fn list(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    Ok(args.rest_list())
}

fn length(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let (items, _) = as_list(args.get("list")?);
    Ok(Expr::number(items.len() as f64))
}

/// 1-based; negative indexes count from the end.
fn nth(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let (items, _) = as_list(args.get("list")?);
    let n = args.number("n")?;
    let len = items.len() as i64;
    let index = n.value as i64;
    if n.unit.is_some() || n.value.fract() != 0.0 || index == 0 || index.abs() > len {
        return Err(ReduceError::type_error(format!(
            "$n: Invalid index {} for a list with {} elements",
            n, len
        )));
    }
    let position = if index > 0 { index - 1 } else { len + index };
    Ok(items[position as usize].clone())
}

fn separator_name(separator: ListSeparator) -> &'static str {
    match separator {
        ListSeparator::Space => "space",
        ListSeparator::Comma => "comma",
        ListSeparator::Slash => "slash",
    }
}

fn separator(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let (_, separator) = as_list(args.get("list")?);
    Ok(Expr::unquoted(separator_name(separator)))
}

/// `auto` keeps `fallback`.
fn chosen_separator(args: &BoundArgs, fallback: ListSeparator) -> ReduceResult<ListSeparator> {
    let (name, _) = args.string("separator")?;
    match name.as_str() {
        "auto" => Ok(fallback),
        "space" => Ok(ListSeparator::Space),
        "comma" => Ok(ListSeparator::Comma),
        "slash" => Ok(ListSeparator::Slash),
        other => Err(ReduceError::type_error(format!(
            "$separator: Must be \"space\", \"comma\", \"slash\", or \"auto\", not {}",
            other
        ))),
    }
}

fn join(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let (mut items, first) = as_list(args.get("list1")?);
    let first_len = items.len();
    let (more, second) = as_list(args.get("list2")?);
    items.extend(more);
    let fallback = if first_len > 1 { first } else { second };
    Ok(Expr::list(items, chosen_separator(args, fallback)?))
}

fn append(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let (mut items, separator) = as_list(args.get("list")?);
    items.push(args.get("val")?.clone());
    Ok(Expr::list(items, chosen_separator(args, separator)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px_list() -> Expr {
        Expr::list(
            vec![Expr::dimension(1.0, "px"), Expr::dimension(2.0, "px"), Expr::dimension(3.0, "px")],
            ListSeparator::Space,
        )
    }

    #[test]
    fn test_nth_counts_from_either_end() {
        let calc = Calculator::default();
        let at = |n: f64| {
            BoundArgs::from_values(
                vec![("list".into(), px_list()), ("n".into(), Expr::number(n))],
                Vec::new(),
            )
        };
        assert_eq!(nth(&calc, &at(1.0)).unwrap(), Expr::dimension(1.0, "px"));
        assert_eq!(nth(&calc, &at(-1.0)).unwrap(), Expr::dimension(3.0, "px"));
        assert_eq!(
            nth(&calc, &at(4.0)).unwrap_err().to_string(),
            "$n: Invalid index 4 for a list with 3 elements"
        );
    }

    #[test]
    fn test_append_keeps_separator() {
        let calc = Calculator::default();
        let args = BoundArgs::from_values(
            vec![
                ("list".into(), px_list()),
                ("val".into(), Expr::dimension(4.0, "px")),
                ("separator".into(), Expr::ident("auto")),
            ],
            Vec::new(),
        );
        assert_eq!(append(&calc, &args).unwrap().to_string(), "1px 2px 3px 4px");
    }

    #[test]
    fn test_list_builds_comma_list() {
        let calc = Calculator::default();
        let args = BoundArgs::from_values(Vec::new(), vec![Expr::ident("a"), Expr::ident("b")]);
        assert_eq!(list(&calc, &args).unwrap().to_string(), "a, b");
    }
}
