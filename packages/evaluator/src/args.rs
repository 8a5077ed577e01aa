//! Binding call arguments to a declared parameter shape.

use crate::error::{ReduceError, ReduceResult};
use kiln_ast::{Color, Expr, ListSeparator, MapExpr, Numeric, ParameterList};

/// Result of matching arguments against parameters. A slot holding `None`
/// takes the parameter's default, which the caller evaluates.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentBinding {
    pub slots: Vec<(String, Option<Expr>)>,
    pub rest: Option<(String, Vec<Expr>)>,
}

/// Match positional and keyword arguments to `params`.
pub fn bind_arguments(
    params: &ParameterList,
    args: Vec<(Option<String>, Expr)>,
) -> ReduceResult<ArgumentBinding> {
    let total = args.len();
    let mut slots: Vec<(String, Option<Expr>)> =
        params.params.iter().map(|p| (p.name.clone(), None)).collect();
    let mut positional_filled = vec![false; slots.len()];
    let mut rest = Vec::new();
    let mut position = 0;
    let mut keywords = Vec::new();

    for (name, value) in args {
        match name {
            Some(name) => keywords.push((name, value)),
            None => {
                if position < slots.len() {
                    slots[position].1 = Some(value);
                    positional_filled[position] = true;
                } else if params.rest.is_some() {
                    rest.push(value);
                } else {
                    return Err(ReduceError::arity(format!(
                        "Only {} arguments allowed, but {} were passed",
                        params.params.len(),
                        total
                    )));
                }
                position += 1;
            }
        }
    }

    for (name, value) in keywords {
        let Some(index) = params.position_of(&name) else {
            return Err(ReduceError::arity(format!("No parameter named ${}", name)));
        };
        if positional_filled[index] {
            return Err(ReduceError::arity(format!(
                "Parameter ${} was passed both by position and by name",
                name
            )));
        }
        if slots[index].1.is_some() {
            return Err(ReduceError::arity(format!(
                "Parameter ${} was passed more than once by name",
                name
            )));
        }
        slots[index].1 = Some(value);
    }

    for (param, (name, value)) in params.params.iter().zip(&slots) {
        if value.is_none() && param.default.is_none() {
            return Err(ReduceError::arity(format!("Missing argument ${}", name)));
        }
    }

    Ok(ArgumentBinding {
        slots,
        rest: params.rest.clone().map(|name| (name, rest)),
    })
}

/// Fully resolved arguments of a native call.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArgs {
    values: Vec<(String, Expr)>,
    rest: Vec<Expr>,
}

impl BoundArgs {
    /// Fill defaulted slots from the parameter list.
    pub fn resolve(params: &ParameterList, binding: ArgumentBinding) -> Self {
        let values = binding
            .slots
            .into_iter()
            .zip(&params.params)
            .map(|((name, value), param)| {
                let value = value.or_else(|| param.default.clone()).unwrap_or(Expr::Null);
                (name, value)
            })
            .collect();
        Self {
            values,
            rest: binding.rest.map(|(_, items)| items).unwrap_or_default(),
        }
    }

    pub fn from_values(values: Vec<(String, Expr)>, rest: Vec<Expr>) -> Self {
        Self { values, rest }
    }

    pub fn get(&self, name: &str) -> ReduceResult<&Expr> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| ReduceError::arity(format!("Missing argument ${}", name)))
    }

    pub fn rest(&self) -> &[Expr] {
        &self.rest
    }

    /// Rest arguments as one comma list.
    pub fn rest_list(&self) -> Expr {
        Expr::list(self.rest.clone(), ListSeparator::Comma)
    }

    fn mismatch(&self, name: &str, value: &Expr, expected: &str) -> ReduceError {
        ReduceError::type_error(format!("${}: {} is not a {}", name, value, expected))
    }

    pub fn number(&self, name: &str) -> ReduceResult<&Numeric> {
        match self.get(name)? {
            Expr::Number(n) => Ok(n),
            other => Err(self.mismatch(name, other, "number")),
        }
    }

    pub fn color(&self, name: &str) -> ReduceResult<&Color> {
        match self.get(name)? {
            Expr::Color(c) => Ok(c),
            other => Err(self.mismatch(name, other, "color")),
        }
    }

    /// String or identifier text, with its quoting.
    pub fn string(&self, name: &str) -> ReduceResult<(String, bool)> {
        match self.get(name)? {
            Expr::Str(s) => Ok((s.value.clone(), s.quoted)),
            Expr::Ident(text) => Ok((text.clone(), false)),
            other => Err(self.mismatch(name, other, "string")),
        }
    }

    pub fn map(&self, name: &str) -> ReduceResult<MapExpr> {
        match self.get(name)? {
            Expr::Map(map) => Ok(map.clone()),
            Expr::List(list) if list.items.is_empty() => Ok(MapExpr { entries: Vec::new() }),
            other => Err(self.mismatch(name, other, "map")),
        }
    }
}
