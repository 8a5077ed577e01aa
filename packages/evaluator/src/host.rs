//! Conversion between host values and tree values.

use crate::error::{ReduceError, ReduceResult};
use kiln_ast::{Expr, ListSeparator, MapExpr, Numeric, Str};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Host values that can become a leaf or composite value.
pub trait ToExpr {
    fn to_expr(&self) -> ReduceResult<Expr>;
}

impl ToExpr for f64 {
    fn to_expr(&self) -> ReduceResult<Expr> {
        if self.is_finite() {
            Ok(Expr::number(*self))
        } else {
            Err(ReduceError::type_error(format!("{} is not a finite number", self)))
        }
    }
}

impl ToExpr for i32 {
    fn to_expr(&self) -> ReduceResult<Expr> {
        Ok(Expr::number(f64::from(*self)))
    }
}

impl ToExpr for usize {
    fn to_expr(&self) -> ReduceResult<Expr> {
        Ok(Expr::number(*self as f64))
    }
}

impl ToExpr for bool {
    fn to_expr(&self) -> ReduceResult<Expr> {
        Ok(Expr::Boolean(*self))
    }
}

impl ToExpr for &str {
    fn to_expr(&self) -> ReduceResult<Expr> {
        Ok(Expr::Str(Str::quoted(*self)))
    }
}

impl ToExpr for String {
    fn to_expr(&self) -> ReduceResult<Expr> {
        self.as_str().to_expr()
    }
}

impl ToExpr for Numeric {
    fn to_expr(&self) -> ReduceResult<Expr> {
        Ok(Expr::Number(self.clone()))
    }
}

impl<T: ToExpr> ToExpr for Option<T> {
    fn to_expr(&self) -> ReduceResult<Expr> {
        match self {
            Some(value) => value.to_expr(),
            None => Ok(Expr::Null),
        }
    }
}

impl<T: ToExpr> ToExpr for Vec<T> {
    fn to_expr(&self) -> ReduceResult<Expr> {
        let items = self.iter().map(ToExpr::to_expr).collect::<ReduceResult<Vec<_>>>()?;
        Ok(Expr::list(items, ListSeparator::Comma))
    }
}

impl<T: ToExpr> ToExpr for BTreeMap<String, T> {
    fn to_expr(&self) -> ReduceResult<Expr> {
        let entries = self
            .iter()
            .map(|(k, v)| Ok((Expr::Str(Str::quoted(k.clone())), v.to_expr()?)))
            .collect::<ReduceResult<Vec<_>>>()?;
        Ok(Expr::Map(MapExpr { entries }))
    }
}

/// JSON → value: numbers, strings, arrays (comma lists), objects (maps),
/// booleans and null.
pub fn expr_from_json(value: &Value) -> ReduceResult<Expr> {
    match value {
        Value::Null => Ok(Expr::Null),
        Value::Bool(b) => Ok(Expr::Boolean(*b)),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ReduceError::type_error(format!("{} is not a finite number", n)))?
            .to_expr(),
        Value::String(s) => s.as_str().to_expr(),
        Value::Array(items) => {
            let items = items.iter().map(expr_from_json).collect::<ReduceResult<Vec<_>>>()?;
            Ok(Expr::list(items, ListSeparator::Comma))
        }
        Value::Object(map) => {
            let entries = map
                .iter()
                .map(|(k, v)| Ok((Expr::Str(Str::quoted(k.clone())), expr_from_json(v)?)))
                .collect::<ReduceResult<Vec<_>>>()?;
            Ok(Expr::Map(MapExpr { entries }))
        }
    }
}

/// Value → JSON. Unitless numbers become JSON numbers; anything with a
/// textual form (dimensions, colors, calc) becomes its rendering.
pub fn expr_to_json(value: &Expr) -> Value {
    match value {
        Expr::Number(n) if n.unit.is_none() => {
            if n.value.fract() == 0.0 && n.value.abs() < 9.0e15 {
                Value::Number(Number::from(n.value as i64))
            } else {
                Number::from_f64(n.value).map(Value::Number).unwrap_or(Value::Null)
            }
        }
        Expr::Str(s) => Value::String(s.value.clone()),
        Expr::Boolean(b) => Value::Bool(*b),
        Expr::Null => Value::Null,
        Expr::List(list) => Value::Array(list.items.iter().map(expr_to_json).collect()),
        Expr::Map(map) => {
            let mut out = Map::new();
            for (k, v) in &map.entries {
                out.insert(k.to_unquoted_string(), expr_to_json(v));
            }
            Value::Object(out)
        }
        other => Value::String(other.to_unquoted_string()),
    }
}
