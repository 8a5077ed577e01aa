//! Typed arithmetic over reduced terms.
//!
//! Every operator takes a `must_reduce` flag. Outside a `calc()` context the
//! result has to be a concrete value, so an irreducible `+ - * /` is an
//! error; inside one the operation is carried forward symbolically as
//! `calc(a op b)`. `%` and `**` never go symbolic.

use crate::error::{ReduceError, ReduceResult};
use crate::units::{convert, round_to};
use crate::values::values_equal;
use kiln_ast::{BinaryOp, Expr, Numeric};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calculator {
    precision: u32,
}

fn numeric(value: &Expr) -> Option<&Numeric> {
    match value {
        Expr::Number(n) => Some(n),
        _ => None,
    }
}

/// Strip a `calc()` wrapper so symbolic results nest as bare expressions.
pub fn unwrap_calc(value: Expr) -> Expr {
    match value {
        Expr::Calc(inner) => *inner,
        other => other,
    }
}

impl Calculator {
    pub fn new(precision: u32) -> Self {
        Self { precision }
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    fn number(&self, value: f64, unit: Option<String>) -> Expr {
        Expr::Number(Numeric {
            value: round_to(value, self.precision),
            unit,
        })
    }

    fn symbolic(&self, op: BinaryOp, a: &Expr, b: &Expr, must_reduce: bool) -> ReduceResult<Expr> {
        if must_reduce {
            return Err(ReduceError::type_error(format!(
                "{} {} {} cannot reduce without calc()",
                a,
                op.symbol(),
                b
            )));
        }
        Ok(Expr::calc(Expr::binary(
            op,
            unwrap_calc(a.clone()),
            unwrap_calc(b.clone()),
        )))
    }

    pub fn add(&self, a: &Expr, b: &Expr, must_reduce: bool) -> ReduceResult<Expr> {
        self.additive(BinaryOp::Add, a, b, must_reduce)
    }

    pub fn subtract(&self, a: &Expr, b: &Expr, must_reduce: bool) -> ReduceResult<Expr> {
        self.additive(BinaryOp::Subtract, a, b, must_reduce)
    }

    fn additive(&self, op: BinaryOp, a: &Expr, b: &Expr, must_reduce: bool) -> ReduceResult<Expr> {
        if let (Some(x), Some(y)) = (numeric(a), numeric(b)) {
            if let Some(right) = convert(y.value, y.unit.as_deref(), x.unit.as_deref()) {
                let value = if op == BinaryOp::Add {
                    x.value + right
                } else {
                    x.value - right
                };
                return Ok(self.number(value, x.unit.clone().or_else(|| y.unit.clone())));
            }
        }
        self.symbolic(op, a, b, must_reduce)
    }

    pub fn multiply(&self, a: &Expr, b: &Expr, must_reduce: bool) -> ReduceResult<Expr> {
        if let (Some(x), Some(y)) = (numeric(a), numeric(b)) {
            if x.unit.is_some() && y.unit.is_some() {
                return Err(ReduceError::type_error(format!(
                    "Cannot multiply {} by {} because both terms contain units",
                    a, b
                )));
            }
            return Ok(self.number(x.value * y.value, x.unit.clone().or_else(|| y.unit.clone())));
        }
        self.symbolic(BinaryOp::Multiply, a, b, must_reduce)
    }

    pub fn divide(&self, a: &Expr, b: &Expr, must_reduce: bool) -> ReduceResult<Expr> {
        if let (Some(x), Some(y)) = (numeric(a), numeric(b)) {
            if y.unit.is_some() {
                return Err(ReduceError::type_error(format!(
                    "Cannot divide {} by {} because {} is not unitless",
                    a, b, b
                )));
            }
            if y.value == 0.0 {
                return Err(ReduceError::type_error(format!("Cannot divide {} by zero", a)));
            }
            return Ok(self.number(x.value / y.value, x.unit.clone()));
        }
        self.symbolic(BinaryOp::Divide, a, b, must_reduce)
    }

    pub fn modulo(&self, a: &Expr, b: &Expr) -> ReduceResult<Expr> {
        let (Some(x), Some(y)) = (numeric(a), numeric(b)) else {
            return Err(ReduceError::type_error(format!(
                "Cannot take {} modulo {} because one or more terms is not a number",
                a, b
            )));
        };
        if y.unit.is_some() {
            return Err(ReduceError::type_error(format!(
                "Cannot take {} modulo {} because {} is not unitless",
                a, b, b
            )));
        }
        if y.value == 0.0 {
            return Err(ReduceError::type_error(format!("Cannot divide {} by zero", a)));
        }
        // Floored: the result takes the divisor's sign.
        let value = x.value - y.value * (x.value / y.value).floor();
        Ok(self.number(value, x.unit.clone()))
    }

    pub fn power(&self, a: &Expr, b: &Expr) -> ReduceResult<Expr> {
        let (Some(x), Some(y)) = (numeric(a), numeric(b)) else {
            return Err(ReduceError::type_error(format!(
                "Cannot raise {} to the power of {} because one or more terms is not a number",
                a, b
            )));
        };
        if y.unit.is_some() {
            return Err(ReduceError::type_error(format!(
                "Cannot raise {} to the power of {} because {} is not unitless",
                a, b, b
            )));
        }
        Ok(self.number(x.value.powf(y.value), x.unit.clone()))
    }

    /// Order two values. Both must be numbers with convertible units.
    pub fn compare(&self, a: &Expr, b: &Expr) -> ReduceResult<Ordering> {
        for side in [a, b] {
            if matches!(side, Expr::Calc(_) | Expr::Math(_)) {
                return Err(ReduceError::type_error(format!(
                    "Cannot compare {} because it is not reducible to a number",
                    side
                )));
            }
        }
        let (Some(x), Some(y)) = (numeric(a), numeric(b)) else {
            return Err(ReduceError::type_error(format!(
                "{} and {} are not numerical and cannot be compared",
                a, b
            )));
        };
        let Some(right) = convert(y.value, y.unit.as_deref(), x.unit.as_deref()) else {
            return Err(ReduceError::type_error(format!(
                "{} and {} have incompatible units and cannot be compared",
                a, b
            )));
        };
        let left = round_to(x.value, self.precision);
        let right = round_to(right, self.precision);
        Ok(left.partial_cmp(&right).unwrap_or(Ordering::Equal))
    }

    pub fn equals(&self, a: &Expr, b: &Expr) -> bool {
        values_equal(a, b, self.precision)
    }

    /// Apply any operator except the short-circuiting `and`/`or`.
    pub fn binary(&self, op: BinaryOp, a: &Expr, b: &Expr, must_reduce: bool) -> ReduceResult<Expr> {
        match op {
            BinaryOp::Add => self.add(a, b, must_reduce),
            BinaryOp::Subtract => self.subtract(a, b, must_reduce),
            BinaryOp::Multiply => self.multiply(a, b, must_reduce),
            BinaryOp::Divide => self.divide(a, b, must_reduce),
            BinaryOp::Modulo => self.modulo(a, b),
            BinaryOp::Power => self.power(a, b),
            BinaryOp::Equal => Ok(Expr::Boolean(self.equals(a, b))),
            BinaryOp::NotEqual => Ok(Expr::Boolean(!self.equals(a, b))),
            BinaryOp::LessThan => Ok(Expr::Boolean(self.compare(a, b)? == Ordering::Less)),
            BinaryOp::LessThanOrEqual => Ok(Expr::Boolean(self.compare(a, b)? != Ordering::Greater)),
            BinaryOp::GreaterThan => Ok(Expr::Boolean(self.compare(a, b)? == Ordering::Greater)),
            BinaryOp::GreaterThanOrEqual => Ok(Expr::Boolean(self.compare(a, b)? != Ordering::Less)),
            BinaryOp::And | BinaryOp::Or => Err(ReduceError::internal(format!(
                "{} must be short-circuited by the caller",
                op.symbol()
            ))),
        }
    }
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new(5)
    }
}
