//! Expression evaluation against a scope.
//!
//! A `calc()` depth counter decides whether arithmetic must produce a
//! concrete value (depth 0) or may be carried forward symbolically. Nested
//! `calc()` flattens to its bare expression.

use crate::args::{bind_arguments, BoundArgs};
use crate::arithmetic::{unwrap_calc, Calculator};
use crate::error::{ReduceError, ReduceResult};
use crate::math::reduce_math;
use crate::scope::{Member, NativeFunction, Scope};
use crate::values::is_truthy;
use kiln_ast::{
    Argument, BinaryOp, Expr, FunctionCall, ListExpr, MapExpr, QualifiedName, Str,
    Template, TemplatePart, UnaryOp,
};
use tracing::trace;

#[derive(Debug, Clone, Copy, Default)]
struct Mode {
    calc_depth: u32,
    /// A literal `a / b` stays a slash-separated pair.
    keep_slash: bool,
}

impl Mode {
    fn must_reduce(self) -> bool {
        self.calc_depth == 0
    }

    fn nested(self) -> Self {
        Self {
            calc_depth: self.calc_depth + 1,
            keep_slash: false,
        }
    }

    fn plain(self) -> Self {
        Self {
            keep_slash: false,
            ..self
        }
    }
}

pub struct ExprEvaluator<'a> {
    scope: &'a Scope,
    calc: Calculator,
}

impl<'a> ExprEvaluator<'a> {
    pub fn new(scope: &'a Scope, calc: Calculator) -> Self {
        Self { scope, calc }
    }

    /// Evaluate to a concrete value.
    pub fn evaluate(&self, expr: &Expr) -> ReduceResult<Expr> {
        self.eval(expr, Mode::default())
    }

    /// Evaluate a declaration value, where `12px/1.5` is a separator rather
    /// than a division.
    pub fn evaluate_declaration(&self, expr: &Expr) -> ReduceResult<Expr> {
        self.eval(
            expr,
            Mode {
                calc_depth: 0,
                keep_slash: true,
            },
        )
    }

    /// Render a template with every interpolation reduced and unquoted.
    pub fn interpolate(&self, template: &Template) -> ReduceResult<String> {
        let mut out = String::new();
        for part in &template.parts {
            match part {
                TemplatePart::Literal(text) => out.push_str(text),
                TemplatePart::Interpolation(expr) => {
                    out.push_str(&self.evaluate(expr)?.to_unquoted_string())
                }
            }
        }
        Ok(out)
    }

    fn eval(&self, expr: &Expr, mode: Mode) -> ReduceResult<Expr> {
        match expr {
            Expr::Number(_)
            | Expr::Color(_)
            | Expr::Str(_)
            | Expr::Url(_)
            | Expr::Ident(_)
            | Expr::Boolean(_)
            | Expr::Null
            | Expr::Operator(_) => Ok(expr.clone()),
            Expr::Template(template) => Ok(Expr::Str(Str {
                value: self.interpolate(template)?,
                quoted: template.quoted,
            })),
            Expr::Variable(name) => self.variable(name),
            Expr::List(list) => {
                let items = list
                    .items
                    .iter()
                    .map(|item| self.eval(item, mode))
                    .collect::<ReduceResult<Vec<_>>>()?;
                Ok(Expr::List(ListExpr {
                    items,
                    separator: list.separator,
                    bracketed: list.bracketed,
                }))
            }
            Expr::Map(map) => {
                let entries = map
                    .entries
                    .iter()
                    .map(|(k, v)| Ok((self.eval(k, mode.plain())?, self.eval(v, mode.plain())?)))
                    .collect::<ReduceResult<Vec<_>>>()?;
                Ok(Expr::Map(MapExpr { entries }))
            }
            Expr::Function(call) => self.function(call, mode),
            Expr::Math(call) => {
                let args = call
                    .args
                    .iter()
                    .map(|arg| self.eval(arg, mode.nested()).map(unwrap_calc))
                    .collect::<ReduceResult<Vec<_>>>()?;
                reduce_math(call.function, args, false, self.calc.precision())
            }
            Expr::Calc(inner) => {
                let value = self.eval(inner, mode.nested())?;
                match value {
                    Expr::Number(_) => Ok(value),
                    other if mode.calc_depth > 0 => Ok(unwrap_calc(other)),
                    other => Ok(Expr::calc(unwrap_calc(other))),
                }
            }
            Expr::Unary { op, operand } => self.unary(*op, operand, mode),
            Expr::Binary { op, left, right } => self.binary(*op, left, right, mode),
        }
    }

    fn variable(&self, name: &QualifiedName) -> ReduceResult<Expr> {
        let key = name.variable_key();
        match self.scope.get(&key) {
            Some(Member::Variable { value, .. }) => Ok(value),
            _ if name.namespace.is_some() => Err(ReduceError::unresolved(
                key.clone(),
                format!("Undefined variable {}", key),
            )),
            _ => Err(ReduceError::undefined_variable(&name.name)),
        }
    }

    fn function(&self, call: &FunctionCall, mode: Mode) -> ReduceResult<Expr> {
        match self.scope.get(&call.name.member_key()) {
            Some(Member::Function(native)) => {
                trace!(function = %call.name, "Calling native function");
                self.call_native(&native, &call.args, mode)
            }
            _ => match &call.name.namespace {
                Some(ns) => Err(ReduceError::undefined_function(ns, &call.name.name)),
                None => {
                    // Plain stylesheet function such as `var()` or `rgb()`.
                    let opaque = Mode {
                        keep_slash: true,
                        ..mode
                    };
                    let args = call
                        .args
                        .iter()
                        .map(|arg| {
                            Ok(Argument {
                                name: arg.name.clone(),
                                value: self.eval(&arg.value, opaque)?,
                            })
                        })
                        .collect::<ReduceResult<Vec<_>>>()?;
                    Ok(Expr::Function(FunctionCall {
                        name: call.name.clone(),
                        args,
                    }))
                }
            },
        }
    }

    fn call_native(&self, native: &NativeFunction, args: &[Argument], mode: Mode) -> ReduceResult<Expr> {
        let values = args
            .iter()
            .map(|arg| Ok((arg.name.clone(), self.eval(&arg.value, mode.plain())?)))
            .collect::<ReduceResult<Vec<_>>>()?;
        let binding = bind_arguments(&native.params, values)?;
        let bound = BoundArgs::resolve(&native.params, binding);
        (native.call)(&self.calc, &bound)
    }

    fn unary(&self, op: UnaryOp, operand: &Expr, mode: Mode) -> ReduceResult<Expr> {
        let value = self.eval(operand, mode.plain())?;
        match (op, value) {
            (UnaryOp::Not, value) => Ok(Expr::Boolean(!is_truthy(&value))),
            (UnaryOp::Minus, Expr::Number(mut n)) => {
                n.value = -n.value;
                Ok(Expr::Number(n))
            }
            (UnaryOp::Plus, Expr::Number(n)) => Ok(Expr::Number(n)),
            (UnaryOp::Minus, Expr::Calc(inner)) => Ok(Expr::calc(Expr::binary(
                BinaryOp::Multiply,
                Expr::number(-1.0),
                *inner,
            ))),
            (op, value) => Ok(Expr::Unary {
                op,
                operand: Box::new(value),
            }),
        }
    }

    fn binary(&self, op: BinaryOp, left: &Expr, right: &Expr, mode: Mode) -> ReduceResult<Expr> {
        match op {
            BinaryOp::And => {
                let l = self.eval(left, mode.plain())?;
                if is_truthy(&l) {
                    self.eval(right, mode.plain())
                } else {
                    Ok(l)
                }
            }
            BinaryOp::Or => {
                let l = self.eval(left, mode.plain())?;
                if is_truthy(&l) {
                    Ok(l)
                } else {
                    self.eval(right, mode.plain())
                }
            }
            BinaryOp::Divide
                if mode.keep_slash
                    && matches!(left, Expr::Number(_))
                    && matches!(right, Expr::Number(_)) =>
            {
                Ok(Expr::binary(op, left.clone(), right.clone()))
            }
            _ => {
                let l = self.eval(left, mode.plain())?;
                let r = self.eval(right, mode.plain())?;
                if op.is_arithmetic() && mode.must_reduce() {
                    if let Some(call) = [&l, &r].into_iter().find(|v| matches!(v, Expr::Math(_))) {
                        return Err(ReduceError::type_error(format!(
                            "{} cannot reduce without calc()",
                            call
                        )));
                    }
                }
                self.calc.binary(op, &l, &r, mode.must_reduce())
            }
        }
    }
}
