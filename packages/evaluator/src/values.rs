//! Truthiness and structural equality of reduced values.

use crate::units::{convert, round_to};
use kiln_ast::{Expr, ListSeparator};

/// Only `false` and `null` are falsey.
pub fn is_truthy(value: &Expr) -> bool {
    !matches!(value, Expr::Boolean(false) | Expr::Null)
}

/// Structural equality used by `==` and `!=`. Numbers compare after unit
/// conversion, a missing unit being compatible with any unit; quoted and
/// unquoted strings with the same text are equal.
pub fn values_equal(a: &Expr, b: &Expr, precision: u32) -> bool {
    match (a, b) {
        (Expr::Number(x), Expr::Number(y)) => {
            match convert(y.value, y.unit.as_deref(), x.unit.as_deref()) {
                Some(converted) => round_to(x.value, precision) == round_to(converted, precision),
                None => false,
            }
        }
        (Expr::Str(x), Expr::Str(y)) => x.value == y.value,
        (Expr::Str(s), Expr::Ident(i)) | (Expr::Ident(i), Expr::Str(s)) => &s.value == i,
        (Expr::Ident(x), Expr::Ident(y)) => x == y,
        (Expr::Color(x), Expr::Color(y)) => x.same_channels(y),
        (Expr::List(x), Expr::List(y)) => {
            let separators_match = x.separator == y.separator || x.items.len() < 2;
            separators_match
                && x.bracketed == y.bracketed
                && x.items.len() == y.items.len()
                && x.items
                    .iter()
                    .zip(&y.items)
                    .all(|(p, q)| values_equal(p, q, precision))
        }
        (Expr::Map(x), Expr::Map(y)) => {
            x.entries.len() == y.entries.len()
                && x.entries.iter().all(|(k, v)| {
                    y.entries
                        .iter()
                        .find(|(k2, _)| values_equal(k, k2, precision))
                        .map(|(_, v2)| values_equal(v, v2, precision))
                        .unwrap_or(false)
                })
        }
        (Expr::List(list), Expr::Map(map)) | (Expr::Map(map), Expr::List(list)) => {
            list.items.is_empty() && map.entries.is_empty()
        }
        _ => a == b,
    }
}

/// View any value as a list: lists as themselves, maps as `(key value)`
/// pairs, everything else as a one-item list.
pub fn as_list(value: &Expr) -> (Vec<Expr>, ListSeparator) {
    match value {
        Expr::List(list) => (list.items.clone(), list.separator),
        Expr::Map(map) => (
            map.entries
                .iter()
                .map(|(k, v)| Expr::list(vec![k.clone(), v.clone()], ListSeparator::Space))
                .collect(),
            ListSeparator::Comma,
        ),
        Expr::Null => (Vec::new(), ListSeparator::Space),
        other => (vec![other.clone()], ListSeparator::Space),
    }
}
