use super::native;
use crate::args::BoundArgs;
use crate::arithmetic::Calculator;
use crate::error::ReduceResult;
use kiln_ast::{Expr, ListSeparator, MapExpr, ParameterList};

pub(super) fn functions() -> Vec<crate::scope::NativeFunction> {
    vec![
        native("get", ParameterList::positional(&["map", "key"]), get),
        native("has-key", ParameterList::positional(&["map", "key"]), has_key),
        native("keys", ParameterList::positional(&["map"]), keys),
        native("values", ParameterList::positional(&["map"]), values),
        native("merge", ParameterList::positional(&["map1", "map2"]), merge),
        native("remove", ParameterList::positional(&["map", "key"]), remove),
    ]
}

fn position(calc: &Calculator, map: &MapExpr, key: &Expr) -> Option<usize> {
    map.entries.iter().position(|(k, _)| calc.equals(k, key))
}

fn get(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let map = args.map("map")?;
    let key = args.get("key")?;
    Ok(position(calc, &map, key)
        .map(|i| map.entries[i].1.clone())
        .unwrap_or(Expr::Null))
}

fn has_key(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let map = args.map("map")?;
    Ok(Expr::Boolean(position(calc, &map, args.get("key")?).is_some()))
}

fn keys(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let map = args.map("map")?;
    let keys = map.entries.into_iter().map(|(k, _)| k).collect();
    Ok(Expr::list(keys, ListSeparator::Comma))
}

fn values(_: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let map = args.map("map")?;
    let values = map.entries.into_iter().map(|(_, v)| v).collect();
    Ok(Expr::list(values, ListSeparator::Comma))
}

/// Entries of `map2` win; new keys are appended in order.
fn merge(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let mut merged = args.map("map1")?;
    for (key, value) in args.map("map2")?.entries {
        match position(calc, &merged, &key) {
            Some(i) => merged.entries[i].1 = value,
            None => merged.entries.push((key, value)),
        }
    }
    Ok(Expr::Map(merged))
}

fn remove(calc: &Calculator, args: &BoundArgs) -> ReduceResult<Expr> {
    let mut map = args.map("map")?;
    let key = args.get("key")?;
    map.entries.retain(|(k, _)| !calc.equals(k, key));
    Ok(Expr::Map(map))
}
