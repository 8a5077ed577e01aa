//! Selector algebra: class scoping and parent-reference (`&`) merging.

use crate::classes::ClassNamer;
use crate::error::{ReduceError, ReduceResult};
use crate::options::ClassScope;
use kiln_ast::{
    Combinator, ComplexPart, ComplexSelector, CompoundSelector, PseudoArgument, PseudoSelector,
    SelectorList, SimpleSelector,
};

const TOP_LEVEL_PARENT: &str = "Top-level selectors may not contain a parent selector reference.";
const REPEATED_PARENT: &str = "Parent selector reference may only appear once per compound selector";

/// Rename class selectors per their scope and replace valid `:global()` /
/// `:local()` pseudos with the class they name.
pub fn scope_classes(list: &SelectorList, namer: &mut ClassNamer) -> ReduceResult<SelectorList> {
    list.validate_scope_pseudos().map_err(ReduceError::syntax)?;
    let scope = namer.default_scope();
    scope_list(list, namer, scope)
}

fn scope_list(list: &SelectorList, namer: &mut ClassNamer, scope: ClassScope) -> ReduceResult<SelectorList> {
    let selectors = list
        .selectors
        .iter()
        .map(|complex| {
            let parts = complex
                .parts
                .iter()
                .map(|part| match part {
                    ComplexPart::Compound(compound) => {
                        let simples = compound
                            .simples
                            .iter()
                            .map(|simple| scope_simple(simple, namer, scope))
                            .collect::<ReduceResult<Vec<_>>>()?;
                        Ok(ComplexPart::Compound(CompoundSelector::new(simples)))
                    }
                    ComplexPart::Combinator(c) => Ok(ComplexPart::Combinator(*c)),
                })
                .collect::<ReduceResult<Vec<_>>>()?;
            Ok(ComplexSelector::new(parts))
        })
        .collect::<ReduceResult<Vec<_>>>()?;
    Ok(SelectorList::new(selectors))
}

fn scope_simple(simple: &SimpleSelector, namer: &mut ClassNamer, scope: ClassScope) -> ReduceResult<SimpleSelector> {
    match simple {
        SimpleSelector::Class(name) => Ok(SimpleSelector::Class(namer.rename(name, scope))),
        SimpleSelector::Pseudo(pseudo) if pseudo.is_scope() => {
            let Some(class) = pseudo.scoped_class() else {
                return Err(ReduceError::syntax(kiln_ast::selector::SCOPE_SINGLE_CLASS));
            };
            let scope = if pseudo.name.eq_ignore_ascii_case("global") {
                ClassScope::Global
            } else {
                ClassScope::Local
            };
            Ok(SimpleSelector::Class(namer.rename(class, scope)))
        }
        SimpleSelector::Pseudo(PseudoSelector {
            name,
            element,
            argument: Some(PseudoArgument::Selector(inner)),
        }) => Ok(SimpleSelector::Pseudo(PseudoSelector {
            name: name.clone(),
            element: *element,
            argument: Some(PseudoArgument::Selector(scope_list(inner, namer, scope)?)),
        })),
        other => Ok(other.clone()),
    }
}

/// Merge a nested selector list with the resolved list of its enclosing
/// rule. Without a parent, any `&` is an error.
pub fn resolve_parent(list: &SelectorList, parent: Option<&SelectorList>) -> ReduceResult<SelectorList> {
    let Some(parent) = parent else {
        if list.contains_parent_ref() {
            return Err(ReduceError::syntax(TOP_LEVEL_PARENT));
        }
        return Ok(list.clone());
    };

    if !list.contains_parent_ref() {
        let selectors = parent
            .selectors
            .iter()
            .flat_map(|p| list.selectors.iter().map(move |c| descend(p, c)))
            .collect();
        return Ok(SelectorList::new(selectors));
    }

    // Each result is tagged with the parent alternative it starts from, so
    // the list comes out parent-major like the `&`-free case above.
    let mut tagged: Vec<(usize, ComplexSelector)> = Vec::new();
    for complex in &list.selectors {
        if complex.contains_parent_ref() {
            tagged.extend(substitute(complex, parent)?);
        } else {
            tagged.extend(parent.selectors.iter().map(|p| descend(p, complex)).enumerate());
        }
    }
    tagged.sort_by_key(|(index, _)| *index);
    Ok(SelectorList::new(tagged.into_iter().map(|(_, c)| c).collect()))
}

fn descend(p: &ComplexSelector, complex: &ComplexSelector) -> ComplexSelector {
    let mut parts = p.parts.clone();
    if !complex.starts_with_combinator() {
        parts.push(ComplexPart::Combinator(Combinator::Descendant));
    }
    parts.extend(complex.parts.iter().cloned());
    ComplexSelector::new(parts)
}

/// Expand every `&` position; the alternatives of all positions multiply.
/// Each result carries the index of the parent alternative taken at the
/// first `&` position (0 when `&` only appears inside a pseudo argument).
fn substitute(
    complex: &ComplexSelector,
    parent: &SelectorList,
) -> ReduceResult<Vec<(usize, ComplexSelector)>> {
    let mut alternatives: Vec<(Option<usize>, Vec<ComplexPart>)> = vec![(None, Vec::new())];
    for part in &complex.parts {
        let (options, per_parent) = match part {
            ComplexPart::Combinator(c) => (vec![vec![ComplexPart::Combinator(*c)]], false),
            ComplexPart::Compound(compound) => expand_compound(compound, parent)?,
        };
        alternatives = alternatives
            .iter()
            .flat_map(|(tag, prefix)| {
                options.iter().enumerate().map(move |(index, option)| {
                    let mut parts = prefix.clone();
                    parts.extend(option.iter().cloned());
                    let tag = if per_parent { tag.or(Some(index)) } else { *tag };
                    (tag, parts)
                })
            })
            .collect();
    }
    Ok(alternatives
        .into_iter()
        .map(|(tag, parts)| (tag.unwrap_or(0), ComplexSelector::new(parts)))
        .collect())
}

/// Alternatives for one compound, and whether there is one per parent
/// alternative.
fn expand_compound(
    compound: &CompoundSelector,
    parent: &SelectorList,
) -> ReduceResult<(Vec<Vec<ComplexPart>>, bool)> {
    let simples = compound
        .simples
        .iter()
        .map(|s| resolve_pseudo_argument(s, parent))
        .collect::<ReduceResult<Vec<_>>>()?;

    let position = simples
        .iter()
        .position(|s| matches!(s, SimpleSelector::Parent { .. }));
    let Some(position) = position else {
        return Ok((vec![vec![ComplexPart::Compound(CompoundSelector::new(simples))]], false));
    };
    if compound.parent_ref_count() > 1 {
        return Err(ReduceError::syntax(REPEATED_PARENT));
    }
    let suffix = match &simples[position] {
        SimpleSelector::Parent { suffix } => suffix.clone(),
        _ => None,
    };

    let alternatives = parent
        .selectors
        .iter()
        .map(|p| merge_into(p, &simples[..position], &simples[position + 1..], suffix.as_deref()))
        .collect::<ReduceResult<Vec<_>>>()?;
    Ok((alternatives, true))
}

/// Parent alternative `p` with `before` and `after` merged into its last
/// compound and `suffix` appended to that compound's final name.
fn merge_into(
    p: &ComplexSelector,
    before: &[SimpleSelector],
    after: &[SimpleSelector],
    suffix: Option<&str>,
) -> ReduceResult<Vec<ComplexPart>> {
    let mut parts = p.parts.clone();
    let last = match parts.pop() {
        Some(ComplexPart::Compound(compound)) => compound,
        Some(combinator) => {
            parts.push(combinator);
            CompoundSelector::new(Vec::new())
        }
        None => CompoundSelector::new(Vec::new()),
    };

    let mut inherited = last.simples;
    if let Some(suffix) = suffix {
        let invalid = || {
            ReduceError::syntax(format!(
                "Invalid parent selector suffix \"{}\" for {}",
                suffix, p
            ))
        };
        match inherited.last_mut() {
            Some(SimpleSelector::Class(name))
            | Some(SimpleSelector::Id(name))
            | Some(SimpleSelector::Type(name)) => name.push_str(suffix),
            _ => return Err(invalid()),
        }
    }

    let mut simples = before.to_vec();
    simples.extend(inherited);
    simples.extend(after.iter().cloned());
    parts.push(ComplexPart::Compound(CompoundSelector::new(simples)));
    Ok(parts)
}

/// `:not(&.b)` and friends resolve their argument against the same parent.
fn resolve_pseudo_argument(simple: &SimpleSelector, parent: &SelectorList) -> ReduceResult<SimpleSelector> {
    match simple {
        SimpleSelector::Pseudo(PseudoSelector {
            name,
            element,
            argument: Some(PseudoArgument::Selector(inner)),
        }) if inner.contains_parent_ref() => Ok(SimpleSelector::Pseudo(PseudoSelector {
            name: name.clone(),
            element: *element,
            argument: Some(PseudoArgument::Selector(resolve_parent(inner, Some(parent))?)),
        })),
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ReduceOptions;
    use kiln_ast::parse_selector;
    use std::path::Path;

    fn resolve(nested: &str, parent: &str) -> ReduceResult<String> {
        let parent = parse_selector(parent).unwrap();
        let nested = parse_selector(nested).unwrap();
        resolve_parent(&nested, Some(&parent)).map(|l| l.to_string())
    }

    #[test]
    fn test_implicit_descendant_is_a_cross_product() {
        assert_eq!(resolve(".b", ".a").unwrap(), ".a .b");
        assert_eq!(resolve(".c, .d", ".a, .b").unwrap(), ".a .c, .a .d, .b .c, .b .d");
    }

    #[test]
    fn test_leading_combinator_joins_directly() {
        assert_eq!(resolve("> .b", ".a").unwrap(), ".a > .b");
    }

    #[test]
    fn test_suffix_applies_to_each_parent() {
        assert_eq!(resolve("&-c", ".a, .b").unwrap(), ".a-c, .b-c");
        assert_eq!(resolve("&__icon", ".x .button").unwrap(), ".x .button__icon");
    }

    #[test]
    fn test_simples_merge_into_the_parent_compound() {
        assert_eq!(resolve("&:hover", ".a").unwrap(), ".a:hover");
        assert_eq!(resolve("span&", ".a").unwrap(), "span.a");
        assert_eq!(resolve(".b &", ".a").unwrap(), ".b .a");
    }

    #[test]
    fn test_multiple_positions_multiply() {
        assert_eq!(
            resolve("& + &", ".a, .b").unwrap(),
            ".a + .a, .a + .b, .b + .a, .b + .b"
        );
    }

    #[test]
    fn test_lists_with_parent_refs_are_parent_major() {
        assert_eq!(resolve("&-c, &-d", ".a, .b").unwrap(), ".a-c, .a-d, .b-c, .b-d");
        assert_eq!(
            resolve("&:hover, .x", ".a, .b").unwrap(),
            ".a:hover, .a .x, .b:hover, .b .x"
        );
    }

    #[test]
    fn test_parent_inside_selector_pseudo() {
        assert_eq!(resolve(".b:not(&)", ".a").unwrap(), ".b:not(.a)");
        assert_eq!(resolve("&:not(.c)", ".a").unwrap(), ".a:not(.c)");
    }

    #[test]
    fn test_top_level_parent_is_an_error() {
        let list = parse_selector("&.a").unwrap();
        assert_eq!(
            resolve_parent(&list, None).unwrap_err().to_string(),
            "Top-level selectors may not contain a parent selector reference."
        );
    }

    #[test]
    fn test_invalid_suffix() {
        assert_eq!(
            resolve("&-c", ".a:hover").unwrap_err().to_string(),
            "Invalid parent selector suffix \"-c\" for .a:hover"
        );
    }

    #[test]
    fn test_scope_pseudos_are_replaced() {
        let options = ReduceOptions::default().hashed();
        let mut namer = ClassNamer::new(Path::new("/a.kiln"), &options);
        let list = parse_selector(":global(.reset) .button").unwrap();
        let scoped = scope_classes(&list, &mut namer).unwrap().to_string();
        assert!(scoped.starts_with(".reset .button_"), "{}", scoped);
    }
}
