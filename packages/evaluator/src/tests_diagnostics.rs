//! Diagnostics at the file boundary: messages, kinds, locations, excerpts.

use crate::*;
use kiln_ast::{
    parse_selector, ComplexSelector, CompoundSelector, NodeKind, ParseResult, PseudoArgument,
    PseudoSelector, SelectorList, SimpleSelector, TreeBuilder,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

fn fail<F>(build: F) -> CompileError
where
    F: FnOnce(&mut TreeBuilder) -> ParseResult<()>,
{
    let mut builder = TreeBuilder::new();
    build(&mut builder).unwrap();
    let registry = StaticRegistry::new();
    Reducer::new("/diag.kiln", builder.finish(), &registry)
        .reduce()
        .unwrap_err()
}

#[test]
fn test_error_carries_location_and_excerpt() {
    let err = fail(|b| {
        b.rule(".a", |b| {
            b.at(2, 3).decl("width", "calc(100vh * 1px)")?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(err.kind(), ErrorKind::Type);
    assert_eq!(err.file, Some(PathBuf::from("/diag.kiln")));
    assert_eq!(err.location.map(|l| (l.line, l.column)), Some((2, 3)));
    assert_eq!(err.excerpt.as_deref(), Some("width: calc(100vh * 1px)"));
    assert_eq!(
        err.report(),
        "Cannot multiply 100vh by 1px because both terms contain units\n  \
         at /diag.kiln:2:3\n  > width: calc(100vh * 1px)"
    );
}

#[test]
fn test_error_inside_mixin_points_at_the_body() {
    let err = fail(|b| {
        b.mixin("m", "", |b| {
            b.at(7, 5).decl("color", "$missing")?;
            Ok(())
        })?;
        b.rule(".a", |b| {
            b.at(10, 3).include("m", "")?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(err.message(), "Undefined variable $missing");
    assert_eq!(err.location.map(|l| (l.line, l.column)), Some((7, 5)));
    assert_eq!(err.excerpt.as_deref(), Some("color: $missing"));
}

#[test]
fn test_scope_pseudo_with_two_selectors() {
    assert_eq!(
        parse_selector(":global(.foo, .bar)").unwrap_err().to_string(),
        "Scope pseudo selectors must contain one selector"
    );

    let pseudo = PseudoSelector {
        name: "global".to_string(),
        element: false,
        argument: Some(PseudoArgument::Selector(parse_selector(".foo, .bar").unwrap())),
    };
    let selector = SelectorList::new(vec![ComplexSelector::compound(CompoundSelector::new(
        vec![SimpleSelector::Pseudo(pseudo)],
    ))]);
    let err = fail(|b| {
        b.node(NodeKind::Rule { selector })?;
        Ok(())
    });
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert_eq!(err.message(), "Scope pseudo selectors must contain one selector");
}

#[test]
fn test_top_level_parent_reference() {
    let err = fail(|b| {
        b.rule("&.a", |b| {
            b.decl("color", "red")?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(
        err.message(),
        "Top-level selectors may not contain a parent selector reference."
    );
    assert_eq!(err.excerpt.as_deref(), Some("&.a"));
}

#[test]
fn test_argument_binding_errors() {
    let with_include = |args: &'static str| {
        fail(move |b| {
            b.mixin("pad", "$x", |b| {
                b.decl("padding", "$x")?;
                Ok(())
            })?;
            b.rule(".a", |b| {
                b.include("pad", args)?;
                Ok(())
            })?;
            Ok(())
        })
    };
    assert_eq!(
        with_include("1px, $x: 2px").message(),
        "Parameter $x was passed both by position and by name"
    );
    assert_eq!(
        with_include("1px, 2px").message(),
        "Only 1 arguments allowed, but 2 were passed"
    );
    assert_eq!(with_include("$y: 1px").message(), "No parameter named $y");
    assert_eq!(
        with_include("$x: 1px, $x: 2px").message(),
        "Parameter $x was passed more than once by name"
    );
}

#[test]
fn test_undefined_mixin() {
    let err = fail(|b| {
        b.include("nothing", "")?;
        Ok(())
    });
    assert_eq!(err.message(), "Undefined mixin nothing");
    assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
}

#[test]
fn test_native_argument_type() {
    let err = fail(|b| {
        b.import_namespace("math", "math")?;
        b.rule(".a", |b| {
            b.decl("width", "math.sqrt(4px)")?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(err.message(), "$number: 4px is not unitless");
}

#[test]
fn test_ordering_non_numbers() {
    let err = fail(|b| {
        b.if_("a < 1", |_| Ok(()))?;
        Ok(())
    });
    assert_eq!(err.message(), "a and 1 are not numerical and cannot be compared");
    assert_eq!(err.excerpt.as_deref(), Some("@if a < 1"));
}

#[test]
fn test_composes_needs_a_single_class_rule() {
    let err = fail(|b| {
        b.rule(".a", |b| {
            b.rule(".b", |b| {
                b.decl("composes", "c")?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(
        err.message(),
        "composes is only allowed in a rule with a single class selector"
    );
}

#[test]
fn test_composed_class_must_exist() {
    let err = fail(|b| {
        b.rule(".a", |b| {
            b.decl("composes", "ghost")?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(err.message(), "Undefined class ghost in composes");
    assert_eq!(err.location, None);
}
