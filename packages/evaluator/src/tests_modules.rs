//! Imports, exports, forwarding and built-in modules.

use crate::*;
use kiln_ast::{ParseResult, TreeBuilder};
use pretty_assertions::assert_eq;
use std::path::Path;

const THEME: &str = "/styles/theme.kiln";

fn reduce_file<F>(file: &str, registry: &StaticRegistry, build: F) -> Result<ReducedFile, CompileError>
where
    F: FnOnce(&mut TreeBuilder) -> ParseResult<()>,
{
    let mut builder = TreeBuilder::new();
    build(&mut builder).unwrap();
    Reducer::new(file, builder.finish(), registry).reduce()
}

/// Registry holding `/styles/theme.kiln`.
fn with_theme() -> StaticRegistry {
    let mut registry = StaticRegistry::new();
    let theme = reduce_file(THEME, &registry, |b| {
        b.export_var("primary", "#336699")?;
        b.var("private", "1px")?;
        b.export_mixin("button", "$pad: 4px", |b| {
            b.decl("padding", "$pad")?;
            b.decl("color", "$primary")?;
            Ok(())
        })?;
        b.rule(".base", |b| {
            b.decl("margin", "0")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap();
    registry.insert(theme.members);
    registry
}

fn app<F>(registry: &StaticRegistry, build: F) -> Result<ReducedFile, CompileError>
where
    F: FnOnce(&mut TreeBuilder) -> ParseResult<()>,
{
    reduce_file("/styles/app.kiln", registry, build)
}

#[test]
fn test_named_import_with_alias() {
    let registry = with_theme();
    let out = app(&registry, |b| {
        b.import_named("./theme.kiln", &["$primary", "$primary as $brand"])?;
        b.rule(".a", |b| {
            b.decl("color", "$primary")?;
            b.decl("border-color", "$brand")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap();
    assert_eq!(
        out.css(),
        ".a {\n  color: #336699;\n  border-color: #336699;\n}\n"
    );
}

#[test]
fn test_namespace_import_of_variables_and_mixins() {
    let registry = with_theme();
    let out = app(&registry, |b| {
        b.import_namespace("./theme.kiln", "theme")?;
        b.rule(".a", |b| {
            b.include("theme.button", "8px")?;
            b.decl("outline-color", "theme.$primary")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap();
    assert_eq!(
        out.css(),
        ".a {\n  padding: 8px;\n  color: #336699;\n  outline-color: #336699;\n}\n"
    );
}

#[test]
fn test_glob_import() {
    let registry = with_theme();
    let out = app(&registry, |b| {
        b.import_glob("./theme.kiln")?;
        b.rule(".a", |b| {
            b.include("button", "")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap();
    assert_eq!(out.css(), ".a {\n  padding: 4px;\n  color: #336699;\n}\n");
}

#[test]
fn test_imported_members_keep_their_provenance() {
    let registry = with_theme();
    let mut builder = TreeBuilder::new();
    builder.import_glob("./theme.kiln").unwrap();
    builder.export_names(&["$primary"]).unwrap();
    let out = Reducer::new("/styles/app.kiln", builder.finish(), &registry)
        .reduce()
        .unwrap();
    assert_eq!(
        out.members.get("$primary").unwrap().provenance(),
        Some(Path::new(THEME))
    );
}

#[test]
fn test_private_bindings_are_not_exported() {
    let registry = with_theme();
    let err = app(&registry, |b| {
        b.import_named("./theme.kiln", &["$private"])?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.message(), "./theme.kiln does not export $private");
    assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
}

#[test]
fn test_parent_relative_specifier() {
    let registry = with_theme();
    let out = reduce_file("/styles/pages/home.kiln", &registry, |b| {
        b.import_named("../theme.kiln", &["$primary"])?;
        b.rule(".hero", |b| {
            b.decl("background", "$primary")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap();
    assert_eq!(out.css(), ".hero {\n  background: #336699;\n}\n");
}

#[test]
fn test_unknown_module() {
    let err = app(&StaticRegistry::new(), |b| {
        b.import_namespace("nope", "nope")?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.message(), "Unknown module nope");
}

#[test]
fn test_builtin_modules() {
    let out = app(&StaticRegistry::new(), |b| {
        b.import_namespace("math", "math")?;
        b.import_named("math", &["floor"])?;
        b.import_namespace("color", "color")?;
        b.rule(".a", |b| {
            b.decl("width", "math.round(1.6px)")?;
            b.decl("z-index", "floor(2.7)")?;
            b.decl("opacity", "color.alpha(color.rgba(#000, 0.5))")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap();
    assert_eq!(
        out.css(),
        ".a {\n  width: 2px;\n  z-index: 2;\n  opacity: 0.5;\n}\n"
    );
}

#[test]
fn test_builtins_need_an_import() {
    let err = app(&StaticRegistry::new(), |b| {
        b.rule(".a", |b| {
            b.decl("width", "math.round(1.6px)")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.message(), "Undefined function math.round");
}

#[test]
fn test_export_names_with_alias() {
    let out = app(&StaticRegistry::new(), |b| {
        b.var("gap", "4px")?;
        b.export_names(&["$gap", "$gap as $spacing"])?;
        Ok(())
    })
    .unwrap();
    let members = &out.members;
    let gap = members.get("$gap").and_then(Member::as_variable).unwrap();
    assert_eq!(gap.to_string(), "4px");
    assert!(members.get("$spacing").is_some());
}

#[test]
fn test_export_of_unbound_name() {
    let err = app(&StaticRegistry::new(), |b| {
        b.export_names(&["$nope"])?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.message(), "Cannot export $nope because it is not defined");
}

#[test]
fn test_export_inside_a_block() {
    let err = app(&StaticRegistry::new(), |b| {
        b.rule(".a", |b| {
            b.export_var("gap", "1px")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.message(), "@export is only allowed at the top level");
}

#[test]
fn test_forwarding_everything() {
    let mut registry = with_theme();
    let index = reduce_file("/styles/index.kiln", &registry, |b| {
        b.export_forward("./theme.kiln", None)?;
        Ok(())
    })
    .unwrap();
    assert!(index.members.get("button").is_some());
    assert_eq!(
        index.members.get("$primary").unwrap().provenance(),
        Some(Path::new(THEME))
    );
    registry.insert(index.members);

    let out = app(&registry, |b| {
        b.import_named("./index.kiln", &["button"])?;
        b.rule(".a", |b| {
            b.include("button", "$pad: 2px")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap();
    assert_eq!(out.css(), ".a {\n  padding: 2px;\n  color: #336699;\n}\n");
}

#[test]
fn test_forwarding_selected_names() {
    let registry = with_theme();
    let index = reduce_file("/styles/index.kiln", &registry, |b| {
        b.export_forward("./theme.kiln", Some(&["$primary as $brand"][..]))?;
        Ok(())
    })
    .unwrap();
    assert!(index.members.get("$brand").is_some());
    assert!(index.members.get("$primary").is_none());
    assert!(index.members.get("button").is_none());
}

#[test]
fn test_composes_from_another_file() {
    let registry = with_theme();
    let out = app(&registry, |b| {
        b.rule(".button", |b| {
            b.decl("composes", "base from \"./theme.kiln\"")?;
            b.decl("color", "red")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap();
    assert_eq!(
        out.members.class("button").unwrap(),
        &["button".to_string(), "base".to_string()]
    );

    let err = app(&registry, |b| {
        b.rule(".button", |b| {
            b.decl("composes", "missing from \"./theme.kiln\"")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.message(), "./theme.kiln does not export missing");
}
