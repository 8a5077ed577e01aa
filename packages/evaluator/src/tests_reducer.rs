//! Flattening, selectors, declarations and class scoping.

use crate::*;
use kiln_ast::{ParseResult, TreeBuilder};
use pretty_assertions::assert_eq;

fn reduce_with<F>(options: ReduceOptions, build: F) -> Result<ReducedFile, CompileError>
where
    F: FnOnce(&mut TreeBuilder) -> ParseResult<()>,
{
    let mut builder = TreeBuilder::new();
    build(&mut builder).unwrap();
    let registry = StaticRegistry::new();
    Reducer::new("/test.kiln", builder.finish(), &registry)
        .with_options(options)
        .reduce()
}

fn css<F>(build: F) -> String
where
    F: FnOnce(&mut TreeBuilder) -> ParseResult<()>,
{
    reduce_with(ReduceOptions::default(), build).unwrap().css()
}

#[test]
fn test_nested_rule_becomes_descendant() {
    let out = css(|b| {
        b.rule(".a", |b| {
            b.rule(".b", |b| {
                b.decl("c", "c")?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(out, ".a .b {\n  c: c;\n}\n");
}

#[test]
fn test_parent_suffix_applies_to_every_parent() {
    let out = css(|b| {
        b.rule(".a, .b", |b| {
            b.rule("&-c", |b| {
                b.decl("d", "d")?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(out, ".a-c, .b-c {\n  d: d;\n}\n");
}

#[test]
fn test_parent_keeps_its_declarations_before_hoisted_children() {
    let out = css(|b| {
        b.rule(".card", |b| {
            b.decl("color", "red")?;
            b.rule("&:hover", |b| {
                b.decl("color", "blue")?;
                Ok(())
            })?;
            b.rule("> .title", |b| {
                b.decl("margin", "0")?;
                Ok(())
            })?;
            b.decl("padding", "1px")?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(
        out,
        ".card {\n  color: red;\n  padding: 1px;\n}\n\
         .card:hover {\n  color: blue;\n}\n\
         .card > .title {\n  margin: 0;\n}\n"
    );
}

#[test]
fn test_media_inside_rule_wraps_declarations() {
    let out = css(|b| {
        b.rule(".a", |b| {
            b.decl("color", "red")?;
            b.at_rule("media", "screen", |b| {
                b.decl("color", "blue")?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(
        out,
        ".a {\n  color: red;\n}\n@media screen {\n  .a {\n    color: blue;\n  }\n}\n"
    );
}

#[test]
fn test_rules_inside_media_keep_the_outer_parent() {
    let out = css(|b| {
        b.rule(".a", |b| {
            b.at_rule("media", "print", |b| {
                b.rule(".b", |b| {
                    b.decl("display", "none")?;
                    Ok(())
                })?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(out, "@media print {\n  .a .b {\n    display: none;\n  }\n}\n");
}

#[test]
fn test_keyframes_are_never_prefixed() {
    let out = css(|b| {
        b.rule(".spinner", |b| {
            b.at_rule("keyframes", "spin", |b| {
                b.rule("from", |b| {
                    b.decl("opacity", "0")?;
                    Ok(())
                })?;
                b.rule("to", |b| {
                    b.decl("opacity", "1")?;
                    Ok(())
                })?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(
        out,
        "@keyframes spin {\n  from {\n    opacity: 0;\n  }\n  to {\n    opacity: 1;\n  }\n}\n"
    );
}

#[test]
fn test_empty_rules_and_at_rules_are_dropped() {
    let out = css(|b| {
        b.rule(".empty", |_| Ok(()))?;
        b.at_rule("media", "screen", |b| {
            b.rule(".also-empty", |_| Ok(()))?;
            Ok(())
        })?;
        b.at_rule_statement("charset", "\"utf-8\"")?;
        Ok(())
    });
    assert_eq!(out, "@charset \"utf-8\";\n");
}

#[test]
fn test_null_values_are_removed() {
    let out = css(|b| {
        b.var("accent", "null")?;
        b.rule(".a", |b| {
            b.decl("color", "$accent")?;
            b.decl("margin", "1px null 2px")?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(out, ".a {\n  margin: 1px 2px;\n}\n");
}

#[test]
fn test_variables_and_arithmetic_in_declarations() {
    let out = css(|b| {
        b.var("gap", "4px")?;
        b.var("half", "$gap / 2")?;
        b.rule(".a", |b| {
            b.decl("margin", "$gap * 2 $half")?;
            b.decl("width", "calc(100% - $gap)")?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(out, ".a {\n  margin: 8px 2px;\n  width: calc(100% - 4px);\n}\n");
}

#[test]
fn test_interpolated_property_and_params() {
    let out = css(|b| {
        b.var("side", "left")?;
        b.var("breakpoint", "600px")?;
        b.rule(".a", |b| {
            b.decl("margin-#{$side}", "1px")?;
            Ok(())
        })?;
        b.at_rule("media", "(min-width: #{$breakpoint})", |b| {
            b.rule(".b", |b| {
                b.decl("float", "#{$side}")?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(
        out,
        ".a {\n  margin-left: 1px;\n}\n\
         @media (min-width: 600px) {\n  .b {\n    float: left;\n  }\n}\n"
    );
}

#[test]
fn test_default_variables_keep_existing_values() {
    let out = css(|b| {
        b.var("color", "red")?;
        b.default_var("color", "blue")?;
        b.default_var("size", "2px")?;
        b.rule(".a", |b| {
            b.decl("color", "$color")?;
            b.decl("border-width", "$size")?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(out, ".a {\n  color: red;\n  border-width: 2px;\n}\n");
}

#[test]
fn test_comments_are_kept_in_place() {
    let out = css(|b| {
        b.comment("header");
        b.rule(".a", |b| {
            b.comment("inside");
            b.decl("color", "red")?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(out, "/* header */\n.a {\n  /* inside */\n  color: red;\n}\n");
}

#[test]
fn test_local_classes_are_hashed_and_exported() {
    let file = reduce_with(ReduceOptions::default().hashed(), |b| {
        b.rule(".button", |b| {
            b.decl("color", "red")?;
            Ok(())
        })?;
        b.rule(":global(.reset) .button", |b| {
            b.decl("margin", "0")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap();

    let generated = file.members.class("button").unwrap()[0].clone();
    assert!(generated.starts_with("button_"), "{}", generated);
    assert_eq!(
        file.css(),
        format!(
            ".{g} {{\n  color: red;\n}}\n.reset .{g} {{\n  margin: 0;\n}}\n",
            g = generated
        )
    );
    assert!(file.members.class("reset").is_none());
}

#[test]
fn test_global_scope_leaves_classes_alone() {
    let options = ReduceOptions {
        class_scope: ClassScope::Global,
        ..ReduceOptions::default().hashed()
    };
    let file = reduce_with(options, |b| {
        b.rule(".plain", |b| {
            b.decl("color", "red")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap();
    assert_eq!(file.css(), ".plain {\n  color: red;\n}\n");
    assert!(file.members.classes().is_empty());
}

#[test]
fn test_composes_records_classes_and_is_removed() {
    let file = reduce_with(ReduceOptions::default(), |b| {
        b.rule(".base", |b| {
            b.decl("color", "red")?;
            Ok(())
        })?;
        b.rule(".button", |b| {
            b.decl("composes", "base")?;
            b.decl("composes", "reset from global")?;
            b.decl("color", "blue")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap();
    assert_eq!(
        file.members.class("button").unwrap(),
        &["button".to_string(), "base".to_string(), "reset".to_string()]
    );
    assert_eq!(
        file.css(),
        ".base {\n  color: red;\n}\n.button {\n  color: blue;\n}\n"
    );
}

#[test]
fn test_class_exports_serialize_to_json() {
    let file = reduce_with(ReduceOptions::default(), |b| {
        b.export_var("gap", "4px")?;
        b.rule(".card", |b| {
            b.decl("margin", "$gap")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap();
    let json = file.members.to_json();
    assert_eq!(json["classes"]["card"][0], "card");
    assert!(json["variables"].get("gap").is_some());
}
