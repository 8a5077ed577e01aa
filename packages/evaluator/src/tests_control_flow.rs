//! `@if`, `@each`, mixins and `@content`.

use crate::*;
use kiln_ast::{ParseResult, TreeBuilder};
use pretty_assertions::assert_eq;

fn reduce<F>(build: F) -> Result<ReducedFile, CompileError>
where
    F: FnOnce(&mut TreeBuilder) -> ParseResult<()>,
{
    let mut builder = TreeBuilder::new();
    build(&mut builder).unwrap();
    let registry = StaticRegistry::new();
    Reducer::new("/flow.kiln", builder.finish(), &registry).reduce()
}

fn css<F>(build: F) -> String
where
    F: FnOnce(&mut TreeBuilder) -> ParseResult<()>,
{
    reduce(build).unwrap().css()
}

#[test]
fn test_if_compares_across_units() {
    let out = css(|b| {
        b.rule(".a", |b| {
            b.if_("1in == 96px", |b| {
                b.decl("color", "blue")?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(out, ".a {\n  color: blue;\n}\n");
}

#[test]
fn test_else_chain_takes_first_true_branch() {
    let out = css(|b| {
        b.var("size", "3")?;
        b.rule(".a", |b| {
            b.if_("$size < 2", |b| {
                b.decl("width", "small")?;
                Ok(())
            })?;
            b.comment("between branches");
            b.else_if("$size < 5", |b| {
                b.decl("width", "medium")?;
                Ok(())
            })?;
            b.else_(|b| {
                b.decl("width", "large")?;
                Ok(())
            })?;
            b.decl("height", "auto")?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(out, ".a {\n  width: medium;\n  height: auto;\n}\n");
}

#[test]
fn test_if_without_match_emits_nothing() {
    let out = css(|b| {
        b.rule(".a", |b| {
            b.decl("color", "red")?;
            b.if_("false", |b| {
                b.decl("color", "blue")?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(out, ".a {\n  color: red;\n}\n");
}

#[test]
fn test_unitless_number_equals_dimension() {
    let out = css(|b| {
        b.rule(".a", |b| {
            b.if_("1px == 1", |b| {
                b.decl("eq", "yes")?;
                Ok(())
            })?;
            b.else_(|b| {
                b.decl("eq", "no")?;
                Ok(())
            })?;
            b.if_("1px <= 1 and 1px >= 1", |b| {
                b.decl("between", "yes")?;
                Ok(())
            })?;
            b.if_("2 != 1px", |b| {
                b.decl("ne", "yes")?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(out, ".a {\n  eq: yes;\n  between: yes;\n  ne: yes;\n}\n");
}

#[test]
fn test_later_guards_are_skipped_once_a_branch_fires() {
    let out = css(|b| {
        b.rule(".a", |b| {
            b.if_("true", |b| {
                b.decl("c", "1")?;
                Ok(())
            })?;
            b.else_if("$nope > 1", |b| {
                b.decl("c", "2")?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(out, ".a {\n  c: 1;\n}\n");
}

#[test]
fn test_branch_bindings_stay_in_the_branch() {
    let err = reduce(|b| {
        b.rule(".a", |b| {
            b.if_("true", |b| {
                b.var("inner", "1px")?;
                Ok(())
            })?;
            b.decl("width", "$inner")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.message(), "Undefined variable $inner");
}

#[test]
fn test_stray_else_is_an_error() {
    let err = reduce(|b| {
        b.rule(".a", |b| {
            b.decl("color", "red")?;
            b.else_(|b| {
                b.decl("color", "blue")?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.message(), "@else must follow an @if");
    assert_eq!(err.kind(), ErrorKind::Syntax);
}

#[test]
fn test_each_unrolls_in_order() {
    let out = css(|b| {
        b.rule(".a", |b| {
            b.each(&["$i"], "list(1, 2, 3)", |b| {
                b.decl("order", "$i")?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(out, ".a {\n  order: 1;\n  order: 2;\n  order: 3;\n}\n");
}

#[test]
fn test_each_binding_does_not_leak() {
    let err = reduce(|b| {
        b.rule(".a", |b| {
            b.each(&["$i"], "list(1, 2, 3)", |b| {
                b.decl("order", "$i")?;
                Ok(())
            })?;
            b.decl("width", "$i")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
    assert_eq!(err.message(), "Undefined variable $i");
}

#[test]
fn test_each_destructures_maps() {
    let out = css(|b| {
        b.rule(":root", |b| {
            b.each(&["$name", "$value"], "(primary: red, accent: blue)", |b| {
                b.decl("--#{$name}", "$value")?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(out, ":root {\n  --primary: red;\n  --accent: blue;\n}\n");
}

#[test]
fn test_each_with_nested_rules() {
    let out = css(|b| {
        b.rule(".grid", |b| {
            b.each(&["$n"], "1 2", |b| {
                b.rule(".col", |b| {
                    b.decl("flex", "$n")?;
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
        ".grid .col {\n  flex: 1;\n}\n.grid .col {\n  flex: 2;\n}\n"
    );
}

#[test]
fn test_reduced_tree_holds_only_reachable_nodes() {
    let reduced = reduce(|b| {
        b.rule(".grid", |b| {
            b.each(&["$n"], "1 2 3", |b| {
                b.rule(".col", |b| {
                    b.decl("flex", "$n")?;
                    Ok(())
                })?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap();
    let tree = &reduced.tree;
    assert_eq!(tree.len(), tree.descendants(tree.root()).len());
}

#[test]
fn test_each_requires_a_list() {
    let err = reduce(|b| {
        b.each(&["$i"], "5", |_| Ok(()))?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.message(), "`5` is not iterable");
    assert_eq!(err.kind(), ErrorKind::Type);
}

#[test]
fn test_each_destructuring_needs_enough_values() {
    let err = reduce(|b| {
        b.each(&["$a", "$b", "$c"], "1 2, 3 4", |_| Ok(()))?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.message(), "`1 2` does not have 3 values to destructure");
    assert_eq!(err.kind(), ErrorKind::Arity);
}

#[test]
fn test_mixin_defaults_see_earlier_parameters() {
    let out = css(|b| {
        b.mixin("pad", "$x, $y: $x", |b| {
            b.decl("padding", "$y $x")?;
            Ok(())
        })?;
        b.rule(".a", |b| {
            b.include("pad", "1px")?;
            Ok(())
        })?;
        b.rule(".b", |b| {
            b.include("pad", "$y: 3px, $x: 1px")?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(
        out,
        ".a {\n  padding: 1px 1px;\n}\n.b {\n  padding: 3px 1px;\n}\n"
    );
}

#[test]
fn test_mixin_rest_parameter_collects_a_comma_list() {
    let out = css(|b| {
        b.mixin("shadows", "$layers...", |b| {
            b.decl("box-shadow", "$layers")?;
            Ok(())
        })?;
        b.rule(".a", |b| {
            b.include("shadows", "0 1px red, 0 2px blue")?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(out, ".a {\n  box-shadow: 0 1px red, 0 2px blue;\n}\n");
}

#[test]
fn test_content_block_is_placed_in_the_mixin() {
    let out = css(|b| {
        b.mixin("hover", "", |b| {
            b.rule("&:hover", |b| {
                b.content()?;
                Ok(())
            })?;
            Ok(())
        })?;
        b.rule(".a", |b| {
            b.var("tone", "green")?;
            b.include_with_content("hover", "", |b| {
                b.decl("color", "$tone")?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(out, ".a:hover {\n  color: green;\n}\n");
}

#[test]
fn test_content_without_block_is_empty() {
    let out = css(|b| {
        b.mixin("base", "", |b| {
            b.decl("color", "red")?;
            b.content()?;
            Ok(())
        })?;
        b.rule(".a", |b| {
            b.include("base", "")?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(out, ".a {\n  color: red;\n}\n");
}

#[test]
fn test_mixin_emitting_top_level_rules() {
    let out = css(|b| {
        b.mixin("theme", "$accent", |b| {
            b.rule(".btn", |b| {
                b.decl("color", "$accent")?;
                Ok(())
            })?;
            Ok(())
        })?;
        b.include("theme", "teal")?;
        Ok(())
    });
    assert_eq!(out, ".btn {\n  color: teal;\n}\n");
}

#[test]
fn test_mixin_body_does_not_see_caller_bindings() {
    let err = reduce(|b| {
        b.mixin("m", "", |b| {
            b.decl("color", "$tone")?;
            Ok(())
        })?;
        b.rule(".a", |b| {
            b.var("tone", "red")?;
            b.include("m", "")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.message(), "Undefined variable $tone");
}

#[test]
fn test_content_outside_mixin() {
    let err = reduce(|b| {
        b.rule(".a", |b| {
            b.content()?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.message(), "@content is only allowed within mixin bodies");
}

#[test]
fn test_runaway_mixin_recursion() {
    let err = reduce(|b| {
        b.mixin("forever", "", |b| {
            b.include("forever", "")?;
            Ok(())
        })?;
        b.rule(".a", |b| {
            b.include("forever", "")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(
        err.message(),
        "Maximum mixin nesting depth exceeded while including forever"
    );
}

#[test]
fn test_missing_mixin_argument() {
    let err = reduce(|b| {
        b.mixin("pad", "$x", |b| {
            b.decl("padding", "$x")?;
            Ok(())
        })?;
        b.rule(".a", |b| {
            b.include("pad", "")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.message(), "Missing argument $x");
    assert_eq!(err.kind(), ErrorKind::Arity);
}

#[test]
fn test_redefinition_in_one_scope() {
    let err = reduce(|b| {
        b.var("foo", "1")?;
        b.var("foo", "2")?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Redefinition);
    assert_eq!(err.message(), "$foo has already been defined in this scope");
}

#[test]
fn test_shadowing_in_a_nested_block() {
    let out = css(|b| {
        b.var("x", "1px")?;
        b.rule(".a", |b| {
            b.var("x", "2px")?;
            b.decl("width", "$x")?;
            Ok(())
        })?;
        b.rule(".b", |b| {
            b.decl("width", "$x")?;
            Ok(())
        })?;
        Ok(())
    });
    assert_eq!(out, ".a {\n  width: 2px;\n}\n.b {\n  width: 1px;\n}\n");
}
