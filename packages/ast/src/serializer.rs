use crate::expr::Argument;
use crate::node::NodeKind;
use crate::tree::{NodeId, Tree};

/// Serializer converts a tree back to stylesheet text.
///
/// Reduced trees contain only rules, declarations, comments and at-rules and
/// render as plain CSS. Unreduced nodes render in source form so that a
/// diagnostic can quote them.
pub struct Serializer {
    indent_level: usize,
    indent_string: String,
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            indent_string: "  ".to_string(),
        }
    }

    pub fn with_indent(indent: &str) -> Self {
        Self {
            indent_level: 0,
            indent_string: indent.to_string(),
        }
    }

    /// Serialize a whole tree.
    pub fn serialize(&mut self, tree: &Tree) -> String {
        let mut output = String::new();
        for child in tree.children(tree.root()) {
            self.serialize_node(tree, *child, &mut output);
        }
        output
    }

    /// Serialize one node and its block.
    pub fn serialize_node(&mut self, tree: &Tree, id: NodeId, output: &mut String) {
        let Ok(kind) = tree.kind(id) else {
            return;
        };
        if let NodeKind::Root = kind {
            for child in tree.children(id) {
                self.serialize_node(tree, *child, output);
            }
            return;
        }
        self.write_indent(output);
        output.push_str(&header(kind));
        let has_block = kind.is_container() && !matches!(kind, NodeKind::Include { has_content: false, .. });
        if has_block {
            output.push_str(" {\n");
            self.indent_level += 1;
            for child in tree.children(id) {
                self.serialize_node(tree, *child, output);
            }
            self.indent_level -= 1;
            self.write_indent(output);
            output.push_str("}\n");
        } else if matches!(kind, NodeKind::Comment { .. }) {
            output.push('\n');
        } else {
            output.push_str(";\n");
        }
    }

    fn write_indent(&self, output: &mut String) {
        for _ in 0..self.indent_level {
            output.push_str(&self.indent_string);
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to serialize a tree.
pub fn serialize(tree: &Tree) -> String {
    Serializer::new().serialize(tree)
}

/// Single-line source form of a node without its block, used as the
/// excerpt of a diagnostic.
pub fn excerpt(tree: &Tree, id: NodeId) -> String {
    tree.kind(id).map(header).unwrap_or_default()
}

fn arguments(args: &[Argument]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn header(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Root => String::new(),
        NodeKind::Rule { selector } => selector.to_string(),
        NodeKind::Declaration {
            property,
            value,
            important,
        } => {
            let mut out = format!("{}: {}", property, value);
            if *important {
                out.push_str(" !important");
            }
            out
        }
        NodeKind::VariableDecl {
            name,
            value,
            exported,
            default,
        } => {
            let mut out = String::new();
            if *exported {
                out.push_str("@export ");
            }
            out.push_str(&format!("${}: {}", name, value));
            if *default {
                out.push_str(" !default");
            }
            out
        }
        NodeKind::Comment { text } => format!("/* {} */", text.trim()),
        NodeKind::If { condition } => format!("@if {}", condition),
        NodeKind::Else { condition: Some(condition) } => format!("@else if {}", condition),
        NodeKind::Else { condition: None } => "@else".to_string(),
        NodeKind::Each { names, iterable } => {
            let names = names
                .iter()
                .map(|n| format!("${}", n))
                .collect::<Vec<_>>()
                .join(", ");
            format!("@each {} in {}", names, iterable)
        }
        NodeKind::Mixin {
            name,
            params,
            exported,
        } => {
            let prefix = if *exported { "@export " } else { "" };
            if params.params.is_empty() && params.rest.is_none() {
                format!("{}@mixin {}", prefix, name)
            } else {
                format!("{}@mixin {}({})", prefix, name, params)
            }
        }
        NodeKind::Include { name, args, .. } => {
            if args.is_empty() {
                format!("@include {}", name)
            } else {
                format!("@include {}({})", name, arguments(args))
            }
        }
        NodeKind::Content => "@content".to_string(),
        NodeKind::Import { specifier, clause } => match clause {
            crate::node::ImportClause::Namespace(_) => {
                format!("@import \"{}\" {}", specifier, clause)
            }
            _ => format!("@import {} from \"{}\"", clause, specifier),
        },
        NodeKind::Export { clause } => format!("@export {}", clause),
        NodeKind::AtRule { name, params, .. } => {
            if params.is_empty() {
                format!("@{}", name)
            } else {
                format!("@{} {}", name, params)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TreeBuilder;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_serialize_plain_rules() {
        let tree = TreeBuilder::new()
            .rule(".a .b", |b| {
                b.decl("color", "red")?;
                b.decl_important("margin", "0 auto")?;
                Ok(())
            })
            .unwrap()
            .comment("done")
            .finish();
        assert_eq!(
            serialize(&tree),
            ".a .b {\n  color: red;\n  margin: 0 auto !important;\n}\n/* done */\n"
        );
    }

    #[test]
    fn test_serialize_at_rules() {
        let tree = TreeBuilder::new()
            .at_rule_statement("charset", "\"utf-8\"")
            .unwrap()
            .at_rule("media", "screen", |b| {
                b.rule(".a", |b| {
                    b.decl("c", "d")?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap()
            .finish();
        assert_eq!(
            serialize(&tree),
            "@charset \"utf-8\";\n@media screen {\n  .a {\n    c: d;\n  }\n}\n"
        );
    }

    #[test]
    fn test_excerpt_of_source_nodes() {
        let mut builder = TreeBuilder::new();
        builder.include("button", "1px, $size: 2px").unwrap();
        builder.var("gap", "$base * 2").unwrap();
        let tree = builder.finish();
        let children = tree.children(tree.root()).to_vec();
        assert_eq!(excerpt(&tree, children[0]), "@include button(1px, $size: 2px)");
        assert_eq!(excerpt(&tree, children[1]), "$gap: $base * 2");
    }

    #[test]
    fn test_custom_indent() {
        let tree = TreeBuilder::new()
            .rule("a", |b| {
                b.decl("x", "y")?;
                Ok(())
            })
            .unwrap()
            .finish();
        let mut serializer = Serializer::with_indent("\t");
        assert_eq!(serializer.serialize(&tree), "a {\n\tx: y;\n}\n");
    }
}
