//! Fluent construction of statement trees.
//!
//! The whole-stylesheet grammar lives upstream; this builder is how callers
//! and tests assemble the node shapes the reducer consumes. Values,
//! selectors and parameter lists are given as text and read with the value
//! and selector readers.

use crate::error::{ParseError, ParseResult};
use crate::expr::QualifiedName;
use crate::node::{ExportClause, ImportClause, MemberName, NodeKind};
use crate::selector_parser::parse_selector;
use crate::tree::{NodeId, SourceLocation, Tree};
use crate::value_parser::{parse_arguments, parse_parameters, parse_template, parse_value};

pub struct TreeBuilder {
    tree: Tree,
    stack: Vec<NodeId>,
    location: Option<SourceLocation>,
}

fn strip_dollar(name: &str) -> String {
    name.trim().trim_start_matches('$').to_string()
}

/// `a`, `$a`, `a as b`
fn member_name(text: &str) -> MemberName {
    match text.split_once(" as ") {
        Some((name, alias)) => MemberName::aliased(name.trim(), alias.trim()),
        None => MemberName::new(text.trim()),
    }
}

fn member_names(names: &[&str]) -> Vec<MemberName> {
    names.iter().map(|n| member_name(n)).collect()
}

impl TreeBuilder {
    pub fn new() -> Self {
        let tree = Tree::new();
        let root = tree.root();
        Self {
            tree,
            stack: vec![root],
            location: None,
        }
    }

    /// Take the built tree, leaving an empty one behind.
    pub fn finish(&mut self) -> Tree {
        self.stack.truncate(1);
        let tree = std::mem::take(&mut self.tree);
        self.stack[0] = self.tree.root();
        tree
    }

    /// Attach a source position to the next node.
    pub fn at(&mut self, line: u32, column: u32) -> &mut Self {
        self.location = Some(SourceLocation::new(line, column));
        self
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.tree.root())
    }

    fn push(&mut self, kind: NodeKind) -> ParseResult<NodeId> {
        let id = self.tree.alloc_at(kind, self.location.take());
        let parent = self.current();
        self.tree
            .append(parent, id)
            .map_err(|e| ParseError::invalid_syntax(0, e.to_string()))?;
        Ok(id)
    }

    fn block<F>(&mut self, kind: NodeKind, body: F) -> ParseResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> ParseResult<()>,
    {
        let id = self.push(kind)?;
        self.stack.push(id);
        let result = body(self);
        self.stack.pop();
        result?;
        Ok(self)
    }

    pub fn rule<F>(&mut self, selector: &str, body: F) -> ParseResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> ParseResult<()>,
    {
        let selector = parse_selector(selector)?;
        self.block(NodeKind::Rule { selector }, body)
    }

    fn declaration(&mut self, property: &str, value: &str, important: bool) -> ParseResult<&mut Self> {
        let kind = NodeKind::Declaration {
            property: parse_template(property)?,
            value: parse_value(value)?,
            important,
        };
        self.push(kind)?;
        Ok(self)
    }

    pub fn decl(&mut self, property: &str, value: &str) -> ParseResult<&mut Self> {
        self.declaration(property, value, false)
    }

    pub fn decl_important(&mut self, property: &str, value: &str) -> ParseResult<&mut Self> {
        self.declaration(property, value, true)
    }

    fn variable(&mut self, name: &str, value: &str, exported: bool, default: bool) -> ParseResult<&mut Self> {
        let kind = NodeKind::VariableDecl {
            name: strip_dollar(name),
            value: parse_value(value)?,
            exported,
            default,
        };
        self.push(kind)?;
        Ok(self)
    }

    pub fn var(&mut self, name: &str, value: &str) -> ParseResult<&mut Self> {
        self.variable(name, value, false, false)
    }

    /// `@export $name: value`
    pub fn export_var(&mut self, name: &str, value: &str) -> ParseResult<&mut Self> {
        self.variable(name, value, true, false)
    }

    /// `$name: value !default`
    pub fn default_var(&mut self, name: &str, value: &str) -> ParseResult<&mut Self> {
        self.variable(name, value, false, true)
    }

    pub fn comment(&mut self, text: &str) -> &mut Self {
        let id = self.tree.alloc_at(
            NodeKind::Comment {
                text: text.to_string(),
            },
            self.location.take(),
        );
        let parent = self.current();
        // The current node is always a container pushed by `block`.
        let _ = self.tree.append(parent, id);
        self
    }

    pub fn if_<F>(&mut self, condition: &str, body: F) -> ParseResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> ParseResult<()>,
    {
        let condition = parse_value(condition)?;
        self.block(NodeKind::If { condition }, body)
    }

    pub fn else_if<F>(&mut self, condition: &str, body: F) -> ParseResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> ParseResult<()>,
    {
        let condition = Some(parse_value(condition)?);
        self.block(NodeKind::Else { condition }, body)
    }

    pub fn else_<F>(&mut self, body: F) -> ParseResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> ParseResult<()>,
    {
        self.block(NodeKind::Else { condition: None }, body)
    }

    /// `@each $a, $b in iterable`
    pub fn each<F>(&mut self, names: &[&str], iterable: &str, body: F) -> ParseResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> ParseResult<()>,
    {
        let kind = NodeKind::Each {
            names: names.iter().map(|n| strip_dollar(n)).collect(),
            iterable: parse_value(iterable)?,
        };
        self.block(kind, body)
    }

    pub fn mixin<F>(&mut self, name: &str, params: &str, body: F) -> ParseResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> ParseResult<()>,
    {
        let kind = NodeKind::Mixin {
            name: name.to_string(),
            params: parse_parameters(params)?,
            exported: false,
        };
        self.block(kind, body)
    }

    /// `@export @mixin name(params)`
    pub fn export_mixin<F>(&mut self, name: &str, params: &str, body: F) -> ParseResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> ParseResult<()>,
    {
        let kind = NodeKind::Mixin {
            name: name.to_string(),
            params: parse_parameters(params)?,
            exported: true,
        };
        self.block(kind, body)
    }

    pub fn include(&mut self, name: &str, args: &str) -> ParseResult<&mut Self> {
        let kind = NodeKind::Include {
            name: QualifiedName::parse(name),
            args: parse_arguments(args)?,
            has_content: false,
        };
        self.push(kind)?;
        Ok(self)
    }

    pub fn include_with_content<F>(&mut self, name: &str, args: &str, body: F) -> ParseResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> ParseResult<()>,
    {
        let kind = NodeKind::Include {
            name: QualifiedName::parse(name),
            args: parse_arguments(args)?,
            has_content: true,
        };
        self.block(kind, body)
    }

    pub fn content(&mut self) -> ParseResult<&mut Self> {
        self.push(NodeKind::Content)?;
        Ok(self)
    }

    /// `@import $a, b as c from "specifier"`
    pub fn import_named(&mut self, specifier: &str, names: &[&str]) -> ParseResult<&mut Self> {
        self.push(NodeKind::Import {
            specifier: specifier.to_string(),
            clause: ImportClause::Named(member_names(names)),
        })?;
        Ok(self)
    }

    /// `@import "specifier" as namespace`
    pub fn import_namespace(&mut self, specifier: &str, namespace: &str) -> ParseResult<&mut Self> {
        self.push(NodeKind::Import {
            specifier: specifier.to_string(),
            clause: ImportClause::Namespace(namespace.to_string()),
        })?;
        Ok(self)
    }

    /// `@import * from "specifier"`
    pub fn import_glob(&mut self, specifier: &str) -> ParseResult<&mut Self> {
        self.push(NodeKind::Import {
            specifier: specifier.to_string(),
            clause: ImportClause::Glob,
        })?;
        Ok(self)
    }

    pub fn export_names(&mut self, names: &[&str]) -> ParseResult<&mut Self> {
        self.push(NodeKind::Export {
            clause: ExportClause::Names(member_names(names)),
        })?;
        Ok(self)
    }

    /// `@export * from "x"` when `names` is `None`.
    pub fn export_forward(&mut self, from: &str, names: Option<&[&str]>) -> ParseResult<&mut Self> {
        self.push(NodeKind::Export {
            clause: ExportClause::Forward {
                from: from.to_string(),
                names: names.map(member_names),
            },
        })?;
        Ok(self)
    }

    pub fn at_rule<F>(&mut self, name: &str, params: &str, body: F) -> ParseResult<&mut Self>
    where
        F: FnOnce(&mut Self) -> ParseResult<()>,
    {
        let kind = NodeKind::AtRule {
            name: name.to_string(),
            params: parse_template(params)?,
            has_block: true,
        };
        self.block(kind, body)
    }

    pub fn at_rule_statement(&mut self, name: &str, params: &str) -> ParseResult<&mut Self> {
        self.push(NodeKind::AtRule {
            name: name.to_string(),
            params: parse_template(params)?,
            has_block: false,
        })?;
        Ok(self)
    }

    /// Append an already-built node kind.
    pub fn node(&mut self, kind: NodeKind) -> ParseResult<&mut Self> {
        self.push(kind)?;
        Ok(self)
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    #[test]
    fn test_builder_nests_blocks() {
        let tree = TreeBuilder::new()
            .rule(".a", |b| {
                b.var("x", "1px")?;
                b.rule("&-b", |b| {
                    b.decl("width", "$x")?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap()
            .finish();
        let root = tree.root();
        assert_eq!(tree.children(root).len(), 1);
        let rule = tree.children(root)[0];
        assert_eq!(tree.children(rule).len(), 2);
        match tree.kind(tree.children(rule)[0]).unwrap() {
            NodeKind::VariableDecl { name, value, .. } => {
                assert_eq!(name, "x");
                assert_eq!(value, &Expr::dimension(1.0, "px"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_builder_records_locations() {
        let mut builder = TreeBuilder::new();
        builder.at(3, 5).decl("color", "red").unwrap();
        builder.decl("color", "blue").unwrap();
        let tree = builder.finish();
        let children = tree.children(tree.root());
        assert_eq!(tree.location(children[0]), Some(SourceLocation::new(3, 5)));
        assert_eq!(tree.location(children[1]), None);
    }

    #[test]
    fn test_builder_surfaces_parse_errors() {
        let mut builder = TreeBuilder::new();
        assert!(builder.rule(":global(.a, .b)", |_| Ok(())).is_err());
        assert!(builder.decl("width", "1px )").is_err());
    }

    #[test]
    fn test_member_names_with_alias() {
        let mut builder = TreeBuilder::new();
        builder.import_named("./theme", &["$primary as $brand", "button"]).unwrap();
        let tree = builder.finish();
        match tree.kind(tree.children(tree.root())[0]).unwrap() {
            NodeKind::Import {
                clause: ImportClause::Named(names),
                ..
            } => {
                assert_eq!(names[0], MemberName::aliased("$primary", "$brand"));
                assert_eq!(names[1].local(), "button");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
