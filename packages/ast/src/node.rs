use crate::expr::{Argument, Expr, QualifiedName, Template};
use crate::selector::SelectorList;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Statement node kinds. Value-level kinds live in [`Expr`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    Root,
    Rule {
        selector: SelectorList,
    },
    Declaration {
        property: Template,
        value: Expr,
        important: bool,
    },
    VariableDecl {
        name: String,
        value: Expr,
        exported: bool,
        default: bool,
    },
    Comment {
        text: String,
    },
    If {
        condition: Expr,
    },
    Else {
        condition: Option<Expr>,
    },
    Each {
        names: Vec<String>,
        iterable: Expr,
    },
    Mixin {
        name: String,
        params: ParameterList,
        exported: bool,
    },
    Include {
        name: QualifiedName,
        args: Vec<Argument>,
        has_content: bool,
    },
    Content,
    Import {
        specifier: String,
        clause: ImportClause,
    },
    Export {
        clause: ExportClause,
    },
    AtRule {
        name: String,
        params: Template,
        has_block: bool,
    },
}

impl NodeKind {
    pub fn is_container(&self) -> bool {
        match self {
            NodeKind::Root
            | NodeKind::Rule { .. }
            | NodeKind::If { .. }
            | NodeKind::Else { .. }
            | NodeKind::Each { .. }
            | NodeKind::Mixin { .. }
            | NodeKind::Include { .. } => true,
            NodeKind::AtRule { has_block, .. } => *has_block,
            NodeKind::Declaration { .. }
            | NodeKind::VariableDecl { .. }
            | NodeKind::Comment { .. }
            | NodeKind::Content
            | NodeKind::Import { .. }
            | NodeKind::Export { .. } => false,
        }
    }

    /// Kinds that may appear in reduced output.
    pub fn is_plain(&self) -> bool {
        matches!(
            self,
            NodeKind::Root
                | NodeKind::Rule { .. }
                | NodeKind::Declaration { .. }
                | NodeKind::Comment { .. }
                | NodeKind::AtRule { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Rule { .. } => "rule",
            NodeKind::Declaration { .. } => "declaration",
            NodeKind::VariableDecl { .. } => "variable",
            NodeKind::Comment { .. } => "comment",
            NodeKind::If { .. } => "@if",
            NodeKind::Else { .. } => "@else",
            NodeKind::Each { .. } => "@each",
            NodeKind::Mixin { .. } => "@mixin",
            NodeKind::Include { .. } => "@include",
            NodeKind::Content => "@content",
            NodeKind::Import { .. } => "@import",
            NodeKind::Export { .. } => "@export",
            NodeKind::AtRule { .. } => "at-rule",
        }
    }
}

/// One declared parameter, `$name` or `$name: default`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub default: Option<Expr>,
}

impl Parameter {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, default: Expr) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
        }
    }
}

/// Parameter shape shared by mixins and native functions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterList {
    pub params: Vec<Parameter>,
    /// Name of the trailing `$rest...` parameter.
    pub rest: Option<String>,
}

impl ParameterList {
    pub fn new(params: Vec<Parameter>, rest: Option<String>) -> Self {
        Self { params, rest }
    }

    /// Shape with only required positional parameters.
    pub fn positional(names: &[&str]) -> Self {
        Self {
            params: names.iter().map(|n| Parameter::required(*n)).collect(),
            rest: None,
        }
    }

    pub fn with_rest(mut self, rest: impl Into<String>) -> Self {
        self.rest = Some(rest.into());
        self
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }
}

impl fmt::Display for ParameterList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for param in &self.params {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            match &param.default {
                Some(default) => write!(f, "${}: {}", param.name, default)?,
                None => write!(f, "${}", param.name)?,
            }
        }
        if let Some(rest) = &self.rest {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "${}...", rest)?;
        }
        Ok(())
    }
}

/// A member named in an import or export. Variables carry their `$`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberName {
    pub name: String,
    pub alias: Option<String>,
}

impl MemberName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    /// Name the member is bound under on the receiving side.
    pub fn local(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

impl fmt::Display for MemberName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} as {}", self.name, alias),
            None => f.write_str(&self.name),
        }
    }
}

fn write_names(f: &mut fmt::Formatter<'_>, names: &[MemberName]) -> fmt::Result {
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", name)?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImportClause {
    /// `@import $a, b as c from "./x"`
    Named(Vec<MemberName>),
    /// `@import "./x" as ns`
    Namespace(String),
    /// `@import * from "./x"`
    Glob,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExportClause {
    /// `@export $a, b as c`
    Names(Vec<MemberName>),
    /// `@export * from "./x"` when `names` is `None`.
    Forward {
        from: String,
        names: Option<Vec<MemberName>>,
    },
}

impl fmt::Display for ImportClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportClause::Named(names) => write_names(f, names),
            ImportClause::Namespace(ns) => write!(f, "as {}", ns),
            ImportClause::Glob => f.write_str("*"),
        }
    }
}

impl fmt::Display for ExportClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportClause::Names(names) => write_names(f, names),
            ExportClause::Forward { from, names: None } => write!(f, "* from \"{}\"", from),
            ExportClause::Forward {
                from,
                names: Some(names),
            } => {
                write_names(f, names)?;
                write!(f, " from \"{}\"", from)
            }
        }
    }
}
