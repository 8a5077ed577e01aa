//! Selector model.
//!
//! `SelectorList → [ComplexSelector]`, `ComplexSelector → [Compound | Combinator]`,
//! `CompoundSelector → [SimpleSelector]`. The parent reference `&` is a simple
//! selector so that prefixes (`span&`) and suffixes (`&-foo`) keep their
//! position inside the compound.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pseudo-classes whose argument is itself a selector list.
pub const SELECTOR_PSEUDOS: &[&str] = &[
    "not",
    "is",
    "matches",
    "where",
    "has",
    "host",
    "host-context",
    "slotted",
    "-moz-any",
    "-webkit-any",
    "any",
    "current",
    "global",
    "local",
];

pub const SCOPE_ONE_SELECTOR: &str = "Scope pseudo selectors must contain one selector";
pub const SCOPE_SINGLE_CLASS: &str = "Scope pseudo selectors must contain a single class selector";

pub fn is_selector_pseudo(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SELECTOR_PSEUDOS.contains(&lower.as_str())
}

/// `:global()` / `:local()`.
pub fn is_scope_pseudo(name: &str) -> bool {
    name.eq_ignore_ascii_case("global") || name.eq_ignore_ascii_case("local")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorList {
    pub selectors: Vec<ComplexSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexSelector {
    pub parts: Vec<ComplexPart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplexPart {
    Compound(CompoundSelector),
    Combinator(Combinator),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundSelector {
    pub simples: Vec<SimpleSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimpleSelector {
    Type(String),
    Universal,
    Class(String),
    Id(String),
    Attribute(AttributeSelector),
    Pseudo(PseudoSelector),
    Parent { suffix: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSelector {
    pub name: String,
    pub matcher: Option<AttributeMatcher>,
    pub modifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMatcher {
    /// `=`, `~=`, `|=`, `^=`, `$=` or `*=`.
    pub op: String,
    pub value: String,
    pub quoted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PseudoSelector {
    pub name: String,
    /// `::name` rather than `:name`.
    pub element: bool,
    pub argument: Option<PseudoArgument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PseudoArgument {
    Selector(SelectorList),
    Raw(String),
}

impl SelectorList {
    pub fn new(selectors: Vec<ComplexSelector>) -> Self {
        Self { selectors }
    }

    /// `.name`
    pub fn class(name: &str) -> Self {
        Self::new(vec![ComplexSelector::compound(CompoundSelector::new(vec![
            SimpleSelector::Class(name.to_string()),
        ]))])
    }

    /// `&` anywhere, including inside selector pseudo arguments.
    pub fn contains_parent_ref(&self) -> bool {
        self.selectors.iter().any(ComplexSelector::contains_parent_ref)
    }

    /// The class name when the list is exactly one class selector.
    pub fn single_class(&self) -> Option<&str> {
        match self.selectors.as_slice() {
            [only] => only.single_class(),
            _ => None,
        }
    }

    /// Check every `:global()`/`:local()` in the list.
    pub fn validate_scope_pseudos(&self) -> Result<(), &'static str> {
        for complex in &self.selectors {
            for compound in complex.compounds() {
                for simple in &compound.simples {
                    if let SimpleSelector::Pseudo(pseudo) = simple {
                        pseudo.validate_scope()?;
                        if let Some(PseudoArgument::Selector(inner)) = &pseudo.argument {
                            inner.validate_scope_pseudos()?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl ComplexSelector {
    pub fn new(parts: Vec<ComplexPart>) -> Self {
        Self { parts }
    }

    pub fn compound(compound: CompoundSelector) -> Self {
        Self {
            parts: vec![ComplexPart::Compound(compound)],
        }
    }

    pub fn compounds(&self) -> impl Iterator<Item = &CompoundSelector> {
        self.parts.iter().filter_map(|p| match p {
            ComplexPart::Compound(c) => Some(c),
            ComplexPart::Combinator(_) => None,
        })
    }

    pub fn starts_with_combinator(&self) -> bool {
        matches!(self.parts.first(), Some(ComplexPart::Combinator(_)))
    }

    /// `&` directly in one of the compounds.
    pub fn has_direct_parent_ref(&self) -> bool {
        self.compounds().any(CompoundSelector::has_parent_ref)
    }

    pub fn contains_parent_ref(&self) -> bool {
        self.compounds().any(|c| {
            c.simples.iter().any(|s| match s {
                SimpleSelector::Parent { .. } => true,
                SimpleSelector::Pseudo(PseudoSelector {
                    argument: Some(PseudoArgument::Selector(inner)),
                    ..
                }) => inner.contains_parent_ref(),
                _ => false,
            })
        })
    }

    pub fn single_class(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [ComplexPart::Compound(compound)] => match compound.simples.as_slice() {
                [SimpleSelector::Class(name)] => Some(name),
                _ => None,
            },
            _ => None,
        }
    }
}

impl CompoundSelector {
    pub fn new(simples: Vec<SimpleSelector>) -> Self {
        Self { simples }
    }

    pub fn has_parent_ref(&self) -> bool {
        self.simples
            .iter()
            .any(|s| matches!(s, SimpleSelector::Parent { .. }))
    }

    pub fn parent_ref_count(&self) -> usize {
        self.simples
            .iter()
            .filter(|s| matches!(s, SimpleSelector::Parent { .. }))
            .count()
    }
}

impl PseudoSelector {
    pub fn is_scope(&self) -> bool {
        !self.element && is_scope_pseudo(&self.name)
    }

    /// A scope pseudo must hold exactly one selector, a single class.
    pub fn validate_scope(&self) -> Result<(), &'static str> {
        if !self.is_scope() {
            return Ok(());
        }
        match &self.argument {
            Some(PseudoArgument::Selector(list)) if list.selectors.len() == 1 => {
                if list.single_class().is_some() {
                    Ok(())
                } else {
                    Err(SCOPE_SINGLE_CLASS)
                }
            }
            Some(PseudoArgument::Raw(_)) => Err(SCOPE_SINGLE_CLASS),
            _ => Err(SCOPE_ONE_SELECTOR),
        }
    }

    /// The class named by a valid scope pseudo.
    pub fn scoped_class(&self) -> Option<&str> {
        match &self.argument {
            Some(PseudoArgument::Selector(list)) if self.is_scope() => list.single_class(),
            _ => None,
        }
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, complex) in self.selectors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", complex)?;
        }
        Ok(())
    }
}

impl fmt::Display for ComplexSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            match part {
                ComplexPart::Compound(compound) => write!(f, "{}", compound)?,
                ComplexPart::Combinator(combinator) => {
                    let token = combinator.token();
                    if i == 0 {
                        write!(f, "{} ", token.trim())?;
                    } else if i + 1 == self.parts.len() {
                        write!(f, " {}", token.trim())?;
                    } else {
                        f.write_str(token)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Combinator {
    pub fn token(self) -> &'static str {
        match self {
            Combinator::Descendant => " ",
            Combinator::Child => " > ",
            Combinator::NextSibling => " + ",
            Combinator::SubsequentSibling => " ~ ",
        }
    }
}

impl fmt::Display for CompoundSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for simple in &self.simples {
            write!(f, "{}", simple)?;
        }
        Ok(())
    }
}

impl fmt::Display for SimpleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimpleSelector::Type(name) => f.write_str(name),
            SimpleSelector::Universal => f.write_str("*"),
            SimpleSelector::Class(name) => write!(f, ".{}", name),
            SimpleSelector::Id(name) => write!(f, "#{}", name),
            SimpleSelector::Attribute(attr) => write!(f, "{}", attr),
            SimpleSelector::Pseudo(pseudo) => write!(f, "{}", pseudo),
            SimpleSelector::Parent { suffix } => {
                f.write_str("&")?;
                if let Some(suffix) = suffix {
                    f.write_str(suffix)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for AttributeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.name)?;
        if let Some(matcher) = &self.matcher {
            f.write_str(&matcher.op)?;
            if matcher.quoted {
                write!(f, "\"{}\"", matcher.value)?;
            } else {
                f.write_str(&matcher.value)?;
            }
        }
        if let Some(modifier) = &self.modifier {
            write!(f, " {}", modifier)?;
        }
        f.write_str("]")
    }
}

impl fmt::Display for PseudoSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.element { "::" } else { ":" })?;
        f.write_str(&self.name)?;
        match &self.argument {
            Some(PseudoArgument::Selector(list)) => write!(f, "({})", list),
            Some(PseudoArgument::Raw(text)) => write!(f, "({})", text),
            None => Ok(()),
        }
    }
}
