//! Syntax tree model for the Kiln stylesheet compiler.
//!
//! Statements live in an arena [`Tree`]; values are owned [`Expr`] trees;
//! selectors are owned by rules. Everything renders back to stylesheet
//! text through `Display` and the [`Serializer`].

pub mod builder;
pub mod error;
pub mod expr;
pub mod lexer;
pub mod node;
pub mod selector;
pub mod selector_parser;
pub mod serializer;
pub mod tree;
pub mod value_parser;

pub use builder::TreeBuilder;
pub use error::{ParseError, ParseResult, TreeError};
pub use expr::{
    format_number, Argument, BinaryOp, Color, Expr, FunctionCall, ListExpr, ListSeparator,
    MapExpr, MathCall, MathFn, Numeric, QualifiedName, Str, Template, TemplatePart, UnaryOp,
};
pub use node::{ExportClause, ImportClause, MemberName, NodeKind, Parameter, ParameterList};
pub use selector::{
    AttributeMatcher, AttributeSelector, Combinator, ComplexPart, ComplexSelector,
    CompoundSelector, PseudoArgument, PseudoSelector, SelectorList, SimpleSelector,
};
pub use selector_parser::parse_selector;
pub use serializer::{excerpt, serialize, Serializer};
pub use tree::{Node, NodeId, SourceLocation, Tree};
pub use value_parser::{parse_arguments, parse_parameters, parse_template, parse_value};
