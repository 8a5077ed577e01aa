//! Value expressions.
//!
//! Values are owned by the statement node that holds them (a declaration, a
//! variable, a guard). Cloning an [`Expr`] is a deep copy, so reduced values
//! are always built fresh and substituted wholesale.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Digits kept when a float is rendered, independent of reduction precision.
const RENDER_PRECISION: i32 = 10;

/// A number with an optional unit, e.g. `10px`, `50%` or `1.5`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Numeric {
    pub value: f64,
    pub unit: Option<String>,
}

impl Numeric {
    pub fn new(value: f64, unit: Option<&str>) -> Self {
        Self {
            value,
            unit: unit.filter(|u| !u.is_empty()).map(str::to_string),
        }
    }

    pub fn unitless(value: f64) -> Self {
        Self { value, unit: None }
    }

    pub fn with_unit(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: Some(unit.into()),
        }
    }

    pub fn is_unitless(&self) -> bool {
        self.unit.is_none()
    }

    /// Lowercased unit, units are compared case-insensitively.
    pub fn unit_key(&self) -> Option<String> {
        self.unit.as_ref().map(|u| u.to_ascii_lowercase())
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_number(self.value))?;
        if let Some(unit) = &self.unit {
            f.write_str(unit)?;
        }
        Ok(())
    }
}

/// Render a float the way stylesheets expect: no trailing zeros, no `-0`.
pub fn format_number(value: f64) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "infinity".into() } else { "-infinity".into() };
    }
    if value.is_nan() {
        return "NaN".into();
    }
    let factor = 10f64.powi(RENDER_PRECISION);
    let mut rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        rounded = 0.0;
    }
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}

/// An RGBA color. Channels are 0-255, alpha is 0-1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
    /// Source spelling, kept so untouched colors render as written.
    pub original: Option<String>,
}

impl Color {
    pub fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red: red.clamp(0.0, 255.0),
            green: green.clamp(0.0, 255.0),
            blue: blue.clamp(0.0, 255.0),
            alpha: alpha.clamp(0.0, 1.0),
            original: None,
        }
    }

    /// Parse `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(text: &str) -> Option<Self> {
        let hex = text.strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let expand = |c: char| -> Option<f64> {
            let d = c.to_digit(16)?;
            Some((d * 17) as f64)
        };
        let pair = |s: &str| -> Option<f64> { u8::from_str_radix(s, 16).ok().map(f64::from) };
        let chars: Vec<char> = hex.chars().collect();
        let (r, g, b, a) = match chars.len() {
            3 => (expand(chars[0])?, expand(chars[1])?, expand(chars[2])?, 255.0),
            4 => (
                expand(chars[0])?,
                expand(chars[1])?,
                expand(chars[2])?,
                expand(chars[3])?,
            ),
            6 => (pair(&hex[0..2])?, pair(&hex[2..4])?, pair(&hex[4..6])?, 255.0),
            8 => (
                pair(&hex[0..2])?,
                pair(&hex[2..4])?,
                pair(&hex[4..6])?,
                pair(&hex[6..8])?,
            ),
            _ => return None,
        };
        Some(Self {
            red: r,
            green: g,
            blue: b,
            alpha: a / 255.0,
            original: Some(text.to_string()),
        })
    }

    /// Same channels, forgetting the source spelling.
    pub fn computed(mut self) -> Self {
        self.original = None;
        self
    }

    pub fn same_channels(&self, other: &Color) -> bool {
        self.red.round() == other.red.round()
            && self.green.round() == other.green.round()
            && self.blue.round() == other.blue.round()
            && (self.alpha - other.alpha).abs() < 1e-6
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(original) = &self.original {
            return f.write_str(original);
        }
        let (r, g, b) = (
            self.red.round() as u8,
            self.green.round() as u8,
            self.blue.round() as u8,
        );
        if self.alpha >= 1.0 {
            write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
        } else {
            write!(f, "rgba({}, {}, {}, {})", r, g, b, format_number(self.alpha))
        }
    }
}

/// A string, quoted or bare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Str {
    pub value: String,
    pub quoted: bool,
}

impl Str {
    pub fn quoted(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quoted: true,
        }
    }

    pub fn unquoted(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quoted: false,
        }
    }
}

impl fmt::Display for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "\"{}\"", self.value.replace('\\', "\\\\").replace('"', "\\\""))
        } else {
            f.write_str(&self.value)
        }
    }
}

/// Text with `#{...}` interpolations. Used for quoted strings, property
/// names and at-rule parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub parts: Vec<TemplatePart>,
    pub quoted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplatePart {
    Literal(String),
    Interpolation(Expr),
}

impl Template {
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            parts: vec![TemplatePart::Literal(text.into())],
            quoted: false,
        }
    }

    /// The literal text, if the template has no interpolations.
    pub fn as_literal(&self) -> Option<String> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => out.push_str(text),
                TemplatePart::Interpolation(_) => return None,
            }
        }
        Some(out)
    }

    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(|p| matches!(p, TemplatePart::Literal(t) if t.is_empty()))
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            f.write_str("\"")?;
        }
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => f.write_str(text)?,
                TemplatePart::Interpolation(expr) => write!(f, "#{{{}}}", expr)?,
            }
        }
        if self.quoted {
            f.write_str("\"")?;
        }
        Ok(())
    }
}

/// A possibly namespaced member name: `button`, `theme.button`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub namespace: Option<String>,
    pub name: String,
}

impl QualifiedName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    /// Parse `name` or `ns.name`.
    pub fn parse(text: &str) -> Self {
        match text.split_once('.') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() => Self::namespaced(ns, name),
            _ => Self::new(text),
        }
    }

    /// Scope key of a mixin or function with this name.
    pub fn member_key(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.name),
            None => self.name.clone(),
        }
    }

    /// Scope key of a variable with this name.
    pub fn variable_key(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.${}", ns, self.name),
            None => format!("${}", self.name),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.member_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListSeparator {
    Space,
    Comma,
    Slash,
}

impl ListSeparator {
    pub fn token(self) -> &'static str {
        match self {
            ListSeparator::Space => " ",
            ListSeparator::Comma => ", ",
            ListSeparator::Slash => " / ",
        }
    }

    /// Binding strength: comma binds loosest, space tightest.
    fn strength(self) -> u8 {
        match self {
            ListSeparator::Comma => 0,
            ListSeparator::Slash => 1,
            ListSeparator::Space => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListExpr {
    pub items: Vec<Expr>,
    pub separator: ListSeparator,
    pub bracketed: bool,
}

impl ListExpr {
    pub fn new(items: Vec<Expr>, separator: ListSeparator) -> Self {
        Self {
            items,
            separator,
            bracketed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapExpr {
    pub entries: Vec<(Expr, Expr)>,
}

/// A call argument, positional or `$name: value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Expr,
}

impl Argument {
    pub fn positional(value: Expr) -> Self {
        Self { name: None, value }
    }

    pub fn keyword(name: impl Into<String>, value: Expr) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "${}: {}", name, self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

/// A function call. Unknown names are opaque CSS functions such as `var()`
/// or `rgb()`; known names dispatch to native callables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: QualifiedName,
    pub args: Vec<Argument>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MathFn {
    Min,
    Max,
    Clamp,
}

impl MathFn {
    pub fn name(self) -> &'static str {
        match self {
            MathFn::Min => "min",
            MathFn::Max => "max",
            MathFn::Clamp => "clamp",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "min" => Some(MathFn::Min),
            "max" => Some(MathFn::Max),
            "clamp" => Some(MathFn::Clamp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathCall {
    pub function: MathFn,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "**",
        }
    }

    /// Binding strength, low to high.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Equal | BinaryOp::NotEqual => 3,
            BinaryOp::LessThan
            | BinaryOp::LessThanOrEqual
            | BinaryOp::GreaterThan
            | BinaryOp::GreaterThanOrEqual => 4,
            BinaryOp::Add | BinaryOp::Subtract => 5,
            BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => 6,
            BinaryOp::Power => 7,
        }
    }

    pub fn is_right_associative(self) -> bool {
        matches!(self, BinaryOp::Power)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Equal | BinaryOp::NotEqual)
    }

    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinaryOp::LessThan
                | BinaryOp::LessThanOrEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanOrEqual
        )
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Subtract
                | BinaryOp::Multiply
                | BinaryOp::Divide
                | BinaryOp::Modulo
                | BinaryOp::Power
        )
    }
}

/// Whether `child`, as the left or right operand of `parent`, must be
/// parenthesized to keep its meaning when rendered.
pub fn needs_parens(parent: BinaryOp, child: BinaryOp, right: bool) -> bool {
    let (p, c) = (parent.precedence(), child.precedence());
    if c != p {
        return c < p;
    }
    if parent.is_equality() {
        return true;
    }
    if parent.is_right_associative() {
        return !right;
    }
    if (parent == BinaryOp::Modulo || child == BinaryOp::Modulo) && parent != child {
        return true;
    }
    if !right {
        return false;
    }
    matches!(
        parent,
        BinaryOp::Subtract | BinaryOp::Divide | BinaryOp::Modulo
    ) || parent.is_relational()
}

/// The closed set of value kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(Numeric),
    Color(Color),
    Str(Str),
    Template(Template),
    Url(String),
    Ident(String),
    Boolean(bool),
    Null,
    Variable(QualifiedName),
    /// A raw operator token inside an opaque argument list, e.g. `=`.
    Operator(String),
    List(ListExpr),
    Map(MapExpr),
    Function(FunctionCall),
    Math(MathCall),
    Calc(Box<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn number(value: f64) -> Self {
        Expr::Number(Numeric::unitless(value))
    }

    pub fn dimension(value: f64, unit: &str) -> Self {
        Expr::Number(Numeric::new(value, Some(unit)))
    }

    pub fn ident(text: impl Into<String>) -> Self {
        Expr::Ident(text.into())
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Expr::Str(Str::quoted(text))
    }

    pub fn unquoted(text: impl Into<String>) -> Self {
        Expr::Str(Str::unquoted(text))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expr::Variable(QualifiedName::new(name))
    }

    pub fn list(items: Vec<Expr>, separator: ListSeparator) -> Self {
        Expr::List(ListExpr::new(items, separator))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn calc(inner: Expr) -> Self {
        Expr::Calc(Box::new(inner))
    }

    pub fn as_number(&self) -> Option<&Numeric> {
        match self {
            Expr::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Expr::Null)
    }

    /// Name of the value kind, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Expr::Number(_) => "number",
            Expr::Color(_) => "color",
            Expr::Str(_) | Expr::Template(_) => "string",
            Expr::Url(_) => "url",
            Expr::Ident(_) => "identifier",
            Expr::Boolean(_) => "bool",
            Expr::Null => "null",
            Expr::Variable(_) => "variable",
            Expr::Operator(_) => "operator",
            Expr::List(_) => "list",
            Expr::Map(_) => "map",
            Expr::Function(_) => "function call",
            Expr::Math(_) => "math function",
            Expr::Calc(_) => "calculation",
            Expr::Unary { .. } | Expr::Binary { .. } => "expression",
        }
    }

    /// Rendering without quotes, used for interpolation.
    pub fn to_unquoted_string(&self) -> String {
        match self {
            Expr::Str(s) => s.value.clone(),
            Expr::Template(t) => Template { quoted: false, ..t.clone() }.to_string(),
            other => other.to_string(),
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parent: BinaryOp, right: bool) -> fmt::Result {
        match self {
            Expr::Binary { op, .. } if needs_parens(parent, *op, right) => write!(f, "({})", self),
            _ => write!(f, "{}", self),
        }
    }
}

fn fmt_list_item(item: &Expr, separator: ListSeparator, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match item {
        Expr::List(inner)
            if !inner.bracketed
                && inner.items.len() > 1
                && inner.separator.strength() <= separator.strength() =>
        {
            write!(f, "({})", item)
        }
        _ => write!(f, "{}", item),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Color(c) => write!(f, "{}", c),
            Expr::Str(s) => write!(f, "{}", s),
            Expr::Template(t) => write!(f, "{}", t),
            Expr::Url(url) => write!(f, "url({})", url),
            Expr::Ident(text) => f.write_str(text),
            Expr::Boolean(b) => write!(f, "{}", b),
            Expr::Null => f.write_str("null"),
            Expr::Variable(name) => f.write_str(&name.variable_key()),
            Expr::Operator(op) => f.write_str(op),
            Expr::List(list) => {
                if list.bracketed {
                    f.write_str("[")?;
                } else if list.items.is_empty() {
                    return f.write_str("()");
                }
                let mut first = true;
                for item in list.items.iter().filter(|i| !i.is_null()) {
                    if !first {
                        f.write_str(list.separator.token())?;
                    }
                    first = false;
                    fmt_list_item(item, list.separator, f)?;
                }
                if list.bracketed {
                    f.write_str("]")?;
                }
                Ok(())
            }
            Expr::Map(map) => {
                f.write_str("(")?;
                for (i, (key, value)) in map.entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str(")")
            }
            Expr::Function(call) => {
                write!(f, "{}(", call.name)?;
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expr::Math(call) => {
                write!(f, "{}(", call.function.name())?;
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expr::Calc(inner) => write!(f, "calc({})", inner),
            Expr::Unary { op, operand } => {
                let negative_literal = matches!(operand.as_ref(), Expr::Number(n) if n.value < 0.0);
                match op {
                    UnaryOp::Minus | UnaryOp::Plus if negative_literal => write!(f, "{}", operand),
                    UnaryOp::Not => write!(f, "not {}", operand),
                    UnaryOp::Minus | UnaryOp::Plus => {
                        let sign = if *op == UnaryOp::Minus { "-" } else { "+" };
                        match operand.as_ref() {
                            Expr::Binary { .. } => write!(f, "{}({})", sign, operand),
                            _ => write!(f, "{}{}", sign, operand),
                        }
                    }
                }
            }
            Expr::Binary { op, left, right } => {
                left.fmt_operand(f, *op, false)?;
                write!(f, " {} ", op.symbol())?;
                right.fmt_operand(f, *op, true)
            }
        }
    }
}
