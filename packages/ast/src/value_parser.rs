//! Reader for value text: declaration values, guards, iterables, arguments
//! and parameter lists.
//!
//! Precedence climbing over the logos token stream. Lists nest as
//! comma < slash-free space lists < binary expressions, and `-` between
//! space-list items is told apart from subtraction by its surrounding
//! whitespace (`1 -2` is a list, `1 - 2` and `1-2` are subtraction).

use crate::error::{ParseError, ParseResult};
use crate::expr::{
    Argument, BinaryOp, Color, Expr, ListExpr, ListSeparator, MapExpr, MathCall, MathFn, Numeric,
    QualifiedName, Str, Template, TemplatePart, UnaryOp,
};
use crate::lexer::{lex, SpannedToken, Token};
use crate::node::{Parameter, ParameterList};

/// Parse a complete value.
pub fn parse_value(source: &str) -> ParseResult<Expr> {
    let mut parser = ValueParser::new(source)?;
    let value = parser.comma_list()?;
    parser.expect_end()?;
    Ok(value)
}

/// Parse `1px, $b: 2` as call arguments.
pub fn parse_arguments(source: &str) -> ParseResult<Vec<Argument>> {
    let mut parser = ValueParser::new(source)?;
    let args = parser.arguments_until_end()?;
    parser.expect_end()?;
    Ok(args)
}

/// Parse `$a, $b: 2px, $rest...` as a parameter list.
pub fn parse_parameters(source: &str) -> ParseResult<ParameterList> {
    let mut parser = ValueParser::new(source)?;
    let params = parser.parameters()?;
    parser.expect_end()?;
    Ok(params)
}

/// Split text on `#{...}` into literal and interpolated parts.
pub fn parse_template(source: &str) -> ParseResult<Template> {
    Ok(Template {
        parts: template_parts(source, 0)?,
        quoted: false,
    })
}

fn template_parts(source: &str, offset: usize) -> ParseResult<Vec<TemplatePart>> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = source;
    let mut consumed = 0;
    while let Some(start) = rest.find("#{") {
        literal.push_str(&rest[..start]);
        let inner_start = start + 2;
        let mut depth = 1;
        let mut end = None;
        for (i, c) in rest[inner_start..].char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(inner_start + i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let end = end.ok_or_else(|| ParseError::unexpected_eof(offset + consumed + rest.len()))?;
        if !literal.is_empty() {
            parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
        }
        let expr = parse_value(&rest[inner_start..end]).map_err(|e| shift_error(e, offset + consumed + inner_start))?;
        parts.push(TemplatePart::Interpolation(expr));
        consumed += end + 1;
        rest = &rest[end + 1..];
    }
    literal.push_str(rest);
    if !literal.is_empty() || parts.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }
    Ok(parts)
}

fn shift_error(error: ParseError, by: usize) -> ParseError {
    match error {
        ParseError::UnexpectedToken {
            pos,
            expected,
            found,
        } => ParseError::UnexpectedToken {
            pos: pos + by,
            expected,
            found,
        },
        ParseError::UnexpectedEof { pos } => ParseError::UnexpectedEof { pos: pos + by },
        ParseError::InvalidSyntax { pos, message } => ParseError::InvalidSyntax {
            pos: pos + by,
            message,
        },
        ParseError::LexerError { pos } => ParseError::LexerError { pos: pos + by },
    }
}

struct ValueParser<'src> {
    tokens: Vec<SpannedToken<'src>>,
    pos: usize,
    len: usize,
}

impl<'src> ValueParser<'src> {
    fn new(source: &'src str) -> ParseResult<Self> {
        let tokens = lex(source)
            .map(|t| t.map_err(|e| ParseError::lexer_error(e.span.start)))
            .collect::<ParseResult<Vec<_>>>()?;
        Ok(Self {
            tokens,
            pos: 0,
            len: source.len(),
        })
    }

    fn raw(&self, index: usize) -> Option<Token<'src>> {
        self.tokens.get(index).map(|t| t.token)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|t| t.span.start).unwrap_or(self.len)
    }

    fn skip_space(&mut self) -> bool {
        let mut skipped = false;
        while self.raw(self.pos) == Some(Token::Space) {
            self.pos += 1;
            skipped = true;
        }
        skipped
    }

    /// Next significant token index and whether whitespace precedes it.
    fn peek_index(&self) -> (usize, bool) {
        let mut index = self.pos;
        while self.raw(index) == Some(Token::Space) {
            index += 1;
        }
        (index, index > self.pos)
    }

    fn peek(&self) -> Option<Token<'src>> {
        self.raw(self.peek_index().0)
    }

    fn next(&mut self) -> Option<Token<'src>> {
        self.skip_space();
        let token = self.raw(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error_here(&self, expected: &str) -> ParseError {
        let (index, _) = self.peek_index();
        match self.tokens.get(index) {
            Some(t) => ParseError::unexpected_token(t.span.start, expected, t.token.describe()),
            None => ParseError::unexpected_eof(self.len),
        }
    }

    fn expect(&mut self, token: Token<'src>, expected: &str) -> ParseResult<()> {
        if self.peek() == Some(token) {
            self.next();
            Ok(())
        } else {
            Err(self.error_here(expected))
        }
    }

    fn expect_end(&mut self) -> ParseResult<()> {
        self.skip_space();
        if self.pos < self.tokens.len() {
            Err(self.error_here("end of value"))
        } else {
            Ok(())
        }
    }

    fn at_item_end(&self) -> bool {
        matches!(
            self.peek(),
            None | Some(Token::Comma)
                | Some(Token::RParen)
                | Some(Token::RBracket)
                | Some(Token::RBrace)
                | Some(Token::Colon)
                | Some(Token::Ellipsis)
        )
    }

    fn comma_list(&mut self) -> ParseResult<Expr> {
        let first = self.space_list()?;
        if self.peek() != Some(Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.peek() == Some(Token::Comma) {
            self.next();
            if self.at_item_end() {
                break;
            }
            items.push(self.space_list()?);
        }
        Ok(Expr::List(ListExpr::new(items, ListSeparator::Comma)))
    }

    fn space_list(&mut self) -> ParseResult<Expr> {
        let first = self.expression(0)?;
        let mut items = vec![first];
        while self.starts_space_item() {
            self.skip_space();
            items.push(self.expression(0)?);
        }
        if items.len() == 1 {
            Ok(items.remove(0))
        } else {
            Ok(Expr::List(ListExpr::new(items, ListSeparator::Space)))
        }
    }

    /// Whitespace followed by something that opens a new item.
    fn starts_space_item(&self) -> bool {
        let (index, spaced) = self.peek_index();
        if !spaced {
            return false;
        }
        match self.raw(index) {
            Some(Token::Minus) | Some(Token::Plus) => {
                !matches!(self.raw(index + 1), Some(Token::Space) | None)
            }
            Some(Token::Ident(word)) => !matches!(word, "and" | "or"),
            Some(token) => starts_primary(token),
            None => false,
        }
    }

    /// Binary operator at the cursor, if the next token is one.
    fn peek_operator(&self) -> Option<BinaryOp> {
        let (index, spaced) = self.peek_index();
        let op = match self.raw(index)? {
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Subtract,
            Token::Star => BinaryOp::Multiply,
            Token::Slash => BinaryOp::Divide,
            Token::Percent => BinaryOp::Modulo,
            Token::StarStar => BinaryOp::Power,
            Token::EqEq => BinaryOp::Equal,
            Token::NotEq => BinaryOp::NotEqual,
            Token::Lt => BinaryOp::LessThan,
            Token::Lte => BinaryOp::LessThanOrEqual,
            Token::Gt => BinaryOp::GreaterThan,
            Token::Gte => BinaryOp::GreaterThanOrEqual,
            Token::Ident("and") if spaced => BinaryOp::And,
            Token::Ident("or") if spaced => BinaryOp::Or,
            _ => return None,
        };
        // `a -b` continues a space list.
        if matches!(op, BinaryOp::Add | BinaryOp::Subtract)
            && spaced
            && !matches!(self.raw(index + 1), Some(Token::Space) | None)
        {
            return None;
        }
        Some(op)
    }

    fn expression(&mut self, min_precedence: u8) -> ParseResult<Expr> {
        let mut left = self.unary()?;
        while let Some(op) = self.peek_operator() {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.next();
            let next_min = if op.is_right_associative() {
                precedence
            } else {
                precedence + 1
            };
            let right = self.expression(next_min)?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        match self.peek() {
            Some(Token::Minus) | Some(Token::Plus) => {
                let minus = self.next() == Some(Token::Minus);
                // `-2px` is a literal, `- 2px` and `-$x` are operations
                if self.raw(self.pos).map(|t| matches!(t, Token::Number(_))) == Some(true) {
                    let mut number = self.primary()?;
                    if let Expr::Number(n) = &mut number {
                        if minus {
                            n.value = -n.value;
                        }
                    }
                    return Ok(number);
                }
                let operand = self.unary()?;
                Ok(Expr::Unary {
                    op: if minus { UnaryOp::Minus } else { UnaryOp::Plus },
                    operand: Box::new(operand),
                })
            }
            Some(Token::Ident("not")) if matches!(self.raw(self.peek_index().0 + 1), Some(Token::Space)) => {
                self.next();
                let operand = self.unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let start = self.peek_index().0;
        let offset = self.tokens.get(start).map(|t| t.span.start).unwrap_or(self.len);
        let Some(token) = self.next() else {
            return Err(ParseError::unexpected_eof(self.len));
        };
        match token {
            Token::Number(text) => parse_number(text, offset).map(Expr::Number),
            Token::Hash(text) => Ok(match Color::from_hex(text) {
                Some(color) => Expr::Color(color),
                None => Expr::Ident(text.to_string()),
            }),
            Token::Variable(name) => Ok(Expr::Variable(QualifiedName::new(name))),
            Token::NamespacedVariable(text) => {
                let (ns, name) = text.split_once(".$").unwrap_or(("", text));
                Ok(Expr::Variable(QualifiedName::namespaced(ns, name)))
            }
            Token::DoubleQuoted(text) | Token::SingleQuoted(text) => quoted(text, offset + 1),
            Token::Url(text) => Ok(Expr::Url(text.to_string())),
            Token::Ident(word) => Ok(match word {
                "true" => Expr::Boolean(true),
                "false" => Expr::Boolean(false),
                "null" => Expr::Null,
                _ => Expr::Ident(word.to_string()),
            }),
            Token::InterpolationStart => {
                let inner = self.comma_list()?;
                self.expect(Token::RBrace, "}")?;
                Ok(Expr::Template(Template {
                    parts: vec![TemplatePart::Interpolation(inner)],
                    quoted: false,
                }))
            }
            Token::FunctionStart(name) => self.call(name),
            Token::LParen => self.parenthesized(),
            Token::LBracket => {
                let inner = if self.peek() == Some(Token::RBracket) {
                    Expr::List(ListExpr::new(Vec::new(), ListSeparator::Space))
                } else {
                    self.comma_list()?
                };
                self.expect(Token::RBracket, "]")?;
                let mut list = match inner {
                    Expr::List(list) => list,
                    other => ListExpr::new(vec![other], ListSeparator::Space),
                };
                list.bracketed = true;
                Ok(Expr::List(list))
            }
            Token::Eq => Ok(Expr::Operator("=".to_string())),
            other => Err(ParseError::unexpected_token(offset, "a value", other.describe())),
        }
    }

    fn parenthesized(&mut self) -> ParseResult<Expr> {
        if self.peek() == Some(Token::RParen) {
            self.next();
            return Ok(Expr::List(ListExpr::new(Vec::new(), ListSeparator::Space)));
        }
        let first = self.space_list()?;
        if self.peek() == Some(Token::Colon) {
            return self.map_entries(first);
        }
        let value = if self.peek() == Some(Token::Comma) {
            let mut items = vec![first];
            while self.peek() == Some(Token::Comma) {
                self.next();
                if self.peek() == Some(Token::RParen) {
                    break;
                }
                items.push(self.space_list()?);
            }
            Expr::List(ListExpr::new(items, ListSeparator::Comma))
        } else {
            first
        };
        self.expect(Token::RParen, ")")?;
        Ok(value)
    }

    fn map_entries(&mut self, first_key: Expr) -> ParseResult<Expr> {
        let mut entries = Vec::new();
        let mut key = first_key;
        loop {
            self.expect(Token::Colon, ":")?;
            let value = self.space_list()?;
            entries.push((key, value));
            if self.peek() != Some(Token::Comma) {
                break;
            }
            self.next();
            if self.peek() == Some(Token::RParen) {
                break;
            }
            key = self.space_list()?;
        }
        self.expect(Token::RParen, ")")?;
        Ok(Expr::Map(MapExpr { entries }))
    }

    fn call(&mut self, name: &str) -> ParseResult<Expr> {
        if name.eq_ignore_ascii_case("calc") {
            let inner = self.comma_list()?;
            self.expect(Token::RParen, ")")?;
            return Ok(Expr::calc(inner));
        }
        if !name.contains('.') {
            if let Some(function) = MathFn::from_name(name) {
                let mut args = Vec::new();
                if self.peek() != Some(Token::RParen) {
                    loop {
                        args.push(self.space_list()?);
                        if self.peek() != Some(Token::Comma) {
                            break;
                        }
                        self.next();
                    }
                }
                self.expect(Token::RParen, ")")?;
                return Ok(Expr::Math(MathCall { function, args }));
            }
        }
        let args = if self.peek() == Some(Token::RParen) {
            Vec::new()
        } else {
            self.arguments_until_end()?
        };
        self.expect(Token::RParen, ")")?;
        Ok(Expr::Function(crate::expr::FunctionCall {
            name: QualifiedName::parse(name),
            args,
        }))
    }

    fn arguments_until_end(&mut self) -> ParseResult<Vec<Argument>> {
        let mut args = Vec::new();
        if self.peek().is_none() {
            return Ok(args);
        }
        loop {
            args.push(self.argument()?);
            if self.peek() != Some(Token::Comma) {
                break;
            }
            self.next();
            if matches!(self.peek(), None | Some(Token::RParen)) {
                break;
            }
        }
        Ok(args)
    }

    fn argument(&mut self) -> ParseResult<Argument> {
        let (index, _) = self.peek_index();
        if let Some(Token::Variable(name)) = self.raw(index) {
            let mut after = index + 1;
            while self.raw(after) == Some(Token::Space) {
                after += 1;
            }
            if self.raw(after) == Some(Token::Colon) {
                self.pos = after + 1;
                let value = self.space_list()?;
                return Ok(Argument::keyword(name, value));
            }
        }
        Ok(Argument::positional(self.space_list()?))
    }

    fn parameters(&mut self) -> ParseResult<ParameterList> {
        let mut list = ParameterList::default();
        if self.peek().is_none() {
            return Ok(list);
        }
        loop {
            let offset = self.offset();
            let name = match self.next() {
                Some(Token::Variable(name)) => name.to_string(),
                Some(other) => {
                    return Err(ParseError::unexpected_token(offset, "a parameter", other.describe()))
                }
                None => return Err(ParseError::unexpected_eof(self.len)),
            };
            match self.peek() {
                Some(Token::Ellipsis) => {
                    self.next();
                    list.rest = Some(name);
                    break;
                }
                Some(Token::Colon) => {
                    self.next();
                    let default = self.space_list()?;
                    list.params.push(Parameter::optional(name, default));
                }
                _ => list.params.push(Parameter::required(name)),
            }
            if self.peek() != Some(Token::Comma) {
                break;
            }
            self.next();
        }
        Ok(list)
    }
}

fn starts_primary(token: Token<'_>) -> bool {
    matches!(
        token,
        Token::Number(_)
            | Token::Hash(_)
            | Token::Variable(_)
            | Token::NamespacedVariable(_)
            | Token::FunctionStart(_)
            | Token::Url(_)
            | Token::Ident(_)
            | Token::DoubleQuoted(_)
            | Token::SingleQuoted(_)
            | Token::InterpolationStart
            | Token::LParen
            | Token::LBracket
    )
}

fn parse_number(text: &str, offset: usize) -> ParseResult<Numeric> {
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    let value = digits
        .parse::<f64>()
        .map_err(|_| ParseError::invalid_syntax(offset, format!("Invalid number {}", text)))?;
    Ok(Numeric::new(value, Some(unit)))
}

fn quoted(text: &str, offset: usize) -> ParseResult<Expr> {
    let unescaped = text.replace("\\\"", "\"").replace("\\'", "'");
    if !unescaped.contains("#{") {
        return Ok(Expr::Str(Str::quoted(unescaped)));
    }
    Ok(Expr::Template(Template {
        parts: template_parts(&unescaped, offset)?,
        quoted: true,
    }))
}
