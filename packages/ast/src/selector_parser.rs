//! Reader for selector text.

use crate::error::{ParseError, ParseResult};
use crate::selector::{
    is_selector_pseudo, AttributeMatcher, AttributeSelector, Combinator, ComplexPart,
    ComplexSelector, CompoundSelector, PseudoArgument, PseudoSelector, SelectorList,
    SimpleSelector,
};

/// Parse a selector list such as `.a > b, &-c:hover`.
pub fn parse_selector(source: &str) -> ParseResult<SelectorList> {
    let mut parser = SelectorParser {
        chars: source.char_indices().collect(),
        pos: 0,
        len: source.len(),
    };
    let list = parser.list()?;
    parser.skip_space();
    if let Some(c) = parser.peek() {
        return Err(ParseError::unexpected_token(parser.offset(), "end of selector", c.to_string()));
    }
    Ok(list)
}

struct SelectorParser {
    chars: Vec<(usize, char)>,
    pos: usize,
    len: usize,
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

impl SelectorParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars.get(self.pos).map(|(i, _)| *i).unwrap_or(self.len)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_space(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn expect(&mut self, expected: char) -> ParseResult<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(ParseError::unexpected_token(
                self.offset(),
                expected.to_string(),
                c.to_string(),
            )),
            None => Err(ParseError::unexpected_eof(self.len)),
        }
    }

    fn name(&mut self) -> ParseResult<String> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.pos += 1;
                out.push('\\');
                if let Some(escaped) = self.bump() {
                    out.push(escaped);
                }
            } else if is_name_char(c) {
                out.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if out.is_empty() {
            return Err(match self.peek() {
                Some(c) => ParseError::unexpected_token(self.offset(), "a name", c.to_string()),
                None => ParseError::unexpected_eof(self.len),
            });
        }
        Ok(out)
    }

    fn list(&mut self) -> ParseResult<SelectorList> {
        let mut selectors = Vec::new();
        loop {
            self.skip_space();
            selectors.push(self.complex()?);
            self.skip_space();
            if self.peek() == Some(',') {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(SelectorList::new(selectors))
    }

    fn combinator(&mut self) -> Option<Combinator> {
        let combinator = match self.peek()? {
            '>' => Combinator::Child,
            '+' => Combinator::NextSibling,
            '~' => Combinator::SubsequentSibling,
            _ => return None,
        };
        self.pos += 1;
        Some(combinator)
    }

    fn complex(&mut self) -> ParseResult<ComplexSelector> {
        let mut parts = Vec::new();
        if let Some(combinator) = self.combinator() {
            parts.push(ComplexPart::Combinator(combinator));
            self.skip_space();
        }
        loop {
            parts.push(ComplexPart::Compound(self.compound()?));
            let spaced = self.skip_space();
            match self.peek() {
                None | Some(',') | Some(')') => break,
                _ => {}
            }
            match self.combinator() {
                Some(combinator) => {
                    parts.push(ComplexPart::Combinator(combinator));
                    self.skip_space();
                    if matches!(self.peek(), None | Some(',') | Some(')')) {
                        break;
                    }
                }
                None if spaced => parts.push(ComplexPart::Combinator(Combinator::Descendant)),
                None => {
                    let c = self.peek().unwrap_or(' ');
                    return Err(ParseError::unexpected_token(self.offset(), "a combinator", c.to_string()));
                }
            }
        }
        Ok(ComplexSelector::new(parts))
    }

    fn compound(&mut self) -> ParseResult<CompoundSelector> {
        let mut simples = Vec::new();
        while let Some(c) = self.peek() {
            let simple = match c {
                '&' => {
                    self.pos += 1;
                    let suffix = match self.peek() {
                        Some(s) if is_name_char(s) => Some(self.name()?),
                        _ => None,
                    };
                    SimpleSelector::Parent { suffix }
                }
                '*' => {
                    self.pos += 1;
                    SimpleSelector::Universal
                }
                '.' => {
                    self.pos += 1;
                    SimpleSelector::Class(self.name()?)
                }
                '#' => {
                    self.pos += 1;
                    SimpleSelector::Id(self.name()?)
                }
                '[' => SimpleSelector::Attribute(self.attribute()?),
                ':' => SimpleSelector::Pseudo(self.pseudo()?),
                '%' => {
                    self.pos += 1;
                    SimpleSelector::Type(format!("%{}", self.name()?))
                }
                c if c.is_ascii_digit() => SimpleSelector::Type(self.keyframe_stop()?),
                c if is_name_char(c) => SimpleSelector::Type(self.name()?),
                _ => break,
            };
            simples.push(simple);
        }
        if simples.is_empty() {
            return Err(match self.peek() {
                Some(c) => ParseError::unexpected_token(self.offset(), "a selector", c.to_string()),
                None => ParseError::unexpected_eof(self.len),
            });
        }
        Ok(CompoundSelector::new(simples))
    }

    /// `50%` or `12.5%` inside `@keyframes`.
    fn keyframe_stop(&mut self) -> ParseResult<String> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' {
                out.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        self.expect('%')?;
        out.push('%');
        Ok(out)
    }

    fn attribute(&mut self) -> ParseResult<AttributeSelector> {
        self.expect('[')?;
        self.skip_space();
        let name = self.name()?;
        self.skip_space();
        let mut matcher = None;
        let mut modifier = None;
        if self.peek() != Some(']') {
            let mut op = String::new();
            if matches!(self.peek(), Some('~' | '|' | '^' | '$' | '*')) {
                op.extend(self.bump());
            }
            self.expect('=')?;
            op.push('=');
            self.skip_space();
            let (value, quoted) = match self.peek() {
                Some(quote @ ('"' | '\'')) => {
                    self.pos += 1;
                    let mut value = String::new();
                    loop {
                        match self.bump() {
                            Some(c) if c == quote => break,
                            Some('\\') => {
                                value.push('\\');
                                value.extend(self.bump());
                            }
                            Some(c) => value.push(c),
                            None => return Err(ParseError::unexpected_eof(self.len)),
                        }
                    }
                    (value, true)
                }
                _ => (self.name()?, false),
            };
            matcher = Some(AttributeMatcher { op, value, quoted });
            self.skip_space();
            if matches!(self.peek(), Some(c) if c.is_alphabetic()) {
                modifier = Some(self.name()?);
                self.skip_space();
            }
        }
        self.expect(']')?;
        Ok(AttributeSelector {
            name,
            matcher,
            modifier,
        })
    }

    fn pseudo(&mut self) -> ParseResult<PseudoSelector> {
        let start = self.offset();
        self.expect(':')?;
        let element = self.peek() == Some(':');
        if element {
            self.pos += 1;
        }
        let name = self.name()?;
        let argument = if self.peek() == Some('(') {
            self.pos += 1;
            let argument = if is_selector_pseudo(&name) || name.eq_ignore_ascii_case("slotted") {
                self.skip_space();
                let list = self.list()?;
                self.skip_space();
                PseudoArgument::Selector(list)
            } else {
                PseudoArgument::Raw(self.raw_argument()?)
            };
            self.expect(')')?;
            Some(argument)
        } else {
            None
        };
        let pseudo = PseudoSelector {
            name,
            element,
            argument,
        };
        pseudo
            .validate_scope()
            .map_err(|message| ParseError::invalid_syntax(start, message))?;
        Ok(pseudo)
    }

    /// Balanced text up to the closing paren, e.g. `2n + 1`.
    fn raw_argument(&mut self) -> ParseResult<String> {
        let mut depth = 0;
        let mut out = String::new();
        loop {
            match self.peek() {
                Some(')') if depth == 0 => break,
                Some(c) => {
                    match c {
                        '(' => depth += 1,
                        ')' => depth -= 1,
                        _ => {}
                    }
                    out.push(c);
                    self.pos += 1;
                }
                None => return Err(ParseError::unexpected_eof(self.len)),
            }
        }
        Ok(out.trim().to_string())
    }
}
