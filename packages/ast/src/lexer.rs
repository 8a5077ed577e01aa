//! Lexer for value text using logos.
//!
//! Whitespace is significant in values (it separates space-list items and
//! disambiguates `a -b` from `a - b`), so it is emitted as a token rather
//! than skipped.

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/")]
pub enum Token<'src> {
    #[regex(r"[ \t\r\n\f]+")]
    Space,

    // `10`, `.5`, `1.5em`, `50%`
    #[regex(r"([0-9]+(\.[0-9]+)?|\.[0-9]+)(%|[a-zA-Z]+)?", |lex| lex.slice())]
    Number(&'src str),

    #[regex(r"#[a-zA-Z0-9_-]+", |lex| lex.slice())]
    Hash(&'src str),

    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_-]*", |lex| &lex.slice()[1..])]
    Variable(&'src str),

    // `theme.$primary`
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_-]*\.\$[a-zA-Z_][a-zA-Z0-9_-]*", |lex| lex.slice())]
    NamespacedVariable(&'src str),

    // `rgb(`, `math.round(`; the slice excludes the paren
    #[regex(r"-{0,2}[a-zA-Z_][a-zA-Z0-9_-]*(\.[a-zA-Z_][a-zA-Z0-9_-]*)?\(", |lex| {
        let s = lex.slice();
        &s[..s.len() - 1]
    })]
    FunctionStart(&'src str),

    // Unquoted `url(...)`; the slice is the inner text
    #[regex(r#"url\([^)"'\s]*\)"#, |lex| {
        let s = lex.slice();
        &s[4..s.len() - 1]
    })]
    Url(&'src str),

    #[regex(r"-{0,2}[a-zA-Z_][a-zA-Z0-9_-]*", |lex| lex.slice())]
    Ident(&'src str),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    DoubleQuoted(&'src str),

    #[regex(r"'([^'\\]|\\.)*'", |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    SingleQuoted(&'src str),

    #[token("#{")]
    InterpolationStart,
    #[token("}")]
    RBrace,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    StarStar,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Lte,
    #[token(">")]
    Gt,
    #[token(">=")]
    Gte,
    #[token("=")]
    Eq,
    #[token("!")]
    Bang,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("...")]
    Ellipsis,
}

impl<'src> Token<'src> {
    /// Short description for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Token::Space => "whitespace".to_string(),
            Token::Number(s)
            | Token::Hash(s)
            | Token::NamespacedVariable(s)
            | Token::Ident(s) => (*s).to_string(),
            Token::Variable(s) => format!("${}", s),
            Token::FunctionStart(s) => format!("{}(", s),
            Token::Url(s) => format!("url({})", s),
            Token::DoubleQuoted(s) => format!("\"{}\"", s),
            Token::SingleQuoted(s) => format!("'{}'", s),
            Token::InterpolationStart => "#{".to_string(),
            Token::RBrace => "}".to_string(),
            Token::Plus => "+".to_string(),
            Token::Minus => "-".to_string(),
            Token::Star => "*".to_string(),
            Token::StarStar => "**".to_string(),
            Token::Slash => "/".to_string(),
            Token::Percent => "%".to_string(),
            Token::EqEq => "==".to_string(),
            Token::NotEq => "!=".to_string(),
            Token::Lt => "<".to_string(),
            Token::Lte => "<=".to_string(),
            Token::Gt => ">".to_string(),
            Token::Gte => ">=".to_string(),
            Token::Eq => "=".to_string(),
            Token::Bang => "!".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::LBracket => "[".to_string(),
            Token::RBracket => "]".to_string(),
            Token::Comma => ",".to_string(),
            Token::Colon => ":".to_string(),
            Token::Ellipsis => "...".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken<'src> {
    pub token: Token<'src>,
    pub span: TokenSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub span: TokenSpan,
}

/// Lex value text into tokens with spans.
pub fn lex(source: &str) -> impl Iterator<Item = Result<SpannedToken<'_>, LexError>> + '_ {
    Token::lexer(source).spanned().map(|(result, span)| {
        let span = TokenSpan {
            start: span.start,
            end: span.end,
        };
        match result {
            Ok(token) => Ok(SpannedToken { token, span }),
            Err(_) => Err(LexError { span }),
        }
    })
}
