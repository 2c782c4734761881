//! Token definitions and lexing.
//!
//! Keywords are upper-case only (`SELECT`, not `select`); `true`/`false`
//! are the boolean literals. Whitespace and comments are skipped by the
//! lexer itself, so the parser sees only meaningful tokens.

use logos::Logos;

use dtl_core::Span;

use crate::error::ParseError;

#[derive(Logos, Debug, Clone, PartialEq)]
#[cfg_attr(test, derive(serde::Serialize))]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
#[logos(skip r"/\*(?:[^*]|\*[^/])*\*/")]
pub enum Token<'src> {
    // --- keywords ---
    #[token("WITH")]
    With,

    #[token("AS")]
    As,

    #[token("SELECT")]
    Select,

    #[token("DISTINCT")]
    Distinct,

    #[token("CONSECUTIVE")]
    Consecutive,

    #[token("FROM")]
    From,

    #[token("JOIN")]
    Join,

    #[token("ON")]
    On,

    #[token("USING")]
    Using,

    #[token("WHERE")]
    Where,

    #[token("GROUP")]
    Group,

    #[token("BY")]
    By,

    #[token("IMPORT")]
    Import,

    #[token("EXPORT")]
    Export,

    #[token("TO")]
    To,

    #[token("true")]
    True,

    #[token("false")]
    False,

    // --- literals ---
    #[regex(r"[0-9]+\.[0-9]+")]
    Float(&'src str),

    #[regex(r"[0-9]+")]
    Integer(&'src str),

    /// Single-quoted string literal, quotes included.
    #[regex(r"'(?:[^'\\]|\\.)*'")]
    String(&'src str),

    /// Single-quoted bytes literal, `b` prefix and quotes included.
    #[regex(r"b'(?:[^'\\]|\\.)*'")]
    ByteString(&'src str),

    // --- identifiers ---
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Name(&'src str),

    /// Double-quoted identifier, quotes included.
    #[regex(r#""(?:[^"\\]|\\.)*""#)]
    QuotedName(&'src str),

    // --- symbols ---
    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token("(")]
    OpenParen,

    #[token(")")]
    CloseParen,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("=")]
    Eq,

    #[token("!=")]
    NotEq,

    #[token("<=")]
    LessThanEq,

    #[token("<")]
    LessThan,

    #[token(">=")]
    GreaterThanEq,

    #[token(">")]
    GreaterThan,
}

impl Token<'_> {
    /// Short description for "expected X, found Y" messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Name(name) => format!("identifier '{name}'"),
            Token::QuotedName(_) => "quoted identifier".to_owned(),
            Token::Integer(text) | Token::Float(text) => format!("number '{text}'"),
            Token::String(_) => "string literal".to_owned(),
            Token::ByteString(_) => "bytes literal".to_owned(),
            Token::With => "'WITH'".to_owned(),
            Token::As => "'AS'".to_owned(),
            Token::Select => "'SELECT'".to_owned(),
            Token::Distinct => "'DISTINCT'".to_owned(),
            Token::Consecutive => "'CONSECUTIVE'".to_owned(),
            Token::From => "'FROM'".to_owned(),
            Token::Join => "'JOIN'".to_owned(),
            Token::On => "'ON'".to_owned(),
            Token::Using => "'USING'".to_owned(),
            Token::Where => "'WHERE'".to_owned(),
            Token::Group => "'GROUP'".to_owned(),
            Token::By => "'BY'".to_owned(),
            Token::Import => "'IMPORT'".to_owned(),
            Token::Export => "'EXPORT'".to_owned(),
            Token::To => "'TO'".to_owned(),
            Token::True => "'true'".to_owned(),
            Token::False => "'false'".to_owned(),
            Token::Semicolon => "';'".to_owned(),
            Token::Comma => "','".to_owned(),
            Token::Dot => "'.'".to_owned(),
            Token::OpenParen => "'('".to_owned(),
            Token::CloseParen => "')'".to_owned(),
            Token::Star => "'*'".to_owned(),
            Token::Slash => "'/'".to_owned(),
            Token::Plus => "'+'".to_owned(),
            Token::Minus => "'-'".to_owned(),
            Token::Eq => "'='".to_owned(),
            Token::NotEq => "'!='".to_owned(),
            Token::LessThan => "'<'".to_owned(),
            Token::LessThanEq => "'<='".to_owned(),
            Token::GreaterThan => "'>'".to_owned(),
            Token::GreaterThanEq => "'>='".to_owned(),
        }
    }
}

/// Tokenize a whole script. Fails on the first character no token matches.
pub fn lex(source: &str) -> Result<Vec<(Token<'_>, Span)>, ParseError> {
    let mut tokens = Vec::new();
    for (result, range) in Token::lexer(source).spanned() {
        let span = Span::from(range);
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                let fragment = &source[span.start as usize..span.end as usize];
                return Err(ParseError::new(
                    format!("unexpected character sequence '{fragment}'"),
                    span,
                ));
            }
        }
    }
    Ok(tokens)
}
