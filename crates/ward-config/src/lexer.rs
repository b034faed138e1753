//! Lexical analysis for ward config files, using logos.
//!
//! Comments run from `#` to end of line. String literals support `\"` and
//! `\\` escapes.

use std::fmt;

use logos::Logos;

use crate::ConfigError;

/// A config-file token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"#[^\n]*")]
pub enum Token {
    /// Keyword `implicit`
    #[token("implicit")]
    Implicit,
    /// Keyword `enforce`
    #[token("enforce")]
    Enforce,

    #[token("->")]
    Arrow,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token("!")]
    Bang,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    Str(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Implicit => f.write_str("'implicit'"),
            Token::Enforce => f.write_str("'enforce'"),
            Token::Arrow => f.write_str("'->'"),
            Token::Semi => f.write_str("';'"),
            Token::Comma => f.write_str("','"),
            Token::Bang => f.write_str("'!'"),
            Token::Amp => f.write_str("'&'"),
            Token::Pipe => f.write_str("'|'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Ident(name) => write!(f, "identifier '{name}'"),
            Token::Str(_) => f.write_str("string literal"),
        }
    }
}

/// Strip the surrounding quotes and resolve escapes.
fn unescape(slice: &str) -> String {
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// A token together with the 1-based source line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub line: u32,
}

/// Tokenize a whole config file.
pub fn lex(source: &str) -> Result<Vec<SpannedToken>, ConfigError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);
    while let Some(result) = lexer.next() {
        let line = line_of(source, lexer.span().start);
        match result {
            Ok(token) => tokens.push(SpannedToken { token, line }),
            Err(()) => {
                return Err(ConfigError::Lex {
                    line,
                    text: lexer.slice().to_string(),
                })
            }
        }
    }
    Ok(tokens)
}

fn line_of(source: &str, offset: usize) -> u32 {
    source[..offset].bytes().filter(|&b| b == b'\n').count() as u32 + 1
}
