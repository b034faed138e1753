//! Hand-written recursive-descent parser for the config grammar.
//!
//! ```text
//! config        := statement* EOF
//! statement     := implicit_decl | enforce_decl | perm_decl
//! implicit_decl := "implicit" ident string? ";"
//! enforce_decl  := "enforce" (string ident? | ident) ";"
//! perm_decl     := ident string? ("->" restriction ("," restriction)*)? ";"
//! restriction   := expr string?
//! expr          := and ("|" and)*
//! and           := atom ("&" atom)*
//! atom          := "!" atom | "(" expr ")" | ident
//! ```
//!
//! An identifier atom `p` denotes "the context holds permission `p`".

use ward_core::{Config, Declaration, Enforcement, Expr, PermName, Restriction};

use crate::lexer::{lex, SpannedToken, Token};
use crate::ConfigError;

/// Parse one config file into a [`Config`].
pub fn parse_config(source: &str) -> Result<Config, ConfigError> {
    let tokens = lex(source)?;
    let mut stream = TokenStream::new(&tokens);
    let mut config = Config::new();

    while !stream.at_end() {
        parse_statement(&mut stream, &mut config)?;
    }
    Ok(config)
}

/// Token cursor with single-token lookahead.
struct TokenStream<'a> {
    tokens: &'a [SpannedToken],
    pos: usize,
}

impl<'a> TokenStream<'a> {
    fn new(tokens: &'a [SpannedToken]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos).map(|t| &t.token);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Line of the current token, or of the last token at EOF.
    fn line(&self) -> u32 {
        self.tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn expect(&mut self, expected: Token) -> Result<(), ConfigError> {
        match self.peek() {
            Some(t) if std::mem::discriminant(t) == std::mem::discriminant(&expected) => {
                self.advance();
                Ok(())
            }
            found => Err(self.unexpected(found.cloned(), &format!("expected {expected}"))),
        }
    }

    fn unexpected(&self, found: Option<Token>, context: &str) -> ConfigError {
        let message = match found {
            Some(token) => format!("{context}, found {token}"),
            None => format!("{context}, found end of input"),
        };
        ConfigError::Parse {
            line: self.line(),
            message,
        }
    }

    fn ident(&mut self, context: &str) -> Result<String, ConfigError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            found => Err(self.unexpected(found.cloned(), context)),
        }
    }

    /// Consume a string literal if one is next.
    fn opt_string(&mut self) -> Option<String> {
        match self.peek() {
            Some(Token::Str(s)) => {
                let s = s.clone();
                self.advance();
                Some(s)
            }
            _ => None,
        }
    }
}

fn parse_statement(stream: &mut TokenStream, config: &mut Config) -> Result<(), ConfigError> {
    match stream.peek() {
        Some(Token::Implicit) => parse_implicit(stream, config),
        Some(Token::Enforce) => parse_enforce(stream, config),
        Some(Token::Ident(_)) => parse_permission(stream, config),
        found => Err(stream.unexpected(found.cloned(), "expected a declaration")),
    }
}

fn parse_implicit(stream: &mut TokenStream, config: &mut Config) -> Result<(), ConfigError> {
    stream.expect(Token::Implicit)?;
    let name = stream.ident("expected permission name after 'implicit'")?;
    let description = stream.opt_string();
    stream.expect(Token::Semi)?;

    config.declare(
        PermName::new(name),
        Declaration {
            implicit: true,
            description,
            restrictions: Vec::new(),
        },
    );
    Ok(())
}

fn parse_enforce(stream: &mut TokenStream, config: &mut Config) -> Result<(), ConfigError> {
    stream.expect(Token::Enforce)?;
    let enforcement = match stream.peek() {
        Some(Token::Str(path)) => {
            let path = path.clone();
            stream.advance();
            match stream.peek() {
                Some(Token::Ident(name)) => {
                    let name = name.clone();
                    stream.advance();
                    Enforcement::PathFunction(path, name)
                }
                _ => Enforcement::Path(path),
            }
        }
        Some(Token::Ident(name)) => {
            let name = name.clone();
            stream.advance();
            Enforcement::Function(name)
        }
        found => {
            return Err(stream.unexpected(
                found.cloned(),
                "expected a path string or function name after 'enforce'",
            ))
        }
    };
    stream.expect(Token::Semi)?;
    config.enforcements.push(enforcement);
    Ok(())
}

fn parse_permission(stream: &mut TokenStream, config: &mut Config) -> Result<(), ConfigError> {
    let name = stream.ident("expected permission name")?;
    let description = stream.opt_string();

    let mut restrictions = Vec::new();
    if matches!(stream.peek(), Some(Token::Arrow)) {
        stream.advance();
        loop {
            let expr = parse_expr(stream)?;
            let description = stream.opt_string();
            restrictions.push(Restriction { expr, description });
            match stream.peek() {
                Some(Token::Comma) => {
                    stream.advance();
                }
                _ => break,
            }
        }
    }
    stream.expect(Token::Semi)?;

    config.declare(
        PermName::new(name),
        Declaration {
            implicit: false,
            description,
            restrictions,
        },
    );
    Ok(())
}

fn parse_expr(stream: &mut TokenStream) -> Result<Expr, ConfigError> {
    let mut expr = parse_and(stream)?;
    while matches!(stream.peek(), Some(Token::Pipe)) {
        stream.advance();
        expr = expr.or(parse_and(stream)?);
    }
    Ok(expr)
}

fn parse_and(stream: &mut TokenStream) -> Result<Expr, ConfigError> {
    let mut expr = parse_atom(stream)?;
    while matches!(stream.peek(), Some(Token::Amp)) {
        stream.advance();
        expr = expr.and(parse_atom(stream)?);
    }
    Ok(expr)
}

fn parse_atom(stream: &mut TokenStream) -> Result<Expr, ConfigError> {
    match stream.peek() {
        Some(Token::Bang) => {
            stream.advance();
            Ok(parse_atom(stream)?.not())
        }
        Some(Token::LParen) => {
            stream.advance();
            let expr = parse_expr(stream)?;
            stream.expect(Token::RParen)?;
            Ok(expr)
        }
        Some(Token::Ident(name)) => {
            let name = name.clone();
            stream.advance();
            Ok(Expr::has(name.as_str()))
        }
        found => Err(stream.unexpected(found.cloned(), "expected a restriction expression")),
    }
}
