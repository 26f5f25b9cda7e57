//! Script tokens, lexed with logos

use logos::Logos;
use std::ops::Range;

/// Token kinds of the patch script language
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
pub enum TokenKind {
    #[token("this")]
    This,
    #[token("if")]
    If,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    #[token("=>")]
    Arrow,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,

    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,

    #[regex(r"-?[0-9]+\.[0-9]+")]
    Float,
    #[regex(r"-?[0-9]+")]
    Int,
    #[regex(r#""([^"\\]|\\.)*""#)]
    #[regex(r"'([^'\\]|\\.)*'")]
    Str,
    #[regex("[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    // Not produced by logos
    Error,
    Eof,
}

impl TokenKind {
    /// Human-readable name for diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::This => "'this'",
            TokenKind::If => "'if'",
            TokenKind::True | TokenKind::False => "boolean",
            TokenKind::Null => "'null'",
            TokenKind::Arrow => "'=>'",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::AndAnd => "'&&'",
            TokenKind::OrOr => "'||'",
            TokenKind::Bang => "'!'",
            TokenKind::Dot => "'.'",
            TokenKind::Comma => "','",
            TokenKind::Semi => "';'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Float | TokenKind::Int => "number",
            TokenKind::Str => "string",
            TokenKind::Ident => "identifier",
            TokenKind::Error => "invalid character",
            TokenKind::Eof => "end of script",
        }
    }
}

/// A token with its byte span
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.clone()]
    }
}

/// Tokenize a script, always ending with `Eof`
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);

    while let Some(result) = lexer.next() {
        let kind = result.unwrap_or(TokenKind::Error);
        tokens.push(Token {
            kind,
            span: lexer.span(),
        });
    }

    let end = source.len();
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: end..end,
    });
    tokens
}
