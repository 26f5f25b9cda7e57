//! Recursive descent parser for patch scripts
//!
//! ```text
//! script    := (statement ';'*)* EOF
//! statement := 'this' '.' IDENT '.' method
//! method    := 'remove_where' '(' lambda ')'
//!            | 'map' '(' IDENT '=>' map_body ')'
//!            | 'push' '(' operand ')'
//! map_body  := 'if' expr block | block | action
//! block     := '{' (action ';'*)* '}'
//! action    := IDENT '.' IDENT '.' ('push' '(' operand ')' | 'remove_where' '(' lambda ')')
//! lambda    := IDENT '=>' expr
//! expr      := and ('||' and)*
//! and       := unary ('&&' unary)*
//! unary     := '!' unary | '(' expr ')' | operand (('==' | '!=') operand)?
//! operand   := literal | IDENT ('.' IDENT)*
//! ```

use crate::ast::{Action, CmpOp, Expr, Operand, Statement};
use crate::token::{tokenize, Token, TokenKind};
use linkdb_core::Scalar;
use thiserror::Error;

/// Script syntax error with the byte offset it was detected at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct ScriptParseError {
    pub message: String,
    pub offset: usize,
}

impl From<ScriptParseError> for linkdb_core::Error {
    fn from(e: ScriptParseError) -> Self {
        linkdb_core::Error::InvalidScript {
            reason: e.to_string(),
        }
    }
}

type ParseResult<T> = Result<T, ScriptParseError>;

/// Deepest expression tree a script may build. Each `!`, parenthesis and
/// `&&`/`||` operator adds a level.
pub const MAX_EXPR_DEPTH: usize = 64;

pub(crate) fn parse(source: &str) -> ParseResult<Vec<Statement>> {
    let tokens = tokenize(source);
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        scopes: Vec::new(),
        depth: 0,
    };
    parser.parse_script()
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    /// Lambda parameters currently in scope, innermost last
    scopes: Vec<String>,
    /// Expression levels opened above the current token
    depth: usize,
}

impl<'s> Parser<'s> {
    fn peek(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos];
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: impl Into<String>) -> ScriptParseError {
        ScriptParseError {
            message: message.into(),
            offset: self.tokens[self.pos].span.start,
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<&Token> {
        if self.peek() == kind {
            Ok(self.advance())
        } else {
            Err(self.error(format!(
                "expected {}, found {}",
                kind.describe(),
                self.peek().describe()
            )))
        }
    }

    fn ident(&mut self) -> ParseResult<String> {
        let source = self.source;
        let tok = self.expect(TokenKind::Ident)?;
        Ok(tok.text(source).to_string())
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_script(&mut self) -> ParseResult<Vec<Statement>> {
        let mut statements = Vec::new();
        loop {
            while self.eat(TokenKind::Semi) {}
            if self.peek() == TokenKind::Eof {
                break;
            }
            statements.push(self.parse_statement()?);
        }
        if statements.is_empty() {
            return Err(self.error("script has no statements"));
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        self.expect(TokenKind::This)?;
        self.expect(TokenKind::Dot)?;
        let field = self.ident()?;
        self.expect(TokenKind::Dot)?;
        let method_at = self.pos;
        let method = self.ident()?;
        self.expect(TokenKind::LParen)?;

        let statement = match method.as_str() {
            "remove_where" => {
                let (param, predicate) = self.parse_lambda()?;
                Statement::RemoveWhere {
                    field,
                    param,
                    predicate,
                }
            }
            "map" => {
                let param = self.ident()?;
                self.expect(TokenKind::Arrow)?;
                self.scopes.push(param.clone());
                let body = self.parse_map_body();
                self.scopes.pop();
                let (condition, actions) = body?;
                Statement::Map {
                    field,
                    param,
                    condition,
                    actions,
                }
            }
            "push" => Statement::Push {
                field,
                value: self.parse_operand()?,
            },
            other => {
                self.pos = method_at;
                return Err(self.error(format!("unknown list operation '{}'", other)));
            }
        };

        self.expect(TokenKind::RParen)?;
        Ok(statement)
    }

    fn parse_lambda(&mut self) -> ParseResult<(String, Expr)> {
        let param = self.ident()?;
        self.expect(TokenKind::Arrow)?;
        self.scopes.push(param.clone());
        let predicate = self.parse_expr();
        self.scopes.pop();
        Ok((param, predicate?))
    }

    fn parse_map_body(&mut self) -> ParseResult<(Option<Expr>, Vec<Action>)> {
        if self.eat(TokenKind::If) {
            let condition = self.parse_expr()?;
            let actions = self.parse_block()?;
            Ok((Some(condition), actions))
        } else if self.peek() == TokenKind::LBrace {
            Ok((None, self.parse_block()?))
        } else {
            Ok((None, vec![self.parse_action()?]))
        }
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Action>> {
        self.expect(TokenKind::LBrace)?;
        let mut actions = Vec::new();
        loop {
            while self.eat(TokenKind::Semi) {}
            if self.eat(TokenKind::RBrace) {
                break;
            }
            actions.push(self.parse_action()?);
        }
        Ok(actions)
    }

    fn parse_action(&mut self) -> ParseResult<Action> {
        let target_at = self.pos;
        let target = self.ident()?;
        if self.scopes.last() != Some(&target) {
            self.pos = target_at;
            return Err(self.error(format!(
                "actions must target the map element, found '{}'",
                target
            )));
        }
        self.expect(TokenKind::Dot)?;
        let field = self.ident()?;
        self.expect(TokenKind::Dot)?;
        let method_at = self.pos;
        let method = self.ident()?;
        self.expect(TokenKind::LParen)?;

        let action = match method.as_str() {
            "push" => Action::Push {
                field,
                value: self.parse_operand()?,
            },
            "remove_where" => {
                let (param, predicate) = self.parse_lambda()?;
                Action::RemoveWhere {
                    field,
                    param,
                    predicate,
                }
            }
            other => {
                self.pos = method_at;
                return Err(self.error(format!("unknown element operation '{}'", other)));
            }
        };
        self.expect(TokenKind::RParen)?;
        Ok(action)
    }

    fn parse_expr(&mut self) -> ParseResult<Expr> {
        let base = self.depth;
        let result = self.parse_or_chain();
        self.depth = base;
        result
    }

    fn parse_or_chain(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(TokenKind::OrOr) {
            self.descend()?;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let base = self.depth;
        let result = self.parse_and_chain();
        self.depth = base;
        result
    }

    fn parse_and_chain(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        while self.eat(TokenKind::AndAnd) {
            self.descend()?;
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.eat(TokenKind::Bang) {
            self.descend()?;
            let inner = self.parse_unary();
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner?)));
        }
        if self.eat(TokenKind::LParen) {
            self.descend()?;
            let inner = self.parse_expr();
            self.depth -= 1;
            let inner = inner?;
            self.expect(TokenKind::RParen)?;
            return Ok(inner);
        }
        let left = self.parse_operand()?;
        let op = match self.peek() {
            TokenKind::EqEq => CmpOp::Eq,
            TokenKind::NotEq => CmpOp::Ne,
            _ => return Ok(Expr::Truthy(left)),
        };
        self.advance();
        let right = self.parse_operand()?;
        Ok(Expr::Compare { left, op, right })
    }

    /// Open one expression level, failing past [`MAX_EXPR_DEPTH`].
    fn descend(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_EXPR_DEPTH {
            return Err(self.error_at(
                self.pos.saturating_sub(1),
                format!("expression nested deeper than {} levels", MAX_EXPR_DEPTH),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn parse_operand(&mut self) -> ParseResult<Operand> {
        let source = self.source;
        let at = self.pos;
        let tok = self.advance().clone();
        let text = tok.text(source);
        let literal = match tok.kind {
            TokenKind::True => Scalar::Bool(true),
            TokenKind::False => Scalar::Bool(false),
            TokenKind::Null => Scalar::Null,
            TokenKind::Int => text
                .parse::<i64>()
                .map(Scalar::Int)
                .map_err(|e| self.error_at(at, format!("invalid integer: {}", e)))?,
            TokenKind::Float => text
                .parse::<f64>()
                .map(Scalar::Float)
                .map_err(|e| self.error_at(at, format!("invalid number: {}", e)))?,
            TokenKind::Str => Scalar::String(unescape(&text[1..text.len() - 1])),
            TokenKind::Ident => return self.parse_reference(at, text.to_string()),
            other => {
                return Err(self.error_at(
                    at,
                    format!("expected a value, found {}", other.describe()),
                ))
            }
        };
        Ok(Operand::Literal(literal))
    }

    fn parse_reference(&mut self, at: usize, name: String) -> ParseResult<Operand> {
        let mut path = Vec::new();
        while self.peek() == TokenKind::Dot {
            self.advance();
            path.push(self.ident()?);
        }
        if self.scopes.iter().any(|s| s == &name) {
            Ok(Operand::Var { name, path })
        } else if path.is_empty() {
            Ok(Operand::Param(name))
        } else {
            Err(self.error_at(
                at,
                format!("'{}' is a script parameter and has no fields", name),
            ))
        }
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> ScriptParseError {
        ScriptParseError {
            message: message.into(),
            offset: self.tokens[pos].span.start,
        }
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
