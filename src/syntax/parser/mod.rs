//! Recursive-descent parser: tokens → [`CoinDecl`].
//!
//! Fail-fast: the first unexpected token aborts with a [`ParseError`].
//! Nesting of blocks and expressions is bounded by `max_depth`.

mod expr;
mod items;
mod stmt;

use crate::ast::*;
use crate::error::ParseError;
use crate::lexeme::Lexeme;
use crate::span::{Span, Spanned};

pub const MAX_NESTING_DEPTH: u32 = 256;

pub(crate) type PResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<Spanned<Lexeme>>,
    pos: usize,
    depth: u32,
    max_depth: u32,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned<Lexeme>>) -> Self {
        Self::with_max_depth(tokens, MAX_NESTING_DEPTH)
    }

    pub fn with_max_depth(mut tokens: Vec<Spanned<Lexeme>>, max_depth: u32) -> Self {
        if tokens.last().map(|t| &t.node) != Some(&Lexeme::Eof) {
            let end = tokens.last().map(|t| t.span.end).unwrap_or(0);
            tokens.push(Spanned::new(Lexeme::Eof, Span::new(0, end, end)));
        }
        Self {
            tokens,
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    /// `@decorator* coin Name { item* }`
    pub fn parse_coin(mut self) -> PResult<CoinDecl> {
        let decorators = self.parse_decorators()?;
        self.expect(&Lexeme::Coin)?;
        let name = self.expect_ident()?;
        self.expect(&Lexeme::LBrace)?;

        let mut items = Vec::new();
        while !self.at(&Lexeme::RBrace) {
            if self.at(&Lexeme::Eof) {
                return Err(self.error_expected("'}' to close the coin body"));
            }
            items.push(self.parse_item()?);
        }
        self.expect(&Lexeme::RBrace)?;
        self.expect(&Lexeme::Eof)?;

        tracing::debug!(coin = %name.node, items = items.len(), "parsed coin");
        Ok(CoinDecl {
            name,
            decorators,
            items,
        })
    }

    /// `@name` or `@name(args…)`, repeated.
    fn parse_decorators(&mut self) -> PResult<Vec<Spanned<Decorator>>> {
        let mut decorators = Vec::new();
        while self.at(&Lexeme::At) {
            let start = self.current_span();
            self.advance();
            let name = self.expect_ident()?;
            let args = if self.at(&Lexeme::LParen) {
                self.parse_args()?
            } else {
                Vec::new()
            };
            let span = start.merge(self.prev_span());
            decorators.push(Spanned::new(Decorator { name, args }, span));
        }
        Ok(decorators)
    }

    // ─── Nesting ───────────────────────────────────────────────────

    fn enter_nesting(&mut self) -> PResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParseError {
                span: self.current_span(),
                expected: format!("at most {} levels of nesting", self.max_depth),
                found: "expression too deep".to_string(),
            });
        }
        Ok(())
    }

    fn exit_nesting(&mut self) {
        self.depth -= 1;
    }

    fn exit_nesting_by(&mut self, levels: u32) {
        self.depth -= levels;
    }

    // ─── Token helpers ─────────────────────────────────────────────

    fn peek(&self) -> &Lexeme {
        &self.tokens[self.pos].node
    }

    fn peek_at(&self, offset: usize) -> &Lexeme {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].node
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current_span()
        }
    }

    fn advance(&mut self) -> Spanned<Lexeme> {
        let tok = self.tokens[self.pos].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, token: &Lexeme) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn eat(&mut self, token: &Lexeme) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Lexeme) -> PResult<Span> {
        if self.at(token) {
            let span = self.current_span();
            self.advance();
            Ok(span)
        } else {
            Err(self.error_expected(&token.description()))
        }
    }

    fn expect_ident(&mut self) -> PResult<Spanned<String>> {
        if let Lexeme::Ident(name) = self.peek().clone() {
            let span = self.current_span();
            self.advance();
            Ok(Spanned::new(name, span))
        } else {
            Err(self.error_expected("identifier"))
        }
    }

    fn error_expected(&self, expected: &str) -> ParseError {
        ParseError {
            span: self.current_span(),
            expected: expected.to_string(),
            found: self.peek().description(),
        }
    }
}
