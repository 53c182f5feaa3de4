use crate::ast::*;
use crate::lexeme::Lexeme;
use crate::span::{Span, Spanned};

use super::expr::compound_op;
use super::{PResult, Parser};

impl Parser {
    /// `{ stmt* }`
    pub(super) fn parse_block(&mut self) -> PResult<Block> {
        self.expect(&Lexeme::LBrace)?;
        self.enter_nesting()?;
        let mut stmts = Vec::new();
        while !self.at(&Lexeme::RBrace) {
            if self.at(&Lexeme::Eof) {
                return Err(self.error_expected("'}'"));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.exit_nesting();
        self.expect(&Lexeme::RBrace)?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> PResult<Spanned<Stmt>> {
        let start = self.current_span();
        let stmt = match self.peek().clone() {
            Lexeme::Let => self.parse_let()?,
            Lexeme::If => self.parse_if()?,
            Lexeme::Require => self.parse_require()?,
            Lexeme::Exception => self.parse_exception()?,
            Lexeme::Emit => self.parse_emit()?,
            Lexeme::Send => self.parse_send()?,
            Lexeme::Return => {
                self.advance();
                let value = if self.at(&Lexeme::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(&Lexeme::Semicolon)?;
                Stmt::Return(value)
            }
            Lexeme::State if self.peek_at(1) == &Lexeme::Dot && self.peek_at(3).is_assign_op() => {
                self.advance();
                self.advance();
                let field = self.expect_ident()?;
                let target = Spanned::new(Place::State(field.node), start.merge(field.span));
                self.parse_assign(target)?
            }
            Lexeme::Ident(name) if name == "_" && self.peek_at(1) == &Lexeme::Semicolon => {
                self.advance();
                self.advance();
                Stmt::Placeholder
            }
            Lexeme::Ident(_) if matches!(self.peek_at(1), Lexeme::Ident(_)) => {
                // `<type> name = value;`
                let ty = self.parse_type()?;
                let name = self.expect_ident()?;
                self.expect(&Lexeme::Eq)?;
                let value = self.parse_expr()?;
                self.expect(&Lexeme::Semicolon)?;
                Stmt::Let {
                    name,
                    ty: Some(ty),
                    value,
                }
            }
            Lexeme::Ident(_) if self.peek_at(1).is_assign_op() => {
                let name = self.expect_ident()?;
                let target = name.map(Place::Var);
                self.parse_assign(target)?
            }
            _ => {
                let expr = self.parse_expr()?;
                self.expect(&Lexeme::Semicolon)?;
                Stmt::Expr(expr)
            }
        };
        Ok(Spanned::new(stmt, start.merge(self.prev_span())))
    }

    /// `let x [: T] = e;`
    fn parse_let(&mut self) -> PResult<Stmt> {
        self.expect(&Lexeme::Let)?;
        let name = self.expect_ident()?;
        let ty = if self.eat(&Lexeme::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(&Lexeme::Eq)?;
        let value = self.parse_expr()?;
        self.expect(&Lexeme::Semicolon)?;
        Ok(Stmt::Let { name, ty, value })
    }

    /// Assignment after its target; `x op= e` becomes `x = x op e`.
    fn parse_assign(&mut self, target: Spanned<Place>) -> PResult<Stmt> {
        let op = compound_op(self.peek());
        let op_span = self.current_span();
        self.advance();
        let rhs = self.parse_expr()?;
        self.expect(&Lexeme::Semicolon)?;

        let value = match op {
            None => rhs,
            Some(op) => SourceExpr::binary(op, place_expr(&target, op_span), rhs),
        };
        Ok(Stmt::Assign { target, value })
    }

    /// `if (c) { … } [else if … | else { … }]`
    fn parse_if(&mut self) -> PResult<Stmt> {
        self.expect(&Lexeme::If)?;
        let cond = self.parse_expr()?;
        let then_block = self.parse_block()?;
        let else_block = if self.eat(&Lexeme::Else) {
            if self.at(&Lexeme::If) {
                let start = self.current_span();
                self.enter_nesting()?;
                let nested = self.parse_if();
                self.exit_nesting();
                let nested = nested?;
                Some(vec![Spanned::new(nested, start.merge(self.prev_span()))])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_block,
            else_block,
        })
    }

    /// `require(cond[, message]);`
    fn parse_require(&mut self) -> PResult<Stmt> {
        let keyword = self.expect(&Lexeme::Require)?;
        let mut args = self.parse_args()?.into_iter();
        self.expect(&Lexeme::Semicolon)?;
        let Some(cond) = args.next() else {
            return Err(self.arity_error(keyword, "a condition"));
        };
        let message = args.next();
        if args.next().is_some() {
            return Err(self.arity_error(keyword, "at most 2 arguments to 'require'"));
        }
        Ok(Stmt::Require { cond, message })
    }

    /// `exception([message]);`
    fn parse_exception(&mut self) -> PResult<Stmt> {
        let keyword = self.expect(&Lexeme::Exception)?;
        let mut args = if self.at(&Lexeme::LParen) {
            self.parse_args()?.into_iter()
        } else {
            Vec::new().into_iter()
        };
        self.expect(&Lexeme::Semicolon)?;
        let message = args.next();
        if args.next().is_some() {
            return Err(self.arity_error(keyword, "at most 1 argument to 'exception'"));
        }
        Ok(Stmt::Exception { message })
    }

    /// `emit Name(args…);` or `emit(Name, args…);`
    fn parse_emit(&mut self) -> PResult<Stmt> {
        self.expect(&Lexeme::Emit)?;
        let (event, args) = if self.eat(&Lexeme::LParen) {
            let event = self.expect_ident()?;
            let mut args = Vec::new();
            while self.eat(&Lexeme::Comma) {
                args.push(self.parse_expr()?);
            }
            self.expect(&Lexeme::RParen)?;
            (event, args)
        } else {
            let event = self.expect_ident()?;
            let args = self.parse_args()?;
            (event, args)
        };
        self.expect(&Lexeme::Semicolon)?;
        Ok(Stmt::Emit { event, args })
    }

    /// `send(recipient, amount[, memo]);`
    fn parse_send(&mut self) -> PResult<Stmt> {
        let keyword = self.expect(&Lexeme::Send)?;
        let args = self.parse_args()?;
        self.expect(&Lexeme::Semicolon)?;
        if !(2..=3).contains(&args.len()) {
            return Err(self.arity_error(keyword, "2 or 3 arguments to 'send'"));
        }
        let mut args = args.into_iter();
        match (args.next(), args.next()) {
            (Some(recipient), Some(amount)) => Ok(Stmt::Send {
                recipient,
                amount,
                memo: args.next(),
            }),
            _ => Err(self.arity_error(keyword, "2 or 3 arguments to 'send'")),
        }
    }

    fn arity_error(&self, keyword: Span, expected: &str) -> crate::error::ParseError {
        crate::error::ParseError {
            span: keyword.merge(self.prev_span()),
            expected: expected.to_string(),
            found: "a different number of arguments".to_string(),
        }
    }
}

/// Read-back of an assignment target, for desugared compound assignment.
fn place_expr(target: &Spanned<Place>, op_span: Span) -> Spanned<SourceExpr> {
    let span = target.span.merge(op_span);
    let expr = match &target.node {
        Place::Var(name) => SourceExpr::Ident(name.clone()),
        Place::State(field) => SourceExpr::Member {
            object: Box::new(Spanned::new(SourceExpr::Ident("state".to_string()), target.span)),
            field: Spanned::new(field.clone(), target.span),
        },
    };
    Spanned::new(expr, span)
}
