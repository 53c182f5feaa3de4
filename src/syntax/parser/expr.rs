use crate::ast::*;
use crate::lexeme::Lexeme;
use crate::span::Spanned;

use super::{PResult, Parser};

impl Parser {
    pub(super) fn parse_expr(&mut self) -> PResult<Spanned<SourceExpr>> {
        self.enter_nesting()?;
        let expr = self.parse_expr_bp(0);
        self.exit_nesting();
        expr
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> PResult<Spanned<SourceExpr>> {
        let mut lhs = self.parse_unary()?;

        // Each fold nests `lhs` one level deeper; the levels are held until
        // the whole chain is parsed.
        let mut folds = 0;
        let result = loop {
            let Some(op) = binary_op(self.peek()) else {
                break Ok(lhs);
            };
            let (l_bp, r_bp) = op.binding_power();
            if l_bp < min_bp {
                break Ok(lhs);
            }

            self.advance(); // consume operator
            folds += 1;
            if let Err(e) = self.enter_nesting() {
                break Err(e);
            }
            match self.parse_expr_bp(r_bp) {
                Ok(rhs) => lhs = SourceExpr::binary(op, lhs, rhs),
                Err(e) => break Err(e),
            }
        };
        self.exit_nesting_by(folds);
        result
    }

    fn parse_unary(&mut self) -> PResult<Spanned<SourceExpr>> {
        let op = match self.peek() {
            Lexeme::Bang => UnOp::Not,
            Lexeme::Minus => UnOp::Neg,
            Lexeme::Tilde => UnOp::BitNot,
            _ => {
                let primary = self.parse_primary()?;
                return self.parse_postfix(primary);
            }
        };
        let start = self.current_span();
        self.advance();
        self.enter_nesting()?;
        let operand = self.parse_unary();
        self.exit_nesting();
        let operand = operand?;
        let span = start.merge(operand.span);
        Ok(Spanned::new(
            SourceExpr::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// `.field` chains, nesting one level per field.
    fn parse_postfix(&mut self, mut expr: Spanned<SourceExpr>) -> PResult<Spanned<SourceExpr>> {
        let mut fields = 0;
        let result = loop {
            if !self.eat(&Lexeme::Dot) {
                break Ok(expr);
            }
            fields += 1;
            if let Err(e) = self.enter_nesting() {
                break Err(e);
            }
            let field = match self.expect_ident() {
                Ok(field) => field,
                Err(e) => break Err(e),
            };
            let span = expr.span.merge(field.span);
            expr = Spanned::new(
                SourceExpr::Member {
                    object: Box::new(expr),
                    field,
                },
                span,
            );
        };
        self.exit_nesting_by(fields);
        result
    }

    fn parse_primary(&mut self) -> PResult<Spanned<SourceExpr>> {
        let start = self.current_span();

        let literal = match self.peek().clone() {
            Lexeme::Integer(n) => Literal::Int(n),
            Lexeme::Hex(bytes) => Literal::Bytes(bytes),
            Lexeme::Str(s) => Literal::Str(s),
            Lexeme::True => Literal::Bool(true),
            Lexeme::False => Literal::Bool(false),
            Lexeme::State => {
                self.advance();
                return Ok(Spanned::new(SourceExpr::Ident("state".to_string()), start));
            }
            Lexeme::Coin => {
                self.advance();
                return Ok(Spanned::new(SourceExpr::Ident("coin".to_string()), start));
            }
            Lexeme::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&Lexeme::RParen)?;
                return Ok(inner);
            }
            Lexeme::Ident(name) => {
                self.advance();
                if !self.at(&Lexeme::LParen) {
                    return Ok(Spanned::new(SourceExpr::Ident(name), start));
                }
                let args = self.parse_args()?;
                let span = start.merge(self.prev_span());
                return Ok(Spanned::new(
                    SourceExpr::Call {
                        callee: Spanned::new(name, start),
                        args,
                    },
                    span,
                ));
            }
            _ => return Err(self.error_expected("expression")),
        };
        self.advance();
        Ok(Spanned::new(SourceExpr::Literal(literal), start))
    }

    /// `( expr, … )`
    pub(super) fn parse_args(&mut self) -> PResult<Vec<Spanned<SourceExpr>>> {
        self.expect(&Lexeme::LParen)?;
        let mut args = Vec::new();
        while !self.at(&Lexeme::RParen) {
            args.push(self.parse_expr()?);
            if !self.eat(&Lexeme::Comma) {
                break;
            }
        }
        self.expect(&Lexeme::RParen)?;
        Ok(args)
    }
}

fn binary_op(token: &Lexeme) -> Option<BinOp> {
    let op = match token {
        Lexeme::OrOr => BinOp::Or,
        Lexeme::AndAnd => BinOp::And,
        Lexeme::Pipe => BinOp::BitOr,
        Lexeme::Caret => BinOp::BitXor,
        Lexeme::Amp => BinOp::BitAnd,
        Lexeme::EqEq => BinOp::Eq,
        Lexeme::NotEq => BinOp::NotEq,
        Lexeme::StrGt => BinOp::StrGt,
        Lexeme::Lt => BinOp::Lt,
        Lexeme::Gt => BinOp::Gt,
        Lexeme::LtEq => BinOp::LtEq,
        Lexeme::GtEq => BinOp::GtEq,
        Lexeme::Shl => BinOp::Shl,
        Lexeme::Shr => BinOp::Shr,
        Lexeme::Plus => BinOp::Add,
        Lexeme::Minus => BinOp::Sub,
        Lexeme::Star => BinOp::Mul,
        Lexeme::Slash => BinOp::Div,
        Lexeme::Percent => BinOp::Mod,
        _ => return None,
    };
    Some(op)
}

/// Binary operator a compound-assignment token desugars to.
pub(super) fn compound_op(token: &Lexeme) -> Option<BinOp> {
    match token {
        Lexeme::PlusEq => Some(BinOp::Add),
        Lexeme::MinusEq => Some(BinOp::Sub),
        Lexeme::StarEq => Some(BinOp::Mul),
        Lexeme::SlashEq => Some(BinOp::Div),
        Lexeme::PercentEq => Some(BinOp::Mod),
        _ => None,
    }
}
