use crate::ast::*;
use crate::lexeme::Lexeme;
use crate::span::Spanned;

use super::{PResult, Parser};

impl Parser {
    pub(super) fn parse_item(&mut self) -> PResult<Spanned<Item>> {
        let start = self.current_span();

        if self.at(&Lexeme::At) {
            let decorators = self.parse_decorators()?;
            if !self.at(&Lexeme::Action) {
                return Err(self.error_expected("'action' after decorators"));
            }
            let action = self.parse_action(decorators)?;
            return Ok(Spanned::new(Item::Action(action), start.merge(self.prev_span())));
        }

        let item = match self.peek() {
            Lexeme::Storage => Item::Storage(self.parse_storage()?),
            Lexeme::State => Item::State(self.parse_state_block()?),
            Lexeme::Const => Item::Const(self.parse_const()?),
            Lexeme::Action => Item::Action(self.parse_action(Vec::new())?),
            Lexeme::Event => Item::Event(self.parse_event()?),
            Lexeme::Function | Lexeme::Inline => Item::Function(self.parse_function()?),
            Lexeme::Modifier => Item::Modifier(self.parse_modifier()?),
            _ => {
                return Err(self.error_expected(
                    "an item (storage, state, const, action, event, function or modifier)",
                ))
            }
        };
        Ok(Spanned::new(item, start.merge(self.prev_span())))
    }

    /// `storage <type> <name> = <expr>;`
    fn parse_storage(&mut self) -> PResult<StorageDecl> {
        self.expect(&Lexeme::Storage)?;
        let ty = self.parse_type()?;
        let name = self.expect_ident()?;
        self.expect(&Lexeme::Eq)?;
        let value = self.parse_expr()?;
        self.expect(&Lexeme::Semicolon)?;
        Ok(StorageDecl { ty, name, value })
    }

    /// `state { <type> <name>; … }`
    fn parse_state_block(&mut self) -> PResult<StateDecl> {
        self.expect(&Lexeme::State)?;
        self.expect(&Lexeme::LBrace)?;
        let mut fields = Vec::new();
        while !self.at(&Lexeme::RBrace) {
            let ty = self.parse_type()?;
            let name = self.expect_ident()?;
            self.expect(&Lexeme::Semicolon)?;
            fields.push(Param { ty, name });
        }
        self.expect(&Lexeme::RBrace)?;
        Ok(StateDecl { fields })
    }

    /// `const [<type>] <NAME> = <expr>;`
    fn parse_const(&mut self) -> PResult<ConstDecl> {
        self.expect(&Lexeme::Const)?;
        let ty = if matches!(self.peek(), Lexeme::Ident(_))
            && matches!(self.peek_at(1), Lexeme::Ident(_))
        {
            Some(self.parse_type()?)
        } else {
            None
        };
        let name = self.expect_ident()?;
        self.expect(&Lexeme::Eq)?;
        let value = self.parse_expr()?;
        self.expect(&Lexeme::Semicolon)?;
        Ok(ConstDecl { ty, name, value })
    }

    fn parse_action(&mut self, decorators: Vec<Spanned<Decorator>>) -> PResult<ActionDecl> {
        self.expect(&Lexeme::Action)?;
        let name = self.expect_ident()?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        let decorators = decorators.into_iter().map(action_decorator).collect();
        Ok(ActionDecl {
            name,
            decorators,
            params,
            body,
        })
    }

    /// `event <Name>(<type> <field>, …);`
    fn parse_event(&mut self) -> PResult<EventDecl> {
        self.expect(&Lexeme::Event)?;
        let name = self.expect_ident()?;
        let fields = self.parse_params()?;
        self.expect(&Lexeme::Semicolon)?;
        Ok(EventDecl { name, fields })
    }

    /// `[inline] function <name>(<params>) [-> <type>] { … }`
    fn parse_function(&mut self) -> PResult<FunctionDecl> {
        let inline = self.eat(&Lexeme::Inline);
        self.expect(&Lexeme::Function)?;
        let name = self.expect_ident()?;
        let params = self.parse_params()?;
        let ret = if self.eat(&Lexeme::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(FunctionDecl {
            name,
            inline,
            params,
            ret,
            body,
        })
    }

    fn parse_modifier(&mut self) -> PResult<ModifierDecl> {
        self.expect(&Lexeme::Modifier)?;
        let name = self.expect_ident()?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(ModifierDecl { name, params, body })
    }

    /// `(<type> <name>, …)`
    fn parse_params(&mut self) -> PResult<Vec<Param>> {
        self.expect(&Lexeme::LParen)?;
        let mut params = Vec::new();
        while !self.at(&Lexeme::RParen) {
            let ty = self.parse_type()?;
            let name = self.expect_ident()?;
            params.push(Param { ty, name });
            if !self.eat(&Lexeme::Comma) {
                break;
            }
        }
        self.expect(&Lexeme::RParen)?;
        Ok(params)
    }

    pub(super) fn parse_type(&mut self) -> PResult<Spanned<Type>> {
        let name = self.expect_ident()?;
        Ok(name.map(|n| Type::from_name(&n)))
    }
}

/// Classify a parsed decorator for an action.
fn action_decorator(decorator: Spanned<Decorator>) -> Spanned<ActionDecorator> {
    let Spanned { node, span } = decorator;
    let kind = match node.name.node.as_str() {
        "onlyAddress" => ActionDecorator::OnlyAddress(node.args),
        "stateful" if node.args.is_empty() => ActionDecorator::Stateful,
        _ => ActionDecorator::Modifier {
            name: node.name,
            args: node.args,
        },
    };
    Spanned::new(kind, span)
}
