//! Coin-level symbol table: storage, constants, state, events, functions and
//! modifiers. Built once per coin and read-only while actions are lowered.

use std::collections::HashSet;

use indexmap::IndexMap;

use super::builder::Usage;
use super::builtins;
use crate::address::{decode_address, looks_like_address};
use crate::ast::{
    CoinDecl, ConstDecl, EventDecl, FunctionDecl, Item, Literal, ModifierDecl, SourceExpr, Stmt,
    Type, UnOp,
};
use crate::error::{GenerationError, GenerationErrorKind};
use crate::layer::StateSchema;
use crate::span::{Span, Spanned};
use crate::tree::Node;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Storage,
    Constant,
}

/// A compile-time value substituted wherever its name is used.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub ty: Option<Type>,
    pub value: Node,
    /// Features and functions the value needs in programs that use it.
    pub usage: Usage,
    pub span: Span,
}

#[derive(Debug, Default)]
pub struct SymbolTable<'a> {
    symbols: IndexMap<String, Symbol>,
    pub events: IndexMap<&'a str, &'a EventDecl>,
    pub functions: IndexMap<&'a str, &'a FunctionDecl>,
    pub modifiers: IndexMap<&'a str, &'a ModifierDecl>,
    /// Constants in declaration order, before their values are lowered.
    pub constants: Vec<&'a ConstDecl>,
    pub state: Option<StateSchema>,
}

fn duplicate(name: &str, span: Span) -> GenerationError {
    GenerationError::new(GenerationErrorKind::Duplicate(name.to_string()), span)
}

impl<'a> SymbolTable<'a> {
    pub fn build(coin: &'a CoinDecl) -> Result<Self, GenerationError> {
        let mut table = SymbolTable::default();
        let mut values: HashSet<&str> = HashSet::new();
        let mut actions: HashSet<&str> = HashSet::new();

        for item in &coin.items {
            match &item.node {
                Item::Storage(decl) => {
                    let name = decl.name.node.as_str();
                    if !values.insert(name) {
                        return Err(duplicate(name, decl.name.span));
                    }
                    let value = storage_value(name, &decl.value, &decl.ty.node)?;
                    table.symbols.insert(
                        name.to_string(),
                        Symbol {
                            kind: SymbolKind::Storage,
                            ty: Some(decl.ty.node.clone()),
                            value,
                            usage: Usage::default(),
                            span: decl.name.span,
                        },
                    );
                }
                Item::State(decl) => {
                    if table.state.is_some() {
                        return Err(duplicate("state", item.span));
                    }
                    let mut fields = HashSet::new();
                    for field in &decl.fields {
                        if !fields.insert(field.name.node.as_str()) {
                            return Err(duplicate(&field.name.node, field.name.span));
                        }
                    }
                    table.state = Some(StateSchema::from_decl(decl));
                }
                Item::Const(decl) => {
                    if !values.insert(decl.name.node.as_str()) {
                        return Err(duplicate(&decl.name.node, decl.name.span));
                    }
                    table.constants.push(decl);
                }
                Item::Action(decl) => {
                    if !actions.insert(decl.name.node.as_str()) {
                        return Err(duplicate(&decl.name.node, decl.name.span));
                    }
                }
                Item::Event(decl) => {
                    let name = decl.name.node.as_str();
                    if table.events.insert(name, decl).is_some() {
                        return Err(duplicate(name, decl.name.span));
                    }
                }
                Item::Function(decl) => {
                    let name = decl.name.node.as_str();
                    if builtins::is_builtin(name)
                        || name == super::stmt::MERGE_LIST
                        || table.modifiers.contains_key(name)
                        || table.functions.insert(name, decl).is_some()
                    {
                        return Err(duplicate(name, decl.name.span));
                    }
                }
                Item::Modifier(decl) => {
                    let name = decl.name.node.as_str();
                    if table.functions.contains_key(name)
                        || table.modifiers.insert(name, decl).is_some()
                    {
                        return Err(duplicate(name, decl.name.span));
                    }
                    let found = count_placeholders(&decl.body);
                    if found != 1 {
                        return Err(GenerationError::new(
                            GenerationErrorKind::Placeholder {
                                name: name.to_string(),
                                found,
                            },
                            decl.name.span,
                        ));
                    }
                }
            }
        }

        tracing::debug!(
            symbols = table.symbols.len(),
            constants = table.constants.len(),
            functions = table.functions.len(),
            events = table.events.len(),
            "built symbol table"
        );
        Ok(table)
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn define_constant(
        &mut self,
        decl: &ConstDecl,
        value: Node,
        ty: Option<Type>,
        usage: Usage,
    ) {
        self.symbols.insert(
            decl.name.node.clone(),
            Symbol {
                kind: SymbolKind::Constant,
                ty: decl.ty.as_ref().map(|t| t.node.clone()).or(ty),
                value,
                usage,
                span: decl.name.span,
            },
        );
    }
}

fn storage_value(
    name: &str,
    expr: &Spanned<SourceExpr>,
    ty: &Type,
) -> Result<Node, GenerationError> {
    match &expr.node {
        SourceExpr::Literal(lit) => literal_node(lit, Some(ty), expr.span),
        SourceExpr::Unary {
            op: UnOp::Neg,
            operand,
        } => match &operand.node {
            SourceExpr::Literal(Literal::Int(n)) => Ok(Node::bigint(-n.clone())),
            _ => Err(GenerationError::new(
                GenerationErrorKind::NonLiteralStorage(name.to_string()),
                expr.span,
            )),
        },
        _ => Err(GenerationError::new(
            GenerationErrorKind::NonLiteralStorage(name.to_string()),
            expr.span,
        )),
    }
}

/// A literal as a Tree IR atom. Strings typed `address` or `bytes32` that
/// look like `xch1…`/`txch1…` addresses become their puzzle hash.
pub fn literal_node(lit: &Literal, ty: Option<&Type>, span: Span) -> Result<Node, GenerationError> {
    Ok(match lit {
        Literal::Int(n) => Node::bigint(n.clone()),
        Literal::Bool(b) => Node::bool(*b),
        Literal::Bytes(b) => Node::bytes(b.clone()),
        Literal::Str(s) => match ty {
            Some(Type::Address | Type::Bytes32) if looks_like_address(s) => {
                address_node(s, span)?
            }
            Some(Type::Address) => {
                return Err(GenerationError::new(
                    GenerationErrorKind::InvalidAddress(s.clone()),
                    span,
                ))
            }
            _ => Node::str(s.clone()),
        },
    })
}

/// Decode an address literal into its 32-byte puzzle hash.
pub fn address_node(text: &str, span: Span) -> Result<Node, GenerationError> {
    let (_, hash) = decode_address(text).map_err(|e| {
        tracing::debug!(address = text, error = %e, "address literal rejected");
        GenerationError::new(GenerationErrorKind::InvalidAddress(text.to_string()), span)
    })?;
    Ok(Node::bytes(hash.to_vec()))
}

pub fn count_placeholders(block: &[Spanned<Stmt>]) -> usize {
    block
        .iter()
        .map(|stmt| match &stmt.node {
            Stmt::Placeholder => 1,
            Stmt::If {
                then_block,
                else_block,
                ..
            } => {
                count_placeholders(then_block)
                    + else_block.as_deref().map_or(0, count_placeholders)
            }
            _ => 0,
        })
        .sum()
}
