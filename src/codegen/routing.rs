//! Action routing: how an action's parameters, ambient values and
//! decorators are wired into the program that runs it.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Serialize;

use super::builder::Builder;
use super::builtins::Arity;
use super::expr::{check_arity, Binding, Context, Env, Lowerer, Path, Result};
use super::symbols::SymbolTable;
use crate::ast::{ActionDecl, ActionDecorator, ModifierDecl, SourceExpr, Stmt, Type};
use crate::config::CompileOptions;
use crate::error::{GenerationError, GenerationErrorKind};
use crate::layer::field_accessor;
use crate::span::Spanned;
use crate::tree::Node;

/// Spend-time values an action can read through `msg.*` and `coin.*`.
///
/// Each one becomes a solution value that the program asserts before use.
/// The derive order is the parameter order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ambient {
    Sender,
    Amount,
    PuzzleHash,
    CoinId,
}

impl Ambient {
    pub fn from_member(object: &str, field: &str) -> Option<Self> {
        match (object, field) {
            ("msg", "sender") => Some(Ambient::Sender),
            ("msg", "value") | ("coin", "amount") => Some(Ambient::Amount),
            ("coin", "puzzleHash") => Some(Ambient::PuzzleHash),
            ("coin", "id") => Some(Ambient::CoinId),
            _ => None,
        }
    }

    pub fn param_name(self) -> &'static str {
        match self {
            Ambient::Sender => "sender",
            Ambient::Amount => "my_amount",
            Ambient::PuzzleHash => "my_puzzle_hash",
            Ambient::CoinId => "my_coin_id",
        }
    }

    pub fn value_type(self) -> Type {
        match self {
            Ambient::Sender => Type::PublicKey,
            Ambient::Amount => Type::Int("uint64".to_string()),
            Ambient::PuzzleHash | Ambient::CoinId => Type::Bytes32,
        }
    }

    /// The condition that pins `value` to the real spend.
    pub fn assertion(self, action: &str, value: Node) -> Node {
        let items = match self {
            Ambient::Sender => vec![
                Node::sym("AGG_SIG_ME"),
                value,
                Node::call("sha256", vec![Node::str(action)]),
            ],
            Ambient::Amount => vec![Node::sym("ASSERT_MY_AMOUNT"), value],
            Ambient::PuzzleHash => vec![Node::sym("ASSERT_MY_PUZZLEHASH"), value],
            Ambient::CoinId => vec![Node::sym("ASSERT_MY_COIN_ID"), value],
        };
        Node::call("list", items)
    }
}

/// Where an action program finds its inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Shape {
    /// Parameters and ambient values are the program's own solution
    /// parameters.
    Direct,
    /// Parameters come positionally from `args`; ambient values are
    /// top-level solution parameters shared by all routed actions.
    Routed,
    /// Parameters come positionally from `args`, ambient values follow them.
    Layered,
}

pub(crate) enum Layer<'a> {
    /// `@onlyAddress`: the sender must be one of these.
    Guard(Vec<Node>),
    /// A user modifier with its parameters bound.
    Modifier { decl: &'a ModifierDecl, env: Env },
}

/// An action ready for lowering.
pub(crate) struct ActionPlan<'a> {
    pub name: &'a str,
    /// Declared `@stateful`: may read and write `state.*`.
    pub stateful: bool,
    /// Runs under the action layer and must return the next state.
    pub layered: bool,
    pub ambient: IndexMap<Ambient, Node>,
    pub layers: Vec<Layer<'a>>,
    pub params: Env,
    pub body: &'a [Spanned<Stmt>],
}

fn decorator_error(kind: GenerationErrorKind, span: crate::span::Span) -> GenerationError {
    GenerationError::new(kind, span)
}

pub(crate) fn plan_action<'a>(
    table: &SymbolTable<'a>,
    opts: &CompileOptions,
    builder: &mut Builder,
    action: &'a ActionDecl,
    shape: Shape,
) -> Result<ActionPlan<'a>> {
    let name = action.name.node.as_str();
    let mut params = Env::new();
    for (i, param) in action.params.iter().enumerate() {
        let value = match shape {
            Shape::Direct => Node::sym(param.name.node.as_str()),
            Shape::Routed | Shape::Layered => field_accessor(Node::sym("args"), i),
        };
        let binding = Binding::param(value, param.ty.node.clone());
        if params.insert(param.name.node.clone(), binding).is_some() {
            return Err(decorator_error(
                GenerationErrorKind::Duplicate(param.name.node.clone()),
                param.name.span,
            ));
        }
    }

    let header = Path {
        locals: params.clone(),
        ..Path::default()
    };
    let mut stateful = false;
    let mut guarded = false;
    let mut layers = Vec::new();
    for decorator in &action.decorators {
        match &decorator.node {
            ActionDecorator::Stateful => stateful = true,
            ActionDecorator::OnlyAddress(ids) => {
                check_arity("onlyAddress", Arity::AtLeast(1), ids.len(), decorator.span)?;
                let mut lw = Lowerer::new(table, opts, builder, Context::Function(name));
                let ids = ids
                    .iter()
                    .map(|id| lw.lower_address(id, &header))
                    .collect::<Result<Vec<_>>>()?;
                guarded = true;
                layers.push(Layer::Guard(ids));
            }
            ActionDecorator::Modifier { name: m, args } => {
                let decl = match m.node.as_str() {
                    "stateful" => {
                        return Err(decorator_error(
                            GenerationErrorKind::ArityMismatch {
                                name: "stateful".to_string(),
                                expected: "0".to_string(),
                                found: args.len(),
                            },
                            decorator.span,
                        ))
                    }
                    "singleton" => {
                        return Err(decorator_error(
                            GenerationErrorKind::BadDecoratorTarget {
                                decorator: "singleton".to_string(),
                                target: "an action".to_string(),
                            },
                            decorator.span,
                        ))
                    }
                    other => table.modifiers.get(other).copied().ok_or_else(|| {
                        decorator_error(
                            GenerationErrorKind::UnknownDecorator(other.to_string()),
                            m.span,
                        )
                    })?,
                };
                check_arity(
                    &m.node,
                    Arity::Exact(decl.params.len()),
                    args.len(),
                    decorator.span,
                )?;
                let mut lw = Lowerer::new(table, opts, builder, Context::Function(name));
                let mut env = Env::new();
                for (param, arg) in decl.params.iter().zip(args) {
                    let value = lw.lower_typed(arg, Some(&param.ty.node), &header)?;
                    env.insert(
                        param.name.node.clone(),
                        Binding::param(value, param.ty.node.clone()),
                    );
                }
                layers.push(Layer::Modifier { decl, env });
            }
        }
    }

    let mut used = BTreeSet::new();
    let mut sends = false;
    scan_block(&action.body, &mut used, &mut sends);
    for layer in &layers {
        if let Layer::Modifier { decl, .. } = layer {
            scan_block(&decl.body, &mut used, &mut sends);
        }
    }
    if guarded {
        used.insert(Ambient::Sender);
    }
    if opts.conservation_check && sends {
        used.insert(Ambient::Amount);
    }
    let ambient = used
        .into_iter()
        .enumerate()
        .map(|(k, a)| {
            let value = match shape {
                Shape::Direct | Shape::Routed => Node::sym(a.param_name()),
                Shape::Layered => field_accessor(Node::sym("args"), action.params.len() + k),
            };
            (a, value)
        })
        .collect();

    tracing::trace!(action = name, stateful, layers = layers.len(), "planned action");
    Ok(ActionPlan {
        name,
        stateful,
        layered: shape == Shape::Layered,
        ambient,
        layers,
        params,
        body: &action.body,
    })
}

/// `(if (= action "a") A (if (= action "b") B … (x "unknown action")))`
pub(crate) fn dispatch(branches: Vec<(String, Node)>) -> Node {
    branches.into_iter().rev().fold(
        Node::call("x", vec![Node::str("unknown action")]),
        |otherwise, (name, body)| {
            let test = Node::call("=", vec![Node::sym("action"), Node::str(name)]);
            Node::call("if", vec![test, body, otherwise])
        },
    )
}

/// Collect the ambient members a block reads, and whether it sends.
pub(crate) fn scan_block(block: &[Spanned<Stmt>], used: &mut BTreeSet<Ambient>, sends: &mut bool) {
    for stmt in block {
        match &stmt.node {
            Stmt::Let { value, .. } | Stmt::Assign { value, .. } => scan_expr(value, used),
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                scan_expr(cond, used);
                scan_block(then_block, used, sends);
                if let Some(block) = else_block {
                    scan_block(block, used, sends);
                }
            }
            Stmt::Require { cond, message } => {
                scan_expr(cond, used);
                if let Some(m) = message {
                    scan_expr(m, used);
                }
            }
            Stmt::Exception { message } | Stmt::Return(message) => {
                if let Some(m) = message {
                    scan_expr(m, used);
                }
            }
            Stmt::Emit { args, .. } => args.iter().for_each(|a| scan_expr(a, used)),
            Stmt::Send {
                recipient,
                amount,
                memo,
            } => {
                *sends = true;
                scan_expr(recipient, used);
                scan_expr(amount, used);
                if let Some(m) = memo {
                    scan_expr(m, used);
                }
            }
            Stmt::Expr(e) => scan_expr(e, used),
            Stmt::Placeholder => {}
        }
    }
}

fn scan_expr(expr: &Spanned<SourceExpr>, used: &mut BTreeSet<Ambient>) {
    match &expr.node {
        SourceExpr::Literal(_) | SourceExpr::Ident(_) => {}
        SourceExpr::Member { object, field } => match &object.node {
            SourceExpr::Ident(name) => {
                if let Some(a) = Ambient::from_member(name, &field.node) {
                    used.insert(a);
                }
            }
            _ => scan_expr(object, used),
        },
        SourceExpr::Binary { lhs, rhs, .. } => {
            scan_expr(lhs, used);
            scan_expr(rhs, used);
        }
        SourceExpr::Unary { operand, .. } => scan_expr(operand, used),
        SourceExpr::Call { args, .. } => args.iter().for_each(|a| scan_expr(a, used)),
    }
}
