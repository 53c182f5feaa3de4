use num_bigint::BigInt;

use crate::span::{Span, Spanned};

pub mod display;

/// A parsed `coin` declaration, the root of a CoinScript file.
#[derive(Clone, Debug)]
pub struct CoinDecl {
    pub name: Spanned<String>,
    pub decorators: Vec<Spanned<Decorator>>,
    pub items: Vec<Spanned<Item>>,
}

/// A decorator as written: `@name` or `@name(args…)`.
#[derive(Clone, Debug)]
pub struct Decorator {
    pub name: Spanned<String>,
    pub args: Vec<Spanned<SourceExpr>>,
}

/// Items inside a coin body.
#[derive(Clone, Debug)]
pub enum Item {
    Storage(StorageDecl),
    State(StateDecl),
    Const(ConstDecl),
    Action(ActionDecl),
    Event(EventDecl),
    Function(FunctionDecl),
    Modifier(ModifierDecl),
}

/// `storage <type> <name> = <literal>;`, substituted at compile time.
#[derive(Clone, Debug)]
pub struct StorageDecl {
    pub ty: Spanned<Type>,
    pub name: Spanned<String>,
    pub value: Spanned<SourceExpr>,
}

/// `state { <type> <name>; … }`. Field order is the tuple order.
#[derive(Clone, Debug)]
pub struct StateDecl {
    pub fields: Vec<Param>,
}

#[derive(Clone, Debug)]
pub struct ConstDecl {
    pub ty: Option<Spanned<Type>>,
    pub name: Spanned<String>,
    pub value: Spanned<SourceExpr>,
}

/// A typed name: parameter, state field or event field.
#[derive(Clone, Debug)]
pub struct Param {
    pub ty: Spanned<Type>,
    pub name: Spanned<String>,
}

#[derive(Clone, Debug)]
pub struct ActionDecl {
    pub name: Spanned<String>,
    pub decorators: Vec<Spanned<ActionDecorator>>,
    pub params: Vec<Param>,
    pub body: Block,
}

impl ActionDecl {
    pub fn is_stateful(&self) -> bool {
        self.decorators
            .iter()
            .any(|d| matches!(d.node, ActionDecorator::Stateful))
    }
}

/// Decorators an action can carry.
#[derive(Clone, Debug)]
pub enum ActionDecorator {
    /// `@onlyAddress(id, …)`: the spend must be signed by one of `ids`.
    OnlyAddress(Vec<Spanned<SourceExpr>>),
    /// `@stateful`: routed through the state layer.
    Stateful,
    /// `@name(args…)`: a user modifier, or an unknown decorator.
    Modifier {
        name: Spanned<String>,
        args: Vec<Spanned<SourceExpr>>,
    },
}

#[derive(Clone, Debug)]
pub struct EventDecl {
    pub name: Spanned<String>,
    pub fields: Vec<Param>,
}

#[derive(Clone, Debug)]
pub struct FunctionDecl {
    pub name: Spanned<String>,
    pub inline: bool,
    pub params: Vec<Param>,
    pub ret: Option<Spanned<Type>>,
    pub body: Block,
}

/// `modifier name(params) { … _; … }`
#[derive(Clone, Debug)]
pub struct ModifierDecl {
    pub name: Spanned<String>,
    pub params: Vec<Param>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    /// Any integer width, keeping the spelling: `uint256`, `int`, …
    Int(String),
    Bool,
    Address,
    Bytes32,
    Bytes,
    String,
    PublicKey,
    Named(String),
}

impl Type {
    pub fn from_name(name: &str) -> Type {
        match name {
            "bool" => Type::Bool,
            "address" => Type::Address,
            "bytes32" => Type::Bytes32,
            "bytes" => Type::Bytes,
            "string" => Type::String,
            "pubkey" | "PublicKey" | "publicKey" => Type::PublicKey,
            n if is_int_type(n) => Type::Int(n.to_string()),
            other => Type::Named(other.to_string()),
        }
    }

    /// Byte-string types, for which `+` means concatenation.
    pub fn is_bytes_like(&self) -> bool {
        matches!(self, Type::String | Type::Bytes)
    }
}

fn is_int_type(name: &str) -> bool {
    let digits = name
        .strip_prefix("uint")
        .or_else(|| name.strip_prefix("int"));
    match digits {
        Some(d) => d.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

pub type Block = Vec<Spanned<Stmt>>;

#[derive(Clone, Debug)]
pub enum Stmt {
    /// `let x [: T] = e;` or `T x = e;`
    Let {
        name: Spanned<String>,
        ty: Option<Spanned<Type>>,
        value: Spanned<SourceExpr>,
    },
    /// `x = e;` or `state.f = e;`; compound assignment is desugared.
    Assign {
        target: Spanned<Place>,
        value: Spanned<SourceExpr>,
    },
    If {
        cond: Spanned<SourceExpr>,
        then_block: Block,
        else_block: Option<Block>,
    },
    Require {
        cond: Spanned<SourceExpr>,
        message: Option<Spanned<SourceExpr>>,
    },
    Exception {
        message: Option<Spanned<SourceExpr>>,
    },
    Emit {
        event: Spanned<String>,
        args: Vec<Spanned<SourceExpr>>,
    },
    Send {
        recipient: Spanned<SourceExpr>,
        amount: Spanned<SourceExpr>,
        memo: Option<Spanned<SourceExpr>>,
    },
    Return(Option<Spanned<SourceExpr>>),
    /// `_;` inside a modifier body.
    Placeholder,
    Expr(Spanned<SourceExpr>),
}

/// An assignable location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Place {
    Var(String),
    State(String),
}

/// Language-level expression, distinct from Tree IR nodes.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceExpr {
    Literal(Literal),
    Ident(String),
    Binary {
        op: BinOp,
        lhs: Box<Spanned<SourceExpr>>,
        rhs: Box<Spanned<SourceExpr>>,
    },
    Unary {
        op: UnOp,
        operand: Box<Spanned<SourceExpr>>,
    },
    Call {
        callee: Spanned<String>,
        args: Vec<Spanned<SourceExpr>>,
    },
    Member {
        object: Box<Spanned<SourceExpr>>,
        field: Spanned<String>,
    },
}

impl SourceExpr {
    pub fn binary(op: BinOp, lhs: Spanned<SourceExpr>, rhs: Spanned<SourceExpr>) -> Spanned<Self> {
        let span = lhs.span.merge(rhs.span);
        Spanned::new(
            SourceExpr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        )
    }

    /// `a.b` where `a` is a plain identifier.
    pub fn as_member_of(&self) -> Option<(&str, &str)> {
        match self {
            SourceExpr::Member { object, field } => match &object.node {
                SourceExpr::Ident(name) => Some((name.as_str(), field.node.as_str())),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(BigInt),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    NotEq,
    StrGt,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinOp {
    /// (left, right) binding power. Higher binds tighter; all operators are
    /// left-associative.
    pub fn binding_power(self) -> (u8, u8) {
        match self {
            BinOp::Or => (1, 2),
            BinOp::And => (3, 4),
            BinOp::BitOr => (5, 6),
            BinOp::BitXor => (7, 8),
            BinOp::BitAnd => (9, 10),
            BinOp::Eq | BinOp::NotEq | BinOp::StrGt => (11, 12),
            BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq => (13, 14),
            BinOp::Shl | BinOp::Shr => (15, 16),
            BinOp::Add | BinOp::Sub => (17, 18),
            BinOp::Mul | BinOp::Div | BinOp::Mod => (19, 20),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Neg,
    BitNot,
}

impl CoinDecl {
    pub fn actions(&self) -> impl Iterator<Item = &ActionDecl> {
        self.items.iter().filter_map(|i| match &i.node {
            Item::Action(a) => Some(a),
            _ => None,
        })
    }

    pub fn state(&self) -> Option<&StateDecl> {
        self.items.iter().find_map(|i| match &i.node {
            Item::State(s) => Some(s),
            _ => None,
        })
    }

    pub fn span(&self) -> Span {
        self.name.span
    }
}
