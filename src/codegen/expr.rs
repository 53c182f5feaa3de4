//! Expression lowering: `SourceExpr` → Tree IR node.

use indexmap::IndexMap;

use super::builder::{Builder, Feature};
use super::builtins::{self, Arity};
use super::routing::{ActionPlan, Ambient};
use super::stmt::Segment;
use super::symbols::{address_node, literal_node, SymbolTable};
use crate::address::looks_like_address;
use crate::ast::{BinOp, Literal, SourceExpr, Type, UnOp};
use crate::config::CompileOptions;
use crate::error::{GenerationError, GenerationErrorKind};
use crate::span::{Span, Spanned};
use crate::tree::Node;

pub(crate) type Result<T> = std::result::Result<T, GenerationError>;

/// A name visible in the current scope. Values are substituted at each use.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Binding {
    pub value: Node,
    pub ty: Option<Type>,
    pub mutable: bool,
}

impl Binding {
    pub fn param(value: Node, ty: Type) -> Self {
        Self {
            value,
            ty: Some(ty),
            mutable: false,
        }
    }
}

pub(crate) type Env = IndexMap<String, Binding>;

/// Everything one control path has accumulated so far.
#[derive(Clone, Debug, Default)]
pub(crate) struct Path {
    pub locals: Env,
    /// Outer bindings hidden by a `let` of the same name, restored when the
    /// block that declared it closes.
    pub shadowed: Vec<(String, Binding)>,
    /// Current value of each state field, by position.
    pub state: Vec<Node>,
    /// Conditions emitted on this path, in source order.
    pub conditions: Vec<Segment>,
    /// Running total of `send` amounts.
    pub sent: Option<Node>,
}

impl Path {
    /// A path for one branch of an inline `if`: same bindings, no
    /// conditions or sends of its own yet.
    pub fn branch(&self) -> Self {
        Self {
            locals: self.locals.clone(),
            shadowed: self.shadowed.clone(),
            state: self.state.clone(),
            conditions: Vec::new(),
            sent: None,
        }
    }

    /// Take the bindings, state and send total of `other`.
    pub fn adopt_values(&mut self, other: &Path) {
        self.locals = other.locals.clone();
        self.state = other.state.clone();
        self.sent = other.sent.clone();
    }

    /// Leave a block entered with `len` locals and `mark` shadowed names.
    pub fn close_block(&mut self, len: usize, mark: usize) {
        let restored: Vec<_> = self.shadowed.drain(mark..).rev().collect();
        for (name, binding) in restored {
            self.locals.insert(name, binding);
        }
        self.locals.truncate(len);
    }
}

/// What is being lowered.
#[derive(Clone, Copy)]
pub(crate) enum Context<'a, 'p> {
    /// A user function, or an expression outside any action body.
    Function(&'a str),
    Action(&'p ActionPlan<'a>),
}

pub(crate) struct Lowerer<'a, 'p> {
    pub(crate) table: &'p SymbolTable<'a>,
    pub(crate) opts: &'p CompileOptions,
    pub(crate) builder: &'p mut Builder,
    pub(crate) ctx: Context<'a, 'p>,
    depth: u32,
}

fn err(kind: GenerationErrorKind, span: Span) -> GenerationError {
    GenerationError::new(kind, span)
}

pub(crate) fn check_arity(name: &str, arity: Arity, found: usize, span: Span) -> Result<()> {
    if arity.accepts(found) {
        Ok(())
    } else {
        Err(err(
            GenerationErrorKind::ArityMismatch {
                name: name.to_string(),
                expected: arity.to_string(),
                found,
            },
            span,
        ))
    }
}

impl<'a, 'p> Lowerer<'a, 'p> {
    pub fn new(
        table: &'p SymbolTable<'a>,
        opts: &'p CompileOptions,
        builder: &'p mut Builder,
        ctx: Context<'a, 'p>,
    ) -> Self {
        Self {
            table,
            opts,
            builder,
            ctx,
            depth: 0,
        }
    }

    pub(crate) fn plan(&self) -> Option<&'p ActionPlan<'a>> {
        match self.ctx {
            Context::Action(plan) => Some(plan),
            Context::Function(_) => None,
        }
    }

    pub(crate) fn scope_name(&self) -> &'a str {
        match self.ctx {
            Context::Action(plan) => plan.name,
            Context::Function(name) => name,
        }
    }

    pub(crate) fn enter(&mut self, span: Span) -> Result<()> {
        self.depth += 1;
        if self.depth > self.opts.max_depth {
            return Err(err(GenerationErrorKind::TooDeep(self.opts.max_depth), span));
        }
        Ok(())
    }

    pub(crate) fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn lower_expr(&mut self, expr: &Spanned<SourceExpr>, path: &Path) -> Result<Node> {
        self.enter(expr.span)?;
        let result = self.lower_inner(expr, path);
        self.exit();
        result
    }

    /// Lower an expression where a declared type is known, so address
    /// literals decode to puzzle hashes.
    pub fn lower_typed(
        &mut self,
        expr: &Spanned<SourceExpr>,
        ty: Option<&Type>,
        path: &Path,
    ) -> Result<Node> {
        match &expr.node {
            SourceExpr::Literal(lit) => literal_node(lit, ty, expr.span),
            _ => self.lower_expr(expr, path),
        }
    }

    /// Lower an expression used as a puzzle hash.
    pub fn lower_address(&mut self, expr: &Spanned<SourceExpr>, path: &Path) -> Result<Node> {
        match &expr.node {
            SourceExpr::Literal(Literal::Str(s)) if looks_like_address(s) => {
                address_node(s, expr.span)
            }
            _ => self.lower_expr(expr, path),
        }
    }

    pub fn lower_args(&mut self, args: &[Spanned<SourceExpr>], path: &Path) -> Result<Vec<Node>> {
        args.iter().map(|a| self.lower_expr(a, path)).collect()
    }

    fn lower_inner(&mut self, expr: &Spanned<SourceExpr>, path: &Path) -> Result<Node> {
        match &expr.node {
            SourceExpr::Literal(lit) => literal_node(lit, None, expr.span),
            SourceExpr::Ident(name) => self.lower_ident(name, expr.span, path),
            SourceExpr::Member { object, field } => {
                self.lower_member(object, &field.node, expr.span, path)
            }
            SourceExpr::Binary { op, lhs, rhs } => {
                let a = self.lower_expr(lhs, path)?;
                let b = self.lower_expr(rhs, path)?;
                let concat = *op == BinOp::Add
                    && [lhs, rhs].iter().any(|side| {
                        self.infer_type(side, path)
                            .is_some_and(|t| t.is_bytes_like())
                    });
                Ok(lower_binary(*op, a, b, concat))
            }
            SourceExpr::Unary { op, operand } => {
                let a = self.lower_expr(operand, path)?;
                Ok(match op {
                    UnOp::Not => Node::call("not", vec![a]),
                    UnOp::Neg => Node::call("-", vec![Node::int(0), a]),
                    UnOp::BitNot => Node::call("lognot", vec![a]),
                })
            }
            SourceExpr::Call { callee, args } => self.lower_call(callee, args, expr.span, path),
        }
    }

    fn lower_ident(&mut self, name: &str, span: Span, path: &Path) -> Result<Node> {
        if let Some(binding) = path.locals.get(name) {
            return Ok(binding.value.clone());
        }
        if let Some(symbol) = self.table.get(name) {
            self.builder.absorb(&symbol.usage);
            return Ok(symbol.value.clone());
        }
        Err(err(GenerationErrorKind::UnknownIdentifier(name.to_string()), span))
    }

    fn lower_member(
        &mut self,
        object: &Spanned<SourceExpr>,
        field: &str,
        span: Span,
        path: &Path,
    ) -> Result<Node> {
        let unknown_member = |object: &str| {
            err(
                GenerationErrorKind::UnknownMember {
                    object: object.to_string(),
                    field: field.to_string(),
                },
                span,
            )
        };
        let SourceExpr::Ident(name) = &object.node else {
            return Err(unknown_member("expression"));
        };
        match name.as_str() {
            "state" => {
                let index = self.state_index(field, span)?;
                path.state
                    .get(index)
                    .cloned()
                    .ok_or_else(|| unknown_member("state"))
            }
            "msg" | "coin" => {
                let ambient = Ambient::from_member(name, field).ok_or_else(|| unknown_member(name))?;
                match self.plan() {
                    Some(plan) => plan.ambient.get(&ambient).cloned().ok_or_else(|| {
                        err(
                            GenerationErrorKind::Unsupported(format!(
                                "`{}.{}` is not available here",
                                name, field
                            )),
                            span,
                        )
                    }),
                    None => Err(err(
                        GenerationErrorKind::Unsupported(format!(
                            "`{}.{}` is only available inside action bodies",
                            name, field
                        )),
                        span,
                    )),
                }
            }
            other if path.locals.contains_key(other) || self.table.get(other).is_some() => {
                Err(unknown_member(other))
            }
            other => Err(err(GenerationErrorKind::UnknownIdentifier(other.to_string()), span)),
        }
    }

    /// Position of `field` in the state tuple, checking that state is in
    /// scope.
    pub(crate) fn state_index(&self, field: &str, span: Span) -> Result<usize> {
        match self.plan() {
            Some(plan) if plan.stateful => self
                .table
                .state
                .as_ref()
                .and_then(|schema| schema.index_of(field))
                .ok_or_else(|| {
                    err(
                        GenerationErrorKind::UnknownMember {
                            object: "state".to_string(),
                            field: field.to_string(),
                        },
                        span,
                    )
                }),
            _ => Err(err(
                GenerationErrorKind::StateOutsideStateful(field.to_string()),
                span,
            )),
        }
    }

    fn lower_call(
        &mut self,
        callee: &Spanned<String>,
        args: &[Spanned<SourceExpr>],
        span: Span,
        path: &Path,
    ) -> Result<Node> {
        let name = callee.node.as_str();
        if let Some(builtin) = builtins::lookup(name) {
            check_arity(name, builtin.arity, args.len(), span)?;
            let args = self.lower_args(args, path)?;
            if let Some(feature) = builtin.feature {
                self.builder.use_feature(feature);
            }
            return Ok(Node::call(builtin.op, args));
        }
        if builtins::lookup_condition(name).is_some() {
            let kind = match self.ctx {
                Context::Function(_) => GenerationErrorKind::ConditionOutsideAction(name.to_string()),
                Context::Action(_) => GenerationErrorKind::Unsupported(format!(
                    "`{}` produces a condition and has no value; call it as a statement",
                    name
                )),
            };
            return Err(err(kind, span));
        }
        if let Some(function) = self.table.functions.get(name) {
            check_arity(name, Arity::Exact(function.params.len()), args.len(), span)?;
            let args = self.lower_args(args, path)?;
            self.builder.call(name);
            return Ok(Node::call(name, args));
        }
        Err(err(GenerationErrorKind::UnknownFunction(name.to_string()), callee.span))
    }

    /// Best-effort static type, used to pick `concat` for string `+`.
    pub fn infer_type(&self, expr: &Spanned<SourceExpr>, path: &Path) -> Option<Type> {
        match &expr.node {
            SourceExpr::Literal(Literal::Str(_)) => Some(Type::String),
            SourceExpr::Literal(Literal::Bytes(_)) => Some(Type::Bytes),
            SourceExpr::Literal(Literal::Int(_)) => Some(Type::Int("int".to_string())),
            SourceExpr::Literal(Literal::Bool(_)) => Some(Type::Bool),
            SourceExpr::Ident(name) => match path.locals.get(name) {
                Some(binding) => binding.ty.clone(),
                None => self.table.get(name).and_then(|s| s.ty.clone()),
            },
            SourceExpr::Member { object, field } => match &object.node {
                SourceExpr::Ident(obj) if obj == "state" => self
                    .table
                    .state
                    .as_ref()
                    .and_then(|s| s.fields.iter().find(|f| f.name == field.node))
                    .map(|f| f.ty.clone()),
                SourceExpr::Ident(obj) => {
                    Ambient::from_member(obj, &field.node).map(Ambient::value_type)
                }
                _ => None,
            },
            SourceExpr::Call { callee, .. } => match builtins::lookup(&callee.node) {
                Some(builtin) => Some(builtin.returns.to_type()),
                None => self
                    .table
                    .functions
                    .get(callee.node.as_str())
                    .and_then(|f| f.ret.as_ref())
                    .map(|t| t.node.clone()),
            },
            SourceExpr::Binary { op, lhs, rhs } => match op {
                BinOp::Add => {
                    let bytes = [lhs, rhs].iter().any(|side| {
                        self.infer_type(side, path)
                            .is_some_and(|t| t.is_bytes_like())
                    });
                    Some(if bytes {
                        Type::Bytes
                    } else {
                        Type::Int("int".to_string())
                    })
                }
                BinOp::Sub
                | BinOp::Mul
                | BinOp::Div
                | BinOp::Mod
                | BinOp::BitAnd
                | BinOp::BitOr
                | BinOp::BitXor
                | BinOp::Shl
                | BinOp::Shr => Some(Type::Int("int".to_string())),
                _ => Some(Type::Bool),
            },
            SourceExpr::Unary { op, .. } => match op {
                UnOp::Not => Some(Type::Bool),
                UnOp::Neg | UnOp::BitNot => Some(Type::Int("int".to_string())),
            },
        }
    }

    pub(crate) fn use_conditions(&mut self) {
        self.builder.use_feature(Feature::Conditions);
    }
}

/// The operator table for binary expressions.
pub(crate) fn lower_binary(op: BinOp, a: Node, b: Node, concat: bool) -> Node {
    let call = |head: &str, args: Vec<Node>| Node::call(head, args);
    match op {
        BinOp::Add if concat => call("concat", vec![a, b]),
        BinOp::Add => call("+", vec![a, b]),
        BinOp::Sub => call("-", vec![a, b]),
        BinOp::Mul => call("*", vec![a, b]),
        BinOp::Div => call("/", vec![a, b]),
        BinOp::Mod => call("r", vec![call("divmod", vec![a, b])]),
        BinOp::Eq => call("=", vec![a, b]),
        BinOp::NotEq => call("not", vec![call("=", vec![a, b])]),
        BinOp::StrGt => call(">s", vec![a, b]),
        BinOp::Gt => call(">", vec![a, b]),
        BinOp::Lt => call(">", vec![b, a]),
        BinOp::GtEq => call("not", vec![call(">", vec![b, a])]),
        BinOp::LtEq => call("not", vec![call(">", vec![a, b])]),
        BinOp::And => call("all", vec![a, b]),
        BinOp::Or => call("any", vec![a, b]),
        BinOp::BitAnd => call("logand", vec![a, b]),
        BinOp::BitOr => call("logior", vec![a, b]),
        BinOp::BitXor => call("logxor", vec![a, b]),
        BinOp::Shl => call("ash", vec![a, b]),
        BinOp::Shr => call("ash", vec![a, call("-", vec![Node::int(0), b])]),
    }
}
