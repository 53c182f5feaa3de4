//! Statement lowering.
//!
//! Statements are lowered in continuation-passing style: each statement
//! receives the rest of its control path. `require` becomes
//! `(if c REST (x m))`. An `if` whose branches both fall through is lowered
//! inline: each branch runs on its own copy of the path, every binding it
//! changes becomes `(if c then else)`, and the branch conditions join the
//! path as one conditional list, so the rest is lowered once. Only an `if`
//! with a branch that ends the path, or that may `return` early, gets the
//! rest in each branch that continues.

use super::builtins::{self, Arity};
use super::expr::{check_arity, Binding, Context, Env, Lowerer, Path, Result};
use super::routing::{Ambient, Layer};
use crate::ast::display::event_signature;
use crate::ast::{FunctionDecl, Place, SourceExpr, Stmt};
use crate::error::{GenerationError, GenerationErrorKind};
use crate::layer::field_accessor;
use crate::span::{Span, Spanned};
use crate::tree::Node;

use super::builder::Feature;

/// Helper that appends two condition lists.
pub(crate) const MERGE_LIST: &str = "merge_list";

/// `(defun merge_list (a b) (if a (c (f a) (merge_list (r a) b)) b))`
pub(crate) fn merge_list_defun() -> Node {
    let (a, b) = (Node::sym("a"), Node::sym("b"));
    Node::list(vec![
        Node::sym("defun"),
        Node::sym(MERGE_LIST),
        Node::list(vec![a.clone(), b.clone()]),
        Node::call(
            "if",
            vec![
                a.clone(),
                Node::call(
                    "c",
                    vec![
                        Node::call("f", vec![a.clone()]),
                        Node::call(MERGE_LIST, vec![Node::call("r", vec![a]), b.clone()]),
                    ],
                ),
                b,
            ],
        ),
    ])
}

/// One piece of a path's condition list.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Segment {
    /// A single condition.
    Item(Node),
    /// An expression that evaluates to a list of conditions.
    Splice(Node),
    /// `require` inside an inline branch: the rest of the list is built
    /// only if `cond` holds.
    Guard { cond: Node, message: Option<Node> },
    /// `exception` inside an inline branch.
    Fail(Option<Node>),
}

/// What happens to locals when a continuation resumes.
#[derive(Clone, Debug)]
pub(crate) enum Scope {
    /// Close the block just left.
    Close { len: usize, mark: usize },
    /// Switch back to an enclosing modifier's locals.
    Restore { env: Env, mark: usize },
}

/// The rest of a control path.
pub(crate) enum Cont<'c> {
    Done,
    Stmts {
        stmts: &'c [Spanned<Stmt>],
        layer: usize,
        scope: Scope,
        next: &'c Cont<'c>,
    },
}

fn err(kind: GenerationErrorKind, span: Span) -> GenerationError {
    GenerationError::new(kind, span)
}

fn fail(message: Option<Node>) -> Node {
    Node::call("x", message.into_iter().collect())
}

/// Whether a block only computes values: no conditions, no failures, no
/// early exit.
fn rebinds_only(block: &[Spanned<Stmt>]) -> bool {
    block.iter().all(|stmt| match &stmt.node {
        Stmt::Let { .. } | Stmt::Assign { .. } => true,
        Stmt::If {
            then_block,
            else_block,
            ..
        } => rebinds_only(then_block) && else_block.as_deref().map_or(true, rebinds_only),
        Stmt::Expr(e) => !matches!(
            &e.node,
            SourceExpr::Call { callee, .. } if builtins::lookup_condition(&callee.node).is_some()
        ),
        _ => false,
    })
}

/// Whether every path through `block` ends inside it.
fn ends(block: &[Spanned<Stmt>]) -> bool {
    block.iter().any(|stmt| match &stmt.node {
        Stmt::Exception { .. } | Stmt::Return(_) => true,
        Stmt::If {
            then_block,
            else_block,
            ..
        } => ends(then_block) && else_block.as_deref().is_some_and(ends),
        _ => false,
    })
}

/// Whether `block` may leave its path early without failing.
fn exits_early(block: &[Spanned<Stmt>]) -> bool {
    block.iter().any(|stmt| match &stmt.node {
        Stmt::Return(_) | Stmt::Placeholder => true,
        Stmt::If {
            then_block,
            else_block,
            ..
        } => exits_early(then_block) || else_block.as_deref().is_some_and(exits_early),
        _ => false,
    })
}

/// The list built so far, from the back: trailing plain items, or an
/// expression once anything else has been folded in.
fn take_rest(items: &mut Vec<Node>, tail: &mut Option<Node>) -> Node {
    match tail.take() {
        Some(node) => node,
        None if items.is_empty() => Node::nil(),
        None => Node::call("list", items.drain(..).rev().collect()),
    }
}

impl<'a, 'p> Lowerer<'a, 'p> {
    /// Lower the planned action: ambient assertions first, then decorator
    /// layers outermost-first, then the body.
    pub(crate) fn lower_action(&mut self) -> Result<Node> {
        let plan = self.plan().ok_or_else(|| {
            err(
                GenerationErrorKind::Unsupported("no action to lower".to_string()),
                Span::dummy(),
            )
        })?;
        let state = match (&self.table.state, plan.layered) {
            (Some(schema), true) => (0..schema.len())
                .map(|i| field_accessor(Node::sym("state"), i))
                .collect(),
            _ => Vec::new(),
        };
        let conditions: Vec<Segment> = plan
            .ambient
            .iter()
            .map(|(a, value)| Segment::Item(a.assertion(plan.name, value.clone())))
            .collect();
        if !conditions.is_empty() {
            self.use_conditions();
        }
        let path = Path {
            state,
            conditions,
            ..Path::default()
        };
        self.lower_layer(0, path, &Cont::Done)
    }

    fn lower_layer(&mut self, level: usize, mut path: Path, cont: &Cont<'_>) -> Result<Node> {
        let Some(plan) = self.plan() else {
            return self.resume(path, cont);
        };
        match plan.layers.get(level) {
            None => {
                path.locals = plan.params.clone();
                self.lower_stmts(plan.body, level, path, cont)
            }
            Some(Layer::Guard(ids)) => {
                let sender = plan
                    .ambient
                    .get(&Ambient::Sender)
                    .cloned()
                    .unwrap_or_else(|| Node::sym(Ambient::Sender.param_name()));
                let mut checks: Vec<Node> = ids
                    .iter()
                    .map(|id| Node::call("=", vec![sender.clone(), id.clone()]))
                    .collect();
                let check = if checks.len() == 1 {
                    checks.remove(0)
                } else {
                    Node::call("any", checks)
                };
                let inner = self.lower_layer(level + 1, path, cont)?;
                Ok(Node::call(
                    "if",
                    vec![check, inner, fail(Some(Node::str("unauthorized")))],
                ))
            }
            Some(Layer::Modifier { decl, env }) => {
                path.locals = env.clone();
                self.lower_stmts(&decl.body, level, path, cont)
            }
        }
    }

    /// `(defun name (params) body)`
    pub(crate) fn lower_function(&mut self, decl: &FunctionDecl) -> Result<Node> {
        let mut locals = Env::new();
        for param in &decl.params {
            let binding = Binding::param(Node::sym(param.name.node.as_str()), param.ty.node.clone());
            if locals.insert(param.name.node.clone(), binding).is_some() {
                return Err(err(
                    GenerationErrorKind::Duplicate(param.name.node.clone()),
                    param.name.span,
                ));
            }
        }
        let path = Path {
            locals,
            ..Path::default()
        };
        let body = self.lower_stmts(&decl.body, 0, path, &Cont::Done)?;
        let head = if decl.inline { "defun-inline" } else { "defun" };
        let params = decl
            .params
            .iter()
            .map(|p| Node::sym(p.name.node.as_str()))
            .collect();
        Ok(Node::list(vec![
            Node::sym(head),
            Node::sym(decl.name.node.as_str()),
            Node::list(params),
            body,
        ]))
    }

    fn resume(&mut self, mut path: Path, cont: &Cont<'_>) -> Result<Node> {
        match cont {
            Cont::Done => self.leaf(path),
            Cont::Stmts {
                stmts,
                layer,
                scope,
                next,
            } => {
                match scope {
                    Scope::Close { len, mark } => path.close_block(*len, *mark),
                    Scope::Restore { env, mark } => {
                        path.locals = env.clone();
                        path.shadowed.truncate(*mark);
                    }
                }
                self.lower_stmts(stmts, *layer, path, next)
            }
        }
    }

    /// The end of a control path.
    fn leaf(&mut self, path: Path) -> Result<Node> {
        let Some(plan) = self.plan() else {
            return Ok(Node::nil());
        };
        let conditions = self.condition_list(path.conditions);
        let mut result = if plan.layered {
            let state = if path.state.is_empty() {
                Node::nil()
            } else {
                Node::call("list", path.state)
            };
            Node::call("c", vec![state, conditions])
        } else {
            conditions
        };
        if let (true, Some(total)) = (self.opts.conservation_check, path.sent) {
            let amount = plan
                .ambient
                .get(&Ambient::Amount)
                .cloned()
                .unwrap_or_else(|| Node::sym(Ambient::Amount.param_name()));
            result = Node::call(
                "if",
                vec![
                    Node::call(">", vec![total, amount]),
                    fail(Some(Node::str("insufficient amount"))),
                    result,
                ],
            );
        }
        Ok(result)
    }

    /// Fold a path's segments into one list expression.
    fn condition_list(&mut self, segments: Vec<Segment>) -> Node {
        let mut items = Vec::new();
        let mut tail = None;
        for segment in segments.into_iter().rev() {
            match segment {
                Segment::Item(item) => match tail.take() {
                    Some(rest) => tail = Some(Node::call("c", vec![item, rest])),
                    None => items.push(item),
                },
                Segment::Splice(list) => {
                    let rest = take_rest(&mut items, &mut tail);
                    tail = Some(if rest.is_nil() {
                        list
                    } else {
                        self.builder.call(MERGE_LIST);
                        Node::call(MERGE_LIST, vec![list, rest])
                    });
                }
                Segment::Guard { cond, message } => {
                    let rest = take_rest(&mut items, &mut tail);
                    tail = Some(Node::call("if", vec![cond, rest, fail(message)]));
                }
                Segment::Fail(message) => {
                    items.clear();
                    tail = Some(fail(message));
                }
            }
        }
        take_rest(&mut items, &mut tail)
    }

    fn in_function(&self) -> bool {
        matches!(self.ctx, Context::Function(_))
    }

    fn require_action(&self, what: &str, span: Span) -> Result<()> {
        if self.in_function() {
            Err(err(GenerationErrorKind::ConditionOutsideAction(what.to_string()), span))
        } else {
            Ok(())
        }
    }

    pub(crate) fn lower_stmts(
        &mut self,
        stmts: &[Spanned<Stmt>],
        layer: usize,
        mut path: Path,
        cont: &Cont<'_>,
    ) -> Result<Node> {
        let Some((first, rest)) = stmts.split_first() else {
            return self.resume(path, cont);
        };
        let span = first.span;
        match &first.node {
            Stmt::Let { .. } | Stmt::Assign { .. } => {
                self.rebind(first, &mut path)?;
                self.lower_stmts(rest, layer, path, cont)
            }
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                let c = self.lower_expr(cond, &path)?;
                if self.inlines(then_block, else_block.as_deref()) {
                    self.inline_if(c, then_block, else_block.as_deref(), &mut path, span)?;
                    return self.lower_stmts(rest, layer, path, cont);
                }

                self.enter(span)?;
                let next = Cont::Stmts {
                    stmts: rest,
                    layer,
                    scope: Scope::Close {
                        len: path.locals.len(),
                        mark: path.shadowed.len(),
                    },
                    next: cont,
                };
                let then_node = self.lower_stmts(then_block, layer, path.clone(), &next);
                let else_node = match else_block {
                    Some(block) => self.lower_stmts(block, layer, path, &next),
                    None => self.resume(path, &next),
                };
                self.exit();
                Ok(Node::call("if", vec![c, then_node?, else_node?]))
            }
            Stmt::Require { cond, message } => {
                let c = self.lower_expr(cond, &path)?;
                let m = message
                    .as_ref()
                    .map(|m| self.lower_expr(m, &path))
                    .transpose()?;
                let rest = self.lower_stmts(rest, layer, path, cont)?;
                Ok(Node::call("if", vec![c, rest, fail(m)]))
            }
            Stmt::Exception { message } => {
                let m = message
                    .as_ref()
                    .map(|m| self.lower_expr(m, &path))
                    .transpose()?;
                Ok(fail(m))
            }
            Stmt::Return(value) => match (self.in_function(), value) {
                (true, Some(e)) => self.lower_expr(e, &path),
                (true, None) => Ok(Node::nil()),
                (false, None) => self.leaf(path),
                (false, Some(e)) => Err(err(
                    GenerationErrorKind::Unsupported(
                        "actions cannot return a value".to_string(),
                    ),
                    e.span,
                )),
            },
            Stmt::Placeholder => {
                let in_modifier = self
                    .plan()
                    .is_some_and(|plan| matches!(plan.layers.get(layer), Some(Layer::Modifier { .. })));
                if !in_modifier {
                    return Err(err(
                        GenerationErrorKind::Unsupported("`_;` outside a modifier".to_string()),
                        span,
                    ));
                }
                let next = Cont::Stmts {
                    stmts: rest,
                    layer,
                    scope: Scope::Restore {
                        env: path.locals.clone(),
                        mark: path.shadowed.len(),
                    },
                    next: cont,
                };
                self.lower_layer(layer + 1, path, &next)
            }
            Stmt::Emit { .. } | Stmt::Send { .. } | Stmt::Expr(_) => {
                self.effect(first, &mut path)?;
                self.lower_stmts(rest, layer, path, cont)
            }
        }
    }

    /// Whether an `if` with these branches is lowered inline. Functions
    /// inline only value-computing branches; actions inline any pair of
    /// branches that both fall through.
    fn inlines(&self, then_block: &[Spanned<Stmt>], else_block: Option<&[Spanned<Stmt>]>) -> bool {
        if self.in_function() {
            return rebinds_only(then_block) && else_block.map_or(true, rebinds_only);
        }
        std::iter::once(then_block)
            .chain(else_block)
            .all(|block| !ends(block) && !exits_early(block))
    }

    /// Append the condition a `send`, `emit` or condition builtin produces;
    /// other expression statements are evaluated for errors and dropped.
    fn effect(&mut self, stmt: &Spanned<Stmt>, path: &mut Path) -> Result<()> {
        let span = stmt.span;
        match &stmt.node {
            Stmt::Emit { event, args } => {
                self.require_action("emit", span)?;
                let decl = self
                    .table
                    .events
                    .get(event.node.as_str())
                    .copied()
                    .ok_or_else(|| {
                        err(GenerationErrorKind::UnknownEvent(event.node.clone()), event.span)
                    })?;
                check_arity(&event.node, Arity::Exact(decl.fields.len()), args.len(), span)?;
                let mut payload = vec![Node::str(event_signature(decl))];
                for (field, arg) in decl.fields.iter().zip(args) {
                    payload.push(self.lower_typed(arg, Some(&field.ty.node), path)?);
                }
                self.use_conditions();
                self.builder.use_feature(Feature::TreeHash);
                let hashed = Node::call("sha256tree", vec![Node::call("list", payload)]);
                path.conditions.push(Segment::Item(Node::call(
                    "list",
                    vec![Node::sym("CREATE_PUZZLE_ANNOUNCEMENT"), hashed],
                )));
                Ok(())
            }
            Stmt::Send {
                recipient,
                amount,
                memo,
            } => {
                self.require_action("send", span)?;
                let to = self.lower_address(recipient, path)?;
                let amt = self.lower_expr(amount, path)?;
                let mut items = vec![Node::sym("CREATE_COIN"), to, amt.clone()];
                if let Some(memo) = memo {
                    let m = self.lower_expr(memo, path)?;
                    items.push(Node::call("list", vec![m]));
                }
                self.use_conditions();
                path.conditions.push(Segment::Item(Node::call("list", items)));
                path.sent = Some(match path.sent.take() {
                    Some(total) => Node::call("+", vec![total, amt]),
                    None => amt,
                });
                Ok(())
            }
            Stmt::Expr(e) => {
                if let SourceExpr::Call { callee, args } = &e.node {
                    if let Some(builtin) = builtins::lookup_condition(&callee.node) {
                        self.require_action(&callee.node, span)?;
                        check_arity(&callee.node, Arity::Exact(builtin.arity), args.len(), span)?;
                        let mut items = vec![Node::sym(builtin.condition)];
                        items.extend(self.lower_args(args, path)?);
                        self.use_conditions();
                        path.conditions.push(Segment::Item(Node::call("list", items)));
                        return Ok(());
                    }
                }
                self.lower_expr(e, path)?;
                tracing::warn!(
                    scope = self.scope_name(),
                    offset = e.span.start,
                    "expression statement has no effect; its value is discarded"
                );
                Ok(())
            }
            _ => Err(err(
                GenerationErrorKind::Unsupported("statement cannot be inlined".to_string()),
                span,
            )),
        }
    }

    /// Apply a `let` or assignment to `path`.
    fn rebind(&mut self, stmt: &Spanned<Stmt>, path: &mut Path) -> Result<()> {
        match &stmt.node {
            Stmt::Let { name, ty, value } => {
                let declared = ty.as_ref().map(|t| t.node.clone());
                let v = self.lower_typed(value, declared.as_ref(), path)?;
                let ty = declared.or_else(|| self.infer_type(value, path));
                let hidden = path.locals.insert(
                    name.node.clone(),
                    Binding {
                        value: v,
                        ty,
                        mutable: true,
                    },
                );
                if let Some(outer) = hidden {
                    path.shadowed.push((name.node.clone(), outer));
                }
                Ok(())
            }
            Stmt::Assign { target, value } => match &target.node {
                Place::Var(name) => {
                    let mutable = match path.locals.get(name) {
                        Some(binding) => binding.mutable,
                        None if self.table.get(name).is_some() => false,
                        None => {
                            return Err(err(
                                GenerationErrorKind::UndeclaredAssignment(name.clone()),
                                target.span,
                            ))
                        }
                    };
                    if !mutable {
                        return Err(err(
                            GenerationErrorKind::ImmutableAssignment(name.clone()),
                            target.span,
                        ));
                    }
                    let ty = path.locals.get(name).and_then(|b| b.ty.clone());
                    let v = self.lower_typed(value, ty.as_ref(), path)?;
                    if let Some(binding) = path.locals.get_mut(name) {
                        binding.value = v;
                    }
                    Ok(())
                }
                Place::State(field) => {
                    let index = self.state_index(field, target.span)?;
                    let ty = self
                        .table
                        .state
                        .as_ref()
                        .and_then(|s| s.fields.get(index))
                        .map(|f| f.ty.clone());
                    let v = self.lower_typed(value, ty.as_ref(), path)?;
                    if let Some(slot) = path.state.get_mut(index) {
                        *slot = v;
                    }
                    Ok(())
                }
            },
            _ => Ok(()),
        }
    }

    /// Run an inline branch in place. Returns `false` when the branch ends
    /// in `exception`.
    fn run_block(&mut self, block: &[Spanned<Stmt>], path: &mut Path) -> Result<bool> {
        let (len, mark) = (path.locals.len(), path.shadowed.len());
        let mut live = true;
        for stmt in block {
            match &stmt.node {
                Stmt::If {
                    cond,
                    then_block,
                    else_block,
                } => {
                    let c = self.lower_expr(cond, path)?;
                    self.inline_if(c, then_block, else_block.as_deref(), path, stmt.span)?;
                }
                Stmt::Require { cond, message } => {
                    let c = self.lower_expr(cond, path)?;
                    let m = message
                        .as_ref()
                        .map(|m| self.lower_expr(m, path))
                        .transpose()?;
                    path.conditions.push(Segment::Guard {
                        cond: c,
                        message: m,
                    });
                }
                Stmt::Exception { message } => {
                    let m = message
                        .as_ref()
                        .map(|m| self.lower_expr(m, path))
                        .transpose()?;
                    path.conditions.push(Segment::Fail(m));
                    live = false;
                    break;
                }
                Stmt::Let { .. } | Stmt::Assign { .. } => self.rebind(stmt, path)?,
                _ => self.effect(stmt, path)?,
            }
        }
        path.close_block(len, mark);
        Ok(live)
    }

    fn inline_if(
        &mut self,
        cond: Node,
        then_block: &[Spanned<Stmt>],
        else_block: Option<&[Spanned<Stmt>]>,
        path: &mut Path,
        span: Span,
    ) -> Result<()> {
        self.enter(span)?;
        let mut then_path = path.branch();
        let mut else_path = path.branch();
        let result = self.run_block(then_block, &mut then_path).and_then(|then_live| {
            let else_live = match else_block {
                Some(block) => self.run_block(block, &mut else_path)?,
                None => true,
            };
            Ok((then_live, else_live))
        });
        self.exit();
        let (then_live, else_live) = result?;

        // Values from a failing branch are never observed.
        match (then_live, else_live) {
            (false, true) => then_path.adopt_values(&else_path),
            (true, false) => else_path.adopt_values(&then_path),
            _ => {}
        }

        let choose = |a: &Node, b: &Node| {
            if a == b {
                a.clone()
            } else {
                Node::call("if", vec![cond.clone(), a.clone(), b.clone()])
            }
        };
        let merged: Vec<(String, Node)> = path
            .locals
            .keys()
            .filter_map(|name| {
                let a = &then_path.locals.get(name)?.value;
                let b = &else_path.locals.get(name)?.value;
                Some((name.clone(), choose(a, b)))
            })
            .collect();
        for (name, value) in merged {
            if let Some(binding) = path.locals.get_mut(&name) {
                binding.value = value;
            }
        }
        let state = path
            .state
            .iter()
            .enumerate()
            .map(|(i, old)| match (then_path.state.get(i), else_path.state.get(i)) {
                (Some(a), Some(b)) => choose(a, b),
                _ => old.clone(),
            })
            .collect();
        path.state = state;

        let delta = match (then_path.sent.take(), else_path.sent.take()) {
            (None, None) => None,
            (a, b) => Some(choose(
                &a.unwrap_or_else(|| Node::int(0)),
                &b.unwrap_or_else(|| Node::int(0)),
            )),
        };
        if let Some(delta) = delta {
            path.sent = Some(match path.sent.take() {
                Some(total) => Node::call("+", vec![total, delta]),
                None => delta,
            });
        }

        let then_list = self.condition_list(then_path.conditions);
        let else_list = self.condition_list(else_path.conditions);
        if !(then_list.is_nil() && else_list.is_nil()) {
            path.conditions
                .push(Segment::Splice(Node::call("if", vec![cond, then_list, else_list])));
        }
        Ok(())
    }
}
