//! Code generation: CoinScript AST → Tree IR programs.
//!
//! A coin compiles to a main program plus, for coins with `@stateful`
//! actions, one program per action committed into the action layer, and an
//! optional singleton launcher. Each program is assembled by its own
//! [`Builder`].

mod builder;
pub mod builtins;
mod expr;
pub mod includes;
mod routing;
mod stmt;
pub mod symbols;

#[cfg(test)]
mod tests;

use std::collections::{BTreeSet, HashMap};

use indexmap::{IndexMap, IndexSet};

pub use builder::{style_for_program, Builder, Feature, Usage};
pub use routing::Ambient;

use crate::ast::{ActionDecl, CoinDecl, Literal, SourceExpr, Type};
use crate::config::CompileOptions;
use crate::error::{GenerationError, GenerationErrorKind};
use crate::layer::{CommittedAction, StateSchema, StatefulCoin};
use crate::span::{Span, Spanned};
use crate::tree::{Node, OpcodeStyle, Program, SerializeOptions, TreeHash};
use expr::{Context, Lowerer, Path};
use routing::{dispatch, plan_action, Shape};
use symbols::{address_node, SymbolTable};

/// One emitted program with what it needs for rendering.
#[derive(Clone, Debug)]
pub struct CompiledProgram {
    pub name: String,
    pub program: Program,
    /// Comments keyed by the tree hash of the commented node.
    pub comments: HashMap<TreeHash, String>,
    pub opcodes: OpcodeStyle,
}

impl CompiledProgram {
    pub fn serialize_options(&self, opts: &CompileOptions) -> SerializeOptions {
        SerializeOptions {
            comments: self.comments.clone(),
            ..opts.serialize_options(self.opcodes)
        }
    }

    pub fn render(&self, opts: &CompileOptions) -> String {
        self.program.render(&self.serialize_options(opts))
    }

    pub fn tree_hash(&self) -> TreeHash {
        self.program.tree_hash()
    }
}

#[derive(Clone, Debug)]
pub struct CompiledAction {
    pub name: String,
    pub params: Vec<(String, Type)>,
    /// Ambient values the action reads, in solution order.
    pub ambient: Vec<Ambient>,
    pub stateful: bool,
    /// The action's own program, for actions committed to the layer.
    pub program: Option<CompiledProgram>,
}

#[derive(Clone, Debug)]
pub struct CompiledCoin {
    pub name: String,
    pub main: CompiledProgram,
    pub launcher: Option<CompiledProgram>,
    /// Fixed launcher id from `@singleton(id)`.
    pub launcher_id: Option<Node>,
    pub actions: Vec<CompiledAction>,
    pub state: Option<StateSchema>,
    pub layer: Option<StatefulCoin>,
}

impl CompiledCoin {
    pub fn action(&self, name: &str) -> Option<&CompiledAction> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// Main program, launcher, then per-action programs.
    pub fn programs(&self) -> impl Iterator<Item = &CompiledProgram> {
        std::iter::once(&self.main)
            .chain(self.launcher.iter())
            .chain(self.actions.iter().filter_map(|a| a.program.as_ref()))
    }
}

struct LoweredFunction {
    def: Node,
    usage: Usage,
}

fn gen_err(kind: GenerationErrorKind, span: Span) -> GenerationError {
    GenerationError::new(kind, span)
}

/// Lower a parsed coin into its programs.
pub fn generate(coin: &CoinDecl, opts: &CompileOptions) -> Result<CompiledCoin, GenerationError> {
    let span = tracing::debug_span!("generate", coin = %coin.name.node);
    let _enter = span.enter();

    let singleton = coin_decorators(coin)?;
    let mut table = SymbolTable::build(coin)?;
    lower_constants(&mut table, opts)?;
    let functions = lower_functions(&table, opts)?;

    let actions: Vec<&ActionDecl> = coin.actions().collect();
    if actions.is_empty() {
        return Err(gen_err(
            GenerationErrorKind::NoActions(coin.name.node.clone()),
            coin.name.span,
        ));
    }
    let stateful = actions.iter().any(|a| a.is_stateful());
    if table.state.is_some() && !stateful {
        tracing::warn!(
            coin = %coin.name.node,
            "state block declared but no action is @stateful; state is unused"
        );
    }

    let generator = Generator {
        coin,
        opts,
        table: &table,
        functions: &functions,
    };
    let (main, compiled, layer) = if stateful {
        let (main, compiled, layer) = generator.layered(&actions)?;
        (main, compiled, Some(layer))
    } else {
        let (main, compiled) = generator.routed(&actions)?;
        (main, compiled, None)
    };
    let launcher = match &singleton {
        Some(id) => Some(launcher_program(id.clone(), opts)?),
        None => None,
    };

    tracing::debug!(
        programs = 1 + launcher.iter().count() + compiled.iter().filter(|a| a.program.is_some()).count(),
        main = %main.tree_hash(),
        "generated coin"
    );
    Ok(CompiledCoin {
        name: coin.name.node.clone(),
        main,
        launcher,
        launcher_id: singleton.flatten(),
        actions: compiled,
        state: table.state.clone(),
        layer,
    })
}

/// Validate coin decorators. Returns `Some(id)` for `@singleton`.
fn coin_decorators(coin: &CoinDecl) -> Result<Option<Option<Node>>, GenerationError> {
    let mut singleton = None;
    for decorator in &coin.decorators {
        let name = decorator.node.name.node.as_str();
        match name {
            "singleton" => {
                let args = &decorator.node.args;
                expr::check_arity(name, builtins::Arity::Range(0, 1), args.len(), decorator.span)?;
                let id = args.first().map(launcher_id).transpose()?;
                singleton = Some(id);
            }
            "stateful" | "onlyAddress" => {
                return Err(gen_err(
                    GenerationErrorKind::BadDecoratorTarget {
                        decorator: name.to_string(),
                        target: "a coin".to_string(),
                    },
                    decorator.span,
                ))
            }
            other => {
                return Err(gen_err(
                    GenerationErrorKind::UnknownDecorator(other.to_string()),
                    decorator.node.name.span,
                ))
            }
        }
    }
    Ok(singleton)
}

fn launcher_id(arg: &Spanned<SourceExpr>) -> Result<Node, GenerationError> {
    match &arg.node {
        SourceExpr::Literal(Literal::Bytes(bytes)) if bytes.len() == 32 => {
            Ok(Node::bytes(bytes.clone()))
        }
        SourceExpr::Literal(Literal::Str(text)) => address_node(text, arg.span),
        _ => Err(gen_err(
            GenerationErrorKind::InvalidAddress("launcher id must be a 32-byte literal".to_string()),
            arg.span,
        )),
    }
}

fn lower_constants(table: &mut SymbolTable<'_>, opts: &CompileOptions) -> Result<(), GenerationError> {
    for decl in table.constants.clone() {
        let mut builder = Builder::new(decl.name.node.as_str());
        let declared = decl.ty.as_ref().map(|t| &t.node);
        let (value, inferred) = {
            let mut lw = Lowerer::new(
                table,
                opts,
                &mut builder,
                Context::Function(decl.name.node.as_str()),
            );
            let value = lw.lower_typed(&decl.value, declared, &Path::default())?;
            (value, lw.infer_type(&decl.value, &Path::default()))
        };
        table.define_constant(decl, value, inferred, builder.into_usage());
    }
    Ok(())
}

fn lower_functions(
    table: &SymbolTable<'_>,
    opts: &CompileOptions,
) -> Result<IndexMap<String, LoweredFunction>, GenerationError> {
    let mut out = IndexMap::new();
    for (&name, &decl) in &table.functions {
        let mut builder = Builder::new(name);
        let def = Lowerer::new(table, opts, &mut builder, Context::Function(name)).lower_function(decl)?;
        out.insert(
            name.to_string(),
            LoweredFunction {
                def,
                usage: builder.into_usage(),
            },
        );
    }
    Ok(out)
}

/// Standard singleton launcher: creates the singleton and announces its
/// puzzle hash, amount and metadata. A fixed id is curried in as
/// `LAUNCHER_ID` and the launcher asserts its own coin id against it.
fn launcher_program(id: Option<Node>, opts: &CompileOptions) -> Result<CompiledProgram, GenerationError> {
    let mut builder = Builder::new("launcher");
    let fixed = id.is_some();
    if fixed {
        builder.curried_param("LAUNCHER_ID", id);
    }
    builder
        .solution_param("singleton_puzzle_hash")
        .solution_param("amount")
        .solution_param("key_value_list")
        .use_feature(Feature::Conditions)
        .use_feature(Feature::TreeHash);
    let announced = Node::call(
        "sha256tree",
        vec![Node::call(
            "list",
            vec![
                Node::sym("singleton_puzzle_hash"),
                Node::sym("amount"),
                Node::sym("key_value_list"),
            ],
        )],
    );
    let mut conditions = Vec::new();
    if fixed {
        conditions.push(Node::call(
            "list",
            vec![Node::sym("ASSERT_MY_COIN_ID"), Node::sym("LAUNCHER_ID")],
        ));
    }
    conditions.push(Node::call(
        "list",
        vec![
            Node::sym("CREATE_COIN"),
            Node::sym("singleton_puzzle_hash"),
            Node::sym("amount"),
        ],
    ));
    conditions.push(Node::call("list", vec![Node::sym("CREATE_COIN_ANNOUNCEMENT"), announced]));
    builder.finish(Node::call("list", conditions), Vec::new(), opts)
}

fn action_signature(action: &ActionDecl) -> String {
    let params: Vec<String> = action
        .params
        .iter()
        .map(|p| format!("{} {}", p.ty.node, p.name.node))
        .collect();
    format!("action {}({})", action.name.node, params.join(", "))
}

fn compiled_action(action: &ActionDecl, ambient: Vec<Ambient>, program: Option<CompiledProgram>) -> CompiledAction {
    CompiledAction {
        name: action.name.node.clone(),
        params: action
            .params
            .iter()
            .map(|p| (p.name.node.clone(), p.ty.node.clone()))
            .collect(),
        ambient,
        stateful: action.is_stateful(),
        program,
    }
}

struct Generator<'a, 'g> {
    coin: &'a CoinDecl,
    opts: &'g CompileOptions,
    table: &'g SymbolTable<'a>,
    functions: &'g IndexMap<String, LoweredFunction>,
}

impl<'a, 'g> Generator<'a, 'g> {
    /// Assemble a program, pulling in every user function it reaches.
    fn finish_program(&self, mut builder: Builder, body: Node) -> Result<CompiledProgram, GenerationError> {
        let mut reached: IndexSet<String> = IndexSet::new();
        let mut pending: Vec<String> = builder.usage().calls.iter().cloned().collect();
        let mut features = BTreeSet::new();
        while let Some(name) = pending.pop() {
            if !reached.insert(name.clone()) {
                continue;
            }
            if let Some(function) = self.functions.get(&name) {
                features.extend(function.usage.features.iter().copied());
                pending.extend(function.usage.calls.iter().cloned());
            }
        }
        for feature in features {
            builder.use_feature(feature);
        }
        let mut definitions: Vec<Node> = self
            .functions
            .iter()
            .filter(|(name, _)| reached.contains(*name))
            .map(|(_, f)| f.def.clone())
            .collect();
        if reached.contains(stmt::MERGE_LIST) {
            definitions.push(stmt::merge_list_defun());
        }
        builder.finish(body, definitions, self.opts)
    }

    /// Plain coin: one program routing on the `action` selector, or taking
    /// the parameters of a lone `default` action directly.
    fn routed(&self, actions: &[&'a ActionDecl]) -> Result<(CompiledProgram, Vec<CompiledAction>), GenerationError> {
        let direct = matches!(actions, [only] if only.name.node == "default");
        let shape = if direct { Shape::Direct } else { Shape::Routed };
        let mut builder = Builder::new(self.coin.name.node.as_str());
        if !direct {
            builder.solution_param("action").solution_param("args");
        }

        let mut branches = Vec::new();
        let mut compiled = Vec::new();
        let mut ambient = BTreeSet::new();
        for &action in actions {
            let plan = plan_action(self.table, self.opts, &mut builder, action, shape)?;
            let body = Lowerer::new(self.table, self.opts, &mut builder, Context::Action(&plan))
                .lower_action()?;
            tracing::trace!(action = plan.name, "routed action");
            if direct {
                for param in &action.params {
                    builder.solution_param(&param.name.node);
                }
            }
            let body = builder.comment(action_signature(action)).attach(body);
            ambient.extend(plan.ambient.keys().copied());
            compiled.push(compiled_action(action, plan.ambient.keys().copied().collect(), None));
            branches.push((action.name.node.clone(), body));
        }
        for a in &ambient {
            builder.solution_param(a.param_name());
        }

        let body = match (direct, branches.pop()) {
            (true, Some((_, body))) => body,
            (_, last) => {
                branches.extend(last);
                dispatch(branches)
            }
        };
        Ok((self.finish_program(builder, body)?, compiled))
    }

    /// Stateful coin: every action becomes its own `(mod (state args) …)`
    /// program committed to the merkle root, and the layer wrapper is the
    /// coin's main program.
    fn layered(
        &self,
        actions: &[&'a ActionDecl],
    ) -> Result<(CompiledProgram, Vec<CompiledAction>, StatefulCoin), GenerationError> {
        let mut committed = Vec::new();
        let mut compiled = Vec::new();
        for &action in actions {
            let mut builder = Builder::new(action.name.node.as_str());
            builder.solution_param("state").solution_param("args");
            let plan = plan_action(self.table, self.opts, &mut builder, action, Shape::Layered)?;
            let body = Lowerer::new(self.table, self.opts, &mut builder, Context::Action(&plan))
                .lower_action()?;
            let body = builder.comment(action_signature(action)).attach(body);
            let program = self.finish_program(builder, body)?;
            tracing::trace!(action = plan.name, hash = %program.tree_hash(), "layered action");

            committed.push(CommittedAction {
                name: action.name.node.clone(),
                program: program.program.clone(),
                arity: action.params.len() + plan.ambient.len(),
            });
            compiled.push(compiled_action(
                action,
                plan.ambient.keys().copied().collect(),
                Some(program),
            ));
        }

        let schema = self.table.state.clone().unwrap_or_default();
        let layer = StatefulCoin::new(schema, committed).map_err(|e| {
            gen_err(GenerationErrorKind::Unsupported(e.to_string()), self.coin.name.span)
        })?;
        let wrapper = layer.wrapper().clone();
        let main = CompiledProgram {
            name: self.coin.name.node.clone(),
            opcodes: style_for_program(&wrapper, self.opts),
            program: wrapper,
            comments: HashMap::new(),
        };
        Ok((main, compiled, layer))
    }
}
