//! Compilation entry points used by the CLI, tests and embedders.

use serde::Serialize;

use crate::ast::CoinDecl;
use crate::codegen::{self, Ambient, CompiledCoin, CompiledProgram};
use crate::config::CompileOptions;
use crate::diagnostic::Diagnostic;
use crate::error::{Error, Result};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::tree::{self, Program, TreeHash};


/// Lex and parse CoinScript source into its AST.
pub fn parse_coin(source: &str, options: &CompileOptions) -> Result<CoinDecl> {
    let tokens = Lexer::new(source, 0).tokenize()?;
    let coin = Parser::with_max_depth(tokens, options.max_depth).parse_coin()?;
    Ok(coin)
}

/// Compile CoinScript source into every program the coin needs.
pub fn compile_coin(source: &str, options: &CompileOptions) -> Result<CompiledCoin> {
    let coin = parse_coin(source, options)?;
    Ok(codegen::generate(&coin, options)?)
}

/// Compile a single CoinScript source string to rendered program text.
pub fn compile(source: &str, filename: &str) -> std::result::Result<String, Vec<Diagnostic>> {
    compile_with_options(source, filename, &CompileOptions::default())
}

/// Compile a single CoinScript source string with options.
pub fn compile_with_options(
    source: &str,
    filename: &str,
    options: &CompileOptions,
) -> std::result::Result<String, Vec<Diagnostic>> {
    let span = tracing::debug_span!("compile", file = filename);
    let _enter = span.enter();
    let coin = compile_coin(source, options).map_err(|e| vec![e.to_diagnostic()])?;
    Ok(coin.main.render(options))
}

/// Check a source file without producing output.
pub fn check(source: &str, filename: &str) -> std::result::Result<(), Vec<Diagnostic>> {
    check_with_options(source, filename, &CompileOptions::default())
}

pub fn check_with_options(
    source: &str,
    filename: &str,
    options: &CompileOptions,
) -> std::result::Result<(), Vec<Diagnostic>> {
    let span = tracing::debug_span!("check", file = filename);
    let _enter = span.enter();
    compile_coin(source, options)
        .map(|_| ())
        .map_err(|e| vec![e.to_diagnostic()])
}

/// Structural hash of raw Tree IR source.
///
/// A `(mod …)` form hashes as written; any other tree hashes as a plain
/// value.
pub fn hash_tree_source(source: &str) -> Result<TreeHash> {
    let node = tree::parse(source)?;
    let hash = tree::tree_hash(&node);
    tracing::debug!(hash = %hash, "hashed tree source");
    Ok(hash)
}

/// Parse raw Tree IR source as a module.
pub fn parse_program(source: &str) -> Result<Program> {
    Program::parse(source).map_err(Error::from)
}

// ─── Build artifact ────────────────────────────────────────────────

/// One rendered program in a build artifact.
#[derive(Clone, Debug, Serialize)]
pub struct ProgramArtifact {
    pub name: String,
    pub source: String,
    pub tree_hash: TreeHash,
    pub params: Vec<String>,
    pub includes: Vec<String>,
}

impl ProgramArtifact {
    pub fn new(program: &CompiledProgram, options: &CompileOptions) -> Self {
        Self {
            name: program.name.clone(),
            source: program.render(options),
            tree_hash: program.tree_hash(),
            params: program.program.params().into_iter().map(String::from).collect(),
            includes: program.program.includes(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ParamArtifact {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ActionArtifact {
    pub name: String,
    pub params: Vec<ParamArtifact>,
    pub ambient: Vec<Ambient>,
    pub stateful: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<ProgramArtifact>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LayerArtifact {
    pub mod_hash: TreeHash,
    pub action_root: TreeHash,
    pub state: Vec<ParamArtifact>,
}

/// Everything `coinscript build --json` writes.
#[derive(Clone, Debug, Serialize)]
pub struct BuildArtifact {
    pub coin: String,
    pub main: ProgramArtifact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launcher: Option<ProgramArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launcher_id: Option<String>,
    pub actions: Vec<ActionArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<LayerArtifact>,
}

impl BuildArtifact {
    pub fn new(coin: &CompiledCoin, options: &CompileOptions) -> Self {
        let actions = coin
            .actions
            .iter()
            .map(|action| ActionArtifact {
                name: action.name.clone(),
                params: action
                    .params
                    .iter()
                    .map(|(name, ty)| ParamArtifact {
                        name: name.clone(),
                        ty: ty.to_string(),
                    })
                    .collect(),
                ambient: action.ambient.clone(),
                stateful: action.stateful,
                program: action.program.as_ref().map(|p| ProgramArtifact::new(p, options)),
            })
            .collect();
        let layer = coin.layer.as_ref().map(|layer| LayerArtifact {
            mod_hash: layer.mod_hash(),
            action_root: layer.action_root(),
            state: layer
                .schema()
                .fields
                .iter()
                .map(|f| ParamArtifact {
                    name: f.name.clone(),
                    ty: f.ty.to_string(),
                })
                .collect(),
        });
        Self {
            coin: coin.name.clone(),
            main: ProgramArtifact::new(&coin.main, options),
            launcher: coin.launcher.as_ref().map(|p| ProgramArtifact::new(p, options)),
            launcher_id: coin.launcher_id.as_ref().map(|id| id.to_string()),
            actions,
            layer,
        }
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
