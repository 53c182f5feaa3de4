pub mod address;
pub mod api;
pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod layer;
pub mod solution;
pub mod syntax;
pub mod tree;

// Re-exports: syntax modules keep their short `crate::X` paths
pub use syntax::lexeme;
pub use syntax::lexer;
pub use syntax::parser;
pub use syntax::span;

// Re-export public API: `coinscript::compile()` etc.
pub use api::*;
pub use codegen::{CompiledAction, CompiledCoin, CompiledProgram};
pub use config::CompileOptions;
pub use error::{Error, Result};
pub use layer::StatefulCoin;
pub use solution::SolutionBuilder;
pub use tree::{Node, Program, TreeHash};
