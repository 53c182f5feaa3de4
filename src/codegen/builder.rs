//! Per-program accumulator.
//!
//! A `Builder` collects everything a single emitted program needs besides
//! its body: curried and solution parameters, the features that decide its
//! includes, the user functions it calls, and comments for rendering. It is
//! created for one program and consumed by [`Builder::finish`].

use std::collections::{BTreeSet, HashMap};

use indexmap::{IndexMap, IndexSet};

use super::includes;
use crate::config::CompileOptions;
use crate::error::{GenerationError, GenerationErrorKind};
use crate::span::Span;
use crate::tree::{tree_hash, Node, OpcodeStyle, Program, TreeHash};

use super::CompiledProgram;

/// Library-backed capabilities a program uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    /// Symbolic condition codes (`CREATE_COIN`, …).
    Conditions,
    /// `sha256tree`.
    TreeHash,
    /// `and` / `or` macros.
    LogicMacros,
}

/// Features and user functions reached by a piece of lowered code.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Usage {
    pub features: BTreeSet<Feature>,
    pub calls: IndexSet<String>,
}

impl Usage {
    pub fn absorb(&mut self, other: &Usage) {
        self.features.extend(other.features.iter().copied());
        self.calls.extend(other.calls.iter().cloned());
    }
}

#[derive(Debug)]
pub struct Builder {
    name: String,
    curried: IndexMap<String, Option<Node>>,
    solution: Vec<String>,
    usage: Usage,
    pending_comment: Option<String>,
    comments: HashMap<TreeHash, String>,
}

impl Builder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            curried: IndexMap::new(),
            solution: Vec::new(),
            usage: Usage::default(),
            pending_comment: None,
            comments: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a curried parameter. With a value, the parameter is bound at
    /// finish and disappears from the emitted parameter list.
    pub fn curried_param(&mut self, name: &str, value: Option<Node>) -> &mut Self {
        self.curried.insert(name.to_string(), value);
        self
    }

    pub fn solution_param(&mut self, name: &str) -> &mut Self {
        if !self.solution.iter().any(|p| p == name) {
            self.solution.push(name.to_string());
        }
        self
    }

    pub fn use_feature(&mut self, feature: Feature) -> &mut Self {
        self.usage.features.insert(feature);
        self
    }

    pub fn call(&mut self, function: &str) -> &mut Self {
        self.usage.calls.insert(function.to_string());
        self
    }

    pub fn absorb(&mut self, usage: &Usage) -> &mut Self {
        self.usage.absorb(usage);
        self
    }

    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    pub fn into_usage(self) -> Usage {
        self.usage
    }

    /// Set the comment for the next node passed to [`Builder::attach`].
    pub fn comment(&mut self, text: impl Into<String>) -> &mut Self {
        self.pending_comment = Some(text.into());
        self
    }

    /// Attach the pending comment, if any, to `node`.
    pub fn attach(&mut self, node: Node) -> Node {
        if let Some(text) = self.pending_comment.take() {
            self.comments.insert(tree_hash(&node), text);
        }
        node
    }

    /// Assemble `(mod params includes definitions body)`, then bind the
    /// curried parameters that carry values.
    pub fn finish(
        self,
        body: Node,
        definitions: Vec<Node>,
        opts: &CompileOptions,
    ) -> Result<CompiledProgram, GenerationError> {
        let includes = includes::resolve(&self.usage.features, opts);
        let opcodes = opts
            .opcodes
            .style_for(includes.iter().any(|lib| lib == includes::CONDITION_CODES));

        let params = self
            .curried
            .keys()
            .chain(self.solution.iter())
            .map(Node::sym)
            .collect();
        let mut items = vec![Node::sym("mod"), Node::list(params)];
        items.extend(
            includes
                .iter()
                .map(|lib| Node::call("include", vec![Node::sym(lib.as_str())])),
        );
        items.extend(definitions);
        items.push(body);

        let program = Program::from_node(Node::list(items)).map_err(|e| {
            GenerationError::new(
                GenerationErrorKind::Unsupported(format!("program `{}`: {}", self.name, e)),
                Span::dummy(),
            )
        })?;
        let bound: IndexMap<String, Node> = self
            .curried
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .collect();
        let program = if bound.is_empty() {
            program
        } else {
            program.bind_curried(&bound)
        };

        tracing::debug!(
            program = %self.name,
            hash = %program.tree_hash(),
            includes = includes.len(),
            "finished program"
        );
        Ok(CompiledProgram {
            name: self.name,
            program,
            comments: self.comments,
            opcodes,
        })
    }
}

/// Rendering style for a program built outside a `Builder`.
pub fn style_for_program(program: &Program, opts: &CompileOptions) -> OpcodeStyle {
    let has_codes = program
        .includes()
        .iter()
        .any(|lib| lib == includes::CONDITION_CODES);
    opts.opcodes.style_for(has_codes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpcodeMode;

    #[test]
    fn test_finish_layout() {
        let mut builder = Builder::new("main");
        builder
            .curried_param("OWNER", None)
            .solution_param("action")
            .solution_param("args")
            .solution_param("action")
            .use_feature(Feature::Conditions);
        let body = Node::call("list", vec![Node::sym("OWNER")]);
        let compiled = builder
            .finish(body, vec![], &CompileOptions::default())
            .unwrap();
        assert_eq!(
            compiled.program.to_string(),
            "(mod (OWNER action args) (include condition_codes.clib) (list OWNER))"
        );
        assert_eq!(compiled.opcodes, OpcodeStyle::Symbolic);
    }

    #[test]
    fn test_bound_curried_params_are_substituted() {
        let mut builder = Builder::new("launcher");
        builder
            .curried_param("LAUNCHER_ID", Some(Node::bytes(vec![0xab; 2])))
            .solution_param("amount");
        let body = Node::call("=", vec![Node::sym("LAUNCHER_ID"), Node::sym("amount")]);
        let compiled = builder
            .finish(body, vec![], &CompileOptions::default())
            .unwrap();
        assert_eq!(compiled.program.to_string(), "(mod (amount) (= 0xabab amount))");
        assert_eq!(compiled.opcodes, OpcodeStyle::Numeric);
    }

    #[test]
    fn test_comments_and_definitions() {
        let mut builder = Builder::new("main");
        builder.solution_param("x").call("double");
        let defun = Node::list(vec![
            Node::sym("defun"),
            Node::sym("double"),
            Node::list(vec![Node::sym("n")]),
            Node::call("*", vec![Node::sym("n"), Node::int(2)]),
        ]);
        let body = builder.comment("double it").attach(Node::call("double", vec![Node::sym("x")]));
        assert!(builder.usage().calls.contains("double"));
        let opts = CompileOptions {
            opcodes: OpcodeMode::Symbolic,
            ..CompileOptions::default()
        };
        let compiled = builder.finish(body.clone(), vec![defun], &opts).unwrap();
        assert_eq!(compiled.comments.get(&tree_hash(&body)).map(String::as_str), Some("double it"));
        assert_eq!(compiled.program.definition_names(), vec!["double"]);
        assert_eq!(compiled.opcodes, OpcodeStyle::Symbolic);
    }
}
