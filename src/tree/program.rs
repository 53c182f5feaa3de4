//! `Program`: a validated `(mod ParamSpec Include* Definition* Body)` form.

use indexmap::IndexMap;

use super::curry::{curry, curry_tree_hash, substitute};
use super::hash::{tree_hash, TreeHash};
use super::serialize::{hex, serialize, SerializeOptions};
use super::{is_curried_name, Atom, Node};
use crate::error::{BackendError, TreeError};

/// An external compiler from program source to VM bytecode.
///
/// Compilation and execution belong to the VM; this crate only produces
/// source and hashes.
pub trait BytecodeCompiler {
    fn compile(&self, source: &str) -> Result<Vec<u8>, BackendError>;
}

const DEFINITION_FORMS: &[&str] = &["defun", "defun-inline", "defmacro", "defconstant"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    node: Node,
}

impl Program {
    /// Validate a node as a module form.
    pub fn from_node(node: Node) -> Result<Self, TreeError> {
        let items: Vec<Node> = match node {
            Node::List(items) => items,
            other => other
                .proper_items()
                .ok_or_else(|| conversion("module is not a proper list"))?
                .into_iter()
                .cloned()
                .collect(),
        };
        if items.len() < 3 {
            return Err(conversion(
                "expected `(mod ParamSpec … Body)` with at least a parameter spec and a body",
            ));
        }
        if items[0].as_symbol() != Some("mod") {
            return Err(conversion("expected `mod` at the head"));
        }
        check_param_spec(&items[1])?;

        let mut seen_definition = false;
        for item in &items[2..items.len() - 1] {
            match item.head_symbol() {
                Some("include") => {
                    if seen_definition {
                        return Err(conversion("`include` after a definition"));
                    }
                    match item.as_list() {
                        Some([_, lib]) if lib.is_atom() => {}
                        _ => return Err(conversion("`include` takes one library name")),
                    }
                }
                Some(head) if DEFINITION_FORMS.contains(&head) => {
                    seen_definition = true;
                    let len = item.as_list().map_or(0, <[Node]>::len);
                    let min = if head == "defconstant" { 3 } else { 4 };
                    if len < min {
                        return Err(TreeError::Conversion {
                            form: head.to_string(),
                            reason: format!("expected at least {} elements, found {}", min, len),
                        });
                    }
                }
                _ => {
                    return Err(conversion(
                        "only `include` and definitions may precede the body",
                    ))
                }
            }
        }
        Ok(Program {
            node: Node::List(items),
        })
    }

    /// Parse module source text.
    pub fn parse(source: &str) -> Result<Self, TreeError> {
        Self::from_node(super::parse(source)?)
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    fn items(&self) -> &[Node] {
        self.node.as_list().unwrap_or(&[])
    }

    pub fn param_spec(&self) -> &Node {
        &self.items()[1]
    }

    /// Parameter names in declaration order.
    pub fn params(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_symbols(&self.items()[1], &mut out);
        out
    }

    pub fn curried_params(&self) -> Vec<&str> {
        self.params().into_iter().filter(|p| is_curried_name(p)).collect()
    }

    pub fn solution_params(&self) -> Vec<&str> {
        self.params().into_iter().filter(|p| !is_curried_name(p)).collect()
    }

    /// Included library names, e.g. `condition_codes.clib`.
    pub fn includes(&self) -> Vec<String> {
        self.middle()
            .iter()
            .filter(|item| item.head_symbol() == Some("include"))
            .filter_map(|item| item.as_list().and_then(|xs| xs.get(1)))
            .map(library_name)
            .collect()
    }

    /// `defun`, `defun-inline`, `defmacro` and `defconstant` forms.
    pub fn definitions(&self) -> Vec<&Node> {
        self.middle()
            .iter()
            .filter(|item| item.head_symbol() != Some("include"))
            .collect()
    }

    /// Names of the defined functions, macros and constants.
    pub fn definition_names(&self) -> Vec<&str> {
        self.definitions()
            .into_iter()
            .filter_map(|d| d.as_list().and_then(|xs| xs.get(1)).and_then(Node::as_symbol))
            .collect()
    }

    pub fn body(&self) -> &Node {
        let items = self.items();
        &items[items.len() - 1]
    }

    fn middle(&self) -> &[Node] {
        let items = self.items();
        &items[2..items.len() - 1]
    }

    pub fn tree_hash(&self) -> TreeHash {
        tree_hash(&self.node)
    }

    /// Substitute curried values into the module and drop the bound names
    /// from its parameter list.
    pub fn bind_curried(&self, bindings: &IndexMap<String, Node>) -> Program {
        let current = self.items();
        let mut items = Vec::with_capacity(current.len());
        items.push(current[0].clone());
        items.push(remove_params(&current[1], bindings));
        for item in &current[2..] {
            items.push(substitute(item, bindings));
        }
        Program {
            node: Node::List(items),
        }
    }

    /// The VM-level curry of this module with `args`.
    pub fn curry(&self, args: &[Node]) -> Node {
        curry(&self.node, args)
    }

    /// Hash of [`Program::curry`] without building the curried tree.
    pub fn curried_hash(&self, args: &[Node]) -> TreeHash {
        let arg_hashes: Vec<TreeHash> = args.iter().map(tree_hash).collect();
        curry_tree_hash(&self.tree_hash(), &arg_hashes)
    }

    pub fn render(&self, opts: &SerializeOptions) -> String {
        serialize(&self.node, opts)
    }

    pub fn compile_with(&self, compiler: &dyn BytecodeCompiler) -> Result<Vec<u8>, BackendError> {
        compiler.compile(&self.render(&SerializeOptions::default()))
    }

    pub fn compile_hex_with(&self, compiler: &dyn BytecodeCompiler) -> Result<String, BackendError> {
        self.compile_with(compiler).map(|bytes| hex(&bytes))
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render(&SerializeOptions::default()))
    }
}

fn conversion(reason: &str) -> TreeError {
    TreeError::Conversion {
        form: "mod".to_string(),
        reason: reason.to_string(),
    }
}

fn check_param_spec(spec: &Node) -> Result<(), TreeError> {
    match spec {
        Node::Atom(Atom::Symbol(_)) => Ok(()),
        Node::Atom(a) if a.is_nil() => Ok(()),
        Node::Atom(_) => Err(conversion("parameter names must be symbols")),
        Node::List(items) => items.iter().try_for_each(check_param_spec),
        Node::Cons(first, rest) => {
            check_param_spec(first)?;
            check_param_spec(rest)
        }
    }
}

fn collect_symbols<'a>(spec: &'a Node, out: &mut Vec<&'a str>) {
    match spec {
        Node::Atom(Atom::Symbol(s)) => out.push(s),
        Node::Atom(_) => {}
        Node::List(items) => items.iter().for_each(|n| collect_symbols(n, out)),
        Node::Cons(first, rest) => {
            collect_symbols(first, out);
            collect_symbols(rest, out);
        }
    }
}

fn remove_params(spec: &Node, bindings: &IndexMap<String, Node>) -> Node {
    match spec {
        Node::List(items) => Node::List(
            items
                .iter()
                .filter(|n| !matches!(n.as_symbol(), Some(s) if bindings.contains_key(s)))
                .map(|n| remove_params(n, bindings))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn library_name(node: &Node) -> String {
    match node {
        Node::Atom(Atom::Symbol(s)) | Node::Atom(Atom::Str(s)) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "(mod (OWNER AMOUNT to) (include condition_codes.clib) \
                          (defun double (n) (* n 2)) \
                          (list (list CREATE_COIN to (double AMOUNT))))";

    #[test]
    fn test_accessors() {
        let program = Program::parse(SAMPLE).unwrap();
        assert_eq!(program.params(), vec!["OWNER", "AMOUNT", "to"]);
        assert_eq!(program.curried_params(), vec!["OWNER", "AMOUNT"]);
        assert_eq!(program.solution_params(), vec!["to"]);
        assert_eq!(program.includes(), vec!["condition_codes.clib".to_string()]);
        assert_eq!(program.definition_names(), vec!["double"]);
        assert_eq!(program.body().head_symbol(), Some("list"));
    }

    #[test]
    fn test_rejects_malformed_modules() {
        assert!(matches!(
            Program::parse("(+ 1 2)"),
            Err(TreeError::Conversion { .. })
        ));
        assert!(matches!(
            Program::parse("(mod (A))"),
            Err(TreeError::Conversion { .. })
        ));
        assert!(matches!(
            Program::parse("(mod (A 5) A)"),
            Err(TreeError::Conversion { .. })
        ));
        assert!(matches!(
            Program::parse("(mod (A) (defun f (x) x) (include a.clib) A)"),
            Err(TreeError::Conversion { .. })
        ));
        assert!(matches!(
            Program::parse("(mod (A) (defun f) A)"),
            Err(TreeError::Conversion { form, .. }) if form == "defun"
        ));
        assert!(matches!(
            Program::parse("(mod (A) (+ A 1) A)"),
            Err(TreeError::Conversion { .. })
        ));
    }

    #[test]
    fn test_bind_curried() {
        let program = Program::parse(SAMPLE).unwrap();
        let mut bindings = IndexMap::new();
        bindings.insert("AMOUNT".to_string(), Node::int(100));
        let bound = program.bind_curried(&bindings);
        assert_eq!(bound.params(), vec!["OWNER", "to"]);
        assert_eq!(
            bound.body().to_string(),
            "(list (list CREATE_COIN to (double 100)))"
        );
    }

    #[test]
    fn test_curried_hash_matches_curry() {
        let program = Program::parse("(mod (A) (+ A 1))").unwrap();
        let args = [Node::int(7)];
        assert_eq!(program.curried_hash(&args), tree_hash(&program.curry(&args)));
    }

    struct EchoCompiler;

    impl BytecodeCompiler for EchoCompiler {
        fn compile(&self, source: &str) -> Result<Vec<u8>, BackendError> {
            Ok(source.as_bytes().to_vec())
        }
    }

    #[test]
    fn test_compile_with_backend() {
        let program = Program::parse("(mod () 1)").unwrap();
        let hex = program.compile_hex_with(&EchoCompiler).unwrap();
        // hex of "(mod () 1)"
        assert_eq!(hex, "286d6f6420282920313129");
    }
}
