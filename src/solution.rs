//! Solutions: execution-time arguments, ordered like a program's solution
//! parameters.

use indexmap::IndexMap;

use crate::error::SolutionError;
use crate::tree::opcodes::condition_code;
use crate::tree::{parse, serialize, Node, Program, SerializeOptions};

#[derive(Clone, Debug, Default)]
pub struct SolutionBuilder {
    params: Vec<String>,
    values: IndexMap<String, Node>,
}

impl SolutionBuilder {
    pub fn new<S: Into<String>>(params: impl IntoIterator<Item = S>) -> Self {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            values: IndexMap::new(),
        }
    }

    /// A builder for `program`'s solution parameters.
    pub fn for_program(program: &Program) -> Self {
        Self::new(program.solution_params())
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn arg(&mut self, name: &str, value: Node) -> Result<&mut Self, SolutionError> {
        if !self.params.iter().any(|p| p == name) {
            return Err(SolutionError::UnknownParameter(name.to_string()));
        }
        self.values.insert(name.to_string(), value);
        Ok(self)
    }

    /// The `action` selector of a routing program.
    pub fn action(&mut self, name: &str) -> Result<&mut Self, SolutionError> {
        self.arg("action", Node::str(name))
    }

    /// Positional action arguments.
    pub fn args(&mut self, values: Vec<Node>) -> Result<&mut Self, SolutionError> {
        self.arg("args", Node::list(values))
    }

    /// A state tuple for the `state` parameter.
    pub fn state(&mut self, values: Vec<Node>) -> Result<&mut Self, SolutionError> {
        self.arg("state", Node::list(values))
    }

    /// A nested condition list, e.g. built with [`condition`].
    pub fn conditions(&mut self, name: &str, conditions: Vec<Node>) -> Result<&mut Self, SolutionError> {
        self.arg(name, Node::list(conditions))
    }

    pub fn build(&self) -> Result<Node, SolutionError> {
        let items = self
            .params
            .iter()
            .map(|p| {
                self.values
                    .get(p)
                    .cloned()
                    .ok_or_else(|| SolutionError::MissingArgument(p.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Node::list(items))
    }

    pub fn render(&self) -> Result<String, SolutionError> {
        Ok(serialize(&self.build()?, &SerializeOptions::default()))
    }
}

/// `(code arg…)` with the numeric code of a condition name.
pub fn condition(name: &str, args: Vec<Node>) -> Option<Node> {
    let code = condition_code(name)?;
    let mut items = vec![Node::int(i64::from(code))];
    items.extend(args);
    Some(Node::list(items))
}

/// Parse rendered solution text back into a tree.
pub fn parse_solution(text: &str) -> Result<Node, crate::error::TreeError> {
    parse(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> Program {
        Program::parse("(mod (OWNER action args sender) (x))").unwrap()
    }

    #[test]
    fn test_mirrors_solution_params() {
        let mut builder = SolutionBuilder::for_program(&program());
        assert_eq!(builder.params(), ["action", "args", "sender"]);

        builder
            .arg("sender", Node::bytes(vec![0x22; 32]))
            .unwrap()
            .action("transfer")
            .unwrap()
            .args(vec![Node::int(5), Node::str("memo")])
            .unwrap();
        let built = builder.build().unwrap();
        let direct = Node::list(vec![
            Node::str("transfer"),
            Node::list(vec![Node::int(5), Node::str("memo")]),
            Node::bytes(vec![0x22; 32]),
        ]);
        assert_eq!(built, direct);
    }

    #[test]
    fn test_render_parses_back() {
        let mut builder = SolutionBuilder::new(["state", "conds", "my_amount"]);
        builder
            .state(vec![Node::int(-3), Node::bytes(vec![0xab, 0xcd])])
            .unwrap()
            .conditions(
                "conds",
                vec![
                    condition("CREATE_COIN", vec![Node::bytes(vec![0x11; 32]), Node::int(100)])
                        .unwrap(),
                    condition("RESERVE_FEE", vec![Node::int(1)]).unwrap(),
                ],
            )
            .unwrap()
            .arg("my_amount", Node::int(1000))
            .unwrap();
        let text = builder.render().unwrap();
        assert!(text.contains("(51 0x1111"));
        assert_eq!(parse_solution(&text).unwrap(), builder.build().unwrap());
    }

    #[test]
    fn test_errors() {
        let mut builder = SolutionBuilder::for_program(&program());
        assert_eq!(
            builder.arg("OWNER", Node::nil()).err(),
            Some(SolutionError::UnknownParameter("OWNER".into()))
        );
        builder.action("mint").unwrap();
        assert_eq!(
            builder.build(),
            Err(SolutionError::MissingArgument("args".into()))
        );
        assert!(condition("NOT_A_CONDITION", vec![]).is_none());
    }
}
