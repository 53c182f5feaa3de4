//! Positional state tuples.

use crate::ast::{StateDecl, Type};
use crate::error::LayerError;
use crate::tree::Node;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateField {
    pub name: String,
    pub ty: Type,
}

/// Field order of a coin's state; field `i` is the `i`-th tuple element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateSchema {
    pub fields: Vec<StateField>,
}

impl StateSchema {
    pub fn from_decl(decl: &StateDecl) -> Self {
        Self {
            fields: decl
                .fields
                .iter()
                .map(|f| StateField {
                    name: f.name.node.clone(),
                    ty: f.ty.node.clone(),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn encode(&self, values: &[Node]) -> Result<Node, LayerError> {
        if values.len() != self.len() {
            return Err(LayerError::StateArity {
                expected: self.len(),
                found: values.len(),
            });
        }
        Ok(Node::list(values.to_vec()))
    }

    pub fn decode(&self, node: &Node) -> Result<Vec<Node>, LayerError> {
        let items = node
            .proper_items()
            .ok_or_else(|| LayerError::MalformedState(node.to_string()))?;
        if items.len() != self.len() {
            return Err(LayerError::StateArity {
                expected: self.len(),
                found: items.len(),
            });
        }
        Ok(items.into_iter().cloned().collect())
    }
}

/// `(f (r … base))` with `index` rests.
pub fn field_accessor(base: Node, index: usize) -> Node {
    let rest = (0..index).fold(base, |node, _| Node::call("r", vec![node]));
    Node::call("f", vec![rest])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> StateSchema {
        StateSchema {
            fields: vec![
                StateField {
                    name: "count".into(),
                    ty: Type::Int("uint64".into()),
                },
                StateField {
                    name: "owner".into(),
                    ty: Type::Address,
                },
            ],
        }
    }

    #[test]
    fn test_encode_decode_inverse() {
        let values = vec![Node::int(3), Node::bytes(vec![0xaa; 32])];
        let node = schema().encode(&values).unwrap();
        assert_eq!(schema().decode(&node).unwrap(), values);

        let consed = Node::cons(
            Node::int(3),
            Node::cons(Node::bytes(vec![0xaa; 32]), Node::nil()),
        );
        assert_eq!(schema().decode(&consed).unwrap(), values);
    }

    #[test]
    fn test_arity_errors() {
        assert_eq!(
            schema().encode(&[Node::int(1)]),
            Err(LayerError::StateArity {
                expected: 2,
                found: 1
            })
        );
        assert!(matches!(
            schema().decode(&Node::cons(Node::int(1), Node::int(2))),
            Err(LayerError::MalformedState(_))
        ));
    }

    #[test]
    fn test_accessors() {
        let state = || Node::sym("state");
        assert_eq!(field_accessor(state(), 0).to_string(), "(f state)");
        assert_eq!(field_accessor(state(), 1).to_string(), "(f (r state))");
        assert_eq!(field_accessor(state(), 2).to_string(), "(f (r (r state)))");
        assert_eq!(schema().index_of("owner"), Some(1));
    }
}
