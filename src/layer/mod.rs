//! Stateful actions: a merkle-committed set of action programs behind a
//! self-recreating wrapper.
//!
//! Each spend reveals one action, proves its inclusion under the committed
//! root, runs it on `(state args)`, and recreates the coin curried with the
//! state the action returned.

pub mod finalizer;
pub mod merkle;
pub mod state;

use num_bigint::BigInt;

use crate::error::LayerError;
use crate::solution::SolutionBuilder;
use crate::tree::{curry, Node, Program, TreeHash};

pub use finalizer::{recreation_hash, wrapper_program};
pub use merkle::{verify_inclusion, ActionMerkleTree, MerkleProof, ProofStep, Side};
pub use state::{field_accessor, StateField, StateSchema};

/// An action program committed into the merkle root.
#[derive(Clone, Debug)]
pub struct CommittedAction {
    pub name: String,
    pub program: Program,
    /// Number of positional values the action reads from `args`.
    pub arity: usize,
}

/// Puzzle reveal and solution for one stateful spend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spend {
    pub puzzle_reveal: Node,
    pub solution: Node,
}

#[derive(Clone, Debug)]
pub struct StatefulCoin {
    schema: StateSchema,
    actions: Vec<CommittedAction>,
    tree: ActionMerkleTree,
    wrapper: Program,
    mod_hash: TreeHash,
}

impl StatefulCoin {
    pub fn new(schema: StateSchema, actions: Vec<CommittedAction>) -> Result<Self, LayerError> {
        let names = actions.iter().map(|a| a.name.clone()).collect();
        let hashes = actions.iter().map(|a| a.program.tree_hash()).collect();
        let tree = ActionMerkleTree::from_hashes(names, hashes).ok_or(LayerError::NoActions)?;
        let wrapper = wrapper_program()?;
        let mod_hash = wrapper.tree_hash();
        tracing::debug!(
            actions = actions.len(),
            root = %tree.root(),
            mod_hash = %mod_hash,
            "committed stateful actions"
        );
        Ok(Self {
            schema,
            actions,
            tree,
            wrapper,
            mod_hash,
        })
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    pub fn actions(&self) -> &[CommittedAction] {
        &self.actions
    }

    pub fn tree(&self) -> &ActionMerkleTree {
        &self.tree
    }

    /// The uncurried wrapper module.
    pub fn wrapper(&self) -> &Program {
        &self.wrapper
    }

    pub fn mod_hash(&self) -> TreeHash {
        self.mod_hash
    }

    pub fn action_root(&self) -> TreeHash {
        self.tree.root()
    }

    /// The wrapper curried with `state`: the coin's full puzzle.
    pub fn puzzle_reveal(&self, state: &[Node]) -> Result<Node, LayerError> {
        let state = self.schema.encode(state)?;
        Ok(curry(
            self.wrapper.node(),
            &[
                Node::bytes(self.mod_hash.as_bytes().to_vec()),
                Node::bytes(self.action_root().as_bytes().to_vec()),
                state,
            ],
        ))
    }

    /// Address of the coin holding `state`, without building the puzzle.
    pub fn puzzle_hash(&self, state: &[Node]) -> Result<TreeHash, LayerError> {
        let state = self.schema.encode(state)?;
        Ok(recreation_hash(&self.mod_hash, &self.action_root(), &state))
    }

    /// Spend the coin holding `state` through `action`.
    pub fn spend(
        &self,
        action: &str,
        state: &[Node],
        args: Vec<Node>,
        amount: u64,
    ) -> Result<Spend, LayerError> {
        let unknown = || LayerError::UnknownAction(action.to_string());
        let index = self.tree.index_of(action).ok_or_else(unknown)?;
        let committed = self.actions.get(index).ok_or_else(unknown)?;
        if args.len() != committed.arity {
            return Err(LayerError::ArgCount {
                action: action.to_string(),
                expected: committed.arity,
                found: args.len(),
            });
        }
        let proof = self.tree.proof(index).ok_or_else(unknown)?;
        let puzzle_reveal = self.puzzle_reveal(state)?;

        let mut solution = SolutionBuilder::for_program(&self.wrapper);
        solution
            .arg("action_puzzle", committed.program.node().clone())?
            .arg("action_proof", proof.to_node())?
            .arg("action_args", Node::list(args))?
            .arg("my_amount", Node::bigint(BigInt::from(amount)))?;

        tracing::trace!(action, index, "built stateful spend");
        Ok(Spend {
            puzzle_reveal,
            solution: solution.build()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Type;
    use crate::tree::{tree_hash, uncurry};

    fn coin() -> StatefulCoin {
        let schema = StateSchema {
            fields: vec![StateField {
                name: "count".into(),
                ty: Type::Int("uint64".into()),
            }],
        };
        let action = |name: &str, src: &str, arity| CommittedAction {
            name: name.into(),
            program: Program::parse(src).unwrap(),
            arity,
        };
        StatefulCoin::new(
            schema,
            vec![
                action("inc", "(mod (state args) (c (list (+ (f state) 1)) ()))", 0),
                action("add", "(mod (state args) (c (list (+ (f state) (f args))) ()))", 1),
                action("reset", "(mod (state args) (c (list 0) ()))", 0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_puzzle_hash_matches_reveal() {
        let coin = coin();
        let state = [Node::int(41)];
        let reveal = coin.puzzle_reveal(&state).unwrap();
        assert_eq!(tree_hash(&reveal), coin.puzzle_hash(&state).unwrap());

        let (module, args) = uncurry(&reveal).unwrap();
        assert_eq!(&module, coin.wrapper().node());
        assert_eq!(args[2], Node::list(vec![Node::int(41)]));
    }

    #[test]
    fn test_spend_solution_layout() {
        let coin = coin();
        let spend = coin.spend("add", &[Node::int(1)], vec![Node::int(5)], 1000).unwrap();
        let items = spend.solution.as_list().unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(&items[0], coin.actions()[1].program.node());
        assert_eq!(items[2], Node::list(vec![Node::int(5)]));
        assert_eq!(items[3], Node::int(1000));

        let program_hash = coin.actions()[1].program.tree_hash();
        let proof = coin.tree().proof(1).unwrap();
        assert_eq!(items[1], proof.to_node());
        assert!(verify_inclusion(&coin.action_root(), &program_hash, &proof));
    }

    #[test]
    fn test_spend_errors() {
        let coin = coin();
        assert_eq!(
            coin.spend("burn", &[Node::int(1)], vec![], 1),
            Err(LayerError::UnknownAction("burn".into()))
        );
        assert_eq!(
            coin.spend("add", &[Node::int(1)], vec![], 1),
            Err(LayerError::ArgCount {
                action: "add".into(),
                expected: 1,
                found: 0
            })
        );
        assert_eq!(
            coin.spend("inc", &[], vec![], 1),
            Err(LayerError::StateArity {
                expected: 1,
                found: 0
            })
        );
        assert!(matches!(
            StatefulCoin::new(StateSchema::default(), vec![]),
            Err(LayerError::NoActions)
        ));
    }
}
