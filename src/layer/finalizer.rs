//! The stateful wrapper: dispatch through the action merkle root, then
//! recreate the coin with the action's new state.
//!
//! The successor's address is computed on chain with the same curry-hash
//! formula as [`crate::tree::curry_tree_hash`], so the wrapper carries CLVM
//! mirrors of `hash_atom`, `hash_pair` and the curried environment fold.

use crate::error::TreeError;
use crate::tree::hash::{hash_atom, tree_hash};
use crate::tree::{curry_tree_hash, Node, Program, TreeHash};

/// Curried parameters of the wrapper, in curry order.
pub const CURRIED_PARAMS: [&str; 3] = ["MOD_HASH", "ACTION_MERKLE_ROOT", "STATE"];

/// Solution parameters of the wrapper, in order.
pub const SOLUTION_PARAMS: [&str; 4] = ["action_puzzle", "action_proof", "action_args", "my_amount"];

const WRAPPER: &str = r#"
(mod (MOD_HASH ACTION_MERKLE_ROOT STATE action_puzzle action_proof action_args my_amount)
  (include condition_codes.clib)
  (include sha256tree.clib)
  (defun hash_atom (value) (sha256 1 value))
  (defun hash_pair (left right) (sha256 2 left right))
  (defun quoted_hash (value_hash) (hash_pair (hash_atom 1) value_hash))
  (defun curried_env_hash (arg_hashes)
    (if arg_hashes
      (hash_pair (hash_atom 4)
        (hash_pair (quoted_hash (f arg_hashes))
          (hash_pair (curried_env_hash (r arg_hashes)) (hash_atom ()))))
      (hash_atom 1)))
  (defun curry_tree_hash (mod_hash arg_hashes)
    (hash_pair (hash_atom 2)
      (hash_pair (quoted_hash mod_hash)
        (hash_pair (curried_env_hash arg_hashes) (hash_atom ())))))
  (defun leaf_digest (program_hash) (hash_atom program_hash))
  (defun merkle_fold (digest proof)
    (if proof
      (merkle_fold
        (if (f (f proof))
          (hash_pair (r (f proof)) digest)
          (hash_pair digest (r (f proof))))
        (r proof))
      digest))
  (defun recreate (MOD_HASH ACTION_MERKLE_ROOT new_state my_amount)
    (list CREATE_COIN
      (curry_tree_hash MOD_HASH
        (list (hash_atom MOD_HASH) (hash_atom ACTION_MERKLE_ROOT) (sha256tree new_state)))
      my_amount))
  (defun finish (MOD_HASH ACTION_MERKLE_ROOT my_amount result)
    (c (recreate MOD_HASH ACTION_MERKLE_ROOT (f result) my_amount)
      (c (list ASSERT_MY_AMOUNT my_amount) (r result))))
  (if (= (merkle_fold (leaf_digest (sha256tree action_puzzle)) action_proof) ACTION_MERKLE_ROOT)
    (finish MOD_HASH ACTION_MERKLE_ROOT my_amount (a action_puzzle (list STATE action_args)))
    (x "action not committed")))
"#;

/// The uncurried wrapper module.
pub fn wrapper_program() -> Result<Program, TreeError> {
    Program::parse(WRAPPER)
}

/// Address of the wrapper curried with `(mod_hash, root, state)`, computed
/// the way `recreate` does it on chain.
pub fn recreation_hash(mod_hash: &TreeHash, root: &TreeHash, state: &Node) -> TreeHash {
    let args = [
        hash_atom(mod_hash.as_bytes()),
        hash_atom(root.as_bytes()),
        tree_hash(state),
    ];
    curry_tree_hash(mod_hash, &args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::curry;

    #[test]
    fn test_wrapper_shape() {
        let wrapper = wrapper_program().unwrap();
        let mut params = CURRIED_PARAMS.to_vec();
        params.extend(SOLUTION_PARAMS);
        assert_eq!(wrapper.params(), params);
        assert_eq!(wrapper.curried_params(), CURRIED_PARAMS.to_vec());
        assert_eq!(
            wrapper.includes(),
            vec!["condition_codes.clib".to_string(), "sha256tree.clib".to_string()]
        );
        assert!(wrapper.definition_names().contains(&"curry_tree_hash"));
        assert!(wrapper.definition_names().contains(&"merkle_fold"));
    }

    #[test]
    fn test_recreation_hash_matches_curried_tree() {
        let wrapper = wrapper_program().unwrap();
        let mod_hash = wrapper.tree_hash();
        let root = hash_atom(b"root");
        let state = Node::list(vec![Node::int(5), Node::bytes(vec![0x11; 32])]);

        let curried = curry(
            wrapper.node(),
            &[
                Node::bytes(mod_hash.as_bytes().to_vec()),
                Node::bytes(root.as_bytes().to_vec()),
                state.clone(),
            ],
        );
        assert_eq!(tree_hash(&curried), recreation_hash(&mod_hash, &root, &state));
    }
}
