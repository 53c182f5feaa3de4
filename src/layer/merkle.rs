//! Binary merkle tree over action program hashes.
//!
//! Leaves are `H(0x01 ‖ program_hash)` in insertion order; interior nodes are
//! `H(0x02 ‖ left ‖ right)`. A level with an odd count promotes its last node
//! unchanged, so proofs skip that level.

use crate::tree::hash::{hash_atom, hash_pair};
use crate::tree::{Node, Program, TreeHash};

/// Which side of the running digest a sibling sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofStep {
    pub sibling: TreeHash,
    pub side: Side,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MerkleProof {
    pub steps: Vec<ProofStep>,
}

impl MerkleProof {
    /// `((side . sibling) …)` with side `1` for a left sibling and `()`
    /// for a right one, as folded by the wrapper's `merkle_fold`.
    pub fn to_node(&self) -> Node {
        Node::list(
            self.steps
                .iter()
                .map(|step| {
                    Node::cons(
                        Node::bool(step.side == Side::Left),
                        Node::bytes(step.sibling.as_bytes().to_vec()),
                    )
                })
                .collect(),
        )
    }
}

/// Digest of a leaf for the action with program hash `program`.
pub fn leaf_digest(program: &TreeHash) -> TreeHash {
    hash_atom(program.as_bytes())
}

#[derive(Clone, Debug)]
pub struct ActionMerkleTree {
    names: Vec<String>,
    program_hashes: Vec<TreeHash>,
    /// `levels[0]` are the leaf digests; the last level holds the root.
    levels: Vec<Vec<TreeHash>>,
}

impl ActionMerkleTree {
    /// Build over `(name, program)` pairs. Returns `None` when empty.
    pub fn build(actions: &[(String, Program)]) -> Option<Self> {
        let names = actions.iter().map(|(name, _)| name.clone()).collect();
        let hashes = actions.iter().map(|(_, p)| p.tree_hash()).collect();
        Self::from_hashes(names, hashes)
    }

    pub fn from_hashes(names: Vec<String>, program_hashes: Vec<TreeHash>) -> Option<Self> {
        if program_hashes.is_empty() {
            return None;
        }
        let mut levels = vec![program_hashes.iter().map(leaf_digest).collect::<Vec<_>>()];
        while let Some(level) = levels.last().filter(|l| l.len() > 1) {
            let next = level
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    _ => pair[0],
                })
                .collect();
            levels.push(next);
        }
        Some(Self {
            names,
            program_hashes,
            levels,
        })
    }

    pub fn root(&self) -> TreeHash {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or_else(crate::tree::hash::nil_hash)
    }

    pub fn len(&self) -> usize {
        self.program_hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.program_hashes.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn program_hash(&self, index: usize) -> Option<&TreeHash> {
        self.program_hashes.get(index)
    }

    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.len() {
            return None;
        }
        let mut steps = Vec::new();
        let mut idx = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = idx ^ 1;
            if let Some(hash) = level.get(sibling) {
                let side = if sibling < idx { Side::Left } else { Side::Right };
                steps.push(ProofStep {
                    sibling: *hash,
                    side,
                });
            }
            idx /= 2;
        }
        Some(MerkleProof { steps })
    }
}

/// Fold `proof` from the leaf of `program_hash` and compare with `root`.
pub fn verify_inclusion(root: &TreeHash, program_hash: &TreeHash, proof: &MerkleProof) -> bool {
    let digest = proof
        .steps
        .iter()
        .fold(leaf_digest(program_hash), |digest, step| match step.side {
            Side::Left => hash_pair(&step.sibling, &digest),
            Side::Right => hash_pair(&digest, &step.sibling),
        });
    digest == *root
}
