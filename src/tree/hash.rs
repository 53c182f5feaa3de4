//! Structural hashing: the content address of a tree.
//!
//! `hash(atom) = sha256(0x01 ‖ bytes)`, `hash(pair) = sha256(0x02 ‖ l ‖ r)`.
//! The one-byte prefixes keep atoms and pairs in disjoint domains.

use std::collections::HashMap;
use std::marker::PhantomData;

use sha2::{Digest, Sha256};

use super::{Cursor, Node, View};

// ─── Tree Hash ─────────────────────────────────────────────────────

/// A 256-bit SHA-256 tree hash ("puzzle hash" for programs).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreeHash(pub [u8; 32]);

impl TreeHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Display as full hex.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Parse a 64-character hex string, with or without `0x`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        if hex.len() != 64 {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let hi = hex_digit(chunk[0])?;
            let lo = hex_digit(chunk[1])?;
            bytes[i] = (hi << 4) | lo;
        }
        Some(TreeHash(bytes))
    }

    /// As a bytes node, for embedding a hash into a program.
    pub fn to_node(&self) -> Node {
        Node::bytes(self.0.to_vec())
    }
}

pub(crate) fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl std::fmt::Debug for TreeHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TreeHash(0x{})", self.to_hex())
    }
}

impl std::fmt::Display for TreeHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl serde::Serialize for TreeHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

// ─── Primitives ────────────────────────────────────────────────────

fn finish(hasher: Sha256) -> TreeHash {
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    TreeHash(out)
}

pub fn hash_atom(bytes: &[u8]) -> TreeHash {
    let mut hasher = Sha256::new();
    hasher.update([1u8]);
    hasher.update(bytes);
    finish(hasher)
}

pub fn hash_pair(first: &TreeHash, rest: &TreeHash) -> TreeHash {
    let mut hasher = Sha256::new();
    hasher.update([2u8]);
    hasher.update(first.0);
    hasher.update(rest.0);
    finish(hasher)
}

pub fn nil_hash() -> TreeHash {
    hash_atom(&[])
}

/// Hash of a proper list given its element hashes.
pub fn hash_list(items: &[TreeHash]) -> TreeHash {
    items
        .iter()
        .rev()
        .fold(nil_hash(), |acc, item| hash_pair(item, &acc))
}

/// Structural hash of a tree.
pub fn tree_hash(node: &Node) -> TreeHash {
    TreeHasher::new().hash(node)
}

// ─── Memoizing hasher ──────────────────────────────────────────────

/// Memoizes subtree hashes by node identity.
///
/// Trees are immutable once built, so a node's address is a valid cache
/// key for as long as the borrow `'a` lives.
pub struct TreeHasher<'a> {
    memo: HashMap<*const Node, TreeHash>,
    _tree: PhantomData<&'a Node>,
}

impl<'a> Default for TreeHasher<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> TreeHasher<'a> {
    pub fn new() -> Self {
        Self {
            memo: HashMap::new(),
            _tree: PhantomData,
        }
    }

    pub fn hash(&mut self, node: &'a Node) -> TreeHash {
        self.hash_cursor(Cursor::Node(node))
    }

    /// Number of memoized subtrees.
    pub fn cached(&self) -> usize {
        self.memo.len()
    }

    fn hash_cursor(&mut self, cursor: Cursor<'a>) -> TreeHash {
        if let Some(node) = cursor.node() {
            if let Some(h) = self.memo.get(&(node as *const Node)) {
                return *h;
            }
        }

        // Walk the right spine iteratively, then fold right to left.
        let mut firsts = Vec::new();
        let mut cur = cursor;
        let terminal = loop {
            match cur.view() {
                View::Atom(atom) => break hash_atom(&atom.to_bytes()),
                View::Pair(first, rest) => {
                    firsts.push(first);
                    if let Some(h) = rest.node().and_then(|n| self.memo.get(&(n as *const Node))) {
                        break *h;
                    }
                    cur = rest;
                }
            }
        };

        let mut acc = terminal;
        for first in firsts.into_iter().rev() {
            let fh = self.hash_cursor(first);
            acc = hash_pair(&fh, &acc);
        }

        if let Some(node) = cursor.node() {
            self.memo.insert(node as *const Node, acc);
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nil_hash_value() {
        // sha256(0x01)
        assert_eq!(
            nil_hash().to_hex(),
            "4bf5122f344554c53bde2ebb8cd2b7e3d1600ad631c385a5d7cce23c7785459a"
        );
    }

    #[test]
    fn test_atom_and_pair_domains_differ() {
        let a = hash_atom(&[]);
        let p = hash_pair(&a, &a);
        let mut joined = vec![];
        joined.extend_from_slice(&a.0);
        joined.extend_from_slice(&a.0);
        assert_ne!(p, hash_atom(&joined));
    }

    #[test]
    fn test_hash_list_matches_tree() {
        let node = Node::list(vec![Node::int(1), Node::str("x")]);
        let expected = hash_list(&[tree_hash(&Node::int(1)), tree_hash(&Node::str("x"))]);
        assert_eq!(tree_hash(&node), expected);
    }

    #[test]
    fn test_memoized_hasher_agrees() {
        let shared = Node::list(vec![Node::sym("+"), Node::sym("A"), Node::int(2)]);
        let tree = Node::list(vec![shared.clone(), shared.clone(), shared]);
        let mut hasher = TreeHasher::new();
        let h1 = hasher.hash(&tree);
        assert!(hasher.cached() >= 1);
        assert_eq!(h1, tree_hash(&tree));
        assert_eq!(hasher.hash(&tree), h1);
    }

    #[test]
    fn test_hex_roundtrip() {
        let h = tree_hash(&Node::int(7));
        assert_eq!(TreeHash::from_hex(&h.to_hex()), Some(h));
        assert_eq!(TreeHash::from_hex(&h.to_string()), Some(h));
        assert!(TreeHash::from_hex("abc").is_none());
    }

    #[test]
    fn test_long_list_does_not_recurse() {
        let node = Node::list((0..100_000).map(Node::int).collect());
        let _ = tree_hash(&node);
    }
}
