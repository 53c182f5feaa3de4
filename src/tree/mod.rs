//! Tree IR: the S-expression program representation.
//!
//! A node is an atom, a nil-terminated list, or an improper cons pair.
//! Equality and hashing are structural: a list and the equivalent chain of
//! cons pairs are the same value, and two atoms are equal when their byte
//! encodings are equal (see [`Atom::to_bytes`]).
//!
//! ```text
//! text ──parse──▶ Node ──serialize──▶ text
//!                  │
//!                  ├──tree_hash──▶ TreeHash (32 bytes, SHA-256)
//!                  ├──to_bytes───▶ CLVM serialization
//!                  └──curry──────▶ (a (q . P) (c (q . A0) ... 1))
//! ```

pub mod bytes;
pub mod curry;
pub mod hash;
pub mod opcodes;
pub mod parse;
pub mod program;
pub mod serialize;

use std::borrow::Cow;

use num_bigint::BigInt;
use num_traits::Zero;

pub use bytes::{from_bytes, to_bytes, to_hex};
pub use curry::{curry, curry_tree_hash, substitute, uncurry};
pub use hash::{tree_hash, TreeHash, TreeHasher};
pub use parse::parse;
pub use program::{BytecodeCompiler, Program};
pub use serialize::{serialize, OpcodeStyle, SerializeOptions};

/// A single primitive value.
#[derive(Clone, Debug)]
pub enum Atom {
    Nil,
    Int(BigInt),
    /// Raw bytes, rendered as `0x…`.
    Bytes(Vec<u8>),
    /// Text bytes, rendered quoted.
    Str(String),
    Symbol(String),
    Bool(bool),
}

static NIL: Atom = Atom::Nil;

impl Atom {
    /// The atom's byte encoding, the input to hashing and serialization.
    ///
    /// Symbols naming a VM operator or condition code encode as that code,
    /// so `CREATE_COIN` and `51` are the same atom.
    pub fn to_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            Atom::Nil | Atom::Bool(false) => Cow::Borrowed(&[]),
            Atom::Bool(true) => Cow::Borrowed(&[1]),
            Atom::Int(n) => Cow::Owned(int_to_bytes(n)),
            Atom::Bytes(b) => Cow::Borrowed(b),
            Atom::Str(s) => Cow::Borrowed(s.as_bytes()),
            Atom::Symbol(s) => match opcodes::code_of(s) {
                Some(code) => Cow::Owned(int_to_bytes(&BigInt::from(code))),
                None => Cow::Borrowed(s.as_bytes()),
            },
        }
    }

    pub fn is_nil(&self) -> bool {
        self.to_bytes().is_empty()
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for Atom {}

/// Minimal big-endian two's complement; zero is the empty string.
pub fn int_to_bytes(n: &BigInt) -> Vec<u8> {
    if n.is_zero() {
        return Vec::new();
    }
    n.to_signed_bytes_be()
}

pub fn int_from_bytes(bytes: &[u8]) -> BigInt {
    if bytes.is_empty() {
        return BigInt::zero();
    }
    BigInt::from_signed_bytes_be(bytes)
}

/// A Tree IR node.
#[derive(Clone, Debug)]
pub enum Node {
    Atom(Atom),
    /// A nil-terminated sequence.
    List(Vec<Node>),
    /// An improper pair `(first . rest)`.
    Cons(Box<Node>, Box<Node>),
}

impl Node {
    pub fn nil() -> Self {
        Node::Atom(Atom::Nil)
    }

    pub fn int(value: i64) -> Self {
        Node::Atom(Atom::Int(BigInt::from(value)))
    }

    pub fn bigint(value: BigInt) -> Self {
        Node::Atom(Atom::Int(value))
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Node::Atom(Atom::Bytes(value.into()))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Node::Atom(Atom::Str(value.into()))
    }

    pub fn sym(name: impl Into<String>) -> Self {
        Node::Atom(Atom::Symbol(name.into()))
    }

    pub fn bool(value: bool) -> Self {
        Node::Atom(Atom::Bool(value))
    }

    pub fn list(items: Vec<Node>) -> Self {
        Node::List(items)
    }

    pub fn cons(first: Node, rest: Node) -> Self {
        Node::Cons(Box::new(first), Box::new(rest))
    }

    /// `(q . value)`
    pub fn quote(value: Node) -> Self {
        Node::cons(Node::sym("q"), value)
    }

    /// `(op arg…)`
    pub fn call(op: &str, args: Vec<Node>) -> Self {
        let mut items = Vec::with_capacity(args.len() + 1);
        items.push(Node::sym(op));
        items.extend(args);
        Node::List(items)
    }

    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::Node(self)
    }

    pub fn is_nil(&self) -> bool {
        match self.cursor().view() {
            View::Atom(a) => a.is_nil(),
            View::Pair(..) => false,
        }
    }

    pub fn is_atom(&self) -> bool {
        matches!(self.cursor().view(), View::Atom(_))
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Node::Atom(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Node::Atom(Atom::Symbol(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Node::List(items) => Some(items),
            _ => None,
        }
    }

    /// The leading symbol of a list form, e.g. `if` in `(if c t e)`.
    pub fn head_symbol(&self) -> Option<&str> {
        self.as_list()?.first()?.as_symbol()
    }

    /// Collect the elements of a proper list, whether built as a List or as
    /// a cons chain. Returns `None` for atoms other than nil and for
    /// improper chains.
    pub fn proper_items(&self) -> Option<Vec<&Node>> {
        let mut items = Vec::new();
        let mut cur = self;
        loop {
            match cur {
                Node::List(xs) => {
                    items.extend(xs.iter());
                    return Some(items);
                }
                Node::Cons(first, rest) => {
                    items.push(first);
                    cur = rest;
                }
                Node::Atom(a) if a.is_nil() => return Some(items),
                Node::Atom(_) => return None,
            }
        }
    }

    /// Whether this node is a pair (a non-empty list or a cons).
    pub fn is_pair(&self) -> bool {
        matches!(self.cursor().view(), View::Pair(..))
    }
}

impl From<Atom> for Node {
    fn from(atom: Atom) -> Self {
        Node::Atom(atom)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self.cursor(), other.cursor())];
        while let Some((a, b)) = stack.pop() {
            match (a.view(), b.view()) {
                (View::Atom(x), View::Atom(y)) => {
                    if x != y {
                        return false;
                    }
                }
                (View::Pair(xf, xr), View::Pair(yf, yr)) => {
                    stack.push((xr, yr));
                    stack.push((xf, yf));
                }
                _ => return false,
            }
        }
        true
    }
}

impl Eq for Node {}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&serialize(self, &SerializeOptions::default()))
    }
}

// ─── Structural traversal ──────────────────────────────────────────

/// A position in a tree that erases the List/Cons distinction.
///
/// `Tail` points at the remaining elements of a list, so a list of `n`
/// items is viewed as `n` nested pairs ending in nil.
#[derive(Clone, Copy, Debug)]
pub enum Cursor<'a> {
    Node(&'a Node),
    Tail(&'a [Node]),
}

/// One structural step: an atom or a pair of cursors.
#[derive(Clone, Copy, Debug)]
pub enum View<'a> {
    Atom(&'a Atom),
    Pair(Cursor<'a>, Cursor<'a>),
}

impl<'a> Cursor<'a> {
    pub fn view(self) -> View<'a> {
        match self {
            Cursor::Node(Node::Atom(a)) => View::Atom(a),
            Cursor::Node(Node::List(items)) => Cursor::Tail(items).view(),
            Cursor::Node(Node::Cons(first, rest)) => {
                View::Pair(Cursor::Node(first), Cursor::Node(rest))
            }
            Cursor::Tail([]) => View::Atom(&NIL),
            Cursor::Tail([head, rest @ ..]) => View::Pair(Cursor::Node(head), Cursor::Tail(rest)),
        }
    }

    /// The underlying node, when the cursor points at one.
    pub fn node(self) -> Option<&'a Node> {
        match self {
            Cursor::Node(n) => Some(n),
            Cursor::Tail(_) => None,
        }
    }

    /// Rebuild an owned node for this position.
    pub fn to_node(self) -> Node {
        match self {
            Cursor::Node(n) => n.clone(),
            Cursor::Tail([]) => Node::nil(),
            Cursor::Tail(items) => Node::List(items.to_vec()),
        }
    }
}

/// Whether a parameter name is curried: ALL-CAPS letters, digits and `_`,
/// with at least one letter.
pub fn is_curried_name(name: &str) -> bool {
    let mut has_letter = false;
    for ch in name.chars() {
        match ch {
            'A'..='Z' => has_letter = true,
            '0'..='9' | '_' => {}
            _ => return false,
        }
    }
    has_letter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_equals_cons_chain() {
        let list = Node::list(vec![Node::int(1), Node::int(2), Node::int(3)]);
        let cons = Node::cons(
            Node::int(1),
            Node::cons(Node::int(2), Node::cons(Node::int(3), Node::nil())),
        );
        assert_eq!(list, cons);
        assert_eq!(tree_hash(&list), tree_hash(&cons));
    }

    #[test]
    fn test_empty_list_is_nil() {
        assert_eq!(Node::list(vec![]), Node::nil());
        assert!(Node::list(vec![]).is_nil());
        assert!(Node::bool(false).is_nil());
        assert!(!Node::bool(true).is_nil());
    }

    #[test]
    fn test_int_bytes_minimal() {
        assert_eq!(int_to_bytes(&BigInt::from(0)), Vec::<u8>::new());
        assert_eq!(int_to_bytes(&BigInt::from(1)), vec![0x01]);
        assert_eq!(int_to_bytes(&BigInt::from(127)), vec![0x7f]);
        assert_eq!(int_to_bytes(&BigInt::from(128)), vec![0x00, 0x80]);
        assert_eq!(int_to_bytes(&BigInt::from(-1)), vec![0xff]);
        assert_eq!(int_to_bytes(&BigInt::from(-129)), vec![0xff, 0x7f]);
        assert_eq!(int_from_bytes(&[0x00, 0x80]), BigInt::from(128));
        assert_eq!(int_from_bytes(&[]), BigInt::from(0));
    }

    #[test]
    fn test_opcode_symbol_equals_code() {
        assert_eq!(Node::sym("CREATE_COIN"), Node::int(51));
        assert_eq!(Node::sym("q"), Node::int(1));
        assert_ne!(Node::sym("owner"), Node::str("owne"));
        assert_eq!(Node::sym("owner"), Node::str("owner"));
    }

    #[test]
    fn test_proper_items() {
        let chain = Node::cons(Node::int(1), Node::list(vec![Node::int(2)]));
        assert_eq!(chain.proper_items().map(|v| v.len()), Some(2));
        let improper = Node::cons(Node::int(1), Node::int(2));
        assert!(improper.proper_items().is_none());
    }

    #[test]
    fn test_curried_names() {
        assert!(is_curried_name("OWNER"));
        assert!(is_curried_name("MOD_HASH"));
        assert!(is_curried_name("A1"));
        assert!(!is_curried_name("_1"));
        assert!(!is_curried_name("owner"));
        assert!(!is_curried_name("Owner"));
        assert!(!is_curried_name(""));
    }
}
