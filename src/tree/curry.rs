//! Substitution and currying.
//!
//! Currying binds arguments into a program as
//! `(a (q . P) (c (q . A0) (c (q . A1) … 1)))`. Its hash is computable from
//! `hash(P)` and the argument hashes alone, which is what lets a running
//! program derive the address of its own successor.

use indexmap::IndexMap;

use super::hash::{hash_atom, hash_list, hash_pair, TreeHash};
use super::{Atom, Node, View};

/// Replace every symbol bound in `bindings` with its value.
pub fn substitute(node: &Node, bindings: &IndexMap<String, Node>) -> Node {
    if bindings.is_empty() {
        return node.clone();
    }
    match node {
        Node::Atom(Atom::Symbol(name)) => match bindings.get(name) {
            Some(value) => value.clone(),
            None => node.clone(),
        },
        Node::Atom(_) => node.clone(),
        Node::List(items) => Node::List(items.iter().map(|n| substitute(n, bindings)).collect()),
        Node::Cons(first, rest) => Node::cons(substitute(first, bindings), substitute(rest, bindings)),
    }
}

/// `(a (q . program) (c (q . A0) (c (q . A1) … 1)))`
pub fn curry(program: &Node, args: &[Node]) -> Node {
    let env = args.iter().rev().fold(Node::int(1), |env, arg| {
        Node::list(vec![Node::sym("c"), Node::quote(arg.clone()), env])
    });
    Node::list(vec![Node::sym("a"), Node::quote(program.clone()), env])
}

/// Hash of `curry(P, args)` from `hash(P)` and `hash(args[i])`.
pub fn curry_tree_hash(program_hash: &TreeHash, arg_hashes: &[TreeHash]) -> TreeHash {
    let q = hash_atom(&[1]);
    let a = hash_atom(&[2]);
    let c = hash_atom(&[4]);
    let one = hash_atom(&[1]);

    let env = arg_hashes.iter().rev().fold(one, |env, arg| {
        hash_list(&[c, hash_pair(&q, arg), env])
    });
    hash_list(&[a, hash_pair(&q, program_hash), env])
}

/// Split a curried program back into `(program, args)`.
pub fn uncurry(node: &Node) -> Option<(Node, Vec<Node>)> {
    let items = node.proper_items()?;
    let [apply, quoted, env] = items.as_slice() else {
        return None;
    };
    if !is_atom_code(apply, 2) {
        return None;
    }
    let program = unquote(quoted)?;

    let mut args = Vec::new();
    let mut env: &Node = env;
    loop {
        if is_atom_code(env, 1) {
            return Some((program, args));
        }
        let parts = env.proper_items()?;
        let [cons, arg, rest] = parts.as_slice() else {
            return None;
        };
        if !is_atom_code(cons, 4) {
            return None;
        }
        args.push(unquote(arg)?);
        env = *rest;
    }
}

fn unquote(node: &Node) -> Option<Node> {
    match node.cursor().view() {
        View::Pair(head, value) => match head.view() {
            View::Atom(atom) if atom.to_bytes()[..] == [1] => Some(value.to_node()),
            _ => None,
        },
        View::Atom(_) => None,
    }
}

fn is_atom_code(node: &Node, code: u8) -> bool {
    match node.cursor().view() {
        View::Atom(atom) => atom.to_bytes()[..] == [code],
        View::Pair(..) => false,
    }
}
