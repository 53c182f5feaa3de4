//! Canonical CLVM binary serialization.
//!
//! `0xff` introduces a pair, `0x80` is nil, a single byte `<= 0x7f` stands
//! for itself, and longer atoms carry a 1–5 byte length prefix.
//! Both directions use explicit stacks, so depth is unbounded.

use super::serialize::hex;
use super::{Atom, Cursor, Node, View};
use crate::error::TreeError;

const PAIR: u8 = 0xff;
const NIL: u8 = 0x80;

/// Largest atom the 5-byte length prefix can describe.
const MAX_ATOM_LEN: u64 = 0x3_ffff_ffff;

pub fn to_bytes(node: &Node) -> Vec<u8> {
    let mut out = Vec::new();
    let mut stack = vec![node.cursor()];
    while let Some(cursor) = stack.pop() {
        match cursor.view() {
            View::Atom(atom) => encode_atom(&atom.to_bytes(), &mut out),
            View::Pair(first, rest) => {
                out.push(PAIR);
                stack.push(rest);
                stack.push(first);
            }
        }
    }
    out
}

pub fn to_hex(node: &Node) -> String {
    hex(&to_bytes(node))
}

fn encode_atom(bytes: &[u8], out: &mut Vec<u8>) {
    let len = bytes.len();
    match len {
        0 => {
            out.push(NIL);
            return;
        }
        1 if bytes[0] <= 0x7f => {
            out.push(bytes[0]);
            return;
        }
        _ => {}
    }
    if len < 0x40 {
        out.push(0x80 | len as u8);
    } else if len < 0x2000 {
        out.push(0xc0 | (len >> 8) as u8);
        out.push(len as u8);
    } else if len < 0x10_0000 {
        out.push(0xe0 | (len >> 16) as u8);
        out.push((len >> 8) as u8);
        out.push(len as u8);
    } else if len < 0x800_0000 {
        out.push(0xf0 | (len >> 24) as u8);
        out.push((len >> 16) as u8);
        out.push((len >> 8) as u8);
        out.push(len as u8);
    } else {
        debug_assert!(len as u64 <= MAX_ATOM_LEN);
        let len = len as u64;
        out.push(0xf8 | (len >> 32) as u8);
        out.push((len >> 24) as u8);
        out.push((len >> 16) as u8);
        out.push((len >> 8) as u8);
        out.push(len as u8);
    }
    out.extend_from_slice(bytes);
}

enum Op {
    Parse,
    Cons,
}

/// Decode a serialized tree. Atoms come back as raw bytes and pairs as cons
/// cells, which compare equal to the original under structural equality.
pub fn from_bytes(input: &[u8]) -> Result<Node, TreeError> {
    let mut pos = 0usize;
    let mut ops = vec![Op::Parse];
    let mut values: Vec<Node> = Vec::new();

    while let Some(op) = ops.pop() {
        match op {
            Op::Parse => {
                let b = *input.get(pos).ok_or_else(|| eof(pos))?;
                pos += 1;
                if b == PAIR {
                    ops.push(Op::Cons);
                    ops.push(Op::Parse);
                    ops.push(Op::Parse);
                } else if b == NIL {
                    values.push(Node::nil());
                } else if b <= 0x7f {
                    values.push(Node::Atom(Atom::Bytes(vec![b])));
                } else {
                    let len = decode_len(b, input, &mut pos)?;
                    let end = pos
                        .checked_add(len)
                        .filter(|&end| end <= input.len())
                        .ok_or_else(|| eof(pos))?;
                    values.push(Node::Atom(Atom::Bytes(input[pos..end].to_vec())));
                    pos = end;
                }
            }
            Op::Cons => {
                let rest = values.pop().ok_or_else(|| malformed(pos))?;
                let first = values.pop().ok_or_else(|| malformed(pos))?;
                values.push(Node::cons(first, rest));
            }
        }
    }

    if pos != input.len() {
        return Err(TreeError::Bytes {
            position: pos,
            reason: "trailing bytes after tree".to_string(),
        });
    }
    values.pop().ok_or_else(|| malformed(pos))
}

fn decode_len(first: u8, input: &[u8], pos: &mut usize) -> Result<usize, TreeError> {
    let mut prefix_len = 0;
    let mut mask = 0x80u8;
    let mut b = first;
    while b & mask != 0 {
        prefix_len += 1;
        b &= !mask;
        mask >>= 1;
    }
    if prefix_len > 5 {
        return Err(TreeError::Bytes {
            position: *pos - 1,
            reason: "length prefix longer than 5 bytes".to_string(),
        });
    }
    let mut len = b as usize;
    for _ in 1..prefix_len {
        let next = *input.get(*pos).ok_or_else(|| eof(*pos))?;
        *pos += 1;
        len = (len << 8) | next as usize;
    }
    Ok(len)
}

fn eof(position: usize) -> TreeError {
    TreeError::Bytes {
        position,
        reason: "unexpected end of input".to_string(),
    }
}

fn malformed(position: usize) -> TreeError {
    TreeError::Bytes {
        position,
        reason: "unbalanced pair".to_string(),
    }
}

/// Length of [`to_bytes`] output, computed without building it.
pub fn serialized_len(node: &Node) -> usize {
    let mut total = 0;
    let mut stack: Vec<Cursor<'_>> = vec![node.cursor()];
    while let Some(cursor) = stack.pop() {
        match cursor.view() {
            View::Atom(atom) => {
                let bytes = atom.to_bytes();
                let inline = bytes.is_empty() || (bytes.len() == 1 && bytes[0] <= 0x7f);
                total += prefix_size(&bytes) + if inline { 0 } else { bytes.len() };
            }
            View::Pair(first, rest) => {
                total += 1;
                stack.push(rest);
                stack.push(first);
            }
        }
    }
    total
}

fn prefix_size(bytes: &[u8]) -> usize {
    match bytes.len() {
        0 => 1,
        1 if bytes[0] <= 0x7f => 1,
        n if n < 0x40 => 1,
        n if n < 0x2000 => 2,
        n if n < 0x10_0000 => 3,
        n if n < 0x800_0000 => 4,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse;

    #[test]
    fn test_known_encodings() {
        assert_eq!(to_bytes(&Node::nil()), vec![0x80]);
        assert_eq!(to_bytes(&Node::int(1)), vec![0x01]);
        assert_eq!(to_bytes(&Node::int(128)), vec![0x82, 0x00, 0x80]);
        assert_eq!(to_bytes(&Node::int(-1)), vec![0x81, 0xff]);
        assert_eq!(to_hex(&parse("(q . 1)").unwrap()), "ff0101");
        assert_eq!(to_hex(&parse("(1 2)").unwrap()), "ff01ff0280");
    }

    #[test]
    fn test_symbols_encode_as_codes() {
        assert_eq!(to_bytes(&Node::sym("CREATE_COIN")), vec![51]);
        assert_eq!(to_bytes(&Node::sym("hi")), vec![0x82, b'h', b'i']);
    }

    #[test]
    fn test_length_prefixes() {
        let medium = Node::bytes(vec![7u8; 0x40]);
        let enc = to_bytes(&medium);
        assert_eq!(&enc[..2], &[0xc0, 0x40]);
        assert_eq!(from_bytes(&enc).unwrap(), medium);

        let large = Node::bytes(vec![1u8; 0x2000]);
        let enc = to_bytes(&large);
        assert_eq!(&enc[..3], &[0xe0, 0x20, 0x00]);
        assert_eq!(from_bytes(&enc).unwrap(), large);
    }

    #[test]
    fn test_decode_matches_source_tree() {
        let node = parse("(mod (A B) (list CREATE_COIN 0xaabb (+ A B)))").unwrap();
        let decoded = from_bytes(&to_bytes(&node)).unwrap();
        assert_eq!(decoded, node);
        assert_eq!(serialized_len(&node), to_bytes(&node).len());
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(from_bytes(&[]), Err(TreeError::Bytes { .. })));
        assert!(matches!(from_bytes(&[0xff, 0x01]), Err(TreeError::Bytes { .. })));
        assert!(matches!(from_bytes(&[0x85, 0x01]), Err(TreeError::Bytes { .. })));
        assert!(matches!(from_bytes(&[0x01, 0x01]), Err(TreeError::Bytes { .. })));
        assert!(matches!(from_bytes(&[0xfe]), Err(TreeError::Bytes { .. })));
    }
}
