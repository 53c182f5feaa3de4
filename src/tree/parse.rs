//! Text → Tree IR.
//!
//! Grammar: `( item* )`, `( item+ . item )`, decimal integers (optionally
//! negative), `0x` hex byte strings, `"…"` or `'…'` strings, and symbols.
//! `;` starts a comment running to end of line.

use num_bigint::BigInt;

use super::{Atom, Node};
use crate::error::TreeError;

/// Maximum list nesting accepted by [`parse`].
pub const MAX_NESTING_DEPTH: usize = 256;

pub fn parse(source: &str) -> Result<Node, TreeError> {
    parse_with_depth(source, MAX_NESTING_DEPTH)
}

pub fn parse_with_depth(source: &str, max_depth: usize) -> Result<Node, TreeError> {
    let mut parser = TreeParser {
        source: source.as_bytes(),
        pos: 0,
        depth: 0,
        max_depth,
    };
    let node = parser.parse_node()?;
    parser.skip_trivia();
    if parser.pos < parser.source.len() {
        return Err(parser.error("end of input"));
    }
    Ok(node)
}

struct TreeParser<'src> {
    source: &'src [u8],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'src> TreeParser<'src> {
    fn parse_node(&mut self) -> Result<Node, TreeError> {
        self.skip_trivia();
        match self.peek() {
            None => Err(self.error("an expression")),
            Some(b'(') => self.parse_list(),
            Some(b')') => Err(self.error("an expression")),
            Some(q @ (b'"' | b'\'')) => self.parse_string(q),
            Some(_) => self.parse_atom(),
        }
    }

    fn parse_list(&mut self) -> Result<Node, TreeError> {
        let open = self.pos;
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(TreeError::TooDeep {
                position: open,
                limit: self.max_depth,
            });
        }
        self.pos += 1; // skip '('

        let mut items = Vec::new();
        let mut tail = None;
        loop {
            self.skip_trivia();
            match self.peek() {
                None => return Err(self.error("')'")),
                Some(b')') => {
                    self.pos += 1;
                    break;
                }
                Some(b'.') if self.is_lone_dot() => {
                    if items.is_empty() {
                        return Err(self.error("an expression before '.'"));
                    }
                    self.pos += 1;
                    tail = Some(self.parse_node()?);
                    self.skip_trivia();
                    if self.peek() != Some(b')') {
                        return Err(self.error("')' after dotted tail"));
                    }
                    self.pos += 1;
                    break;
                }
                Some(_) => items.push(self.parse_node()?),
            }
        }
        self.depth -= 1;

        Ok(match tail {
            None if items.is_empty() => Node::nil(),
            None => Node::List(items),
            Some(tail) => items
                .into_iter()
                .rev()
                .fold(tail, |rest, first| Node::cons(first, rest)),
        })
    }

    fn parse_string(&mut self, quote: u8) -> Result<Node, TreeError> {
        let start = self.pos;
        self.pos += 1;
        while let Some(ch) = self.peek() {
            if ch == quote {
                let text = String::from_utf8_lossy(&self.source[start + 1..self.pos]).into_owned();
                self.pos += 1;
                return Ok(Node::str(text));
            }
            self.pos += 1;
        }
        Err(TreeError::Parse {
            position: start,
            expected: "closing quote".to_string(),
        })
    }

    fn parse_atom(&mut self) -> Result<Node, TreeError> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if is_delimiter(ch) {
                break;
            }
            self.pos += 1;
        }
        let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();

        if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            return match decode_hex(hex) {
                Some(bytes) => Ok(Node::Atom(Atom::Bytes(bytes))),
                None => Err(TreeError::Parse {
                    position: start,
                    expected: "hex digits after '0x'".to_string(),
                }),
            };
        }
        if is_integer(&text) {
            if let Ok(n) = text.parse::<BigInt>() {
                return Ok(Node::bigint(n));
            }
        }
        Ok(Node::sym(text))
    }

    /// A `.` standing alone between delimiters marks a dotted tail.
    fn is_lone_dot(&self) -> bool {
        match self.source.get(self.pos + 1) {
            None => true,
            Some(&next) => is_delimiter(next),
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_whitespace() {
                self.pos += 1;
            } else if ch == b';' {
                while let Some(c) = self.peek() {
                    if c == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn error(&self, expected: &str) -> TreeError {
        TreeError::Parse {
            position: self.pos,
            expected: expected.to_string(),
        }
    }
}

fn is_delimiter(ch: u8) -> bool {
    ch.is_ascii_whitespace() || matches!(ch, b'(' | b')' | b';' | b'"' | b'\'')
}

fn is_integer(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Decode hex digits; an odd count gets a leading zero nibble.
pub(crate) fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = hex
        .bytes()
        .map(super::hash::hex_digit)
        .collect::<Option<Vec<u8>>>()?;
    let mut out = Vec::with_capacity(digits.len() / 2 + 1);
    let mut iter = digits.into_iter();
    if hex.len() % 2 == 1 {
        out.push(iter.next()?);
    }
    while let (Some(hi), Some(lo)) = (iter.next(), iter.next()) {
        out.push((hi << 4) | lo);
    }
    Some(out)
}
