//! Tree IR → text.
//!
//! Compact output is a single line. Pretty output breaks module, function,
//! `if` and `list` forms once they contain a nested list; other forms break
//! only when they exceed the line width. Comments are attached to nodes by
//! tree hash and emitted as `; text` lines in pretty mode.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::hash::{TreeHash, TreeHasher};
use super::opcodes::condition_code;
use super::{Atom, Node};

/// How condition-code symbols are rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpcodeStyle {
    /// `CREATE_COIN`; needs `condition_codes.clib` to compile.
    #[default]
    Symbolic,
    /// `51`
    Numeric,
}

#[derive(Clone, Debug)]
pub struct SerializeOptions {
    pub pretty: bool,
    pub line_width: usize,
    pub indent: usize,
    pub opcodes: OpcodeStyle,
    /// Comment text keyed by the tree hash of the commented node.
    pub comments: HashMap<TreeHash, String>,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            line_width: 80,
            indent: 2,
            opcodes: OpcodeStyle::Symbolic,
            comments: HashMap::new(),
        }
    }
}

impl SerializeOptions {
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            ..Self::default()
        }
    }
}

/// Forms that always break once they hold a nested list, and how many
/// leading elements stay on the opening line.
fn layout_header(head: &str) -> Option<usize> {
    match head {
        "mod" => Some(2),
        "defun" | "defun-inline" | "defmacro" => Some(3),
        "if" => Some(2),
        "list" => Some(1),
        _ => None,
    }
}

pub fn serialize(node: &Node, opts: &SerializeOptions) -> String {
    let mut writer = Writer {
        opts,
        hasher: TreeHasher::new(),
        out: String::new(),
    };
    if opts.pretty {
        if let Some(text) = writer.comment_for(node) {
            writer.write_comment(&text, 0);
        }
        writer.write_pretty(node, 0);
    } else {
        writer.write_flat(node);
    }
    writer.out
}

struct Writer<'a> {
    opts: &'a SerializeOptions,
    hasher: TreeHasher<'a>,
    out: String,
}

impl<'a> Writer<'a> {
    fn write_flat(&mut self, node: &Node) {
        let text = flat(node, self.opts.opcodes);
        self.out.push_str(&text);
    }

    fn write_pretty(&mut self, node: &'a Node, level: usize) {
        let text = flat(node, self.opts.opcodes);
        let items = match node {
            Node::List(items) if items.len() >= 2 => items,
            _ => {
                self.out.push_str(&text);
                return;
            }
        };

        let header = node.head_symbol().and_then(layout_header);
        let forced = header.is_some() && items[1..].iter().any(Node::is_pair);
        let commented = items.iter().any(|item| self.comment_for(item).is_some());
        let fits = level * self.opts.indent + text.len() <= self.opts.line_width;
        if !forced && !commented && fits {
            self.out.push_str(&text);
            return;
        }

        let header = header.unwrap_or(1).min(items.len());
        self.out.push('(');
        for (i, item) in items[..header].iter().enumerate() {
            if i > 0 {
                self.out.push(' ');
            }
            self.out.push_str(&flat(item, self.opts.opcodes));
        }
        for item in &items[header..] {
            self.newline(level + 1);
            if let Some(comment) = self.comment_for(item) {
                self.write_comment(&comment, level + 1);
            }
            self.write_pretty(item, level + 1);
        }
        self.out.push(')');
    }

    fn write_comment(&mut self, text: &str, level: usize) {
        for line in text.lines() {
            self.out.push_str("; ");
            self.out.push_str(line);
            self.newline(level);
        }
    }

    fn newline(&mut self, level: usize) {
        self.out.push('\n');
        for _ in 0..level * self.opts.indent {
            self.out.push(' ');
        }
    }

    fn comment_for(&mut self, node: &'a Node) -> Option<String> {
        if self.opts.comments.is_empty() {
            return None;
        }
        let hash = self.hasher.hash(node);
        self.opts.comments.get(&hash).cloned()
    }
}

/// Single-line rendering.
fn flat(node: &Node, style: OpcodeStyle) -> String {
    let mut out = String::new();
    write_flat_into(node, style, &mut out);
    out
}

fn write_flat_into(node: &Node, style: OpcodeStyle, out: &mut String) {
    match node {
        Node::Atom(atom) => out.push_str(&atom_text(atom, style)),
        Node::List(items) if items.is_empty() => out.push_str("()"),
        Node::List(items) => {
            out.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_flat_into(item, style, out);
            }
            out.push(')');
        }
        Node::Cons(first, rest) => {
            out.push('(');
            write_flat_into(first, style, out);
            let mut cur: &Node = rest;
            loop {
                match cur {
                    Node::Cons(f, r) => {
                        out.push(' ');
                        write_flat_into(f, style, out);
                        cur = r;
                    }
                    Node::List(items) => {
                        for item in items {
                            out.push(' ');
                            write_flat_into(item, style, out);
                        }
                        break;
                    }
                    Node::Atom(a) if a.is_nil() => break,
                    Node::Atom(a) => {
                        out.push_str(" . ");
                        out.push_str(&atom_text(a, style));
                        break;
                    }
                }
            }
            out.push(')');
        }
    }
}

pub(crate) fn atom_text(atom: &Atom, style: OpcodeStyle) -> String {
    match atom {
        Atom::Nil | Atom::Bool(false) => "()".to_string(),
        Atom::Bool(true) => "1".to_string(),
        Atom::Int(n) => n.to_string(),
        Atom::Bytes(b) if b.is_empty() => "()".to_string(),
        Atom::Bytes(b) => format!("0x{}", hex(b)),
        Atom::Str(s) => quote_str(s),
        Atom::Symbol(s) => match (style, condition_code(s)) {
            (OpcodeStyle::Numeric, Some(code)) => code.to_string(),
            _ => s.clone(),
        },
    }
}

/// Quote text when it round-trips through the parser, else fall back to hex.
fn quote_str(s: &str) -> String {
    let printable = s.bytes().all(|b| (0x20..0x7f).contains(&b));
    if s.is_empty() {
        "()".to_string()
    } else if printable && !s.contains('"') {
        format!("\"{}\"", s)
    } else if printable && !s.contains('\'') {
        format!("'{}'", s)
    } else {
        format!("0x{}", hex(s.as_bytes()))
    }
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
