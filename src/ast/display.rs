//! Display strings for AST types and operators.
//!
//! Event signatures are built from these names, so the text is part of the
//! emitted program and must stay stable.

use super::{BinOp, EventDecl, Type, UnOp};

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int(name) => f.write_str(name),
            Type::Bool => f.write_str("bool"),
            Type::Address => f.write_str("address"),
            Type::Bytes32 => f.write_str("bytes32"),
            Type::Bytes => f.write_str("bytes"),
            Type::String => f.write_str("string"),
            Type::PublicKey => f.write_str("pubkey"),
            Type::Named(name) => f.write_str(name),
        }
    }
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Or => "||",
            BinOp::And => "&&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitAnd => "&",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::StrGt => ">s",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::LtEq => "<=",
            BinOp::GtEq => ">=",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
        }
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UnOp::Not => "!",
            UnOp::Neg => "-",
            UnOp::BitNot => "~",
        })
    }
}

/// `Name(type1,type2)`: the text hashed into every announcement of the event.
pub fn event_signature(event: &EventDecl) -> String {
    let types: Vec<String> = event.fields.iter().map(|f| f.ty.node.to_string()).collect();
    format!("{}({})", event.name.node, types.join(","))
}
