//! Builtin functions: VM operators, library macros, and condition builtins.

use std::fmt;

use super::builder::Feature;
use crate::ast::Type;

/// How many arguments a builtin accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => n == k,
            Arity::Range(lo, hi) => (lo..=hi).contains(&n),
            Arity::AtLeast(k) => n >= k,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(k) => write!(f, "{}", k),
            Arity::Range(lo, hi) => write!(f, "{} to {}", lo, hi),
            Arity::AtLeast(k) => write!(f, "at least {}", k),
        }
    }
}

/// A builtin that lowers to a single operator or macro form.
#[derive(Clone, Copy, Debug)]
pub struct Builtin {
    pub name: &'static str,
    /// Head symbol of the emitted form.
    pub op: &'static str,
    pub arity: Arity,
    pub feature: Option<Feature>,
    pub returns: BuiltinType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinType {
    Int,
    Bool,
    Bytes,
    Bytes32,
    PublicKey,
}

impl BuiltinType {
    pub fn to_type(self) -> Type {
        match self {
            BuiltinType::Int => Type::Int("int".to_string()),
            BuiltinType::Bool => Type::Bool,
            BuiltinType::Bytes => Type::Bytes,
            BuiltinType::Bytes32 => Type::Bytes32,
            BuiltinType::PublicKey => Type::PublicKey,
        }
    }
}

const fn pure(name: &'static str, arity: Arity, returns: BuiltinType) -> Builtin {
    Builtin {
        name,
        op: name,
        arity,
        feature: None,
        returns,
    }
}

pub const BUILTINS: &[Builtin] = &[
    pure("concat", Arity::AtLeast(1), BuiltinType::Bytes),
    pure("substr", Arity::Range(2, 3), BuiltinType::Bytes),
    pure("strlen", Arity::Exact(1), BuiltinType::Int),
    pure("sha256", Arity::AtLeast(1), BuiltinType::Bytes32),
    pure("keccak256", Arity::AtLeast(1), BuiltinType::Bytes32),
    pure("coinid", Arity::Exact(3), BuiltinType::Bytes32),
    pure("pubkey_for_exp", Arity::Exact(1), BuiltinType::PublicKey),
    pure("point_add", Arity::AtLeast(1), BuiltinType::PublicKey),
    Builtin {
        name: "sha256tree",
        op: "sha256tree",
        arity: Arity::Exact(1),
        feature: Some(Feature::TreeHash),
        returns: BuiltinType::Bytes32,
    },
    Builtin {
        name: "and",
        op: "and",
        arity: Arity::AtLeast(1),
        feature: Some(Feature::LogicMacros),
        returns: BuiltinType::Bool,
    },
    Builtin {
        name: "or",
        op: "or",
        arity: Arity::AtLeast(1),
        feature: Some(Feature::LogicMacros),
        returns: BuiltinType::Bool,
    },
];

/// A builtin that produces a spend condition.
#[derive(Clone, Copy, Debug)]
pub struct ConditionBuiltin {
    pub name: &'static str,
    pub condition: &'static str,
    pub arity: usize,
}

pub const CONDITION_BUILTINS: &[ConditionBuiltin] = &[
    ConditionBuiltin {
        name: "requireSignature",
        condition: "AGG_SIG_ME",
        arity: 2,
    },
    ConditionBuiltin {
        name: "reserveFee",
        condition: "RESERVE_FEE",
        arity: 1,
    },
    ConditionBuiltin {
        name: "assertHeightAbsolute",
        condition: "ASSERT_HEIGHT_ABSOLUTE",
        arity: 1,
    },
    ConditionBuiltin {
        name: "assertSecondsRelative",
        condition: "ASSERT_SECONDS_RELATIVE",
        arity: 1,
    },
];

pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

pub fn lookup_condition(name: &str) -> Option<&'static ConditionBuiltin> {
    CONDITION_BUILTINS.iter().find(|b| b.name == name)
}

pub fn is_builtin(name: &str) -> bool {
    lookup(name).is_some() || lookup_condition(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity() {
        assert!(Arity::Range(2, 3).accepts(3));
        assert!(!Arity::Range(2, 3).accepts(1));
        assert!(Arity::AtLeast(1).accepts(4));
        assert_eq!(Arity::Range(2, 3).to_string(), "2 to 3");
        assert_eq!(Arity::Exact(3).to_string(), "3");
    }

    #[test]
    fn test_tables() {
        assert_eq!(lookup("sha256tree").and_then(|b| b.feature), Some(Feature::TreeHash));
        assert_eq!(lookup("substr").map(|b| b.op), Some("substr"));
        assert_eq!(lookup_condition("reserveFee").map(|c| c.condition), Some("RESERVE_FEE"));
        assert!(is_builtin("requireSignature"));
        assert!(!is_builtin("transfer"));
    }
}
