//! VM operator and condition-code tables.
//!
//! These are the only process-wide data in the crate: read-only, built once
//! on first lookup.

use std::collections::HashMap;
use std::sync::OnceLock;

/// VM operators and their opcodes.
pub const OPERATORS: &[(&str, u8)] = &[
    ("q", 1),
    ("a", 2),
    ("i", 3),
    ("c", 4),
    ("f", 5),
    ("r", 6),
    ("l", 7),
    ("x", 8),
    ("=", 9),
    (">s", 10),
    ("sha256", 11),
    ("substr", 12),
    ("strlen", 13),
    ("concat", 14),
    ("+", 16),
    ("-", 17),
    ("*", 18),
    ("/", 19),
    ("divmod", 20),
    (">", 21),
    ("ash", 22),
    ("lsh", 23),
    ("logand", 24),
    ("logior", 25),
    ("logxor", 26),
    ("lognot", 27),
    ("point_add", 29),
    ("pubkey_for_exp", 30),
    ("not", 32),
    ("any", 33),
    ("all", 34),
    ("softfork", 36),
    ("coinid", 48),
    ("keccak256", 62),
];

/// Condition codes as named in `condition_codes.clib`.
pub const CONDITIONS: &[(&str, u8)] = &[
    ("REMARK", 1),
    ("AGG_SIG_PARENT", 43),
    ("AGG_SIG_PUZZLE", 44),
    ("AGG_SIG_AMOUNT", 45),
    ("AGG_SIG_PUZZLE_AMOUNT", 46),
    ("AGG_SIG_PARENT_AMOUNT", 47),
    ("AGG_SIG_PARENT_PUZZLE", 48),
    ("AGG_SIG_UNSAFE", 49),
    ("AGG_SIG_ME", 50),
    ("CREATE_COIN", 51),
    ("RESERVE_FEE", 52),
    ("CREATE_COIN_ANNOUNCEMENT", 60),
    ("ASSERT_COIN_ANNOUNCEMENT", 61),
    ("CREATE_PUZZLE_ANNOUNCEMENT", 62),
    ("ASSERT_PUZZLE_ANNOUNCEMENT", 63),
    ("ASSERT_CONCURRENT_SPEND", 64),
    ("ASSERT_CONCURRENT_PUZZLE", 65),
    ("SEND_MESSAGE", 66),
    ("RECEIVE_MESSAGE", 67),
    ("ASSERT_MY_COIN_ID", 70),
    ("ASSERT_MY_PARENT_ID", 71),
    ("ASSERT_MY_PUZZLEHASH", 72),
    ("ASSERT_MY_AMOUNT", 73),
    ("ASSERT_MY_BIRTH_SECONDS", 74),
    ("ASSERT_MY_BIRTH_HEIGHT", 75),
    ("ASSERT_EPHEMERAL", 76),
    ("ASSERT_SECONDS_RELATIVE", 80),
    ("ASSERT_SECONDS_ABSOLUTE", 81),
    ("ASSERT_HEIGHT_RELATIVE", 82),
    ("ASSERT_HEIGHT_ABSOLUTE", 83),
    ("ASSERT_BEFORE_SECONDS_RELATIVE", 84),
    ("ASSERT_BEFORE_SECONDS_ABSOLUTE", 85),
    ("ASSERT_BEFORE_HEIGHT_RELATIVE", 86),
    ("ASSERT_BEFORE_HEIGHT_ABSOLUTE", 87),
];

struct Tables {
    codes: HashMap<&'static str, u8>,
    conditions: HashMap<&'static str, u8>,
}

fn tables() -> &'static Tables {
    static TABLES: OnceLock<Tables> = OnceLock::new();
    TABLES.get_or_init(|| Tables {
        codes: OPERATORS
            .iter()
            .chain(CONDITIONS.iter())
            .map(|&(name, code)| (name, code))
            .collect(),
        conditions: CONDITIONS.iter().copied().collect(),
    })
}

/// Numeric code of an operator or condition name.
pub fn code_of(name: &str) -> Option<u8> {
    tables().codes.get(name).copied()
}

/// Numeric code of a condition name only.
pub fn condition_code(name: &str) -> Option<u8> {
    tables().conditions.get(name).copied()
}

pub fn is_operator(name: &str) -> bool {
    OPERATORS.iter().any(|&(op, _)| op == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_codes() {
        assert_eq!(code_of("q"), Some(1));
        assert_eq!(code_of("a"), Some(2));
        assert_eq!(code_of("c"), Some(4));
        assert_eq!(code_of("sha256"), Some(11));
        assert_eq!(code_of("divmod"), Some(20));
        assert_eq!(code_of("list"), None);
    }

    #[test]
    fn test_condition_codes() {
        assert_eq!(condition_code("AGG_SIG_ME"), Some(50));
        assert_eq!(condition_code("CREATE_COIN"), Some(51));
        assert_eq!(condition_code("ASSERT_MY_AMOUNT"), Some(73));
        assert_eq!(condition_code("sha256"), None);
    }

    #[test]
    fn test_names_unique() {
        let mut names: Vec<&str> = OPERATORS
            .iter()
            .chain(CONDITIONS.iter())
            .map(|(n, _)| *n)
            .collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
