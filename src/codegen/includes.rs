//! Include libraries and the minimal set implied by a program's features.

use std::collections::BTreeSet;

use super::builder::Feature;
use crate::config::{CompileOptions, OpcodeMode};

pub const CONDITION_CODES: &str = "condition_codes.clib";
pub const SHA256TREE: &str = "sha256tree.clib";
pub const UTILITY_MACROS: &str = "utility_macros.clib";
pub const CAT_TRUTHS: &str = "cat_truths.clib";
pub const SINGLETON_TRUTHS: &str = "singleton_truths.clib";

/// Known libraries in emission order.
pub const LIBRARIES: &[&str] = &[
    CONDITION_CODES,
    SHA256TREE,
    UTILITY_MACROS,
    CAT_TRUTHS,
    SINGLETON_TRUTHS,
];

fn library_for(feature: Feature) -> &'static str {
    match feature {
        Feature::Conditions => CONDITION_CODES,
        Feature::TreeHash => SHA256TREE,
        Feature::LogicMacros => UTILITY_MACROS,
    }
}

/// Libraries to include: those the features need, in canonical order,
/// followed by the configured extras. No library appears twice.
///
/// Numeric opcode rendering never needs `condition_codes.clib`.
pub fn resolve(features: &BTreeSet<Feature>, opts: &CompileOptions) -> Vec<String> {
    let implied: BTreeSet<&str> = features
        .iter()
        .map(|f| library_for(*f))
        .filter(|lib| !(*lib == CONDITION_CODES && opts.opcodes == OpcodeMode::Numeric))
        .collect();

    let mut out: Vec<String> = LIBRARIES
        .iter()
        .filter(|lib| implied.contains(*lib))
        .map(|lib| lib.to_string())
        .collect();
    for extra in &opts.extra_includes {
        if !out.contains(extra) {
            out.push(extra.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_set_in_canonical_order() {
        let features = BTreeSet::from([Feature::TreeHash, Feature::Conditions]);
        let libs = resolve(&features, &CompileOptions::default());
        assert_eq!(libs, vec![CONDITION_CODES, SHA256TREE]);
        assert!(resolve(&BTreeSet::new(), &CompileOptions::default()).is_empty());
    }

    #[test]
    fn test_extras_not_duplicated() {
        let opts = CompileOptions {
            extra_includes: vec![SHA256TREE.into(), CAT_TRUTHS.into(), CAT_TRUTHS.into()],
            ..CompileOptions::default()
        };
        let libs = resolve(&BTreeSet::from([Feature::TreeHash]), &opts);
        assert_eq!(libs, vec![SHA256TREE, CAT_TRUTHS]);
    }

    #[test]
    fn test_numeric_mode_skips_condition_codes() {
        let opts = CompileOptions {
            opcodes: OpcodeMode::Numeric,
            ..CompileOptions::default()
        };
        let libs = resolve(&BTreeSet::from([Feature::Conditions, Feature::LogicMacros]), &opts);
        assert_eq!(libs, vec![UTILITY_MACROS]);
    }
}
