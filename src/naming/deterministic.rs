//! Suffix-based naming that always produces an unused name.

use async_trait::async_trait;

use super::{NameSuggester, NamingContext, ScopeNameSet};

const FIXED_SUFFIXES: [&str; 3] = ["2", "Copy", "_copy"];
const MAX_NUMBERED_SUFFIX: u32 = 999;

/// Candidate names for `original` in preference order:
/// `x2`, `xCopy`, `x_copy`, `x_1` ... `x_999`, then `x_dup1`, `x_dup2`, ...
///
/// The sequence is unbounded, so filtering it against any finite set of
/// existing names always yields a result.
pub fn candidates(original: &str) -> impl Iterator<Item = String> + '_ {
    let fixed = FIXED_SUFFIXES
        .into_iter()
        .map(move |suffix| format!("{original}{suffix}"));
    let numbered = (1..=MAX_NUMBERED_SUFFIX).map(move |n| format!("{original}_{n}"));
    let dup = (1u64..).map(move |n| format!("{original}_dup{n}"));
    fixed.chain(numbered).chain(dup)
}

/// First candidate for `original` that is not in `existing`.
pub fn first_free(original: &str, existing: &ScopeNameSet) -> String {
    candidates(original)
        .find(|candidate| !existing.contains(candidate))
        .unwrap_or_else(|| format!("{original}_dup"))
}

/// Total, collision-free naming strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicSuggester;

impl DeterministicSuggester {
    /// Create the strategy
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NameSuggester for DeterministicSuggester {
    fn name(&self) -> &'static str {
        "deterministic"
    }

    async fn suggest(
        &self,
        original: &str,
        _context: &NamingContext,
        _type_name: &str,
        existing: &ScopeNameSet,
        count: usize,
    ) -> Vec<String> {
        candidates(original)
            .filter(|candidate| !existing.contains(candidate))
            .take(count)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::is_valid_identifier;
    use proptest::prelude::*;

    fn context() -> NamingContext {
        NamingContext {
            procedure_name: "Abs".to_string(),
            type_name: "int".to_string(),
            documentation_summary: String::new(),
        }
    }

    #[test]
    fn candidate_order() {
        let first: Vec<_> = candidates("x").take(6).collect();
        assert_eq!(first, vec!["x2", "xCopy", "x_copy", "x_1", "x_2", "x_3"]);
        assert_eq!(candidates("x").nth(3 + 998).as_deref(), Some("x_999"));
        assert_eq!(candidates("x").nth(3 + 999).as_deref(), Some("x_dup1"));
    }

    #[tokio::test]
    async fn empty_scope_returns_first_candidate() {
        let name = DeterministicSuggester
            .suggest_one("x", &context(), "int", &ScopeNameSet::new())
            .await;
        assert_eq!(name, "x2");
    }

    #[tokio::test]
    async fn original_in_scope_yields_value2() {
        let existing: ScopeNameSet = ["value"].into_iter().collect();
        let name = DeterministicSuggester
            .suggest_one("value", &context(), "int", &existing)
            .await;
        assert_eq!(name, "value2");
    }

    #[tokio::test]
    async fn skips_taken_candidates() {
        let existing: ScopeNameSet = ["id", "id2", "idCopy"].into_iter().collect();
        let names = DeterministicSuggester
            .suggest("id", &context(), "int", &existing, 3)
            .await;
        assert_eq!(names, vec!["id_copy", "id_1", "id_2"]);
    }

    #[test]
    fn exhausted_numbered_suffixes_move_to_dup() {
        let existing: ScopeNameSet = candidates("n").take(1002).collect();
        assert_eq!(first_free("n", &existing), "n_dup1");
    }

    proptest! {
        #[test]
        fn never_returns_existing_name(
            original in "[a-z][a-zA-Z0-9]{0,6}",
            existing in prop::collection::hash_set("[a-z][a-zA-Z0-9_]{0,8}", 0..40),
        ) {
            let mut scope: ScopeNameSet = existing.iter().collect();
            scope.insert(&original);
            let name = first_free(&original, &scope);
            prop_assert!(!scope.contains(&name));
            prop_assert!(is_valid_identifier(&name));
        }

        #[test]
        fn taking_the_first_k_candidates_returns_the_next(k in 0usize..1100) {
            let scope: ScopeNameSet = candidates("item").take(k).collect();
            let expected = candidates("item").nth(k).unwrap();
            prop_assert_eq!(first_free("item", &scope), expected);
        }
    }
}
