//! Record eligibility for a given engine identifier.

use crate::record::Condition;

/// Decide whether a record carrying `conditions` runs on `engine`.
///
/// A lone `onlyif` restricts the record to that engine. In every other
/// case only `skipif` conditions are consulted; `onlyif` entries in a
/// list of two or more conditions have no effect.
#[must_use]
pub fn eligible(conditions: &[Condition], engine: &str) -> bool {
    if let [only] = conditions
        && only.is_only()
    {
        return only.engine == engine;
    }

    !conditions
        .iter()
        .any(|condition| condition.is_skip() && condition.engine == engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn no_conditions_always_eligible() {
        assert!(eligible(&[], "mysql"));
        assert!(eligible(&[], ""));
    }

    #[test]
    fn single_only_matches_engine() {
        let conditions = [Condition::only("mysql")];
        assert!(eligible(&conditions, "mysql"));
        assert!(!eligible(&conditions, "postgresql"));
    }

    #[test]
    fn skip_excludes_engine() {
        let conditions = [Condition::skip("mysql")];
        assert!(!eligible(&conditions, "mysql"));
        assert!(eligible(&conditions, "sqlite"));
    }

    #[test]
    fn only_is_ignored_alongside_other_conditions() {
        let conditions = [Condition::only("mysql"), Condition::skip("oracle")];
        assert!(eligible(&conditions, "mysql"));
        assert!(eligible(&conditions, "sqlite"));
        assert!(!eligible(&conditions, "oracle"));

        let two_only = [Condition::only("mysql"), Condition::only("mssql")];
        assert!(eligible(&two_only, "sqlite"));
    }

    #[test]
    fn any_matching_skip_wins() {
        let conditions = [
            Condition::skip("mysql"),
            Condition::skip("mssql"),
            Condition::skip("oracle"),
        ];
        assert!(!eligible(&conditions, "mssql"));
        assert!(!eligible(&conditions, "oracle"));
        assert!(eligible(&conditions, "sqlite"));
    }

    proptest! {
        #[test]
        fn prop_skip_only_lists_reject_exactly_their_engines(
            engines in proptest::collection::vec("[a-z]{1,6}", 1..5),
            target in "[a-z]{1,6}",
        ) {
            let conditions: Vec<Condition> = engines.iter().map(Condition::skip).collect();
            prop_assert_eq!(eligible(&conditions, &target), !engines.contains(&target));
        }

        #[test]
        fn prop_only_entries_never_reject_in_multi_lists(
            engines in proptest::collection::vec("[a-z]{1,6}", 2..5),
            target in "[a-z]{1,6}",
        ) {
            let conditions: Vec<Condition> = engines.iter().map(Condition::only).collect();
            prop_assert!(eligible(&conditions, &target));
        }
    }
}
