//! Property-based tests for version ranges and project ordering.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use std::cmp::Ordering;

    use crate::phases::{ordering, test_support};
    use crate::project::ProjectName;
    use crate::version::{Version, VersionSpec};
    use proptest::prelude::*;

    fn version_text() -> impl Strategy<Value = String> {
        (0u8..4, 0u8..4, proptest::option::of(0u8..3)).prop_map(|(major, minor, patch)| match patch {
            Some(patch) => format!("{}.{}.{}", major, minor, patch),
            None => format!("{}.{}", major, minor),
        })
    }

    fn clause() -> impl Strategy<Value = String> {
        let operator = prop::sample::select(vec![">=", ">", "<=", "<", "==", "!=", ""]);
        prop_oneof![
            (operator, version_text()).prop_map(|(op, version)| format!("{}{}", op, version)),
            (0u8..4).prop_map(|major| format!("{}.*", major)),
            Just("*".to_string()),
        ]
    }

    fn spec() -> impl Strategy<Value = VersionSpec> {
        prop::collection::vec(clause(), 1..3)
            .prop_map(|clauses| VersionSpec::parse(&clauses.join(",")).unwrap())
    }

    // ============================================================================
    // VersionSpec::intersect property tests
    // ============================================================================

    proptest! {
        /// Property: intersection does not depend on operand order
        #[test]
        fn intersect_is_commutative(a in spec(), b in spec()) {
            let left = a.intersect(&b).map(|s| s.set().clone());
            let right = b.intersect(&a).map(|s| s.set().clone());
            prop_assert_eq!(left, right);
        }

        /// Property: a version satisfies the intersection iff it satisfies both
        #[test]
        fn intersect_contains_exactly_common_versions(a in spec(), b in spec(), v in version_text()) {
            let version = Version::parse(&v).unwrap();
            let both = a.contains(&version) && b.contains(&version);
            match a.intersect(&b) {
                Some(merged) => prop_assert_eq!(merged.contains(&version), both),
                None => prop_assert!(!both, "{} satisfies '{}' and '{}'", v, a, b),
            }
        }

        /// Property: the wildcard is the identity of intersection
        #[test]
        fn intersect_with_any_keeps_text(a in spec()) {
            let merged = a.intersect(&VersionSpec::any()).unwrap();
            prop_assert_eq!(merged.as_str(), a.as_str());
        }
    }

    // ============================================================================
    // Version ordering property tests
    // ============================================================================

    proptest! {
        /// Property: comparison is antisymmetric
        #[test]
        fn version_cmp_is_antisymmetric(a in version_text(), b in version_text()) {
            let a = Version::parse(&a).unwrap();
            let b = Version::parse(&b).unwrap();
            prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        }

        /// Property: trailing zero components do not change a version
        #[test]
        fn trailing_zeros_are_equal(a in version_text()) {
            let padded = Version::parse(&format!("{}.0", a)).unwrap();
            prop_assert_eq!(Version::parse(&a).unwrap().cmp(&padded), Ordering::Equal);
        }
    }

    // ============================================================================
    // Project ordering property tests
    // ============================================================================

    fn layered_edges() -> impl Strategy<Value = Vec<Vec<usize>>> {
        // Project i may only depend on projects with a smaller index.
        (1usize..8).prop_flat_map(|count| {
            (0..count)
                .map(|i| {
                    prop::collection::vec(any::<bool>(), i).prop_map(|mask| {
                        mask.iter()
                            .enumerate()
                            .filter(|(_, picked)| **picked)
                            .map(|(index, _)| index)
                            .collect::<Vec<_>>()
                    })
                })
                .collect::<Vec<_>>()
        })
    }

    proptest! {
        /// Property: ordering is a permutation that respects every edge and
        /// does not depend on the order upstream lists were written in
        #[test]
        fn ordering_is_deterministic_and_valid(edges in layered_edges()) {
            let names: Vec<String> = (0..edges.len()).map(|i| format!("p{}", i)).collect();
            let forward: Vec<Vec<&str>> = edges
                .iter()
                .map(|ups| ups.iter().map(|u| names[*u].as_str()).collect())
                .collect();
            let backward: Vec<Vec<&str>> = forward
                .iter()
                .map(|ups| ups.iter().rev().copied().collect())
                .collect();

            let build = |lists: &[Vec<&str>]| {
                let spec: Vec<(&str, &[&str])> = names
                    .iter()
                    .zip(lists)
                    .map(|(name, ups)| (name.as_str(), ups.as_slice()))
                    .rev()
                    .collect();
                test_support::graph(&spec)
            };

            let first = build(&forward);
            let order = ordering::execute(&first).unwrap();
            prop_assert_eq!(order.order.len(), first.discovery_order().len());
            let position = |name: &ProjectName| order.order.iter().position(|n| n == name);
            for name in order.downstream() {
                for up in first.direct_upstream(name) {
                    prop_assert!(position(up) < position(name));
                }
            }

            let second = ordering::execute(&build(&backward)).unwrap();
            prop_assert_eq!(order, second);
        }
    }
}
