//! Property-based tests for name derivation and subnet lookup.

use lz_core::naming::{derive, NameContext, ResourceKind, BUILT_IN_PREFIXES};
use lz_core::{Deferred, SubnetSpec, SubnetTable};
use proptest::prelude::*;

fn arb_kind() -> impl Strategy<Value = ResourceKind> {
    prop_oneof![
        Just(ResourceKind::ResourceGroup),
        Just(ResourceKind::VirtualNetwork),
        Just(ResourceKind::KubernetesCluster),
        Just(ResourceKind::LogAnalyticsWorkspace),
        Just(ResourceKind::ManagedGrafana),
        Just(ResourceKind::ApplicationGateway),
        Just(ResourceKind::PublicIp),
        "[a-z]{1,4}"
            .prop_filter("built-in prefix", |p| !BUILT_IN_PREFIXES.contains(&p.as_str()))
            .prop_map(ResourceKind::Custom),
    ]
}

/// Subnet names, a tag, and the names that do not contain the tag in shuffled order.
fn arb_table_with_shuffled_misses() -> impl Strategy<Value = (Vec<String>, String, Vec<String>)> {
    (prop::collection::vec("snet-[a-z]{1,6}", 1..10), "[a-z]{1,2}").prop_flat_map(
        |(names, tag)| {
            let misses: Vec<String> = names
                .iter()
                .filter(|n| !n.contains(tag.as_str()))
                .cloned()
                .collect();
            (Just(names), Just(tag), Just(misses).prop_shuffle())
        },
    )
}

fn build_table(names: &[String]) -> SubnetTable {
    let mut table = SubnetTable::new();
    for (i, name) in names.iter().enumerate() {
        table.insert(
            SubnetSpec::new(name.clone(), format!("10.{}.0.0/24", i)),
            Deferred::known(format!("/subnets/{}", i)),
        );
    }
    table
}

proptest! {
    /// Same inputs always produce the same name
    #[test]
    fn derive_is_deterministic(
        kind in arb_kind(),
        app in "[a-z][a-z0-9]{0,10}",
        loc in "[a-z]{2,4}",
        env in "[a-z]{2,4}"
    ) {
        let first = derive(&kind, &app, &loc, &env).unwrap();
        let second = derive(&kind, &app, &loc, &env).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first, format!("{}-{}-{}-{}", kind.prefix(), app, loc, env));
    }

    /// The context derives exactly what the free function derives
    #[test]
    fn context_matches_derive(
        kind in arb_kind(),
        app in "[a-z]{1,8}",
        loc in "[a-z]{3}",
        env in "[a-z]{3}"
    ) {
        let context = NameContext::new(app.clone(), loc.clone(), env.clone()).unwrap();
        prop_assert_eq!(context.derive(&kind).unwrap(), derive(&kind, &app, &loc, &env).unwrap());
    }

    /// Selection returns the earliest entry containing the tag
    #[test]
    fn select_returns_first_match(
        names in prop::collection::vec("snet-[a-z]{1,6}", 1..12),
        tag in "[a-z]{1,2}"
    ) {
        let table = build_table(&names);
        let expected = names.iter().find(|n| n.contains(tag.as_str()));
        match table.select_entry(&tag) {
            Ok(entry) => prop_assert_eq!(Some(&entry.spec.name), expected),
            Err(_) => prop_assert!(expected.is_none()),
        }
    }

    /// Appending a non-matching entry never changes the result
    #[test]
    fn non_matching_insert_keeps_selection(
        names in prop::collection::vec("snet-[a-z]{1,6}", 1..8),
        extra in "snet-[0-9]{1,4}"
    ) {
        let before = build_table(&names);
        let mut with_extra = names.clone();
        with_extra.push(extra);
        let after = build_table(&with_extra);

        for tag in ["a", "k", "agw", "aks"] {
            let left = before.select_entry(tag).map(|e| e.spec.name.clone()).ok();
            let right = after.select_entry(tag).map(|e| e.spec.name.clone()).ok();
            prop_assert_eq!(left, right);
        }
    }

    /// Distinct (kind, app, location, environment) tuples never share a name
    #[test]
    fn distinct_tuples_give_distinct_names(
        left in (arb_kind(), "[a-z]{1,6}", "[a-z]{3}", "[a-z]{3}"),
        right in (arb_kind(), "[a-z]{1,6}", "[a-z]{3}", "[a-z]{3}")
    ) {
        prop_assume!(left != right);
        let a = derive(&left.0, &left.1, &left.2, &left.3).unwrap();
        let b = derive(&right.0, &right.1, &right.2, &right.3).unwrap();
        prop_assert_ne!(a, b);
    }

    /// Shuffling the entries that do not match leaves the selection unchanged
    #[test]
    fn reordering_misses_keeps_selection(
        (names, tag, shuffled) in arb_table_with_shuffled_misses()
    ) {
        let mut misses = shuffled.into_iter();
        let reordered: Vec<String> = names
            .iter()
            .map(|n| {
                if n.contains(tag.as_str()) {
                    n.clone()
                } else {
                    misses.next().unwrap_or_else(|| n.clone())
                }
            })
            .collect();

        let before = build_table(&names).select_entry(&tag).map(|e| e.spec.name.clone()).ok();
        let after = build_table(&reordered).select_entry(&tag).map(|e| e.spec.name.clone()).ok();
        prop_assert_eq!(before, after);
    }

    /// Moving a matching entry to the front makes it the selection
    #[test]
    fn reordering_changes_winner(
        names in prop::collection::vec("snet-[a-z]{1,6}", 2..8),
        tag in "[a-z]"
    ) {
        let matching: Vec<&String> = names.iter().filter(|n| n.contains(tag.as_str())).collect();
        prop_assume!(matching.len() >= 2);

        let last = matching[matching.len() - 1].clone();
        let mut reordered: Vec<String> = names.iter().filter(|n| **n != last).cloned().collect();
        reordered.insert(0, last.clone());

        let table = build_table(&reordered);
        prop_assert_eq!(&table.select_entry(&tag).unwrap().spec.name, &last);
    }
}
