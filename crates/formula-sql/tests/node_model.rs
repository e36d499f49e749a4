//! Node Model Tests
//!
//! Structural laws of formula trees: equality and copying, hierarchical
//! addressing, and the sharing guarantees of the rewriting operations.

mod common;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use common::arb_tree;
use formula_sql::{Error, FormulaItem, FormulaWalk, NodeHierarchyIndex, NodeRef};
use proptest::prelude::*;

fn indices(tree: &NodeRef) -> Vec<NodeHierarchyIndex> {
    tree.enumerate().map(|(index, _)| index).collect()
}

fn overlaps(a: &NodeHierarchyIndex, b: &NodeHierarchyIndex) -> bool {
    a.is_prefix_of(b) || b.is_prefix_of(a)
}

// ============================================================================
// Equality and copy laws
// ============================================================================

proptest! {
    #[test]
    fn light_copy_with_own_children_is_equal(tree in arb_tree()) {
        for (_, node) in tree.enumerate() {
            let children: Vec<NodeRef> = node.children().into_iter().cloned().collect();
            let copy = node.light_copy(children).unwrap();
            prop_assert_eq!(&copy, node.as_ref());
        }
    }

    #[test]
    fn shallow_copy_is_equal_but_distinct(tree in arb_tree()) {
        let copy = tree.shallow_copy();
        prop_assert_eq!(&copy, &tree);
        prop_assert!(!Arc::ptr_eq(&copy, &tree));
        for (child, original) in copy.children().into_iter().zip(tree.children()) {
            prop_assert!(Arc::ptr_eq(child, original));
        }
    }
}

// ============================================================================
// Addressing laws
// ============================================================================

proptest! {
    #[test]
    fn every_enumerated_index_resolves(tree in arb_tree()) {
        for (index, node) in tree.enumerate() {
            let found = tree.get_by_index(&index).unwrap();
            prop_assert!(Arc::ptr_eq(&found, &node));
            prop_assert_eq!(tree.resolve_index(&node), Some(index));
        }
    }

    #[test]
    fn enumeration_is_pre_order(tree in arb_tree()) {
        let all = indices(&tree);
        prop_assert!(all[0].is_root());
        for pair in all.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
    }
}

// ============================================================================
// Rewriting laws
// ============================================================================

proptest! {
    #[test]
    fn replacement_shares_off_path_nodes(
        tree in arb_tree(),
        pick in any::<prop::sample::Index>(),
    ) {
        let all = indices(&tree);
        let target = pick.get(&all).clone();
        let replacement = FormulaItem::field("replacement");

        let rewritten = tree.replace_at_index(&target, Arc::clone(&replacement)).unwrap();
        prop_assert!(Arc::ptr_eq(&rewritten.get_by_index(&target).unwrap(), &replacement));

        for (index, node) in tree.enumerate() {
            if overlaps(&index, &target) {
                continue;
            }
            let shared = rewritten.get_by_index(&index).unwrap();
            prop_assert!(Arc::ptr_eq(&shared, &node), "node at {} was rebuilt", index);
        }
    }

    #[test]
    fn batch_substitution_matches_sequential(
        tree in arb_tree(),
        first in any::<prop::sample::Index>(),
        second in any::<prop::sample::Index>(),
    ) {
        let all = indices(&tree);
        let i1 = first.get(&all).clone();
        let i2 = second.get(&all).clone();
        prop_assume!(!overlaps(&i1, &i2));

        let r1 = FormulaItem::field("r1");
        let r2 = FormulaItem::string("r2");
        let batch = tree
            .substitute_batch(BTreeMap::from([
                (i1.clone(), Arc::clone(&r1)),
                (i2.clone(), Arc::clone(&r2)),
            ]))
            .unwrap();

        let one_then_two = tree
            .replace_at_index(&i1, Arc::clone(&r1))
            .and_then(|t| t.replace_at_index(&i2, Arc::clone(&r2)))
            .unwrap();
        let two_then_one = tree
            .replace_at_index(&i2, Arc::clone(&r2))
            .and_then(|t| t.replace_at_index(&i1, Arc::clone(&r1)))
            .unwrap();

        prop_assert_eq!(&batch, &one_then_two);
        prop_assert_eq!(&batch, &two_then_one);
    }
}

mod rewriting_errors {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_overlapping_batch_is_rejected() {
        let tree = FormulaItem::binary(
            "+",
            FormulaItem::func("abs", vec![FormulaItem::field("a")]),
            FormulaItem::integer(1),
        );
        let err = tree
            .substitute_batch(BTreeMap::from([
                (NodeHierarchyIndex::from(vec![0]), FormulaItem::integer(2)),
                (NodeHierarchyIndex::from(vec![0, 0]), FormulaItem::integer(3)),
            ]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Overlapping substitution indices 0 and 0.0"
        );
    }

    #[test]
    fn test_missing_index_is_reported() {
        let tree = FormulaItem::unary("not", FormulaItem::field("flag"));
        let err = tree
            .replace_at_index(&NodeHierarchyIndex::from(vec![1]), FormulaItem::null())
            .unwrap_err();
        assert!(matches!(err, Error::IndexNotFound { .. }));
    }

    #[test]
    fn test_light_copy_checks_arity() {
        let tree = FormulaItem::binary("-", FormulaItem::integer(1), FormulaItem::integer(2));
        let err = tree.light_copy(vec![FormulaItem::integer(1)]).unwrap_err();
        assert!(matches!(
            err,
            Error::Arity {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }
}

// ============================================================================
// Window defaults
// ============================================================================

mod window_defaults {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_window_call_exposes_three_implicit_children() {
        let tree = FormulaItem::window("sum", vec![FormulaItem::field("x")]);
        let direct: Vec<(Vec<usize>, &'static str)> = tree
            .enumerate_with(1)
            .skip(1)
            .map(|(index, node)| (index.indices().to_vec(), node.kind_name()))
            .collect();
        assert_eq!(
            direct,
            vec![
                (vec![0], "Field"),
                (vec![1], "WindowGroupingTotal"),
                (vec![2], "IgnoreDimensions"),
                (vec![3], "BeforeFilterBy"),
            ]
        );

        let grouping = tree.get_by_index(&NodeHierarchyIndex::from(vec![1])).unwrap();
        assert_eq!(grouping, FormulaItem::grouping_total());
        let ignored = tree.get_by_index(&NodeHierarchyIndex::from(vec![2])).unwrap();
        assert_eq!(ignored.child_count(), 0);
        let before = tree.get_by_index(&NodeHierarchyIndex::from(vec![3])).unwrap();
        assert_eq!(before, FormulaItem::before_filter_by(BTreeSet::new()));
    }

    #[test]
    fn test_explicit_grouping_keeps_defaults_for_the_rest() {
        let tree = FormulaItem::window_with(
            "rsum",
            vec![FormulaItem::field("x")],
            Some(FormulaItem::grouping_within(vec![FormulaItem::field("region")])),
            Some(FormulaItem::ordering(vec![FormulaItem::desc(FormulaItem::field("day"))])),
        );
        let kinds: Vec<&str> = tree.children().iter().map(|c| c.kind_name()).collect();
        assert_eq!(
            kinds,
            vec![
                "Field",
                "Ordering",
                "WindowGroupingWithin",
                "IgnoreDimensions",
                "BeforeFilterBy"
            ]
        );
    }
}
