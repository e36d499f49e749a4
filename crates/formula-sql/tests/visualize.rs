//! Visualization Tests
//!
//! Graph shape and edge roles of `visualize`, plus its serialized forms.

mod common;

use std::collections::{BTreeSet, HashSet};

use common::{arb_tree, binary, call, field};
use formula_sql::dot::{EdgeStyle, Graph, NodeShape};
use formula_sql::{visualize, FormulaItem, FormulaWalk};
use proptest::prelude::*;

fn roles<'g>(graph: &'g Graph, id: &'g str) -> Vec<&'g str> {
    graph
        .edges_from(id)
        .filter_map(|edge| edge.label.as_deref())
        .collect()
}

fn label<'g>(graph: &'g Graph, id: &str) -> &'g str {
    graph
        .node(id)
        .map(|node| node.label.as_str())
        .unwrap_or_else(|| panic!("no node {id}"))
}

// ============================================================================
// Structural properties
// ============================================================================

proptest! {
    #[test]
    fn edges_connect_existing_nodes(tree in arb_tree()) {
        let graph = visualize(&tree);
        let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        prop_assert_eq!(ids.len(), graph.nodes.len());
        for edge in &graph.edges {
            prop_assert!(ids.contains(edge.from.as_str()), "dangling {}", edge.from);
            prop_assert!(ids.contains(edge.to.as_str()), "dangling {}", edge.to);
        }
    }

    #[test]
    fn every_node_but_the_root_is_reached(tree in arb_tree()) {
        let graph = visualize(&tree);
        let targets: HashSet<&str> = graph.edges.iter().map(|e| e.to.as_str()).collect();
        prop_assert!(!targets.contains("n0"));
        for node in graph.nodes.iter().skip(1) {
            prop_assert!(targets.contains(node.id.as_str()), "{} is orphaned", node.id);
        }
    }

    #[test]
    fn visualization_is_deterministic(tree in arb_tree()) {
        prop_assert_eq!(visualize(&tree), visualize(&tree));
        prop_assert_eq!(visualize(&tree).to_dot(), visualize(&tree.shallow_copy()).to_dot());
    }
}

// ============================================================================
// Edge roles
// ============================================================================

mod edge_roles {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_case_block_roles() {
        let ast = FormulaItem::case_block(
            field("s"),
            vec![(FormulaItem::string("a"), FormulaItem::integer(1))],
            Some(FormulaItem::integer(0)),
        );
        let graph = visualize(&ast);
        assert_eq!(label(&graph, "n0"), "CASE");
        assert_eq!(roles(&graph, "n0"), vec!["WHAT", "WHEN", "ELSE"]);
        assert_eq!(label(&graph, "n1"), "[s]");
        assert_eq!(label(&graph, "n2"), "WHEN");
        assert_eq!(graph.node("n2").map(|n| n.shape), Some(NodeShape::Diamond));
        assert_eq!(roles(&graph, "n2"), vec!["IS", "THEN"]);
        assert_eq!(label(&graph, "n3"), "'a'");
    }

    #[test]
    fn test_if_chain_uses_dotted_else() {
        let ast = FormulaItem::if_block(
            vec![
                (field("a"), FormulaItem::integer(1)),
                (field("b"), FormulaItem::integer(2)),
            ],
            Some(FormulaItem::integer(3)),
        );
        let graph = visualize(&ast);
        let dotted: Vec<(&str, &str)> = graph
            .edges
            .iter()
            .filter(|e| e.style == EdgeStyle::Dotted)
            .map(|e| (e.from.as_str(), e.to.as_str()))
            .collect();
        assert_eq!(dotted.len(), 2);
        assert!(dotted
            .iter()
            .all(|(from, _)| label(&graph, from) == "IF"));
        assert_eq!(label(&graph, dotted[1].1), "3");
        assert_eq!(roles(&graph, dotted[0].0), vec!["TRUE?", "THEN", "ELSE"]);
    }

    #[test]
    fn test_window_call_shows_grouping_and_ordering() {
        let ast = FormulaItem::window_with(
            "rsum",
            vec![field("x")],
            Some(FormulaItem::grouping_within(vec![field("region")])),
            Some(FormulaItem::ordering(vec![FormulaItem::asc(field("day"))])),
        );
        let graph = visualize(&ast);
        assert_eq!(label(&graph, "n0"), "RSUM(ARG0)");
        assert_eq!(roles(&graph, "n0"), vec!["ARG0", "GROUPING", "ORDERING"]);
        assert_eq!(label(&graph, "n2"), "WITHIN");
        assert_eq!(roles(&graph, "n2"), vec!["DIM 0"]);
    }

    #[test]
    fn test_default_window_configuration_is_summarised() {
        let graph = visualize(&FormulaItem::window("sum", vec![field("x")]));
        let labels: Vec<&str> = graph.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["SUM(ARG0)", "[x]", "TOTAL"]);
    }

    #[test]
    fn test_before_filter_by_fields_are_listed() {
        let ast = std::sync::Arc::new(FormulaItem::WindowFuncCall(
            formula_sql::nodes::WindowFuncCall {
                name: "sum".to_string(),
                args: vec![field("x")],
                ordering: None,
                grouping: FormulaItem::grouping_total(),
                ignore_dimensions: FormulaItem::ignore_dimensions(Vec::new()),
                before_filter_by: FormulaItem::before_filter_by(BTreeSet::from([
                    "region".to_string(),
                ])),
                meta: Default::default(),
            },
        ));
        let graph = visualize(&ast);
        assert_eq!(roles(&graph, "n0"), vec!["ARG0", "GROUPING", "..."]);
        let bfb = graph
            .nodes
            .iter()
            .find(|n| n.label == "BEFORE FILTER BY")
            .unwrap();
        assert_eq!(roles(&graph, &bfb.id), vec!["FIELD 0"]);
    }

    #[test]
    fn test_nested_call_arguments() {
        let ast = call("concat", vec![binary("+", field("a"), FormulaItem::integer(1)), field("b")]);
        let graph = visualize(&ast);
        assert_eq!(label(&graph, "n0"), "CONCAT(ARG0, ARG1)");
        assert_eq!(roles(&graph, "n0"), vec!["ARG0", "ARG1"]);
        assert_eq!(roles(&graph, "n1"), vec!["LEFT", "RIGHT"]);
    }
}

// ============================================================================
// Serialized forms
// ============================================================================

mod serialized {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_round_trip() {
        let ast = FormulaItem::if_block(
            vec![(binary("in", field("a"), FormulaItem::expression_list(vec![FormulaItem::integer(1)])), field("b"))],
            None,
        );
        let graph = visualize(&ast);
        let json = graph.to_json().unwrap();
        let back: Graph = serde_json::from_str(&json).unwrap();
        assert_eq!(back, graph);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["nodes"][0]["shape"], "pentagon");
        assert!(value["edges"]
            .as_array()
            .unwrap()
            .iter()
            .any(|edge| edge["style"] == "dotted"));
    }

    #[test]
    fn test_dot_lists_every_node_and_edge() {
        let ast = binary("-", field("a"), FormulaItem::integer(2));
        let dot = visualize(&ast).to_dot();
        assert!(dot.starts_with("digraph Formula {\n"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("n0 -> n1 [label=\"LEFT\"];"));
        assert!(dot.contains("n0 -> n2 [label=\"RIGHT\"];"));
        assert_eq!(dot.matches("shape=").count(), 3);
    }
}
