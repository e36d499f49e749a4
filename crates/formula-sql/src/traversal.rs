//! Traversal, addressing and rewriting of formula trees.
//!
//! Every node of a tree is addressable by a [`NodeHierarchyIndex`]: the path
//! of child positions from the root, following the order of
//! [`FormulaItem::children`]. The root lives at the empty index.
//!
//! # Traversal
//!
//! [`EnumerateIter`] walks a tree depth-first in pre-order and yields
//! `(index, node)` pairs. It is available through [`FormulaWalk::enumerate`]
//! and, depth-limited, through [`FormulaWalk::enumerate_with`].
//!
//! # Rewriting
//!
//! [`FormulaWalk::replace_at_index`] and [`FormulaWalk::substitute_batch`]
//! rebuild only the ancestors of the replaced nodes. Every other subtree of
//! the result is the very same `Arc` as in the input tree.
//! [`FormulaWalk::replace_nodes`] performs a bottom-up conditional rewrite.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::nodes::{FormulaItem, NodeRef};

/// Path of child positions from the root to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHierarchyIndex(Vec<usize>);

impl NodeHierarchyIndex {
    /// The root index.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Index of the `i`-th child of this node.
    pub fn child(&self, i: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(i);
        Self(indices)
    }

    /// Split off the first step: `0.2.1` becomes `(0, 2.1)`.
    pub fn lsplit(&self) -> Option<(usize, NodeHierarchyIndex)> {
        let (head, tail) = self.0.split_first()?;
        Some((*head, Self(tail.to_vec())))
    }

    /// Split off the last step: `0.2.1` becomes `(0.2, 1)`.
    pub fn rsplit(&self) -> Option<(NodeHierarchyIndex, usize)> {
        let (last, init) = self.0.split_last()?;
        Some((Self(init.to_vec()), *last))
    }

    pub fn parent(&self) -> Option<NodeHierarchyIndex> {
        self.rsplit().map(|(parent, _)| parent)
    }

    /// Non-strict prefix test; every index is a prefix of itself.
    pub fn is_prefix_of(&self, other: &NodeHierarchyIndex) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl From<Vec<usize>> for NodeHierarchyIndex {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for NodeHierarchyIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        let parts: Vec<String> = self.0.iter().map(usize::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

/// Depth-first pre-order iterator yielding `(index, node)` pairs.
pub struct EnumerateIter {
    stack: Vec<(NodeHierarchyIndex, NodeRef)>,
    max_depth: Option<usize>,
}

impl EnumerateIter {
    pub fn new(root: &NodeRef, max_depth: Option<usize>) -> Self {
        Self {
            stack: vec![(NodeHierarchyIndex::root(), Arc::clone(root))],
            max_depth,
        }
    }
}

impl Iterator for EnumerateIter {
    type Item = (NodeHierarchyIndex, NodeRef);

    fn next(&mut self) -> Option<Self::Item> {
        let (index, node) = self.stack.pop()?;

        let expand = self.max_depth.map_or(true, |max| index.len() < max);
        if expand {
            // Reverse push so children come out left to right
            for (i, child) in node.children().into_iter().enumerate().rev() {
                self.stack.push((index.child(i), Arc::clone(child)));
            }
        }

        Some((index, node))
    }
}

/// Extension trait adding traversal and rewriting methods to [`NodeRef`].
pub trait FormulaWalk {
    /// Pre-order `(index, node)` pairs over the whole tree, root first.
    fn enumerate(&self) -> EnumerateIter;

    /// Like [`enumerate`](FormulaWalk::enumerate), but never descends below `max_depth`.
    fn enumerate_with(&self, max_depth: usize) -> EnumerateIter;

    /// The node at `index`.
    fn get_by_index(&self, index: &NodeHierarchyIndex) -> Result<NodeRef>;

    /// New root with the node at `index` replaced; off-path nodes are shared.
    fn replace_at_index(&self, index: &NodeHierarchyIndex, replacement: NodeRef) -> Result<NodeRef>;

    /// Apply many non-overlapping point replacements in one pass.
    fn substitute_batch(&self, mapping: BTreeMap<NodeHierarchyIndex, NodeRef>) -> Result<NodeRef>;

    /// Bottom-up rewrite of every node for which `matches(node, parents)` holds.
    ///
    /// Returns the same `Arc` when nothing was replaced.
    fn replace_nodes<M, R>(&self, matches: &M, replace: &R) -> Result<NodeRef>
    where
        M: Fn(&NodeRef, &[NodeRef]) -> bool,
        R: Fn(&NodeRef, &[NodeRef]) -> Result<NodeRef>;

    /// Innermost node whose source span covers `pos`, preferring the rightmost match.
    fn get_by_pos(&self, pos: usize) -> Option<NodeRef>;

    /// Index of `node`, compared by identity.
    fn resolve_index(&self, node: &NodeRef) -> Option<NodeHierarchyIndex>;

    /// New node equal to this one but with a distinct identity; children are shared.
    fn shallow_copy(&self) -> NodeRef;

    fn find<F>(&self, predicate: F) -> Option<NodeRef>
    where
        F: Fn(&FormulaItem) -> bool;

    fn find_all<F>(&self, predicate: F) -> Vec<NodeRef>
    where
        F: Fn(&FormulaItem) -> bool;

    fn contains<F>(&self, predicate: F) -> bool
    where
        F: Fn(&FormulaItem) -> bool;

    fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&FormulaItem) -> bool;

    /// A leaf has depth 0.
    fn tree_depth(&self) -> usize;
}

impl FormulaWalk for NodeRef {
    fn enumerate(&self) -> EnumerateIter {
        EnumerateIter::new(self, None)
    }

    fn enumerate_with(&self, max_depth: usize) -> EnumerateIter {
        EnumerateIter::new(self, Some(max_depth))
    }

    fn get_by_index(&self, index: &NodeHierarchyIndex) -> Result<NodeRef> {
        let mut node = Arc::clone(self);
        for &i in index.indices() {
            let next = node
                .children()
                .get(i)
                .map(|c| Arc::clone(c))
                .ok_or_else(|| Error::index_not_found(index.clone()))?;
            node = next;
        }
        Ok(node)
    }

    fn replace_at_index(&self, index: &NodeHierarchyIndex, replacement: NodeRef) -> Result<NodeRef> {
        replace_at(self, index.indices(), index, replacement)
    }

    fn substitute_batch(&self, mapping: BTreeMap<NodeHierarchyIndex, NodeRef>) -> Result<NodeRef> {
        let keys: Vec<&NodeHierarchyIndex> = mapping.keys().collect();
        // Lexicographic order puts every extension of an index right after it.
        for pair in keys.windows(2) {
            if pair[0].is_prefix_of(pair[1]) {
                return Err(Error::OverlappingSubstitution {
                    outer: pair[0].clone(),
                    inner: pair[1].clone(),
                });
            }
        }
        let entries: Vec<(&[usize], &NodeHierarchyIndex, &NodeRef)> = mapping
            .iter()
            .map(|(index, node)| (index.indices(), index, node))
            .collect();
        substitute(self, &entries)
    }

    fn replace_nodes<M, R>(&self, matches: &M, replace: &R) -> Result<NodeRef>
    where
        M: Fn(&NodeRef, &[NodeRef]) -> bool,
        R: Fn(&NodeRef, &[NodeRef]) -> Result<NodeRef>,
    {
        let mut parents = Vec::new();
        replace_matching(self, matches, replace, &mut parents)
    }

    fn get_by_pos(&self, pos: usize) -> Option<NodeRef> {
        let position = self.position()?;
        if !position.covers(pos) {
            return None;
        }
        self.children()
            .into_iter()
            .filter_map(|child| child.get_by_pos(pos))
            .last()
            .or_else(|| Some(Arc::clone(self)))
    }

    fn resolve_index(&self, node: &NodeRef) -> Option<NodeHierarchyIndex> {
        self.enumerate()
            .find(|(_, candidate)| Arc::ptr_eq(candidate, node))
            .map(|(index, _)| index)
    }

    fn shallow_copy(&self) -> NodeRef {
        Arc::new(FormulaItem::clone(self))
    }

    fn find<F>(&self, predicate: F) -> Option<NodeRef>
    where
        F: Fn(&FormulaItem) -> bool,
    {
        self.enumerate()
            .map(|(_, node)| node)
            .find(|node| predicate(node))
    }

    fn find_all<F>(&self, predicate: F) -> Vec<NodeRef>
    where
        F: Fn(&FormulaItem) -> bool,
    {
        self.enumerate()
            .map(|(_, node)| node)
            .filter(|node| predicate(node))
            .collect()
    }

    fn contains<F>(&self, predicate: F) -> bool
    where
        F: Fn(&FormulaItem) -> bool,
    {
        self.enumerate().any(|(_, node)| predicate(&node))
    }

    fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&FormulaItem) -> bool,
    {
        self.enumerate().filter(|(_, node)| predicate(node)).count()
    }

    fn tree_depth(&self) -> usize {
        self.children()
            .into_iter()
            .map(|child| child.tree_depth() + 1)
            .max()
            .unwrap_or(0)
    }
}

fn owned_children(node: &NodeRef) -> Vec<NodeRef> {
    node.children().into_iter().cloned().collect()
}

fn replace_at(
    node: &NodeRef,
    path: &[usize],
    full: &NodeHierarchyIndex,
    replacement: NodeRef,
) -> Result<NodeRef> {
    let Some((&head, tail)) = path.split_first() else {
        return Ok(replacement);
    };
    let mut children = owned_children(node);
    let child = children
        .get(head)
        .cloned()
        .ok_or_else(|| Error::index_not_found(full.clone()))?;
    children[head] = replace_at(&child, tail, full, replacement)?;
    Ok(Arc::new(node.light_copy(children)?))
}

fn substitute(node: &NodeRef, entries: &[(&[usize], &NodeHierarchyIndex, &NodeRef)]) -> Result<NodeRef> {
    // Non-overlap guarantees a root-level entry is the only one left.
    if let Some((_, _, replacement)) = entries.iter().find(|(path, _, _)| path.is_empty()) {
        return Ok(Arc::clone(replacement));
    }

    let mut children = owned_children(node);
    let mut start = 0;
    while start < entries.len() {
        let head = entries[start].0[0];
        let end = entries[start..]
            .iter()
            .position(|(path, _, _)| path[0] != head)
            .map_or(entries.len(), |offset| start + offset);

        let child = children
            .get(head)
            .cloned()
            .ok_or_else(|| Error::index_not_found(entries[start].1.clone()))?;
        let tails: Vec<(&[usize], &NodeHierarchyIndex, &NodeRef)> = entries[start..end]
            .iter()
            .map(|(path, index, replacement)| (&path[1..], *index, *replacement))
            .collect();
        children[head] = substitute(&child, &tails)?;
        start = end;
    }
    Ok(Arc::new(node.light_copy(children)?))
}

fn replace_matching<M, R>(
    node: &NodeRef,
    matches: &M,
    replace: &R,
    parents: &mut Vec<NodeRef>,
) -> Result<NodeRef>
where
    M: Fn(&NodeRef, &[NodeRef]) -> bool,
    R: Fn(&NodeRef, &[NodeRef]) -> Result<NodeRef>,
{
    let children = owned_children(node);
    if children.is_empty() {
        return Ok(Arc::clone(node));
    }

    parents.push(Arc::clone(node));
    let mut modified = false;
    let mut new_children = Vec::with_capacity(children.len());
    for child in &children {
        let mut current = replace_matching(child, matches, replace, parents)?;
        if matches(&current, parents) {
            current = replace(&current, parents)?;
        }
        if !Arc::ptr_eq(&current, child) {
            modified = true;
        }
        new_children.push(current);
    }
    parents.pop();

    if modified {
        Ok(Arc::new(node.light_copy(new_children)?))
    } else {
        Ok(Arc::clone(node))
    }
}

// ---------------------------------------------------------------------------
// Common node predicates
// ---------------------------------------------------------------------------

pub fn is_field(node: &FormulaItem) -> bool {
    matches!(node, FormulaItem::Field(_))
}

pub fn is_literal(node: &FormulaItem) -> bool {
    matches!(node, FormulaItem::Literal(_) | FormulaItem::Null(_))
}

pub fn is_window_call(node: &FormulaItem) -> bool {
    matches!(node, FormulaItem::WindowFuncCall(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{NodeMeta, Position};

    fn sample() -> NodeRef {
        // [a] + abs(-1) * [b]
        FormulaItem::formula(FormulaItem::binary(
            "+",
            FormulaItem::field("a"),
            FormulaItem::binary(
                "*",
                FormulaItem::func("abs", vec![FormulaItem::integer(-1)]),
                FormulaItem::field("b"),
            ),
        ))
    }

    fn idx(path: &[usize]) -> NodeHierarchyIndex {
        NodeHierarchyIndex::from(path.to_vec())
    }

    #[test]
    fn test_enumerate_pre_order() {
        let root = sample();
        let visited: Vec<(String, &'static str)> = root
            .enumerate()
            .map(|(i, n)| (i.to_string(), n.kind_name()))
            .collect();
        assert_eq!(
            visited,
            vec![
                ("<root>".to_string(), "Formula"),
                ("0".to_string(), "Binary"),
                ("0.0".to_string(), "Field"),
                ("0.1".to_string(), "Binary"),
                ("0.1.0".to_string(), "FuncCall"),
                ("0.1.0.0".to_string(), "LiteralInteger"),
                ("0.1.1".to_string(), "Field"),
            ]
        );
    }

    #[test]
    fn test_enumerate_with_depth_limit() {
        let root = sample();
        assert_eq!(root.enumerate_with(0).count(), 1);
        assert_eq!(root.enumerate_with(2).count(), 4);
    }

    #[test]
    fn test_index_round_trip() {
        let root = sample();
        for (index, node) in root.enumerate() {
            let found = root.get_by_index(&index).unwrap();
            assert!(Arc::ptr_eq(&found, &node));
        }
    }

    #[test]
    fn test_get_by_index_missing() {
        let root = sample();
        let err = root.get_by_index(&idx(&[0, 5])).unwrap_err();
        assert!(matches!(err, Error::IndexNotFound { .. }));
    }

    #[test]
    fn test_replace_at_index_shares_off_path_nodes() {
        let root = sample();
        let target = idx(&[0, 1, 1]);
        let replacement = FormulaItem::field("c");
        let new_root = root.replace_at_index(&target, replacement.clone()).unwrap();

        assert!(Arc::ptr_eq(&new_root.get_by_index(&target).unwrap(), &replacement));
        for off_path in [idx(&[0, 0]), idx(&[0, 1, 0])] {
            assert!(Arc::ptr_eq(
                &new_root.get_by_index(&off_path).unwrap(),
                &root.get_by_index(&off_path).unwrap()
            ));
        }
        assert!(!Arc::ptr_eq(&new_root, &root));
        assert_eq!(*root.get_by_index(&target).unwrap(), *FormulaItem::field("b"));
    }

    #[test]
    fn test_replace_at_root() {
        let root = sample();
        let replacement = FormulaItem::null();
        let new_root = root.replace_at_index(&NodeHierarchyIndex::root(), replacement.clone()).unwrap();
        assert!(Arc::ptr_eq(&new_root, &replacement));
    }

    #[test]
    fn test_substitute_batch_matches_sequential() {
        let root = sample();
        let (i1, r1) = (idx(&[0, 0]), FormulaItem::field("x"));
        let (i2, r2) = (idx(&[0, 1, 0, 0]), FormulaItem::integer(7));

        let batch = root
            .substitute_batch(BTreeMap::from([(i1.clone(), r1.clone()), (i2.clone(), r2.clone())]))
            .unwrap();
        let forward = root
            .replace_at_index(&i1, r1.clone())
            .and_then(|n| n.replace_at_index(&i2, r2.clone()))
            .unwrap();
        let backward = root
            .replace_at_index(&i2, r2)
            .and_then(|n| n.replace_at_index(&i1, r1))
            .unwrap();
        assert_eq!(batch, forward);
        assert_eq!(batch, backward);
    }

    #[test]
    fn test_substitute_batch_rejects_overlap() {
        let root = sample();
        let err = root
            .substitute_batch(BTreeMap::from([
                (idx(&[0, 1]), FormulaItem::null()),
                (idx(&[0, 1, 0]), FormulaItem::null()),
            ]))
            .unwrap_err();
        match err {
            Error::OverlappingSubstitution { outer, inner } => {
                assert_eq!(outer, idx(&[0, 1]));
                assert_eq!(inner, idx(&[0, 1, 0]));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_shallow_copy() {
        let root = sample();
        let copy = root.shallow_copy();
        assert_eq!(copy, root);
        assert!(!Arc::ptr_eq(&copy, &root));
        for (a, b) in copy.children().into_iter().zip(root.children()) {
            assert!(Arc::ptr_eq(a, b));
        }
    }

    #[test]
    fn test_replace_nodes_untouched_returns_same_arc() {
        let root = sample();
        let same = root.replace_nodes(&|_, _| false, &|n, _| Ok(Arc::clone(n))).unwrap();
        assert!(Arc::ptr_eq(&same, &root));
    }

    #[test]
    fn test_replace_nodes_rewrites_fields() {
        let root = sample();
        let renamed = root
            .replace_nodes(&|n, _| is_field(n), &|n, parents| {
                assert!(!parents.is_empty());
                match n.as_ref() {
                    FormulaItem::Field(f) => Ok(FormulaItem::field(format!("t.{}", f.name))),
                    _ => Ok(Arc::clone(n)),
                }
            })
            .unwrap();
        let names: Vec<String> = renamed
            .find_all(is_field)
            .into_iter()
            .filter_map(|n| match n.as_ref() {
                FormulaItem::Field(f) => Some(f.name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["t.a", "t.b"]);
    }

    #[test]
    fn test_get_by_pos_prefers_innermost() {
        // "[a] + 1"
        let left = Arc::new((*FormulaItem::field("a")).clone().with_meta(NodeMeta::at(Position::new(0, 2), "[a]")));
        let right = Arc::new((*FormulaItem::integer(1)).clone().with_meta(NodeMeta::at(Position::new(6, 6), "1")));
        let sum = Arc::new(
            (*FormulaItem::binary("+", Arc::clone(&left), Arc::clone(&right)))
                .clone()
                .with_meta(NodeMeta::at(Position::new(0, 6), "[a] + 1")),
        );

        assert!(Arc::ptr_eq(&sum.get_by_pos(1).unwrap(), &left));
        assert!(Arc::ptr_eq(&sum.get_by_pos(6).unwrap(), &right));
        assert!(Arc::ptr_eq(&sum.get_by_pos(4).unwrap(), &sum));
        assert!(sum.get_by_pos(9).is_none());
    }

    #[test]
    fn test_walk_helpers() {
        let root = sample();
        assert_eq!(root.count(is_field), 2);
        assert!(root.contains(is_literal));
        assert!(!root.contains(is_window_call));
        assert_eq!(root.tree_depth(), 4);
        let abs = root.find(|n| n.call_name() == Some("abs")).unwrap();
        assert_eq!(root.resolve_index(&abs), Some(idx(&[0, 1, 0])));
    }

    #[test]
    fn test_index_splits() {
        let i = idx(&[0, 2, 1]);
        assert_eq!(i.lsplit(), Some((0, idx(&[2, 1]))));
        assert_eq!(i.rsplit(), Some((idx(&[0, 2]), 1)));
        assert_eq!(i.parent(), Some(idx(&[0, 2])));
        assert!(idx(&[0]).is_prefix_of(&i));
        assert!(!idx(&[1]).is_prefix_of(&i));
        assert_eq!(NodeHierarchyIndex::root().lsplit(), None);
    }
}
