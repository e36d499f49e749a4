use std::sync::Arc;

use tracing::trace;

use crate::definitions::OperationRegistry;
use crate::error::Result;
use crate::nodes::{FormulaItem, NodeRef};
use crate::traversal::FormulaWalk;

fn is_window_only_call(node: &NodeRef, registry: &OperationRegistry) -> bool {
    matches!(node.as_ref(), FormulaItem::FuncCall(call) if registry.is_window_only(&call.name))
}

fn to_window_call(node: &NodeRef) -> NodeRef {
    let FormulaItem::FuncCall(call) = node.as_ref() else {
        return Arc::clone(node);
    };
    trace!(function = %call.name, "promoting call to window function");
    let window = FormulaItem::window(call.name.clone(), call.args.clone());
    Arc::new(window.as_ref().clone().with_meta(call.meta.clone()))
}

/// Rewrite plain calls of window-only functions (`rsum(x)`, `rank(x)`) into
/// [`FormulaItem::WindowFuncCall`] nodes with default grouping, no ignored
/// dimensions and an empty before-filter-by list.
///
/// Returns the input tree itself when it holds no such call.
pub fn normalize_window_calls(ast: &NodeRef, registry: &OperationRegistry) -> Result<NodeRef> {
    let rewritten = ast.replace_nodes(
        &|node: &NodeRef, _: &[NodeRef]| is_window_only_call(node, registry),
        &|node: &NodeRef, _: &[NodeRef]| Ok(to_window_call(node)),
    )?;
    if is_window_only_call(&rewritten, registry) {
        return Ok(to_window_call(&rewritten));
    }
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_only_calls_are_promoted() {
        let registry = OperationRegistry::global();
        let ast = FormulaItem::binary(
            "+",
            FormulaItem::func("rsum", vec![FormulaItem::field("x")]),
            FormulaItem::func("sum", vec![FormulaItem::field("x")]),
        );
        let normalized = normalize_window_calls(&ast, registry).unwrap();
        let FormulaItem::Binary(op) = normalized.as_ref() else {
            panic!("expected binary operator");
        };
        assert!(matches!(op.operands[0].as_ref(), FormulaItem::WindowFuncCall(_)));
        assert!(matches!(op.operands[1].as_ref(), FormulaItem::FuncCall(_)));
        assert!(Arc::ptr_eq(&op.operands[1], ast.children()[1]));
    }

    #[test]
    fn test_root_call_is_promoted() {
        let registry = OperationRegistry::global();
        let ast = FormulaItem::func("rank", vec![FormulaItem::field("x")]);
        let normalized = normalize_window_calls(&ast, registry).unwrap();
        assert_eq!(normalized, FormulaItem::window("rank", vec![FormulaItem::field("x")]));
    }

    #[test]
    fn test_tree_without_window_calls_is_shared() {
        let registry = OperationRegistry::global();
        let ast = FormulaItem::func("abs", vec![FormulaItem::integer(-1)]);
        let normalized = normalize_window_calls(&ast, registry).unwrap();
        assert!(Arc::ptr_eq(&ast, &normalized));
    }
}
