//! Common test utilities: tree builders, a proptest strategy for formula
//! trees and a small three-valued evaluator for compiled predicates.

#![allow(dead_code)]

use std::collections::HashMap;

use formula_sql::sql::{BinaryOp, SqlExpr, SqlLiteral, UnaryOp};
use formula_sql::{DataType, FormulaItem, NodeRef};
use proptest::prelude::*;

/// Install a test-writer subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn field_types(pairs: &[(&str, DataType)]) -> HashMap<String, DataType> {
    pairs
        .iter()
        .map(|(name, t)| (name.to_string(), *t))
        .collect()
}

pub fn field(name: &str) -> NodeRef {
    FormulaItem::field(name)
}

pub fn call(name: &str, args: Vec<NodeRef>) -> NodeRef {
    FormulaItem::func(name, args)
}

pub fn binary(op: &str, left: NodeRef, right: NodeRef) -> NodeRef {
    FormulaItem::binary(op, left, right)
}

// ============================================================================
// Tree strategy
// ============================================================================

fn leaf() -> impl Strategy<Value = NodeRef> {
    prop_oneof![
        "[a-e]".prop_map(|name| FormulaItem::field(name)),
        (-100i64..100).prop_map(FormulaItem::integer),
        "[a-z]{0,4}".prop_map(|s| FormulaItem::string(s)),
        any::<bool>().prop_map(FormulaItem::boolean),
        Just(()).prop_map(|_| FormulaItem::null()),
    ]
}

/// Arbitrary formula trees covering every container kind.
pub fn arb_tree() -> impl Strategy<Value = NodeRef> {
    leaf().prop_recursive(4, 40, 4, |inner| {
        prop_oneof![
            (
                prop::sample::select(vec!["+", "-", "==", "and", "in"]),
                inner.clone(),
                inner.clone()
            )
                .prop_map(|(op, l, r)| FormulaItem::binary(op, l, r)),
            inner
                .clone()
                .prop_map(|operand| FormulaItem::unary("not", operand)),
            (
                prop::sample::select(vec!["abs", "concat", "if"]),
                prop::collection::vec(inner.clone(), 0..4)
            )
                .prop_map(|(name, args)| FormulaItem::func(name, args)),
            prop::collection::vec(inner.clone(), 1..4).prop_map(|args| FormulaItem::window("sum", args)),
            (
                prop::collection::vec((inner.clone(), inner.clone()), 1..3),
                prop::option::of(inner.clone())
            )
                .prop_map(|(parts, otherwise)| FormulaItem::if_block(parts, otherwise)),
            (
                inner.clone(),
                prop::collection::vec((inner.clone(), inner.clone()), 1..3)
            )
                .prop_map(|(subject, parts)| FormulaItem::case_block(subject, parts, None)),
            prop::collection::vec(inner.clone(), 0..3).prop_map(FormulaItem::expression_list),
            inner.clone().prop_map(FormulaItem::parenthesized),
        ]
    })
}

// ============================================================================
// Three-valued evaluation
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Str(String),
    Bool(bool),
}

impl Value {
    fn truth(&self) -> Option<bool> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::Str(_) => panic!("string used as a truth value"),
        }
    }
}

fn from_truth(truth: Option<bool>) -> Value {
    truth.map_or(Value::Null, Value::Bool)
}

/// Evaluate the subset of SQL the null-safe comparisons compile to.
///
/// Columns are looked up by their last name part in `row`.
pub fn eval(expr: &SqlExpr, row: &HashMap<&str, Value>) -> Value {
    match expr {
        SqlExpr::Null => Value::Null,
        SqlExpr::Literal { value } => match value {
            SqlLiteral::Integer(v) => Value::Int(*v),
            SqlLiteral::Boolean(v) => Value::Bool(*v),
            SqlLiteral::String(v) => Value::Str(v.clone()),
            other => panic!("unsupported literal {other:?}"),
        },
        SqlExpr::Column { parts } => {
            let name = parts.last().map(String::as_str).unwrap_or_default();
            row.get(name).cloned().unwrap_or(Value::Null)
        }
        SqlExpr::Cast { expr, .. } => eval(expr, row),
        SqlExpr::Function { name, args, .. } => match name.to_ascii_lowercase().as_str() {
            "coalesce" | "ifnull" => args
                .iter()
                .map(|arg| eval(arg, row))
                .find(|v| *v != Value::Null)
                .unwrap_or(Value::Null),
            "isnull" => Value::Bool(eval(&args[0], row) == Value::Null),
            other => panic!("unsupported function {other}"),
        },
        SqlExpr::IsNull { expr, negated } => {
            let is_null = eval(expr, row) == Value::Null;
            Value::Bool(is_null != *negated)
        }
        SqlExpr::Unary {
            op: UnaryOp::Not,
            operand,
        } => from_truth(eval(operand, row).truth().map(|b| !b)),
        SqlExpr::Binary { op, left, right } => {
            let l = eval(left, row);
            let r = eval(right, row);
            match op {
                BinaryOp::And => match (l.truth(), r.truth()) {
                    (Some(false), _) | (_, Some(false)) => Value::Bool(false),
                    (Some(true), Some(true)) => Value::Bool(true),
                    _ => Value::Null,
                },
                BinaryOp::Or => match (l.truth(), r.truth()) {
                    (Some(true), _) | (_, Some(true)) => Value::Bool(true),
                    (Some(false), Some(false)) => Value::Bool(false),
                    _ => Value::Null,
                },
                BinaryOp::Eq | BinaryOp::NotEq => {
                    if l == Value::Null || r == Value::Null {
                        Value::Null
                    } else {
                        Value::Bool((l == r) == (*op == BinaryOp::Eq))
                    }
                }
                other => panic!("unsupported operator {other:?}"),
            }
        }
        other => panic!("unsupported expression {other:?}"),
    }
}
