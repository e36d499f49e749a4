//! Formula AST node model.
//!
//! A formula tree is a closed sum type ([`FormulaItem`]) whose children are
//! shared through [`NodeRef`] (`Arc<FormulaItem>`). Nodes are never mutated in
//! place: edits produce new nodes via [`FormulaItem::light_copy`] or the index
//! based rewrites in [`crate::traversal`], and every untouched subtree stays
//! shared by pointer with the original.
//!
//! Structural equality compares tag, own attributes and children. Source
//! position and original text live in [`NodeMeta`] and never participate in
//! equality.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Shared pointer to a node. Identity is `Arc::ptr_eq`.
pub type NodeRef = Arc<FormulaItem>;

/// Character span of a node in the formula source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub start: usize,
    pub end: usize,
}

impl Position {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Both ends are inclusive.
    pub fn covers(&self, pos: usize) -> bool {
        self.start <= pos && pos <= self.end
    }
}

/// Diagnostic metadata carried by every node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
}

// Metadata never participates in structural equality.
impl PartialEq for NodeMeta {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl NodeMeta {
    pub fn at(position: Position, original_text: impl Into<String>) -> Self {
        Self {
            position: Some(position),
            original_text: Some(original_text.into()),
        }
    }
}

/// Root node: wraps one expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    pub expr: NodeRef,
    #[serde(default)]
    pub meta: NodeMeta,
}

/// Named field reference, written `[name]` in formulas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default)]
    pub meta: NodeMeta,
}

/// Literal values, one tag per literal kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LiteralValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Date(NaiveDate),
    Datetime(NaiveDateTime),
    DatetimeTz { value: NaiveDateTime, timezone: String },
    GenericDatetime(NaiveDateTime),
    Geopoint(String),
    Geopolygon(String),
    Uuid(Uuid),
    ArrayInt(Vec<i64>),
    ArrayFloat(Vec<f64>),
    ArrayStr(Vec<String>),
    TreeStr(Vec<String>),
}

impl LiteralValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            LiteralValue::Integer(_) => "LiteralInteger",
            LiteralValue::Float(_) => "LiteralFloat",
            LiteralValue::Boolean(_) => "LiteralBoolean",
            LiteralValue::String(_) => "LiteralString",
            LiteralValue::Date(_) => "LiteralDate",
            LiteralValue::Datetime(_) => "LiteralDatetime",
            LiteralValue::DatetimeTz { .. } => "LiteralDatetimeTZ",
            LiteralValue::GenericDatetime(_) => "LiteralGenericDatetime",
            LiteralValue::Geopoint(_) => "LiteralGeopoint",
            LiteralValue::Geopolygon(_) => "LiteralGeopolygon",
            LiteralValue::Uuid(_) => "LiteralUuid",
            LiteralValue::ArrayInt(_) => "LiteralArrayInteger",
            LiteralValue::ArrayFloat(_) => "LiteralArrayFloat",
            LiteralValue::ArrayStr(_) => "LiteralArrayString",
            LiteralValue::TreeStr(_) => "LiteralTreeString",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub value: LiteralValue,
    #[serde(default)]
    pub meta: NodeMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Null {
    #[serde(default)]
    pub meta: NodeMeta,
}

/// Ordered list of expressions, e.g. the right side of `IN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionList {
    pub items: Vec<NodeRef>,
    #[serde(default)]
    pub meta: NodeMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncCall {
    pub name: String,
    pub args: Vec<NodeRef>,
    #[serde(default)]
    pub meta: NodeMeta,
}

/// A window function call.
///
/// Children are ordered as `args..., [ordering], grouping, ignore_dimensions,
/// before_filter_by`. The last three always exist; constructors materialize
/// defaults (`TOTAL`, no ignored dimensions, empty filter list).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowFuncCall {
    pub name: String,
    pub args: Vec<NodeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordering: Option<NodeRef>,
    pub grouping: NodeRef,
    pub ignore_dimensions: NodeRef,
    pub before_filter_by: NodeRef,
    #[serde(default)]
    pub meta: NodeMeta,
}

/// Operator application with a fixed number of operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    pub name: String,
    pub operands: Vec<NodeRef>,
    #[serde(default)]
    pub meta: NodeMeta,
}

/// `IF c1 THEN e1 ELSEIF c2 THEN e2 ... ELSE e END`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfBlock {
    pub if_list: Vec<NodeRef>,
    pub else_expr: NodeRef,
    #[serde(default)]
    pub meta: NodeMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfPart {
    pub cond: NodeRef,
    pub expr: NodeRef,
    #[serde(default)]
    pub meta: NodeMeta,
}

/// `CASE x WHEN v1 THEN e1 ... ELSE e END`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseBlock {
    pub case_expr: NodeRef,
    pub when_list: Vec<NodeRef>,
    pub else_expr: NodeRef,
    #[serde(default)]
    pub meta: NodeMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhenPart {
    pub value: NodeRef,
    pub expr: NodeRef,
    #[serde(default)]
    pub meta: NodeMeta,
}

/// `ORDER BY` clause of a window call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ordering {
    pub items: Vec<NodeRef>,
    #[serde(default)]
    pub meta: NodeMeta,
}

/// Names of filters the window must be computed before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeforeFilterBy {
    pub field_names: BTreeSet<String>,
    #[serde(default)]
    pub meta: NodeMeta,
}

/// Dimensions excluded from the window's level of detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgnoreDimensions {
    pub dims: Vec<NodeRef>,
    #[serde(default)]
    pub meta: NodeMeta,
}

/// Partitioning of a window call; `TOTAL` carries no dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowGrouping {
    pub dims: Vec<NodeRef>,
    #[serde(default)]
    pub meta: NodeMeta,
}

/// Single-child wrapper shared by parentheses and ordering direction nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wrapper {
    pub expr: NodeRef,
    #[serde(default)]
    pub meta: NodeMeta,
}

/// A formula AST node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum FormulaItem {
    Formula(Formula),
    Field(Field),
    Literal(Literal),
    Null(Null),
    ExpressionList(ExpressionList),
    FuncCall(FuncCall),
    WindowFuncCall(WindowFuncCall),
    Unary(Operator),
    Binary(Operator),
    Ternary(Operator),
    IfBlock(IfBlock),
    IfPart(IfPart),
    CaseBlock(CaseBlock),
    WhenPart(WhenPart),
    Ordering(Ordering),
    BeforeFilterBy(BeforeFilterBy),
    IgnoreDimensions(IgnoreDimensions),
    WindowGroupingTotal(WindowGrouping),
    WindowGroupingWithin(WindowGrouping),
    WindowGroupingAmong(WindowGrouping),
    ParenthesizedExpr(Wrapper),
    OrderAscending(Wrapper),
    OrderDescending(Wrapper),
}

impl FormulaItem {
    // ------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------

    pub fn formula(expr: NodeRef) -> NodeRef {
        Arc::new(FormulaItem::Formula(Formula {
            expr,
            meta: NodeMeta::default(),
        }))
    }

    pub fn field(name: impl Into<String>) -> NodeRef {
        Arc::new(FormulaItem::Field(Field {
            name: name.into(),
            meta: NodeMeta::default(),
        }))
    }

    pub fn literal(value: LiteralValue) -> NodeRef {
        Arc::new(FormulaItem::Literal(Literal {
            value,
            meta: NodeMeta::default(),
        }))
    }

    pub fn integer(value: i64) -> NodeRef {
        Self::literal(LiteralValue::Integer(value))
    }

    pub fn float(value: f64) -> NodeRef {
        Self::literal(LiteralValue::Float(value))
    }

    pub fn boolean(value: bool) -> NodeRef {
        Self::literal(LiteralValue::Boolean(value))
    }

    pub fn string(value: impl Into<String>) -> NodeRef {
        Self::literal(LiteralValue::String(value.into()))
    }

    pub fn date(value: NaiveDate) -> NodeRef {
        Self::literal(LiteralValue::Date(value))
    }

    pub fn datetime(value: NaiveDateTime) -> NodeRef {
        Self::literal(LiteralValue::Datetime(value))
    }

    pub fn null() -> NodeRef {
        Arc::new(FormulaItem::Null(Null {
            meta: NodeMeta::default(),
        }))
    }

    pub fn expression_list(items: Vec<NodeRef>) -> NodeRef {
        Arc::new(FormulaItem::ExpressionList(ExpressionList {
            items,
            meta: NodeMeta::default(),
        }))
    }

    pub fn func(name: impl Into<String>, args: Vec<NodeRef>) -> NodeRef {
        Arc::new(FormulaItem::FuncCall(FuncCall {
            name: name.into(),
            args,
            meta: NodeMeta::default(),
        }))
    }

    /// Window call with defaulted grouping, ignore-dimensions and before-filter-by.
    pub fn window(name: impl Into<String>, args: Vec<NodeRef>) -> NodeRef {
        Self::window_with(name, args, None, None)
    }

    /// Window call with explicit grouping and/or ordering.
    pub fn window_with(
        name: impl Into<String>,
        args: Vec<NodeRef>,
        grouping: Option<NodeRef>,
        ordering: Option<NodeRef>,
    ) -> NodeRef {
        Arc::new(FormulaItem::WindowFuncCall(WindowFuncCall {
            name: name.into(),
            args,
            ordering,
            grouping: grouping.unwrap_or_else(Self::grouping_total),
            ignore_dimensions: Self::ignore_dimensions(Vec::new()),
            before_filter_by: Self::before_filter_by(BTreeSet::new()),
            meta: NodeMeta::default(),
        }))
    }

    pub fn unary(name: impl Into<String>, operand: NodeRef) -> NodeRef {
        Arc::new(FormulaItem::Unary(Operator {
            name: name.into(),
            operands: vec![operand],
            meta: NodeMeta::default(),
        }))
    }

    pub fn binary(name: impl Into<String>, left: NodeRef, right: NodeRef) -> NodeRef {
        Arc::new(FormulaItem::Binary(Operator {
            name: name.into(),
            operands: vec![left, right],
            meta: NodeMeta::default(),
        }))
    }

    pub fn ternary(name: impl Into<String>, first: NodeRef, second: NodeRef, third: NodeRef) -> NodeRef {
        Arc::new(FormulaItem::Ternary(Operator {
            name: name.into(),
            operands: vec![first, second, third],
            meta: NodeMeta::default(),
        }))
    }

    /// `IF` block from `(condition, expression)` pairs; a missing else becomes `NULL`.
    pub fn if_block(parts: Vec<(NodeRef, NodeRef)>, else_expr: Option<NodeRef>) -> NodeRef {
        let if_list = parts
            .into_iter()
            .map(|(cond, expr)| {
                Arc::new(FormulaItem::IfPart(IfPart {
                    cond,
                    expr,
                    meta: NodeMeta::default(),
                }))
            })
            .collect();
        Arc::new(FormulaItem::IfBlock(IfBlock {
            if_list,
            else_expr: else_expr.unwrap_or_else(Self::null),
            meta: NodeMeta::default(),
        }))
    }

    /// `CASE` block from `(value, expression)` pairs; a missing else becomes `NULL`.
    pub fn case_block(
        case_expr: NodeRef,
        parts: Vec<(NodeRef, NodeRef)>,
        else_expr: Option<NodeRef>,
    ) -> NodeRef {
        let when_list = parts
            .into_iter()
            .map(|(value, expr)| {
                Arc::new(FormulaItem::WhenPart(WhenPart {
                    value,
                    expr,
                    meta: NodeMeta::default(),
                }))
            })
            .collect();
        Arc::new(FormulaItem::CaseBlock(CaseBlock {
            case_expr,
            when_list,
            else_expr: else_expr.unwrap_or_else(Self::null),
            meta: NodeMeta::default(),
        }))
    }

    pub fn ordering(items: Vec<NodeRef>) -> NodeRef {
        Arc::new(FormulaItem::Ordering(Ordering {
            items,
            meta: NodeMeta::default(),
        }))
    }

    pub fn before_filter_by(field_names: BTreeSet<String>) -> NodeRef {
        Arc::new(FormulaItem::BeforeFilterBy(BeforeFilterBy {
            field_names,
            meta: NodeMeta::default(),
        }))
    }

    pub fn ignore_dimensions(dims: Vec<NodeRef>) -> NodeRef {
        Arc::new(FormulaItem::IgnoreDimensions(IgnoreDimensions {
            dims,
            meta: NodeMeta::default(),
        }))
    }

    pub fn grouping_total() -> NodeRef {
        Arc::new(FormulaItem::WindowGroupingTotal(WindowGrouping {
            dims: Vec::new(),
            meta: NodeMeta::default(),
        }))
    }

    pub fn grouping_within(dims: Vec<NodeRef>) -> NodeRef {
        Arc::new(FormulaItem::WindowGroupingWithin(WindowGrouping {
            dims,
            meta: NodeMeta::default(),
        }))
    }

    pub fn grouping_among(dims: Vec<NodeRef>) -> NodeRef {
        Arc::new(FormulaItem::WindowGroupingAmong(WindowGrouping {
            dims,
            meta: NodeMeta::default(),
        }))
    }

    pub fn parenthesized(expr: NodeRef) -> NodeRef {
        Arc::new(FormulaItem::ParenthesizedExpr(Wrapper {
            expr,
            meta: NodeMeta::default(),
        }))
    }

    pub fn asc(expr: NodeRef) -> NodeRef {
        Arc::new(FormulaItem::OrderAscending(Wrapper {
            expr,
            meta: NodeMeta::default(),
        }))
    }

    pub fn desc(expr: NodeRef) -> NodeRef {
        Arc::new(FormulaItem::OrderDescending(Wrapper {
            expr,
            meta: NodeMeta::default(),
        }))
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Tag name of this node.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FormulaItem::Formula(_) => "Formula",
            FormulaItem::Field(_) => "Field",
            FormulaItem::Literal(l) => l.value.kind_name(),
            FormulaItem::Null(_) => "Null",
            FormulaItem::ExpressionList(_) => "ExpressionList",
            FormulaItem::FuncCall(_) => "FuncCall",
            FormulaItem::WindowFuncCall(_) => "WindowFuncCall",
            FormulaItem::Unary(_) => "Unary",
            FormulaItem::Binary(_) => "Binary",
            FormulaItem::Ternary(_) => "Ternary",
            FormulaItem::IfBlock(_) => "IfBlock",
            FormulaItem::IfPart(_) => "IfPart",
            FormulaItem::CaseBlock(_) => "CaseBlock",
            FormulaItem::WhenPart(_) => "WhenPart",
            FormulaItem::Ordering(_) => "Ordering",
            FormulaItem::BeforeFilterBy(_) => "BeforeFilterBy",
            FormulaItem::IgnoreDimensions(_) => "IgnoreDimensions",
            FormulaItem::WindowGroupingTotal(_) => "WindowGroupingTotal",
            FormulaItem::WindowGroupingWithin(_) => "WindowGroupingWithin",
            FormulaItem::WindowGroupingAmong(_) => "WindowGroupingAmong",
            FormulaItem::ParenthesizedExpr(_) => "ParenthesizedExpr",
            FormulaItem::OrderAscending(_) => "OrderAscending",
            FormulaItem::OrderDescending(_) => "OrderDescending",
        }
    }

    pub fn meta(&self) -> &NodeMeta {
        match self {
            FormulaItem::Formula(n) => &n.meta,
            FormulaItem::Field(n) => &n.meta,
            FormulaItem::Literal(n) => &n.meta,
            FormulaItem::Null(n) => &n.meta,
            FormulaItem::ExpressionList(n) => &n.meta,
            FormulaItem::FuncCall(n) => &n.meta,
            FormulaItem::WindowFuncCall(n) => &n.meta,
            FormulaItem::Unary(n) | FormulaItem::Binary(n) | FormulaItem::Ternary(n) => &n.meta,
            FormulaItem::IfBlock(n) => &n.meta,
            FormulaItem::IfPart(n) => &n.meta,
            FormulaItem::CaseBlock(n) => &n.meta,
            FormulaItem::WhenPart(n) => &n.meta,
            FormulaItem::Ordering(n) => &n.meta,
            FormulaItem::BeforeFilterBy(n) => &n.meta,
            FormulaItem::IgnoreDimensions(n) => &n.meta,
            FormulaItem::WindowGroupingTotal(n)
            | FormulaItem::WindowGroupingWithin(n)
            | FormulaItem::WindowGroupingAmong(n) => &n.meta,
            FormulaItem::ParenthesizedExpr(n)
            | FormulaItem::OrderAscending(n)
            | FormulaItem::OrderDescending(n) => &n.meta,
        }
    }

    fn meta_mut(&mut self) -> &mut NodeMeta {
        match self {
            FormulaItem::Formula(n) => &mut n.meta,
            FormulaItem::Field(n) => &mut n.meta,
            FormulaItem::Literal(n) => &mut n.meta,
            FormulaItem::Null(n) => &mut n.meta,
            FormulaItem::ExpressionList(n) => &mut n.meta,
            FormulaItem::FuncCall(n) => &mut n.meta,
            FormulaItem::WindowFuncCall(n) => &mut n.meta,
            FormulaItem::Unary(n) | FormulaItem::Binary(n) | FormulaItem::Ternary(n) => &mut n.meta,
            FormulaItem::IfBlock(n) => &mut n.meta,
            FormulaItem::IfPart(n) => &mut n.meta,
            FormulaItem::CaseBlock(n) => &mut n.meta,
            FormulaItem::WhenPart(n) => &mut n.meta,
            FormulaItem::Ordering(n) => &mut n.meta,
            FormulaItem::BeforeFilterBy(n) => &mut n.meta,
            FormulaItem::IgnoreDimensions(n) => &mut n.meta,
            FormulaItem::WindowGroupingTotal(n)
            | FormulaItem::WindowGroupingWithin(n)
            | FormulaItem::WindowGroupingAmong(n) => &mut n.meta,
            FormulaItem::ParenthesizedExpr(n)
            | FormulaItem::OrderAscending(n)
            | FormulaItem::OrderDescending(n) => &mut n.meta,
        }
    }

    /// Same node with different metadata.
    pub fn with_meta(mut self, meta: NodeMeta) -> Self {
        *self.meta_mut() = meta;
        self
    }

    pub fn position(&self) -> Option<Position> {
        self.meta().position
    }

    pub fn original_text(&self) -> Option<&str> {
        self.meta().original_text.as_deref()
    }

    /// Function or operator name for call-like nodes.
    pub fn call_name(&self) -> Option<&str> {
        match self {
            FormulaItem::FuncCall(f) => Some(&f.name),
            FormulaItem::WindowFuncCall(f) => Some(&f.name),
            FormulaItem::Unary(o) | FormulaItem::Binary(o) | FormulaItem::Ternary(o) => Some(&o.name),
            _ => None,
        }
    }

    /// Operand sub-nodes in their fixed, tag-specific order.
    pub fn children(&self) -> Vec<&NodeRef> {
        match self {
            FormulaItem::Formula(n) => vec![&n.expr],
            FormulaItem::Field(_)
            | FormulaItem::Literal(_)
            | FormulaItem::Null(_)
            | FormulaItem::BeforeFilterBy(_) => Vec::new(),
            FormulaItem::ExpressionList(n) => n.items.iter().collect(),
            FormulaItem::FuncCall(n) => n.args.iter().collect(),
            FormulaItem::WindowFuncCall(n) => {
                let mut out: Vec<&NodeRef> = n.args.iter().collect();
                out.extend(n.ordering.iter());
                out.push(&n.grouping);
                out.push(&n.ignore_dimensions);
                out.push(&n.before_filter_by);
                out
            }
            FormulaItem::Unary(n) | FormulaItem::Binary(n) | FormulaItem::Ternary(n) => {
                n.operands.iter().collect()
            }
            FormulaItem::IfBlock(n) => {
                let mut out: Vec<&NodeRef> = n.if_list.iter().collect();
                out.push(&n.else_expr);
                out
            }
            FormulaItem::IfPart(n) => vec![&n.cond, &n.expr],
            FormulaItem::CaseBlock(n) => {
                let mut out = vec![&n.case_expr];
                out.extend(n.when_list.iter());
                out.push(&n.else_expr);
                out
            }
            FormulaItem::WhenPart(n) => vec![&n.value, &n.expr],
            FormulaItem::Ordering(n) => n.items.iter().collect(),
            FormulaItem::IgnoreDimensions(n) => n.dims.iter().collect(),
            FormulaItem::WindowGroupingTotal(n)
            | FormulaItem::WindowGroupingWithin(n)
            | FormulaItem::WindowGroupingAmong(n) => n.dims.iter().collect(),
            FormulaItem::ParenthesizedExpr(n)
            | FormulaItem::OrderAscending(n)
            | FormulaItem::OrderDescending(n) => vec![&n.expr],
        }
    }

    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    /// Rebuild this node with new direct children, keeping tag, attributes and metadata.
    pub fn light_copy(&self, children: Vec<NodeRef>) -> Result<FormulaItem> {
        let expected = self.child_count();
        if children.len() != expected {
            return Err(Error::arity(self.kind_name(), expected, children.len()));
        }
        let node = self.kind_name();
        let mut children = children;

        Ok(match self {
            FormulaItem::Formula(n) => FormulaItem::Formula(Formula {
                expr: pop(&mut children, node)?,
                meta: n.meta.clone(),
            }),
            FormulaItem::Field(_)
            | FormulaItem::Literal(_)
            | FormulaItem::Null(_)
            | FormulaItem::BeforeFilterBy(_) => self.clone(),
            FormulaItem::ExpressionList(n) => FormulaItem::ExpressionList(ExpressionList {
                items: children,
                meta: n.meta.clone(),
            }),
            FormulaItem::FuncCall(n) => FormulaItem::FuncCall(FuncCall {
                name: n.name.clone(),
                args: children,
                meta: n.meta.clone(),
            }),
            FormulaItem::WindowFuncCall(n) => {
                let before_filter_by = pop(&mut children, node)?;
                let ignore_dimensions = pop(&mut children, node)?;
                let grouping = pop(&mut children, node)?;
                let ordering = match n.ordering {
                    Some(_) => Some(pop(&mut children, node)?),
                    None => None,
                };
                FormulaItem::WindowFuncCall(WindowFuncCall {
                    name: n.name.clone(),
                    args: children,
                    ordering,
                    grouping,
                    ignore_dimensions,
                    before_filter_by,
                    meta: n.meta.clone(),
                })
            }
            FormulaItem::Unary(n) => FormulaItem::Unary(n.with_operands(children)),
            FormulaItem::Binary(n) => FormulaItem::Binary(n.with_operands(children)),
            FormulaItem::Ternary(n) => FormulaItem::Ternary(n.with_operands(children)),
            FormulaItem::IfBlock(n) => {
                let else_expr = pop(&mut children, node)?;
                FormulaItem::IfBlock(IfBlock {
                    if_list: children,
                    else_expr,
                    meta: n.meta.clone(),
                })
            }
            FormulaItem::IfPart(n) => {
                let expr = pop(&mut children, node)?;
                let cond = pop(&mut children, node)?;
                FormulaItem::IfPart(IfPart {
                    cond,
                    expr,
                    meta: n.meta.clone(),
                })
            }
            FormulaItem::CaseBlock(n) => {
                let else_expr = pop(&mut children, node)?;
                let when_list = children.split_off(1);
                let case_expr = pop(&mut children, node)?;
                FormulaItem::CaseBlock(CaseBlock {
                    case_expr,
                    when_list,
                    else_expr,
                    meta: n.meta.clone(),
                })
            }
            FormulaItem::WhenPart(n) => {
                let expr = pop(&mut children, node)?;
                let value = pop(&mut children, node)?;
                FormulaItem::WhenPart(WhenPart {
                    value,
                    expr,
                    meta: n.meta.clone(),
                })
            }
            FormulaItem::Ordering(n) => FormulaItem::Ordering(Ordering {
                items: children,
                meta: n.meta.clone(),
            }),
            FormulaItem::IgnoreDimensions(n) => FormulaItem::IgnoreDimensions(IgnoreDimensions {
                dims: children,
                meta: n.meta.clone(),
            }),
            FormulaItem::WindowGroupingTotal(n) => {
                FormulaItem::WindowGroupingTotal(n.with_dims(children))
            }
            FormulaItem::WindowGroupingWithin(n) => {
                FormulaItem::WindowGroupingWithin(n.with_dims(children))
            }
            FormulaItem::WindowGroupingAmong(n) => {
                FormulaItem::WindowGroupingAmong(n.with_dims(children))
            }
            FormulaItem::ParenthesizedExpr(n) => {
                FormulaItem::ParenthesizedExpr(n.with_expr(pop(&mut children, node)?))
            }
            FormulaItem::OrderAscending(n) => {
                FormulaItem::OrderAscending(n.with_expr(pop(&mut children, node)?))
            }
            FormulaItem::OrderDescending(n) => {
                FormulaItem::OrderDescending(n.with_expr(pop(&mut children, node)?))
            }
        })
    }

    /// `true` for nodes that configure a window rather than produce a value.
    pub fn is_window_config(&self) -> bool {
        matches!(
            self,
            FormulaItem::Ordering(_)
                | FormulaItem::BeforeFilterBy(_)
                | FormulaItem::IgnoreDimensions(_)
                | FormulaItem::WindowGroupingTotal(_)
                | FormulaItem::WindowGroupingWithin(_)
                | FormulaItem::WindowGroupingAmong(_)
                | FormulaItem::OrderAscending(_)
                | FormulaItem::OrderDescending(_)
        )
    }
}

impl Operator {
    fn with_operands(&self, operands: Vec<NodeRef>) -> Operator {
        Operator {
            name: self.name.clone(),
            operands,
            meta: self.meta.clone(),
        }
    }
}

impl WindowGrouping {
    fn with_dims(&self, dims: Vec<NodeRef>) -> WindowGrouping {
        WindowGrouping {
            dims,
            meta: self.meta.clone(),
        }
    }
}

impl Wrapper {
    fn with_expr(&self, expr: NodeRef) -> Wrapper {
        Wrapper {
            expr,
            meta: self.meta.clone(),
        }
    }
}

fn pop(children: &mut Vec<NodeRef>, node: &'static str) -> Result<NodeRef> {
    children.pop().ok_or_else(|| Error::arity(node, 1, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NodeRef {
        FormulaItem::formula(FormulaItem::binary(
            "+",
            FormulaItem::field("a"),
            FormulaItem::func("abs", vec![FormulaItem::integer(-1)]),
        ))
    }

    fn owned(children: Vec<&NodeRef>) -> Vec<NodeRef> {
        children.into_iter().cloned().collect()
    }

    #[test]
    fn test_equality_ignores_meta() {
        let plain = FormulaItem::field("a");
        let located = (*FormulaItem::field("a"))
            .clone()
            .with_meta(NodeMeta::at(Position::new(0, 3), "[a]"));
        assert_eq!(*plain, located);
        assert_eq!(located.position(), Some(Position::new(0, 3)));
        assert_eq!(located.original_text(), Some("[a]"));
    }

    #[test]
    fn test_equality_is_order_sensitive() {
        let ab = FormulaItem::binary("-", FormulaItem::field("a"), FormulaItem::field("b"));
        let ba = FormulaItem::binary("-", FormulaItem::field("b"), FormulaItem::field("a"));
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_light_copy_with_own_children_is_equal() {
        let root = sample();
        let copy = root.light_copy(owned(root.children())).unwrap();
        assert_eq!(*root, copy);
    }

    #[test]
    fn test_light_copy_arity_error() {
        let root = sample();
        let err = root.light_copy(Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::Arity {
                node: "Formula",
                expected: 1,
                actual: 0
            }
        ));
    }

    #[test]
    fn test_window_defaults_materialized() {
        let call = FormulaItem::window("sum", vec![FormulaItem::field("x")]);
        let kinds: Vec<_> = call.children().iter().map(|c| c.kind_name()).collect();
        assert_eq!(
            kinds,
            vec!["Field", "WindowGroupingTotal", "IgnoreDimensions", "BeforeFilterBy"]
        );
    }

    #[test]
    fn test_window_light_copy_keeps_slots() {
        let call = FormulaItem::window_with(
            "rsum",
            vec![FormulaItem::field("x")],
            Some(FormulaItem::grouping_within(vec![FormulaItem::field("d")])),
            Some(FormulaItem::ordering(vec![FormulaItem::desc(FormulaItem::field("t"))])),
        );
        let copy = call.light_copy(owned(call.children())).unwrap();
        assert_eq!(*call, copy);
        match copy {
            FormulaItem::WindowFuncCall(w) => {
                assert_eq!(w.args.len(), 1);
                assert!(w.ordering.is_some());
                assert_eq!(w.grouping.kind_name(), "WindowGroupingWithin");
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn test_case_block_children_order() {
        let case = FormulaItem::case_block(
            FormulaItem::field("x"),
            vec![(FormulaItem::integer(1), FormulaItem::string("one"))],
            None,
        );
        let kinds: Vec<_> = case.children().iter().map(|c| c.kind_name()).collect();
        assert_eq!(kinds, vec!["Field", "WhenPart", "Null"]);
        let copy = case.light_copy(owned(case.children())).unwrap();
        assert_eq!(*case, copy);
    }

    #[test]
    fn test_serde_round_trip() {
        let root = sample();
        let json = serde_json::to_string(&root).unwrap();
        let back: NodeRef = serde_json::from_str(&json).unwrap();
        assert_eq!(root, back);
    }
}
