//! Graph rendering of formula trees for debugging.
//!
//! [`visualize`] walks a tree once and produces a [`Graph`]: one node per
//! formula node (plus a diamond per `IF`/`WHEN` branch) and one labelled edge
//! per parent/child relation. The graph serializes with serde and renders to
//! Graphviz DOT with [`Graph::to_dot`]. Node ids are assigned in pre-order,
//! so the same tree always yields the same graph.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::nodes::{FormulaItem, LiteralValue, NodeRef};

const FIELD_COLOR: &str = "#e6cccc";
const STRING_COLOR: &str = "#fff6c1";
const INTEGER_COLOR: &str = "#b2dee6";
const FLOAT_COLOR: &str = "#c4b4e6";
const BOOLEAN_COLOR: &str = "#d7e6df";
const NULL_COLOR: &str = "#959595";
const LIST_COLOR: &str = "#bba7fc";
const FUNCTION_COLOR: &str = "#bde6b1";
const OPERATOR_COLOR: &str = "#c2c2c2";
const TOTAL_COLOR: &str = "#bba7fc";
const CLAUSE_COLOR: &str = "#ff898b";
const WRAPPER_COLOR: &str = "#e0e0e0";

const FORMULA_WRAP: usize = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeShape {
    Plaintext,
    Rectangle,
    Oval,
    Hexagon,
    Octagon,
    Pentagon,
    Diamond,
}

impl NodeShape {
    fn as_str(self) -> &'static str {
        match self {
            NodeShape::Plaintext => "plaintext",
            NodeShape::Rectangle => "rectangle",
            NodeShape::Oval => "oval",
            NodeShape::Hexagon => "hexagon",
            NodeShape::Octagon => "octagon",
            NodeShape::Pentagon => "pentagon",
            NodeShape::Diamond => "diamond",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStyle {
    #[default]
    Solid,
    Dotted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub shape: NodeShape,
    /// Fill colour; `None` leaves the node unfilled
    pub fill: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
    #[serde(default)]
    pub style: EdgeStyle,
}

/// A labelled directed graph of one formula tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Outgoing edges of `id`, in insertion order.
    pub fn edges_from<'g>(&'g self, id: &'g str) -> impl Iterator<Item = &'g GraphEdge> + 'g {
        self.edges.iter().filter(move |e| e.from == id)
    }

    /// Serialize for front ends that lay the graph out themselves.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Render as a Graphviz `digraph`.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph Formula {\n");
        for node in &self.nodes {
            let _ = write!(
                out,
                "  {} [label=\"{}\", shape={}",
                node.id,
                escape(&node.label),
                node.shape.as_str()
            );
            if let Some(fill) = &node.fill {
                let _ = write!(out, ", style=filled, fillcolor=\"{fill}\"");
            }
            if node.shape == NodeShape::Rectangle {
                out.push_str(", margin=0");
            }
            out.push_str("];\n");
        }
        for edge in &self.edges {
            let _ = write!(out, "  {} -> {}", edge.from, edge.to);
            let mut attrs = Vec::new();
            if let Some(label) = &edge.label {
                attrs.push(format!("label=\"{}\"", escape(label)));
            }
            if edge.style == EdgeStyle::Dotted {
                attrs.push("style=dotted".to_string());
            }
            if !attrs.is_empty() {
                let _ = write!(out, " [{}]", attrs.join(", "));
            }
            out.push_str(";\n");
        }
        out.push_str("}\n");
        out
    }
}

fn escape(label: &str) -> String {
    label
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Greedy word wrap to `width` columns.
fn wrap(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    for word in text.split_whitespace() {
        match lines.last_mut() {
            Some(line) if line.len() + 1 + word.len() <= width => {
                line.push(' ');
                line.push_str(word);
            }
            _ => lines.push(word.to_string()),
        }
    }
    lines.join("\n")
}

fn literal_label(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Integer(v) => v.to_string(),
        LiteralValue::Float(v) => format!("{v:?}"),
        LiteralValue::Boolean(v) => if *v { "TRUE" } else { "FALSE" }.to_string(),
        LiteralValue::String(v) => format!("'{v}'"),
        LiteralValue::Date(v) => format!("#{v}#"),
        LiteralValue::Datetime(v) | LiteralValue::GenericDatetime(v) => format!("#{v}#"),
        LiteralValue::DatetimeTz { value, timezone } => format!("#{value} {timezone}#"),
        LiteralValue::Geopoint(v) | LiteralValue::Geopolygon(v) => v.clone(),
        LiteralValue::Uuid(v) => format!("'{v}'"),
        LiteralValue::ArrayInt(items) => format!("{items:?}"),
        LiteralValue::ArrayFloat(items) => format!("{items:?}"),
        LiteralValue::ArrayStr(items) | LiteralValue::TreeStr(items) => format!("{items:?}"),
    }
}

fn literal_color(value: &LiteralValue) -> &'static str {
    match value {
        LiteralValue::Integer(_) => INTEGER_COLOR,
        LiteralValue::Float(_) => FLOAT_COLOR,
        LiteralValue::Boolean(_) => BOOLEAN_COLOR,
        _ => STRING_COLOR,
    }
}

#[derive(Default)]
struct GraphBuilder {
    graph: Graph,
}

impl GraphBuilder {
    fn add_node(&mut self, label: impl Into<String>, shape: NodeShape, fill: Option<&str>) -> String {
        let id = format!("n{}", self.graph.nodes.len());
        self.graph.nodes.push(GraphNode {
            id: id.clone(),
            label: label.into(),
            shape,
            fill: fill.map(str::to_string),
        });
        id
    }

    fn edge(&mut self, from: &str, to: &str, label: Option<String>, style: EdgeStyle) {
        self.graph.edges.push(GraphEdge {
            from: from.to_string(),
            to: to.to_string(),
            label,
            style,
        });
    }

    fn labelled(&mut self, from: &str, to: &str, label: impl Into<String>) {
        self.edge(from, to, Some(label.into()), EdgeStyle::Solid);
    }

    fn child(&mut self, parent: &str, node: &NodeRef, label: impl Into<String>) {
        let id = self.visit(node);
        self.labelled(parent, &id, label);
    }

    fn field(&mut self, name: &str) -> String {
        self.add_node(format!("[{name}]"), NodeShape::Rectangle, Some(FIELD_COLOR))
    }

    fn visit(&mut self, node: &NodeRef) -> String {
        match node.as_ref() {
            FormulaItem::Formula(f) => {
                let text = f.meta.original_text.as_deref().unwrap_or_default();
                let id = self.add_node(
                    format!("Formula:\n{}", wrap(text, FORMULA_WRAP)),
                    NodeShape::Plaintext,
                    None,
                );
                self.child(&id, &f.expr, "EXPRESSION");
                id
            }
            FormulaItem::Field(field) => self.field(&field.name),
            FormulaItem::Literal(lit) => self.add_node(
                literal_label(&lit.value),
                NodeShape::Rectangle,
                Some(literal_color(&lit.value)),
            ),
            FormulaItem::Null(_) => self.add_node("NULL", NodeShape::Rectangle, Some(NULL_COLOR)),
            FormulaItem::ExpressionList(list) => {
                let label = format!("[0..{}]", list.items.len().saturating_sub(1));
                let id = self.add_node(label, NodeShape::Hexagon, Some(LIST_COLOR));
                for (i, item) in list.items.iter().enumerate() {
                    self.child(&id, item, format!("[{i}]"));
                }
                id
            }
            FormulaItem::FuncCall(call) => self.call(&call.name, &call.args),
            FormulaItem::WindowFuncCall(call) => {
                let id = self.call(&call.name, &call.args);
                self.child(&id, &call.grouping, "GROUPING");
                if let Some(ordering) = &call.ordering {
                    if !ordering.children().is_empty() {
                        self.child(&id, ordering, "ORDERING");
                    }
                }
                if let FormulaItem::BeforeFilterBy(bfb) = call.before_filter_by.as_ref() {
                    if !bfb.field_names.is_empty() {
                        self.child(&id, &call.before_filter_by, "...");
                    }
                }
                id
            }
            FormulaItem::Unary(op) => {
                let id = self.operator(&op.name);
                for operand in &op.operands {
                    let child = self.visit(operand);
                    self.edge(&id, &child, None, EdgeStyle::Solid);
                }
                id
            }
            FormulaItem::Binary(op) => {
                let id = self.operator(&op.name);
                let labels = if op.name.eq_ignore_ascii_case("in") {
                    ["EL", "ARRAY"]
                } else {
                    ["LEFT", "RIGHT"]
                };
                for (operand, label) in op.operands.iter().zip(labels) {
                    self.child(&id, operand, label);
                }
                id
            }
            FormulaItem::Ternary(op) => {
                let id = self.operator(&op.name);
                for (operand, label) in op.operands.iter().zip(["1ST", "2ND", "3RD"]) {
                    self.child(&id, operand, label);
                }
                id
            }
            FormulaItem::IfBlock(block) => {
                let root = self.add_node("IF-BLOCK", NodeShape::Pentagon, Some(OPERATOR_COLOR));
                let mut previous: Option<String> = None;
                for part in &block.if_list {
                    let FormulaItem::IfPart(part) = part.as_ref() else {
                        continue;
                    };
                    let branch = self.add_node("IF", NodeShape::Diamond, Some(OPERATOR_COLOR));
                    self.labelled(&root, &branch, "PART");
                    if let Some(previous) = &previous {
                        self.edge(previous, &branch, Some("ELSE".into()), EdgeStyle::Dotted);
                    }
                    self.child(&branch, &part.cond, "TRUE?");
                    self.child(&branch, &part.expr, "THEN");
                    previous = Some(branch);
                }
                let otherwise = self.visit(&block.else_expr);
                if let Some(previous) = &previous {
                    self.edge(previous, &otherwise, Some("ELSE".into()), EdgeStyle::Dotted);
                }
                self.labelled(&root, &otherwise, "PART");
                root
            }
            FormulaItem::CaseBlock(block) => {
                let root = self.add_node("CASE", NodeShape::Pentagon, Some(OPERATOR_COLOR));
                self.child(&root, &block.case_expr, "WHAT");
                for part in &block.when_list {
                    let FormulaItem::WhenPart(part) = part.as_ref() else {
                        continue;
                    };
                    let branch = self.add_node("WHEN", NodeShape::Diamond, Some(OPERATOR_COLOR));
                    self.edge(&root, &branch, Some("WHEN".into()), EdgeStyle::Solid);
                    self.child(&branch, &part.value, "IS");
                    self.child(&branch, &part.expr, "THEN");
                }
                self.child(&root, &block.else_expr, "ELSE");
                root
            }
            // Parts outside their block
            FormulaItem::IfPart(part) => {
                let id = self.add_node("IF", NodeShape::Diamond, Some(OPERATOR_COLOR));
                self.child(&id, &part.cond, "TRUE?");
                self.child(&id, &part.expr, "THEN");
                id
            }
            FormulaItem::WhenPart(part) => {
                let id = self.add_node("WHEN", NodeShape::Diamond, Some(OPERATOR_COLOR));
                self.child(&id, &part.value, "IS");
                self.child(&id, &part.expr, "THEN");
                id
            }
            FormulaItem::WindowGroupingTotal(_) => {
                self.add_node("TOTAL", NodeShape::Octagon, Some(TOTAL_COLOR))
            }
            FormulaItem::WindowGroupingWithin(g) => self.dimensions("WITHIN", &g.dims),
            FormulaItem::WindowGroupingAmong(g) => self.dimensions("AMONG", &g.dims),
            FormulaItem::IgnoreDimensions(ignore) => {
                self.dimensions("IGNORE DIMENSIONS", &ignore.dims)
            }
            FormulaItem::Ordering(ordering) => {
                let id = self.add_node("ORDER BY", NodeShape::Octagon, Some(CLAUSE_COLOR));
                for (i, item) in ordering.items.iter().enumerate() {
                    self.child(&id, item, format!("EXPR {i}"));
                }
                id
            }
            FormulaItem::BeforeFilterBy(bfb) => {
                let id = self.add_node("BEFORE FILTER BY", NodeShape::Octagon, Some(CLAUSE_COLOR));
                for (i, name) in bfb.field_names.iter().enumerate() {
                    let field = self.field(name);
                    self.labelled(&id, &field, format!("FIELD {i}"));
                }
                id
            }
            FormulaItem::ParenthesizedExpr(w) => self.wrapper("(...)", &w.expr),
            FormulaItem::OrderAscending(w) => self.wrapper("ASC", &w.expr),
            FormulaItem::OrderDescending(w) => self.wrapper("DESC", &w.expr),
        }
    }

    fn call(&mut self, name: &str, args: &[NodeRef]) -> String {
        let arg_names: Vec<String> = (0..args.len()).map(|i| format!("ARG{i}")).collect();
        let label = format!("{}({})", name.to_uppercase(), arg_names.join(", "));
        let id = self.add_node(label, NodeShape::Oval, Some(FUNCTION_COLOR));
        for (arg, arg_name) in args.iter().zip(arg_names) {
            self.child(&id, arg, arg_name);
        }
        id
    }

    fn operator(&mut self, name: &str) -> String {
        self.add_node(name.to_uppercase(), NodeShape::Oval, Some(OPERATOR_COLOR))
    }

    fn dimensions(&mut self, keyword: &str, dims: &[NodeRef]) -> String {
        let id = self.add_node(keyword, NodeShape::Octagon, Some(CLAUSE_COLOR));
        for (i, dim) in dims.iter().enumerate() {
            self.child(&id, dim, format!("DIM {i}"));
        }
        id
    }

    fn wrapper(&mut self, label: &str, expr: &NodeRef) -> String {
        let id = self.add_node(label, NodeShape::Oval, Some(WRAPPER_COLOR));
        self.child(&id, expr, "EXPR");
        id
    }
}

/// Describe `ast` as a labelled graph.
///
/// Only the tree is consulted; no registry or dialect is involved.
pub fn visualize(ast: &NodeRef) -> Graph {
    let mut builder = GraphBuilder::default();
    builder.visit(ast);
    builder.graph
}
