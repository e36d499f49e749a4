//! Target SQL expression tree.
//!
//! [`SqlExpr`] is the value a compiled formula produces. It is dialect-neutral
//! in shape: dialect differences live either in which nodes a translation
//! variant builds (function names, casts) or in how the
//! [`Generator`](crate::generator::Generator) renders literals, identifiers and
//! concatenation for a given [`GeneratorConfig`](crate::generator::GeneratorConfig).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Literal values in target SQL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SqlLiteral {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Date(NaiveDate),
    /// Timestamp interpreted in UTC
    Datetime(NaiveDateTime),
    /// Timestamp without timezone semantics
    GenericDatetime(NaiveDateTime),
    Uuid(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Target type names for `CAST`; each dialect spells them differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Text,
    Integer,
    Float,
    Boolean,
    Date,
    Datetime,
    Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByItem {
    pub expr: SqlExpr,
    pub desc: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(u64),
    CurrentRow,
    Following(u64),
    UnboundedFollowing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowFrame {
    pub start: FrameBound,
    pub end: FrameBound,
}

impl WindowFrame {
    pub fn rows(start: FrameBound, end: FrameBound) -> Self {
        Self { start, end }
    }
}

/// A target SQL expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum SqlExpr {
    Null,
    Literal { value: SqlLiteral },
    Column { parts: Vec<String> },
    Function {
        name: String,
        args: Vec<SqlExpr>,
        distinct: bool,
    },
    /// `name(params)(args)`, a parametric aggregate
    ParametricFunction {
        name: String,
        params: Vec<SqlExpr>,
        args: Vec<SqlExpr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
    },
    Unary { op: UnaryOp, operand: Box<SqlExpr> },
    IsNull { expr: Box<SqlExpr>, negated: bool },
    InList {
        expr: Box<SqlExpr>,
        list: Vec<SqlExpr>,
        negated: bool,
    },
    Like {
        expr: Box<SqlExpr>,
        pattern: Box<SqlExpr>,
        negated: bool,
    },
    Between {
        expr: Box<SqlExpr>,
        low: Box<SqlExpr>,
        high: Box<SqlExpr>,
        negated: bool,
    },
    Case {
        operand: Option<Box<SqlExpr>>,
        whens: Vec<(SqlExpr, SqlExpr)>,
        else_expr: Option<Box<SqlExpr>>,
    },
    Cast { expr: Box<SqlExpr>, to: SqlType },
    /// `EXTRACT(part FROM expr)`
    Extract { part: String, expr: Box<SqlExpr> },
    /// String concatenation, rendered with the dialect's operator or function
    Concat { parts: Vec<SqlExpr> },
    /// Parenthesized list, e.g. the right side of `IN`
    List { items: Vec<SqlExpr> },
    Array { items: Vec<SqlExpr> },
    /// `expr[index]`, 1-based
    Subscript {
        expr: Box<SqlExpr>,
        index: Box<SqlExpr>,
    },
    Window {
        function: Box<SqlExpr>,
        partition_by: Vec<SqlExpr>,
        order_by: Vec<OrderByItem>,
        frame: Option<WindowFrame>,
    },
    WithinGroup {
        function: Box<SqlExpr>,
        order_by: Vec<OrderByItem>,
    },
    /// Verbatim SQL fragment, e.g. a date-part keyword
    Raw { sql: String },
}

impl SqlExpr {
    pub fn integer(value: i64) -> Self {
        SqlExpr::Literal {
            value: SqlLiteral::Integer(value),
        }
    }

    pub fn float(value: f64) -> Self {
        SqlExpr::Literal {
            value: SqlLiteral::Float(value),
        }
    }

    pub fn boolean(value: bool) -> Self {
        SqlExpr::Literal {
            value: SqlLiteral::Boolean(value),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        SqlExpr::Literal {
            value: SqlLiteral::String(value.into()),
        }
    }

    pub fn literal(value: SqlLiteral) -> Self {
        SqlExpr::Literal { value }
    }

    pub fn column(parts: Vec<String>) -> Self {
        SqlExpr::Column { parts }
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        SqlExpr::Raw { sql: sql.into() }
    }

    pub fn func(name: impl Into<String>, args: Vec<SqlExpr>) -> Self {
        SqlExpr::Function {
            name: name.into(),
            args,
            distinct: false,
        }
    }

    pub fn func_distinct(name: impl Into<String>, args: Vec<SqlExpr>) -> Self {
        SqlExpr::Function {
            name: name.into(),
            args,
            distinct: true,
        }
    }

    pub fn parametric(name: impl Into<String>, params: Vec<SqlExpr>, args: Vec<SqlExpr>) -> Self {
        SqlExpr::ParametricFunction {
            name: name.into(),
            params,
            args,
        }
    }

    pub fn binary(op: BinaryOp, left: SqlExpr, right: SqlExpr) -> Self {
        SqlExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eq(left: SqlExpr, right: SqlExpr) -> Self {
        Self::binary(BinaryOp::Eq, left, right)
    }

    pub fn and(left: SqlExpr, right: SqlExpr) -> Self {
        Self::binary(BinaryOp::And, left, right)
    }

    pub fn or(left: SqlExpr, right: SqlExpr) -> Self {
        Self::binary(BinaryOp::Or, left, right)
    }

    pub fn not(operand: SqlExpr) -> Self {
        SqlExpr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }
    }

    pub fn neg(operand: SqlExpr) -> Self {
        SqlExpr::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(operand),
        }
    }

    pub fn is_null(expr: SqlExpr) -> Self {
        SqlExpr::IsNull {
            expr: Box::new(expr),
            negated: false,
        }
    }

    pub fn is_not_null(expr: SqlExpr) -> Self {
        SqlExpr::IsNull {
            expr: Box::new(expr),
            negated: true,
        }
    }

    pub fn cast(expr: SqlExpr, to: SqlType) -> Self {
        SqlExpr::Cast {
            expr: Box::new(expr),
            to,
        }
    }

    pub fn extract(part: impl Into<String>, expr: SqlExpr) -> Self {
        SqlExpr::Extract {
            part: part.into(),
            expr: Box::new(expr),
        }
    }

    pub fn subscript(expr: SqlExpr, index: SqlExpr) -> Self {
        SqlExpr::Subscript {
            expr: Box::new(expr),
            index: Box::new(index),
        }
    }

    /// The value of an integer literal, looking through unary minus.
    pub fn as_int_literal(&self) -> Option<i64> {
        match self {
            SqlExpr::Literal {
                value: SqlLiteral::Integer(v),
            } => Some(*v),
            SqlExpr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => operand.as_int_literal().and_then(i64::checked_neg),
            _ => None,
        }
    }

    pub fn concat(parts: Vec<SqlExpr>) -> Self {
        SqlExpr::Concat { parts }
    }

    /// `CASE WHEN cond THEN then ELSE otherwise END`
    pub fn case_when(cond: SqlExpr, then: SqlExpr, otherwise: SqlExpr) -> Self {
        SqlExpr::Case {
            operand: None,
            whens: vec![(cond, then)],
            else_expr: Some(Box::new(otherwise)),
        }
    }

    /// The value of a string literal.
    pub fn as_str_literal(&self) -> Option<&str> {
        match self {
            SqlExpr::Literal {
                value: SqlLiteral::String(s),
            } => Some(s),
            _ => None,
        }
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self, SqlExpr::Null)
    }

    /// Binding strength used by the generator to decide on parentheses.
    pub fn precedence(&self) -> u8 {
        match self {
            SqlExpr::Binary { op, .. } => match op {
                BinaryOp::Or => 1,
                BinaryOp::And => 2,
                op if op.is_comparison() => 4,
                BinaryOp::Add | BinaryOp::Sub => 6,
                _ => 7,
            },
            SqlExpr::Unary { op: UnaryOp::Not, .. } => 3,
            SqlExpr::IsNull { .. }
            | SqlExpr::InList { .. }
            | SqlExpr::Like { .. }
            | SqlExpr::Between { .. } => 4,
            SqlExpr::Concat { .. } => 5,
            SqlExpr::Unary { op: UnaryOp::Neg, .. } => 8,
            _ => 9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_order() {
        let or = SqlExpr::or(SqlExpr::boolean(true), SqlExpr::boolean(false));
        let add = SqlExpr::binary(BinaryOp::Add, SqlExpr::integer(1), SqlExpr::integer(2));
        let mul = SqlExpr::binary(BinaryOp::Mul, SqlExpr::integer(1), SqlExpr::integer(2));
        assert!(or.precedence() < add.precedence());
        assert!(add.precedence() < mul.precedence());
        assert!(mul.precedence() < SqlExpr::integer(1).precedence());
    }

    #[test]
    fn test_as_str_literal() {
        assert_eq!(SqlExpr::string("x").as_str_literal(), Some("x"));
        assert_eq!(SqlExpr::integer(1).as_str_literal(), None);
    }

    #[test]
    fn test_as_int_literal_sees_negation() {
        assert_eq!(SqlExpr::neg(SqlExpr::integer(3)).as_int_literal(), Some(-3));
        assert_eq!(SqlExpr::string("3").as_int_literal(), None);
    }

    #[test]
    fn test_as_int_literal_overflow_is_not_a_literal() {
        assert_eq!(SqlExpr::neg(SqlExpr::integer(i64::MIN)).as_int_literal(), None);
        assert_eq!(
            SqlExpr::neg(SqlExpr::integer(i64::MAX)).as_int_literal(),
            Some(-i64::MAX)
        );
    }

    #[test]
    fn test_serde_round_trip_keeps_raw_fragments() {
        let expr = SqlExpr::func(
            "DATE_TRUNC",
            vec![SqlExpr::raw("DAY"), SqlExpr::column(vec!["d".into()])],
        );
        let json = serde_json::to_string(&expr).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["node"], "function");
        assert_eq!(value["args"][0]["node"], "raw");
        assert_eq!(value["args"][0]["sql"], "DAY");
        let back: SqlExpr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, expr);
    }
}
