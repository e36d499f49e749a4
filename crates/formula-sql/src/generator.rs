//! SQL text generation for [`SqlExpr`] trees.
//!
//! Rendering is driven entirely by a [`GeneratorConfig`]; each dialect family
//! supplies one through `dialects::generator_config`.

use crate::sql::{FrameBound, OrderByItem, SqlExpr, SqlLiteral, SqlType, UnaryOp, WindowFrame};

/// How string concatenation is spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatStyle {
    /// `a || b || c`
    Operator,
    /// `NAME(a, b, c)`
    Function(&'static str),
}

/// How date and timestamp literals are spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalLiteralStyle {
    /// `DATE '2020-01-02'`, `TIMESTAMP '2020-01-02 03:04:05'`
    Keyword,
    /// `toDate('2020-01-02')`, `toDateTime('2020-01-02 03:04:05', 'UTC')`
    ClickHouse,
    /// `CAST('2020-01-02' AS DATE)`
    Cast,
    /// `Date('2020-01-02')`, `Datetime('2020-01-02T03:04:05Z')`
    Ydb,
    /// Bare strings
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLiteralStyle {
    /// `[1, 2]`
    Brackets,
    /// `ARRAY[1, 2]`
    Keyword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UuidLiteralStyle {
    String,
    /// `toUUID('...')`
    ClickHouse,
    /// `CAST('...' AS <uuid type>)`
    Cast,
}

/// Spelling of `CAST` target types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeNames {
    pub text: &'static str,
    pub integer: &'static str,
    pub float: &'static str,
    pub boolean: &'static str,
    pub date: &'static str,
    pub datetime: &'static str,
    pub uuid: &'static str,
}

impl TypeNames {
    pub fn get(&self, t: SqlType) -> &'static str {
        match t {
            SqlType::Text => self.text,
            SqlType::Integer => self.integer,
            SqlType::Float => self.float,
            SqlType::Boolean => self.boolean,
            SqlType::Date => self.date,
            SqlType::Datetime => self.datetime,
            SqlType::Uuid => self.uuid,
        }
    }
}

impl Default for TypeNames {
    fn default() -> Self {
        Self {
            text: "VARCHAR",
            integer: "BIGINT",
            float: "DOUBLE PRECISION",
            boolean: "BOOLEAN",
            date: "DATE",
            datetime: "TIMESTAMP",
            uuid: "UUID",
        }
    }
}

/// Per-dialect rendering settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub identifier_quote: char,
    pub identifier_quote_end: char,
    /// Escape backslashes inside string literals
    pub backslash_escapes: bool,
    pub concat: ConcatStyle,
    pub temporal_literals: TemporalLiteralStyle,
    pub array_literals: ArrayLiteralStyle,
    pub uuid_literals: UuidLiteralStyle,
    /// Whether boolean values exist; otherwise literals render as `1`/`0`
    pub supports_boolean: bool,
    pub type_names: TypeNames,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            identifier_quote: '"',
            identifier_quote_end: '"',
            backslash_escapes: false,
            concat: ConcatStyle::Operator,
            temporal_literals: TemporalLiteralStyle::Keyword,
            array_literals: ArrayLiteralStyle::Keyword,
            uuid_literals: UuidLiteralStyle::String,
            supports_boolean: true,
            type_names: TypeNames::default(),
        }
    }
}

/// Renders [`SqlExpr`] trees to SQL text.
pub struct Generator {
    config: GeneratorConfig,
    output: String,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            output: String::new(),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Render one expression.
    pub fn generate(&mut self, expr: &SqlExpr) -> String {
        self.output.clear();
        self.expr(expr);
        std::mem::take(&mut self.output)
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn expr(&mut self, expr: &SqlExpr) {
        match expr {
            SqlExpr::Null => self.write("NULL"),
            SqlExpr::Literal { value } => self.literal(value),
            SqlExpr::Column { parts } => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        self.write(".");
                    }
                    self.identifier(part);
                }
            }
            SqlExpr::Function {
                name,
                args,
                distinct,
            } => {
                self.write(name);
                self.write("(");
                if *distinct {
                    self.write("DISTINCT ");
                }
                self.list(args);
                self.write(")");
            }
            SqlExpr::ParametricFunction { name, params, args } => {
                self.write(name);
                self.write("(");
                self.list(params);
                self.write(")(");
                self.list(args);
                self.write(")");
            }
            SqlExpr::Binary { op, left, right } => {
                let prec = expr.precedence();
                self.operand(left, prec, false);
                self.write(" ");
                self.write(op.symbol());
                self.write(" ");
                self.operand(right, prec, true);
            }
            SqlExpr::Unary { op, operand } => {
                match op {
                    UnaryOp::Not => self.write("NOT "),
                    UnaryOp::Neg => self.write("-"),
                }
                self.operand(operand, expr.precedence(), true);
            }
            SqlExpr::IsNull { expr: inner, negated } => {
                self.operand(inner, expr.precedence(), true);
                self.write(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            SqlExpr::InList {
                expr: inner,
                list,
                negated,
            } => {
                self.operand(inner, expr.precedence(), true);
                self.write(if *negated { " NOT IN (" } else { " IN (" });
                self.list(list);
                self.write(")");
            }
            SqlExpr::Like {
                expr: inner,
                pattern,
                negated,
            } => {
                self.operand(inner, expr.precedence(), true);
                self.write(if *negated { " NOT LIKE " } else { " LIKE " });
                self.operand(pattern, expr.precedence(), true);
            }
            SqlExpr::Between {
                expr: inner,
                low,
                high,
                negated,
            } => {
                let prec = expr.precedence();
                self.operand(inner, prec, true);
                self.write(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
                self.operand(low, prec, true);
                self.write(" AND ");
                self.operand(high, prec, true);
            }
            SqlExpr::Case {
                operand,
                whens,
                else_expr,
            } => {
                self.write("CASE");
                if let Some(operand) = operand {
                    self.write(" ");
                    self.expr(operand);
                }
                for (cond, then) in whens {
                    self.write(" WHEN ");
                    self.expr(cond);
                    self.write(" THEN ");
                    self.expr(then);
                }
                if let Some(else_expr) = else_expr {
                    self.write(" ELSE ");
                    self.expr(else_expr);
                }
                self.write(" END");
            }
            SqlExpr::Cast { expr: inner, to } => {
                self.write("CAST(");
                self.expr(inner);
                self.write(" AS ");
                let name = self.config.type_names.get(*to);
                self.write(name);
                self.write(")");
            }
            SqlExpr::Extract { part, expr: inner } => {
                self.write("EXTRACT(");
                self.write(part);
                self.write(" FROM ");
                self.expr(inner);
                self.write(")");
            }
            SqlExpr::Concat { parts } => self.concat(parts, expr.precedence()),
            SqlExpr::List { items } => {
                self.write("(");
                self.list(items);
                self.write(")");
            }
            SqlExpr::Array { items } => {
                self.write(match self.config.array_literals {
                    ArrayLiteralStyle::Brackets => "[",
                    ArrayLiteralStyle::Keyword => "ARRAY[",
                });
                self.list(items);
                self.write("]");
            }
            SqlExpr::Subscript { expr: inner, index } => {
                self.operand(inner, 9, false);
                self.write("[");
                self.expr(index);
                self.write("]");
            }
            SqlExpr::Window {
                function,
                partition_by,
                order_by,
                frame,
            } => {
                self.expr(function);
                self.write(" OVER (");
                let mut needs_space = false;
                if !partition_by.is_empty() {
                    self.write("PARTITION BY ");
                    self.list(partition_by);
                    needs_space = true;
                }
                if !order_by.is_empty() {
                    if needs_space {
                        self.write(" ");
                    }
                    self.order_by(order_by);
                    needs_space = true;
                }
                if let Some(frame) = frame {
                    if needs_space {
                        self.write(" ");
                    }
                    self.frame(frame);
                }
                self.write(")");
            }
            SqlExpr::WithinGroup { function, order_by } => {
                self.expr(function);
                self.write(" WITHIN GROUP (");
                self.order_by(order_by);
                self.write(")");
            }
            SqlExpr::Raw { sql } => self.write(sql),
        }
    }

    fn operand(&mut self, expr: &SqlExpr, parent_prec: u8, right_side: bool) {
        let prec = expr.precedence();
        // Postfix predicates never chain with comparisons, on either side
        let predicate = matches!(
            expr,
            SqlExpr::IsNull { .. }
                | SqlExpr::InList { .. }
                | SqlExpr::Like { .. }
                | SqlExpr::Between { .. }
        );
        let wrap = prec < parent_prec
            || (prec == parent_prec && prec < 9 && (right_side || predicate));
        if wrap {
            self.write("(");
        }
        self.expr(expr);
        if wrap {
            self.write(")");
        }
    }

    fn list(&mut self, items: &[SqlExpr]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.expr(item);
        }
    }

    fn concat(&mut self, parts: &[SqlExpr], prec: u8) {
        match self.config.concat {
            ConcatStyle::Function(name) => {
                self.write(name);
                self.write("(");
                self.list(parts);
                self.write(")");
            }
            ConcatStyle::Operator => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        self.write(" || ");
                    }
                    self.operand(part, prec, i > 0);
                }
            }
        }
    }

    fn order_by(&mut self, items: &[OrderByItem]) {
        self.write("ORDER BY ");
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.expr(&item.expr);
            if item.desc {
                self.write(" DESC");
            }
        }
    }

    fn frame(&mut self, frame: &WindowFrame) {
        self.write("ROWS BETWEEN ");
        self.frame_bound(frame.start);
        self.write(" AND ");
        self.frame_bound(frame.end);
    }

    fn frame_bound(&mut self, bound: FrameBound) {
        let text = match bound {
            FrameBound::UnboundedPreceding => "UNBOUNDED PRECEDING".to_string(),
            FrameBound::Preceding(n) => format!("{n} PRECEDING"),
            FrameBound::CurrentRow => "CURRENT ROW".to_string(),
            FrameBound::Following(n) => format!("{n} FOLLOWING"),
            FrameBound::UnboundedFollowing => "UNBOUNDED FOLLOWING".to_string(),
        };
        self.write(&text);
    }

    fn identifier(&mut self, name: &str) {
        let (open, close) = (self.config.identifier_quote, self.config.identifier_quote_end);
        let mut quoted = String::with_capacity(name.len() + 2);
        quoted.push(open);
        for c in name.chars() {
            if c == close {
                quoted.push(close);
            }
            quoted.push(c);
        }
        quoted.push(close);
        self.write(&quoted);
    }

    fn quoted_string(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('\'');
        for c in value.chars() {
            match c {
                '\'' => out.push_str("''"),
                '\\' if self.config.backslash_escapes => out.push_str("\\\\"),
                _ => out.push(c),
            }
        }
        out.push('\'');
        out
    }

    fn literal(&mut self, value: &SqlLiteral) {
        let text = match value {
            SqlLiteral::Integer(v) => v.to_string(),
            SqlLiteral::Float(v) => self.float(*v),
            SqlLiteral::Boolean(v) => match (self.config.supports_boolean, v) {
                (true, true) => "TRUE".to_string(),
                (true, false) => "FALSE".to_string(),
                (false, true) => "1".to_string(),
                (false, false) => "0".to_string(),
            },
            SqlLiteral::String(v) => self.quoted_string(v),
            SqlLiteral::Date(d) => self.temporal(&d.format("%Y-%m-%d").to_string(), TemporalKind::Date),
            SqlLiteral::Datetime(dt) => self.temporal(
                &dt.format("%Y-%m-%d %H:%M:%S").to_string(),
                TemporalKind::Datetime,
            ),
            SqlLiteral::GenericDatetime(dt) => self.temporal(
                &dt.format("%Y-%m-%d %H:%M:%S").to_string(),
                TemporalKind::GenericDatetime,
            ),
            SqlLiteral::Uuid(u) => {
                let s = self.quoted_string(&u.to_string());
                match self.config.uuid_literals {
                    UuidLiteralStyle::String => s,
                    UuidLiteralStyle::ClickHouse => format!("toUUID({s})"),
                    UuidLiteralStyle::Cast => format!("CAST({s} AS {})", self.config.type_names.uuid),
                }
            }
        };
        self.write(&text);
    }

    fn float(&self, v: f64) -> String {
        if v.is_nan() {
            return format!("CAST('NaN' AS {})", self.config.type_names.float);
        }
        if v.is_infinite() {
            let text = if v > 0.0 { "'Infinity'" } else { "'-Infinity'" };
            return format!("CAST({text} AS {})", self.config.type_names.float);
        }
        let text = v.to_string();
        if text.contains(['.', 'e', 'E']) {
            text
        } else {
            format!("{text}.0")
        }
    }

        fn temporal(&self, text: &str, kind: TemporalKind) -> String {
        match self.config.temporal_literals {
            TemporalLiteralStyle::Keyword => match kind {
                TemporalKind::Date => format!("DATE {}", self.quoted_string(text)),
                _ => format!("TIMESTAMP {}", self.quoted_string(text)),
            },
            TemporalLiteralStyle::ClickHouse => match kind {
                TemporalKind::Date => format!("toDate({})", self.quoted_string(text)),
                TemporalKind::Datetime => format!("toDateTime({}, 'UTC')", self.quoted_string(text)),
                TemporalKind::GenericDatetime => format!("toDateTime({})", self.quoted_string(text)),
            },
            TemporalLiteralStyle::Cast => {
                let type_name = match kind {
                    TemporalKind::Date => self.config.type_names.date,
                    _ => self.config.type_names.datetime,
                };
                format!("CAST({} AS {type_name})", self.quoted_string(text))
            }
            TemporalLiteralStyle::Ydb => match kind {
                TemporalKind::Date => format!("Date({})", self.quoted_string(text)),
                _ => format!("Datetime({})", self.quoted_string(&format!("{}Z", text.replace(' ', "T")))),
            },
            TemporalLiteralStyle::Plain => self.quoted_string(text),
        }
    }
}

#[derive(Clone, Copy)]
enum TemporalKind {
    Date,
    Datetime,
    GenericDatetime,
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::BinaryOp;
    use chrono::NaiveDate;

    fn render(expr: &SqlExpr) -> String {
        Generator::new(GeneratorConfig::default()).generate(expr)
    }

    #[test]
    fn test_parenthesizes_by_precedence() {
        let sum = SqlExpr::binary(BinaryOp::Add, SqlExpr::integer(1), SqlExpr::integer(2));
        let product = SqlExpr::binary(BinaryOp::Mul, sum.clone(), SqlExpr::integer(3));
        assert_eq!(render(&product), "(1 + 2) * 3");

        let diff = SqlExpr::binary(BinaryOp::Sub, SqlExpr::integer(1), sum);
        assert_eq!(render(&diff), "1 - (1 + 2)");
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(render(&SqlExpr::string("it's")), "'it''s'");
        let config = GeneratorConfig {
            backslash_escapes: true,
            ..Default::default()
        };
        assert_eq!(
            Generator::new(config).generate(&SqlExpr::string("a\\b")),
            "'a\\\\b'"
        );
    }

    #[test]
    fn test_identifier_quoting() {
        let col = SqlExpr::column(vec!["t".into(), "we\"ird".into()]);
        assert_eq!(render(&col), "\"t\".\"we\"\"ird\"");
        let config = GeneratorConfig {
            identifier_quote: '[',
            identifier_quote_end: ']',
            ..Default::default()
        };
        assert_eq!(Generator::new(config).generate(&col), "[t].[we\"ird]");
    }

    #[test]
    fn test_concat_styles() {
        let parts = SqlExpr::concat(vec![SqlExpr::string("a"), SqlExpr::column(vec!["b".into()])]);
        assert_eq!(render(&parts), "'a' || \"b\"");
        let config = GeneratorConfig {
            concat: ConcatStyle::Function("CONCAT"),
            ..Default::default()
        };
        assert_eq!(Generator::new(config).generate(&parts), "CONCAT('a', \"b\")");
    }

    #[test]
    fn test_temporal_literals() {
        let date = SqlExpr::literal(SqlLiteral::Date(NaiveDate::from_ymd_opt(2020, 1, 2).unwrap()));
        assert_eq!(render(&date), "DATE '2020-01-02'");
        let config = GeneratorConfig {
            temporal_literals: TemporalLiteralStyle::ClickHouse,
            ..Default::default()
        };
        assert_eq!(Generator::new(config).generate(&date), "toDate('2020-01-02')");
    }

    #[test]
    fn test_window_rendering() {
        let expr = SqlExpr::Window {
            function: Box::new(SqlExpr::func("SUM", vec![SqlExpr::column(vec!["x".into()])])),
            partition_by: vec![SqlExpr::column(vec!["d".into()])],
            order_by: vec![OrderByItem {
                expr: SqlExpr::column(vec!["t".into()]),
                desc: true,
            }],
            frame: Some(WindowFrame::rows(FrameBound::UnboundedPreceding, FrameBound::CurrentRow)),
        };
        assert_eq!(
            render(&expr),
            "SUM(\"x\") OVER (PARTITION BY \"d\" ORDER BY \"t\" DESC ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW)"
        );
    }

    #[test]
    fn test_float_and_boolean_literals() {
        assert_eq!(render(&SqlExpr::float(2.0)), "2.0");
        assert_eq!(render(&SqlExpr::float(0.5)), "0.5");
        let config = GeneratorConfig {
            supports_boolean: false,
            ..Default::default()
        };
        assert_eq!(Generator::new(config).generate(&SqlExpr::boolean(true)), "1");
    }

    #[test]
    fn test_non_finite_floats_are_cast_from_text() {
        assert_eq!(render(&SqlExpr::float(f64::NAN)), "CAST('NaN' AS DOUBLE PRECISION)");
        assert_eq!(
            render(&SqlExpr::float(f64::NEG_INFINITY)),
            "CAST('-Infinity' AS DOUBLE PRECISION)"
        );
    }

    #[test]
    fn test_predicates_under_comparison_are_parenthesized() {
        let is_null = |name: &str| SqlExpr::IsNull {
            expr: Box::new(SqlExpr::column(vec![name.into()])),
            negated: false,
        };
        let cmp = SqlExpr::eq(is_null("a"), is_null("b"));
        assert_eq!(render(&cmp), "(\"a\" IS NULL) = (\"b\" IS NULL)");

        let conj = SqlExpr::and(is_null("a"), SqlExpr::boolean(true));
        assert_eq!(render(&conj), "\"a\" IS NULL AND TRUE");
    }

    #[test]
    fn test_parametric_function() {
        let expr = SqlExpr::parametric(
            "quantileExact",
            vec![SqlExpr::float(0.5)],
            vec![SqlExpr::column(vec!["x".into()])],
        );
        assert_eq!(render(&expr), "quantileExact(0.5)(\"x\")");
    }
}
