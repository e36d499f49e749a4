//! Window functions.
//!
//! Window calls compile to `f(...) OVER (...)`. The partition comes from the
//! call's grouping (`TOTAL`, `WITHIN`, `AMONG`) and the order from its
//! `ORDER BY` clause, both already compiled into a [`WindowClause`].
//! Ranking and running functions take an optional direction argument.

use super::aggregation::runtime_result;
use super::operators::float_result;
use super::{
    windowed, Definition, RegistryBuilder, TypeStrategy, VariantBody, ANY, INTEGER, NUMBER,
    ORDERED, STRING,
};
use crate::datatype::DataType;
use crate::dialect::DialectCombo;
use crate::error::{Error, Result};
use crate::sql::{FrameBound, OrderByItem, SqlExpr, WindowFrame};
use crate::translation::WindowClause;

/// Dialects with `OVER (...)` support.
pub(crate) const WINDOW_DIALECTS: DialectCombo = DialectCombo::ANY
    .difference(DialectCombo::CLICKHOUSE_19_13)
    .difference(DialectCombo::MYSQL_5_6)
    .difference(DialectCombo::MYSQL_5_7);

fn float_window(args: &[DataType]) -> Option<DataType> {
    float_result(args).map(DataType::non_const)
}

/// Whether a direction argument asks for descending order.
fn is_descending(function: &str, arg: Option<&SqlExpr>, default_desc: bool) -> Result<bool> {
    let Some(arg) = arg else {
        return Ok(default_desc);
    };
    match arg.as_str_literal().map(str::to_lowercase).as_deref() {
        Some("asc") => Ok(false),
        Some("desc") => Ok(true),
        _ => Err(Error::invalid_argument(
            function,
            "direction must be the constant 'asc' or 'desc'",
        )),
    }
}

fn over(
    function: SqlExpr,
    clause: &WindowClause,
    order_by: Vec<OrderByItem>,
    frame: Option<WindowFrame>,
) -> SqlExpr {
    SqlExpr::Window {
        function: Box::new(function),
        partition_by: clause.partition_by.clone(),
        order_by,
        frame,
    }
}

/// `NAME(args) OVER (PARTITION BY ...)`
fn partition_aggregate(name: &'static str) -> VariantBody {
    windowed(move |args, clause, _| {
        let function = if name == "COUNT" && args.is_empty() {
            SqlExpr::func(name, vec![SqlExpr::raw("*")])
        } else {
            SqlExpr::func(name, args.to_vec())
        };
        Ok(over(function, clause, Vec::new(), None))
    })
}

/// `NAME() OVER (PARTITION BY ... ORDER BY value <dir>)`
fn ranking(name: &'static str, function_name: &'static str) -> VariantBody {
    windowed(move |args, clause, _| {
        let Some(value) = args.first() else {
            return Err(Error::arity("call", 1, 0));
        };
        let desc = is_descending(function_name, args.get(1), true)?;
        let mut order_by = vec![OrderByItem {
            expr: value.clone(),
            desc,
        }];
        order_by.extend(clause.order_by.iter().cloned());
        Ok(over(SqlExpr::func(name, Vec::new()), clause, order_by, None))
    })
}

/// Cumulative aggregate over the rows before (ascending) or after (descending) the current one.
fn running(name: &'static str, function_name: &'static str) -> VariantBody {
    windowed(move |args, clause, _| {
        let Some(value) = args.first() else {
            return Err(Error::arity("call", 1, 0));
        };
        let frame = if is_descending(function_name, args.get(1), false)? {
            WindowFrame::rows(FrameBound::CurrentRow, FrameBound::UnboundedFollowing)
        } else {
            WindowFrame::rows(FrameBound::UnboundedPreceding, FrameBound::CurrentRow)
        };
        Ok(over(
            SqlExpr::func(name, vec![value.clone()]),
            clause,
            clause.order_by.clone(),
            Some(frame),
        ))
    })
}

/// Aggregate over a sliding frame of `n` rows; negative `n` looks forward.
fn moving(name: &'static str, function_name: &'static str) -> VariantBody {
    windowed(move |args, clause, _| {
        let [value, rows] = args else {
            return Err(Error::arity("call", 2, args.len()));
        };
        let rows = rows.as_int_literal().ok_or_else(|| {
            Error::invalid_argument(function_name, "row count must be a constant integer")
        })?;
        let frame = if rows >= 0 {
            WindowFrame::rows(FrameBound::Preceding(rows.unsigned_abs()), FrameBound::CurrentRow)
        } else {
            WindowFrame::rows(FrameBound::CurrentRow, FrameBound::Following(rows.unsigned_abs()))
        };
        Ok(over(
            SqlExpr::func(name, vec![value.clone()]),
            clause,
            clause.order_by.clone(),
            Some(frame),
        ))
    })
}

pub(crate) fn register(builder: &mut RegistryBuilder) {
    let dialects = WINDOW_DIALECTS;

    builder
        .add(
            Definition::window("sum")
                .args(&[NUMBER])
                .returns(TypeStrategy::Custom(runtime_result))
                .variant(dialects, partition_aggregate("SUM")),
        )
        .add(
            Definition::window("avg")
                .args(&[NUMBER])
                .returns(TypeStrategy::Custom(float_window))
                .variant(dialects, partition_aggregate("AVG")),
        )
        .add(
            Definition::window("min")
                .args(&[ORDERED])
                .returns(TypeStrategy::Custom(runtime_result))
                .variant(dialects, partition_aggregate("MIN")),
        )
        .add(
            Definition::window("max")
                .args(&[ORDERED])
                .returns(TypeStrategy::Custom(runtime_result))
                .variant(dialects, partition_aggregate("MAX")),
        )
        .add(
            Definition::window("count")
                .args(&[])
                .args(&[ANY])
                .returns_type(DataType::Integer)
                .variant(dialects, partition_aggregate("COUNT")),
        );

    for (function_name, sql) in [
        ("rank", "RANK"),
        ("rank_dense", "DENSE_RANK"),
        ("rank_unique", "ROW_NUMBER"),
    ] {
        builder.add(
            Definition::window(function_name)
                .args(&[ORDERED])
                .args(&[ORDERED, STRING])
                .returns_type(DataType::Integer)
                .variant(dialects, ranking(sql, function_name)),
        );
    }

    for (function_name, sql, value, strategy) in [
        ("rsum", "SUM", NUMBER, TypeStrategy::Custom(runtime_result)),
        ("rcount", "COUNT", ANY, TypeStrategy::Fixed(DataType::Integer)),
        ("rmin", "MIN", ORDERED, TypeStrategy::Custom(runtime_result)),
        ("rmax", "MAX", ORDERED, TypeStrategy::Custom(runtime_result)),
        ("ravg", "AVG", NUMBER, TypeStrategy::Custom(float_window)),
    ] {
        builder.add(
            Definition::window(function_name)
                .args(&[value])
                .args(&[value, STRING])
                .returns(strategy)
                .variant(dialects, running(sql, function_name)),
        );
    }

    for (function_name, sql, strategy) in [
        ("msum", "SUM", TypeStrategy::Custom(runtime_result)),
        ("mavg", "AVG", TypeStrategy::Custom(float_window)),
    ] {
        builder.add(
            Definition::window(function_name)
                .args(&[NUMBER, INTEGER])
                .returns(strategy)
                .variant(dialects, moving(sql, function_name)),
        );
    }
}
