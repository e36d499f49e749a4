//! Aggregate functions.

use super::operators::float_result;
use super::{
    call, direct, expect_args, ContextFlags, Definition, RegistryBuilder, TypeStrategy,
    VariantBody, ANY, BOOLEAN, NUMBER, ORDERED,
};
use crate::datatype::DataType;
use crate::dialect::DialectCombo;
use crate::sql::{OrderByItem, SqlExpr};

/// The runtime kind of the first argument; aggregates are never constant.
pub(crate) fn runtime_result(args: &[DataType]) -> Option<DataType> {
    args.first().map(|t| t.non_const())
}

/// Summing booleans counts them.
fn sum_result(args: &[DataType]) -> Option<DataType> {
    runtime_result(args).map(|t| match t {
        DataType::Boolean => DataType::Integer,
        other => other,
    })
}

/// `FLOAT`, whatever the argument constness.
fn float_aggregate(args: &[DataType]) -> Option<DataType> {
    float_result(args).map(DataType::non_const)
}

/// `CASE WHEN cond THEN value END`
pub(crate) fn when_then(cond: SqlExpr, value: SqlExpr) -> SqlExpr {
    SqlExpr::Case {
        operand: None,
        whens: vec![(cond, value)],
        else_expr: None,
    }
}

/// `NAME(CASE WHEN cond THEN value END)`, optionally `DISTINCT`.
fn conditional(name: &'static str, distinct: bool) -> VariantBody {
    direct(move |args, _| {
        let [value, cond] = expect_args::<2>(args)?;
        let inner = vec![when_then(cond.clone(), value.clone())];
        Ok(if distinct {
            SqlExpr::func_distinct(name, inner)
        } else {
            SqlExpr::func(name, inner)
        })
    })
}

/// `PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY x)`
pub(crate) fn percentile_median() -> VariantBody {
    direct(|args, _| {
        let [value] = expect_args::<1>(args)?;
        Ok(SqlExpr::WithinGroup {
            function: Box::new(SqlExpr::func("PERCENTILE_CONT", vec![SqlExpr::float(0.5)])),
            order_by: vec![OrderByItem {
                expr: value.clone(),
                desc: false,
            }],
        })
    })
}

pub(crate) fn register(builder: &mut RegistryBuilder) {
    let any = DialectCombo::ANY;
    let condition_second = [ContextFlags::empty(), ContextFlags::REQ_CONDITION];

    builder
        .add(
            Definition::new("sum")
                .aggregate()
                .args(&[NUMBER])
                .returns(TypeStrategy::Custom(sum_result))
                .variant(any, call("SUM")),
        )
        .add(
            Definition::new("avg")
                .aggregate()
                .args(&[NUMBER])
                .returns(TypeStrategy::Custom(float_aggregate))
                .variant(any, call("AVG")),
        );

    for (name, sql) in [("min", "MIN"), ("max", "MAX")] {
        builder.add(
            Definition::new(name)
                .aggregate()
                .args(&[ORDERED])
                .returns(TypeStrategy::Custom(runtime_result))
                .variant(any, call(sql)),
        );
    }

    builder
        .add(
            Definition::new("count")
                .aggregate()
                .args(&[])
                .returns_type(DataType::Integer)
                .variant(
                    any,
                    direct(|_, _| Ok(SqlExpr::func("COUNT", vec![SqlExpr::raw("*")]))),
                ),
        )
        .add(
            Definition::new("count")
                .aggregate()
                .args(&[ANY])
                .returns_type(DataType::Integer)
                .variant(any, call("COUNT")),
        )
        .add(
            Definition::new("countd")
                .aggregate()
                .args(&[ANY])
                .returns_type(DataType::Integer)
                .variant(
                    any,
                    direct(|args, _| Ok(SqlExpr::func_distinct("COUNT", args.to_vec()))),
                ),
        );

    builder
        .add(
            Definition::new("sum_if")
                .aggregate()
                .args(&[NUMBER, BOOLEAN])
                .arg_flags(&condition_second)
                .returns(TypeStrategy::Custom(runtime_result))
                .variant(any, conditional("SUM", false)),
        )
        .add(
            Definition::new("avg_if")
                .aggregate()
                .args(&[NUMBER, BOOLEAN])
                .arg_flags(&condition_second)
                .returns(TypeStrategy::Custom(float_aggregate))
                .variant(any, conditional("AVG", false)),
        )
        .add(
            Definition::new("count_if")
                .aggregate()
                .args(&[BOOLEAN])
                .arg_flags(&[ContextFlags::REQ_CONDITION])
                .returns_type(DataType::Integer)
                .variant(
                    any,
                    direct(|args, _| {
                        let [cond] = expect_args::<1>(args)?;
                        Ok(SqlExpr::func(
                            "COUNT",
                            vec![when_then(cond.clone(), SqlExpr::integer(1))],
                        ))
                    }),
                ),
        )
        .add(
            Definition::new("count_if")
                .aggregate()
                .args(&[ANY, BOOLEAN])
                .arg_flags(&condition_second)
                .returns_type(DataType::Integer)
                .variant(any, conditional("COUNT", false)),
        )
        .add(
            Definition::new("countd_if")
                .aggregate()
                .args(&[ANY, BOOLEAN])
                .arg_flags(&condition_second)
                .returns_type(DataType::Integer)
                .variant(any, conditional("COUNT", true)),
        );

    builder.add(
        Definition::new("median")
            .aggregate()
            .args(&[NUMBER])
            .returns_type(DataType::Float)
            .variant(
                DialectCombo::ORACLE | DialectCombo::SNOWFLAKE,
                percentile_median(),
            ),
    );

    for (name, sql) in [("stdev", "STDDEV_SAMP"), ("var", "VAR_SAMP")] {
        builder.add(
            Definition::new(name)
                .aggregate()
                .args(&[NUMBER])
                .returns_type(DataType::Float)
                .variant(any, call(sql)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_results_are_runtime_kinds() {
        assert_eq!(runtime_result(&[DataType::ConstInteger]), Some(DataType::Integer));
        assert_eq!(float_aggregate(&[DataType::ConstInteger]), Some(DataType::Float));
        assert_eq!(runtime_result(&[]), None);
    }

    #[test]
    fn test_when_then_has_no_else() {
        let expr = when_then(SqlExpr::boolean(true), SqlExpr::integer(1));
        assert!(matches!(expr, SqlExpr::Case { else_expr: None, .. }));
    }
}
