//! ClickHouse Dialect
//!
//! ClickHouse function names are camelCase and case-sensitive. Dates only
//! compare with datetimes after an explicit `toDateTime`, and window
//! functions are available from 21.8 on.

use super::DialectImpl;
use crate::datatype::DataType;
use crate::definitions::{
    call, comparisons, denullified_equality, direct, expect_args, unary_fn, unit_arg, when_then,
    DatePromotion, Denullify, NullSentinels, RegistryBuilder, VariantBody, DATEADD_UNITS,
};
use crate::dialect::{DialectCombo, DialectFamily};
use crate::error::Error;
use crate::generator::{
    ArrayLiteralStyle, ConcatStyle, GeneratorConfig, TemporalLiteralStyle, TypeNames,
    UuidLiteralStyle,
};
use crate::sql::{BinaryOp, SqlExpr};

/// ClickHouse dialect
pub struct ClickHouseDialect;

const DATE_PARTS: [(&str, &str); 6] = [
    ("year", "toYear"),
    ("month", "toMonth"),
    ("day", "toDayOfMonth"),
    ("hour", "toHour"),
    ("minute", "toMinute"),
    ("second", "toSecond"),
];

fn to_datetime_utc(expr: SqlExpr) -> SqlExpr {
    SqlExpr::func("toDateTime", vec![expr, SqlExpr::string("UTC")])
}

fn to_datetime(expr: SqlExpr) -> SqlExpr {
    SqlExpr::func("toDateTime", vec![expr])
}

const PROMOTION: DatePromotion = DatePromotion {
    to_datetime: to_datetime_utc,
    to_generic_datetime: to_datetime,
};

fn if_null(value: SqlExpr, fallback: SqlExpr) -> SqlExpr {
    SqlExpr::func("ifNull", vec![value, fallback])
}

fn is_null(value: SqlExpr) -> SqlExpr {
    SqlExpr::func("isNull", vec![value])
}

/// Temporal and UUID operands are compared as text against the `'-'` sentinel.
fn prepare_operand(expr: SqlExpr, kind: DataType) -> SqlExpr {
    if kind.is_temporal() || kind == DataType::Uuid {
        SqlExpr::func("toString", vec![expr])
    } else {
        expr
    }
}

const DENULLIFY: Denullify = Denullify {
    sentinels: NullSentinels {
        value: NullSentinels::STANDARD.value,
        prepare: prepare_operand,
    },
    coalesce: if_null,
    is_null,
};

/// `date_add(DAY, n, x)`, negated for subtraction.
fn add_days(negate: bool) -> VariantBody {
    direct(move |args, _| {
        let [value, days] = expect_args::<2>(args)?;
        let days = if negate {
            SqlExpr::neg(days.clone())
        } else {
            days.clone()
        };
        Ok(SqlExpr::func(
            "date_add",
            vec![SqlExpr::raw("DAY"), days, value.clone()],
        ))
    })
}

/// `dateDiff(unit, right, left)`, scaled into days.
fn date_diff(unit: &'static str, per_day: Option<i64>) -> VariantBody {
    direct(move |args, _| {
        let [left, right] = expect_args::<2>(args)?;
        let diff = SqlExpr::func(
            "dateDiff",
            vec![SqlExpr::string(unit), right.clone(), left.clone()],
        );
        Ok(match per_day {
            Some(n) => SqlExpr::binary(BinaryOp::Div, diff, SqlExpr::integer(n)),
            None => diff,
        })
    })
}

impl DialectImpl for ClickHouseDialect {
    fn family(&self) -> DialectFamily {
        DialectFamily::ClickHouse
    }

    fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            // ClickHouse string literals treat backslash as an escape
            backslash_escapes: true,
            concat: ConcatStyle::Function("concat"),
            temporal_literals: TemporalLiteralStyle::ClickHouse,
            array_literals: ArrayLiteralStyle::Brackets,
            uuid_literals: UuidLiteralStyle::ClickHouse,
            type_names: TypeNames {
                text: "String",
                integer: "Int64",
                float: "Float64",
                boolean: "UInt8",
                date: "Date",
                datetime: "DateTime",
                uuid: "UUID",
            },
            ..Default::default()
        }
    }

    fn register_overrides(&self, builder: &mut RegistryBuilder) {
        let ch = DialectCombo::CLICKHOUSE;

        for definition in comparisons(ch, PROMOTION) {
            builder.add_first(definition);
        }
        builder.add_first(denullified_equality(ch, DENULLIFY));

        builder
            .override_variant("datetime", ch, unary_fn(to_datetime_utc))
            .override_variant("genericdatetime", ch, unary_fn(to_datetime));

        // Arithmetic
        builder
            .override_for(
                "%",
                &[DataType::Float, DataType::Float],
                ch,
                direct(|args, _| {
                    let [left, right] = expect_args::<2>(args)?;
                    let quotient = SqlExpr::func(
                        "floor",
                        vec![SqlExpr::binary(BinaryOp::Div, left.clone(), right.clone())],
                    );
                    Ok(SqlExpr::binary(
                        BinaryOp::Sub,
                        left.clone(),
                        SqlExpr::binary(BinaryOp::Mul, quotient, right.clone()),
                    ))
                }),
            )
            .override_for("+", &[DataType::Date, DataType::Integer], ch, add_days(false))
            .override_for("-", &[DataType::Date, DataType::Integer], ch, add_days(true))
            .override_for("-", &[DataType::Date, DataType::Date], ch, date_diff("day", None))
            .override_for(
                "-",
                &[DataType::Datetime, DataType::Datetime],
                ch,
                date_diff("second", Some(86400)),
            )
            .override_for(
                "+",
                &[DataType::ArrayInt, DataType::ArrayInt],
                ch,
                call("arrayConcat"),
            );

        // Date and time
        for (name, function) in DATE_PARTS {
            builder.override_variant(name, ch, call(function));
        }
        builder
            .override_variant(
                "dateadd",
                ch,
                direct(|args, _| {
                    let [value, unit, amount] = expect_args::<3>(args)?;
                    let unit = unit_arg("dateadd", unit, &DATEADD_UNITS)?;
                    Ok(SqlExpr::func(
                        "date_add",
                        vec![SqlExpr::raw(unit.to_uppercase()), amount.clone(), value.clone()],
                    ))
                }),
            )
            .override_variant("now", ch, call("now"))
            .override_variant("today", ch, call("today"));

        // Aggregation
        builder
            .override_variant("countd", ch, call("uniqExact"))
            .override_variant(
                "countd_if",
                ch,
                direct(|args, _| {
                    let [value, cond] = expect_args::<2>(args)?;
                    Ok(SqlExpr::func(
                        "uniqExact",
                        vec![when_then(cond.clone(), value.clone())],
                    ))
                }),
            )
            .override_variant(
                "median",
                ch,
                direct(|args, _| {
                    Ok(SqlExpr::parametric(
                        "quantileExact",
                        vec![SqlExpr::float(0.5)],
                        args.to_vec(),
                    ))
                }),
            );

        // Strings and arrays
        builder
            .override_variant("len", ch, call("lengthUTF8"))
            .override_variant("arr_len", ch, call("length"))
            .override_variant(
                "arr_str",
                ch,
                direct(|args, _| match args {
                    [array] => Ok(SqlExpr::func(
                        "arrayStringConcat",
                        vec![array.clone(), SqlExpr::string(",")],
                    )),
                    [array, delimiter] => Ok(SqlExpr::func(
                        "arrayStringConcat",
                        vec![array.clone(), delimiter.clone()],
                    )),
                    _ => Err(Error::invalid_argument(
                        "arr_str",
                        "a NULL replacement is not supported for ClickHouse arrays",
                    )),
                }),
            )
            .override_variant(
                "has",
                ch,
                direct(|args, _| {
                    let [array, value] = expect_args::<2>(args)?;
                    Ok(SqlExpr::func("has", vec![array.clone(), value.clone()]))
                }),
            );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::nodes::FormulaItem;
    use crate::translation::compile;

    fn fields() -> HashMap<String, DataType> {
        HashMap::from([
            ("d".to_string(), DataType::Date),
            ("t".to_string(), DataType::Datetime),
            ("x".to_string(), DataType::Float),
            ("s".to_string(), DataType::String),
        ])
    }

    fn sql(ast: &crate::nodes::NodeRef, dialect: DialectCombo) -> String {
        compile(ast, dialect, &fields()).unwrap().sql()
    }

    #[test]
    fn test_date_is_promoted_for_datetime_comparison() {
        let ast = FormulaItem::binary("<", FormulaItem::field("d"), FormulaItem::field("t"));
        assert_eq!(
            sql(&ast, DialectCombo::CLICKHOUSE_21_8),
            "toDateTime(\"d\", 'UTC') < \"t\""
        );
    }

    #[test]
    fn test_float_modulo() {
        let ast = FormulaItem::binary("%", FormulaItem::field("x"), FormulaItem::float(2.5));
        assert_eq!(
            sql(&ast, DialectCombo::CLICKHOUSE_22_10),
            "\"x\" - floor(\"x\" / 2.5) * 2.5"
        );
    }

    #[test]
    fn test_distinct_count_and_median() {
        let countd = FormulaItem::func("countd", vec![FormulaItem::field("s")]);
        assert_eq!(sql(&countd, DialectCombo::CLICKHOUSE_19_13), "uniqExact(\"s\")");
        let median = FormulaItem::func("median", vec![FormulaItem::field("x")]);
        assert_eq!(
            sql(&median, DialectCombo::CLICKHOUSE_23_8),
            "quantileExact(0.5)(\"x\")"
        );
    }

    #[test]
    fn test_date_difference() {
        let ast = FormulaItem::binary("-", FormulaItem::field("d"), FormulaItem::field("d"));
        let compiled = compile(&ast, DialectCombo::CLICKHOUSE_21_8, &fields()).unwrap();
        assert_eq!(compiled.sql(), "dateDiff('day', \"d\", \"d\")");
        assert_eq!(compiled.data_type, DataType::Integer);
    }

    #[test]
    fn test_denullified_equality_uses_if_null() {
        let ast = FormulaItem::binary("_dneq", FormulaItem::field("s"), FormulaItem::field("s"));
        assert_eq!(
            sql(&ast, DialectCombo::CLICKHOUSE_21_8),
            "ifNull(\"s\", '-') = ifNull(\"s\", '-') AND isNull(\"s\") = isNull(\"s\")"
        );
    }
}
