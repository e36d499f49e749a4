//! Date and time functions.

use super::{
    direct, expect_args, Definition, RegistryBuilder, TypeStrategy, DATE, DATELIKE, INTEGER,
    STRING,
};
use crate::datatype::DataType;
use crate::dialect::DialectCombo;
use crate::error::{Error, Result};
use crate::sql::{BinaryOp, SqlExpr, SqlType};

/// Component extractors: formula name and `EXTRACT` part.
pub(crate) const DATE_PARTS: [(&str, &str); 6] = [
    ("year", "YEAR"),
    ("month", "MONTH"),
    ("day", "DAY"),
    ("hour", "HOUR"),
    ("minute", "MINUTE"),
    ("second", "SECOND"),
];

pub(crate) const DATEADD_UNITS: [&str; 3] = ["day", "month", "year"];

pub(crate) const DATETRUNC_UNITS: [&str; 8] = [
    "second", "minute", "hour", "day", "week", "month", "quarter", "year",
];

/// The lower-cased unit named by a constant string argument.
pub(crate) fn unit_arg(function: &str, arg: &SqlExpr, allowed: &[&str]) -> Result<String> {
    let unit = arg
        .as_str_literal()
        .ok_or_else(|| Error::invalid_argument(function, "unit must be a constant string"))?
        .to_lowercase();
    if allowed.contains(&unit.as_str()) {
        Ok(unit)
    } else {
        Err(Error::invalid_argument(
            function,
            format!("unsupported unit '{unit}', expected one of: {}", allowed.join(", ")),
        ))
    }
}

/// The kind of the first argument, constant only if every argument is.
pub(crate) fn temporal_result(args: &[DataType]) -> Option<DataType> {
    let first = *args.first()?;
    if args.iter().all(|t| t.is_const()) {
        Some(first)
    } else {
        Some(first.non_const())
    }
}

pub(crate) fn register(builder: &mut RegistryBuilder) {
    let any = DialectCombo::ANY;

    for (name, part) in DATE_PARTS {
        builder.add(
            Definition::new(name)
                .args(&[DATELIKE])
                .returns_type(DataType::Integer)
                .variant(
                    any,
                    direct(move |args, _| {
                        let [value] = expect_args::<1>(args)?;
                        Ok(SqlExpr::extract(part, value.clone()))
                    }),
                ),
        );
    }

    builder.add(
        Definition::new("dateadd")
            .args(&[DATELIKE, STRING, INTEGER])
            .returns(TypeStrategy::Custom(temporal_result))
            .params_from(0)
            .variant(
                any,
                direct(|args, _| {
                    let [value, unit, amount] = expect_args::<3>(args)?;
                    let unit = unit_arg("dateadd", unit, &DATEADD_UNITS)?;
                    Ok(SqlExpr::binary(
                        BinaryOp::Add,
                        value.clone(),
                        SqlExpr::binary(
                            BinaryOp::Mul,
                            amount.clone(),
                            SqlExpr::raw(format!("INTERVAL '1 {unit}'")),
                        ),
                    ))
                }),
            ),
    );

    builder
        .add(
            Definition::new("datetrunc")
                .args_returning(&[DATE, STRING], TypeStrategy::Custom(temporal_result))
                .variant(
                    any,
                    direct(|args, _| {
                        let [value, unit] = expect_args::<2>(args)?;
                        let unit = unit_arg("datetrunc", unit, &DATETRUNC_UNITS)?;
                        Ok(SqlExpr::cast(
                            SqlExpr::func("DATE_TRUNC", vec![SqlExpr::string(unit), value.clone()]),
                            SqlType::Date,
                        ))
                    }),
                ),
        )
        .add(
            Definition::new("datetrunc")
                .args(&[DATELIKE, STRING])
                .returns(TypeStrategy::Custom(temporal_result))
                .params_from(0)
                .variant(
                    any,
                    direct(|args, _| {
                        let [value, unit] = expect_args::<2>(args)?;
                        let unit = unit_arg("datetrunc", unit, &DATETRUNC_UNITS)?;
                        Ok(SqlExpr::func(
                            "DATE_TRUNC",
                            vec![SqlExpr::string(unit), value.clone()],
                        ))
                    }),
                ),
        );

    builder
        .add(
            Definition::new("now")
                .args(&[])
                .returns_type(DataType::Datetime)
                .variant(any, direct(|_, _| Ok(SqlExpr::raw("CURRENT_TIMESTAMP")))),
        )
        .add(
            Definition::new("today")
                .args(&[])
                .returns_type(DataType::Date)
                .variant(any, direct(|_, _| Ok(SqlExpr::raw("CURRENT_DATE")))),
        );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_arg_validation() {
        assert_eq!(
            unit_arg("dateadd", &SqlExpr::string("Month"), &DATEADD_UNITS).unwrap(),
            "month"
        );
        let err = unit_arg("dateadd", &SqlExpr::string("fortnight"), &DATEADD_UNITS).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        let err = unit_arg("dateadd", &SqlExpr::column(vec!["u".into()]), &DATEADD_UNITS)
            .unwrap_err();
        assert!(err.to_string().contains("constant string"));
    }

    #[test]
    fn test_temporal_result_constness() {
        assert_eq!(
            temporal_result(&[DataType::ConstDate, DataType::ConstString]),
            Some(DataType::ConstDate)
        );
        assert_eq!(
            temporal_result(&[DataType::ConstDate, DataType::ConstString, DataType::Integer]),
            Some(DataType::Date)
        );
        assert_eq!(temporal_result(&[]), None);
    }
}
