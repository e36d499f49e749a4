//! Type conversion functions.

use super::{
    direct, expect_args, wrapped, Definition, RegistryBuilder, VariantBody, ANY, BOOLEAN,
    DATELIKE, NUMBER, STRING,
};
use crate::datatype::DataType;
use crate::dialect::DialectCombo;
use crate::error::Error;
use crate::sql::{BinaryOp, SqlExpr, SqlType};

/// `CAST(expr AS <datetime>)`
pub fn cast_to_datetime(expr: SqlExpr) -> SqlExpr {
    SqlExpr::cast(expr, SqlType::Datetime)
}

/// Timestamps without timezone semantics share the datetime storage type.
pub fn cast_to_generic_datetime(expr: SqlExpr) -> SqlExpr {
    SqlExpr::cast(expr, SqlType::Datetime)
}

fn cast(to: SqlType) -> VariantBody {
    direct(move |args, _| {
        let [value] = expect_args::<1>(args)?;
        Ok(SqlExpr::cast(value.clone(), to))
    })
}

fn identity() -> VariantBody {
    direct(|args, _| {
        let [value] = expect_args::<1>(args)?;
        Ok(value.clone())
    })
}

/// Apply `f` to the only argument.
pub(crate) fn unary_fn(f: fn(SqlExpr) -> SqlExpr) -> VariantBody {
    direct(move |args, _| {
        let [value] = expect_args::<1>(args)?;
        Ok(f(value.clone()))
    })
}

pub(crate) fn register(builder: &mut RegistryBuilder) {
    let any = DialectCombo::ANY;

    builder
        .add(
            Definition::new("str")
                .args(&[STRING])
                .returns_type(DataType::String)
                .variant(any, identity()),
        )
        .add(
            Definition::new("str")
                .args(&[ANY])
                .returns_type(DataType::String)
                .variant(
                    any,
                    wrapped(|args, _| {
                        let [value] = args else {
                            return Err(Error::arity("str", 1, args.len()));
                        };
                        Ok(if value.data_type == DataType::Null {
                            SqlExpr::Null
                        } else {
                            SqlExpr::cast(value.expression.clone(), SqlType::Text)
                        })
                    }),
                ),
        );

    builder.add(
        Definition::new("int")
            .args(&[NUMBER])
            .args(&[STRING])
            .returns_type(DataType::Integer)
            .variant(any, cast(SqlType::Integer)),
    );

    builder.add(
        Definition::new("float")
            .args(&[NUMBER])
            .args(&[STRING])
            .returns_type(DataType::Float)
            .variant(any, cast(SqlType::Float)),
    );

    builder
        .add(
            Definition::new("bool")
                .args(&[BOOLEAN])
                .returns_type(DataType::Boolean)
                .variant(any, identity()),
        )
        .add(
            Definition::new("bool")
                .args(&[NUMBER])
                .returns_type(DataType::Boolean)
                .condition()
                .variant(
                    any,
                    direct(|args, _| {
                        let [value] = expect_args::<1>(args)?;
                        Ok(SqlExpr::binary(
                            BinaryOp::NotEq,
                            value.clone(),
                            SqlExpr::integer(0),
                        ))
                    }),
                ),
        )
        .add(
            Definition::new("bool")
                .args(&[STRING])
                .returns_type(DataType::Boolean)
                .variant(any, cast(SqlType::Boolean)),
        );

    builder.add(
        Definition::new("date")
            .args(&[STRING])
            .args(&[DATELIKE])
            .returns_type(DataType::Date)
            .variant(any, cast(SqlType::Date)),
    );

    builder.add(
        Definition::new("datetime")
            .args(&[STRING])
            .args(&[DATELIKE])
            .returns_type(DataType::Datetime)
            .variant(any, unary_fn(cast_to_datetime)),
    );

    builder.add(
        Definition::new("genericdatetime")
            .args(&[STRING])
            .args(&[DATELIKE])
            .returns_type(DataType::GenericDatetime)
            .variant(any, unary_fn(cast_to_generic_datetime)),
    );
}
