//! Mathematical functions.

use super::operators::float_result;
use super::{
    call, direct, expect_args, Definition, RegistryBuilder, TypeStrategy, INTEGER, NUMBER, ORDERED,
};
use crate::datatype::DataType;
use crate::dialect::DialectCombo;
use crate::sql::{BinaryOp, SqlExpr, SqlType};

pub(crate) fn register(builder: &mut RegistryBuilder) {
    let any = DialectCombo::ANY;

    for (name, sql) in [("abs", "ABS"), ("sign", "SIGN")] {
        builder.add(
            Definition::new(name)
                .args(&[NUMBER])
                .returns(TypeStrategy::FromArgs(&[0]))
                .variant(any, call(sql)),
        );
    }

    for (name, sql) in [("floor", "FLOOR"), ("ceiling", "CEIL")] {
        builder.add(
            Definition::new(name)
                .args(&[INTEGER])
                .returns(TypeStrategy::FromArgs(&[0]))
                .variant(
                    any,
                    direct(|args, _| {
                        let [value] = expect_args::<1>(args)?;
                        Ok(value.clone())
                    }),
                ),
        );
        builder.add(
            Definition::new(name)
                .args(&[NUMBER])
                .returns(TypeStrategy::FromArgs(&[0]))
                .variant(any, call(sql)),
        );
    }

    builder.add(
        Definition::new("round")
            .args(&[NUMBER])
            .args(&[NUMBER, INTEGER])
            .returns(TypeStrategy::FromArgs(&[0]))
            .variant(any, call("ROUND")),
    );

    for (name, sql) in [("sqrt", "SQRT"), ("exp", "EXP"), ("ln", "LN")] {
        builder.add(
            Definition::new(name)
                .args(&[NUMBER])
                .returns(TypeStrategy::Custom(float_result))
                .variant(any, call(sql)),
        );
    }

    builder.add(
        Definition::new("power")
            .args(&[NUMBER, NUMBER])
            .returns(TypeStrategy::Custom(float_result))
            .variant(any, call("POWER")),
    );

    builder.add(
        Definition::new("div")
            .args(&[NUMBER, NUMBER])
            .returns_type(DataType::Integer)
            .variant(
                any,
                direct(|args, _| {
                    let [left, right] = expect_args::<2>(args)?;
                    Ok(SqlExpr::cast(
                        SqlExpr::func(
                            "FLOOR",
                            vec![SqlExpr::binary(BinaryOp::Div, left.clone(), right.clone())],
                        ),
                        SqlType::Integer,
                    ))
                }),
            ),
    );

    for (name, sql) in [("least", "LEAST"), ("greatest", "GREATEST")] {
        builder.add(
            Definition::new(name)
                .variadic(ORDERED)
                .variant(any, call(sql)),
        );
    }
}
