//! Array functions.

use super::{
    call, direct, expect_args, Definition, RegistryBuilder, ARRAY, ARRAY_FLOAT, ARRAY_INT,
    ARRAY_STR, INTEGER, NUMBER, STRING,
};
use crate::datatype::DataType;
use crate::dialect::DialectCombo;
use crate::error::Error;
use crate::sql::SqlExpr;

pub(crate) fn register(builder: &mut RegistryBuilder) {
    let any = DialectCombo::ANY;

    builder.add(
        Definition::new("arr_len")
            .args(&[ARRAY])
            .returns_type(DataType::Integer)
            .variant(any, call("CARDINALITY")),
    );

    builder.add(
        Definition::new("arr_str")
            .args(&[ARRAY])
            .args(&[ARRAY, STRING])
            .args(&[ARRAY, STRING, STRING])
            .returns_type(DataType::String)
            .variant(
                any,
                direct(|args, _| {
                    let mut args = args.to_vec();
                    match args.len() {
                        1 => args.push(SqlExpr::string(",")),
                        2 | 3 => {}
                        n => return Err(Error::arity("arr_str", 3, n)),
                    }
                    Ok(SqlExpr::func("ARRAY_TO_STRING", args))
                }),
            ),
    );

    for (array, item) in [
        (ARRAY_INT, DataType::Integer),
        (ARRAY_FLOAT, DataType::Float),
        (ARRAY_STR, DataType::String),
    ] {
        builder.add(
            Definition::new("get_item")
                .args(&[array, INTEGER])
                .returns_type(item)
                .variant(
                    any,
                    direct(|args, _| {
                        let [array, index] = expect_args::<2>(args)?;
                        Ok(SqlExpr::subscript(array.clone(), index.clone()))
                    }),
                ),
        );
    }

    builder.add(
        Definition::new("has")
            .args(&[ARRAY_INT, NUMBER])
            .args(&[ARRAY_FLOAT, NUMBER])
            .args(&[ARRAY_STR, STRING])
            .returns_type(DataType::Boolean)
            .condition()
            .variant(
                any,
                direct(|args, _| {
                    let [array, value] = expect_args::<2>(args)?;
                    Ok(SqlExpr::eq(
                        value.clone(),
                        SqlExpr::func("ANY", vec![array.clone()]),
                    ))
                }),
            ),
    );
}
