//! Conditional and null-handling functions.

use super::{
    call, direct, expect_args, ContextFlags, Definition, RegistryBuilder, TypeStrategy, ANY,
    BOOLEAN, NUMBER,
};
use crate::dialect::DialectCombo;
use crate::sql::SqlExpr;

pub(crate) fn register(builder: &mut RegistryBuilder) {
    let any = DialectCombo::ANY;

    builder.add(
        Definition::new("if")
            .args(&[BOOLEAN, ANY, ANY])
            .returns(TypeStrategy::FromArgs(&[1, 2]))
            .arg_flags(&[ContextFlags::REQ_CONDITION])
            .variant(
                any,
                direct(|args, _| {
                    let [cond, then, otherwise] = expect_args::<3>(args)?;
                    Ok(SqlExpr::case_when(
                        cond.clone(),
                        then.clone(),
                        otherwise.clone(),
                    ))
                }),
            ),
    );

    builder
        .add(
            Definition::new("ifnull")
                .args(&[ANY, ANY])
                .variant(any, call("COALESCE")),
        )
        .add(
            Definition::new("coalesce")
                .variadic(ANY)
                .variant(any, call("COALESCE")),
        )
        .add(
            Definition::new("zn")
                .args(&[NUMBER])
                .returns(TypeStrategy::FromArgs(&[0]))
                .variant(
                    any,
                    direct(|args, _| {
                        let [value] = expect_args::<1>(args)?;
                        Ok(SqlExpr::func(
                            "COALESCE",
                            vec![value.clone(), SqlExpr::integer(0)],
                        ))
                    }),
                ),
        );
}
