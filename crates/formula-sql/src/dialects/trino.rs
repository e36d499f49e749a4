//! Trino Dialect

use super::DialectImpl;
use crate::definitions::{direct, expect_args, RegistryBuilder};
use crate::dialect::{DialectCombo, DialectFamily};
use crate::generator::{GeneratorConfig, TypeNames, UuidLiteralStyle};
use crate::sql::SqlExpr;

/// Trino dialect
pub struct TrinoDialect;

impl DialectImpl for TrinoDialect {
    fn family(&self) -> DialectFamily {
        DialectFamily::Trino
    }

    fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            uuid_literals: UuidLiteralStyle::Cast,
            type_names: TypeNames {
                float: "DOUBLE",
                ..TypeNames::default()
            },
            ..Default::default()
        }
    }

    fn register_overrides(&self, builder: &mut RegistryBuilder) {
        let trino = DialectCombo::TRINO;
        builder
            .override_variant(
                "arr_str",
                trino,
                direct(|args, _| {
                    let mut args = args.to_vec();
                    if args.len() == 1 {
                        args.push(SqlExpr::string(","));
                    }
                    Ok(SqlExpr::func("ARRAY_JOIN", args))
                }),
            )
            .override_variant(
                "has",
                trino,
                direct(|args, _| {
                    let [array, value] = expect_args::<2>(args)?;
                    Ok(SqlExpr::func("CONTAINS", vec![array.clone(), value.clone()]))
                }),
            )
            .override_variant(
                "median",
                trino,
                direct(|args, _| {
                    let [value] = expect_args::<1>(args)?;
                    Ok(SqlExpr::func(
                        "APPROX_PERCENTILE",
                        vec![value.clone(), SqlExpr::float(0.5)],
                    ))
                }),
            );
    }
}
