//! Snowflake Dialect

use super::DialectImpl;
use crate::definitions::{call, direct, expect_args, RegistryBuilder};
use crate::dialect::{DialectCombo, DialectFamily};
use crate::generator::{GeneratorConfig, TypeNames};
use crate::sql::SqlExpr;

/// Snowflake dialect
pub struct SnowflakeDialect;

impl DialectImpl for SnowflakeDialect {
    fn family(&self) -> DialectFamily {
        DialectFamily::Snowflake
    }

    fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            backslash_escapes: true,
            type_names: TypeNames {
                float: "FLOAT",
                datetime: "TIMESTAMP_NTZ",
                uuid: "VARCHAR",
                ..TypeNames::default()
            },
            ..Default::default()
        }
    }

    fn register_overrides(&self, builder: &mut RegistryBuilder) {
        let snowflake = DialectCombo::SNOWFLAKE;
        builder
            .override_variant("arr_len", snowflake, call("ARRAY_SIZE"))
            .override_variant(
                "has",
                snowflake,
                direct(|args, _| {
                    let [array, value] = expect_args::<2>(args)?;
                    Ok(SqlExpr::func(
                        "ARRAY_CONTAINS",
                        vec![SqlExpr::func("TO_VARIANT", vec![value.clone()]), array.clone()],
                    ))
                }),
            )
            .override_variant(
                "find",
                snowflake,
                direct(|args, _| {
                    let [text, needle] = expect_args::<2>(args)?;
                    Ok(SqlExpr::func("POSITION", vec![needle.clone(), text.clone()]))
                }),
            );
    }
}
