//! MySQL Dialect

use super::DialectImpl;
use crate::definitions::{call, direct, expect_args, RegistryBuilder};
use crate::dialect::{DialectCombo, DialectFamily};
use crate::generator::{ConcatStyle, GeneratorConfig, TemporalLiteralStyle, TypeNames};
use crate::sql::SqlExpr;

/// MySQL dialect
pub struct MySqlDialect;

impl DialectImpl for MySqlDialect {
    fn family(&self) -> DialectFamily {
        DialectFamily::MySql
    }

    fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            identifier_quote: '`',
            identifier_quote_end: '`',
            backslash_escapes: true,
            // `||` is logical OR unless PIPES_AS_CONCAT is set
            concat: ConcatStyle::Function("CONCAT"),
            temporal_literals: TemporalLiteralStyle::Cast,
            type_names: TypeNames {
                text: "CHAR",
                integer: "SIGNED",
                float: "DOUBLE",
                boolean: "UNSIGNED",
                date: "DATE",
                datetime: "DATETIME",
                uuid: "CHAR",
            },
            ..Default::default()
        }
    }

    fn register_overrides(&self, builder: &mut RegistryBuilder) {
        let mysql = DialectCombo::MYSQL;
        builder
            .override_variant("len", mysql, call("CHAR_LENGTH"))
            .override_variant(
                "find",
                mysql,
                direct(|args, _| {
                    let [text, needle] = expect_args::<2>(args)?;
                    Ok(SqlExpr::func("LOCATE", vec![needle.clone(), text.clone()]))
                }),
            )
            .override_variant("now", mysql, call("NOW"))
            .override_variant("today", mysql, call("CURDATE"));
    }
}
