//! SQLite Dialect

use super::DialectImpl;
use crate::definitions::{call, direct, expect_args, RegistryBuilder};
use crate::dialect::{DialectCombo, DialectFamily};
use crate::generator::{GeneratorConfig, TemporalLiteralStyle, TypeNames};
use crate::sql::SqlExpr;

/// SQLite dialect
pub struct SqliteDialect;

impl DialectImpl for SqliteDialect {
    fn family(&self) -> DialectFamily {
        DialectFamily::Sqlite
    }

    fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            // Dates are stored as ISO-8601 text
            temporal_literals: TemporalLiteralStyle::Plain,
            type_names: TypeNames {
                text: "TEXT",
                integer: "INTEGER",
                float: "REAL",
                boolean: "INTEGER",
                date: "DATE",
                datetime: "DATETIME",
                uuid: "TEXT",
            },
            ..Default::default()
        }
    }

    fn register_overrides(&self, builder: &mut RegistryBuilder) {
        let sqlite = DialectCombo::SQLITE;
        builder
            .override_variant("find", sqlite, call("INSTR"))
            .override_variant(
                "now",
                sqlite,
                direct(|_, _| Ok(SqlExpr::func("DATETIME", vec![SqlExpr::string("now")]))),
            )
            .override_variant(
                "today",
                sqlite,
                direct(|_, _| Ok(SqlExpr::func("DATE", vec![SqlExpr::string("now")]))),
            )
            .override_variant(
                "left",
                sqlite,
                direct(|args, _| {
                    let [text, count] = expect_args::<2>(args)?;
                    Ok(SqlExpr::func(
                        "SUBSTR",
                        vec![text.clone(), SqlExpr::integer(1), count.clone()],
                    ))
                }),
            )
            .override_variant(
                "right",
                sqlite,
                direct(|args, _| {
                    let [text, count] = expect_args::<2>(args)?;
                    Ok(SqlExpr::func("SUBSTR", vec![text.clone(), SqlExpr::neg(count.clone())]))
                }),
            );
    }
}
