//! BigQuery Dialect

use super::DialectImpl;
use crate::definitions::{call, direct, expect_args, RegistryBuilder};
use crate::dialect::{DialectCombo, DialectFamily};
use crate::generator::{ConcatStyle, GeneratorConfig, TypeNames};
use crate::sql::SqlExpr;

/// BigQuery dialect
pub struct BigQueryDialect;

impl DialectImpl for BigQueryDialect {
    fn family(&self) -> DialectFamily {
        DialectFamily::BigQuery
    }

    fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            identifier_quote: '`',
            identifier_quote_end: '`',
            backslash_escapes: true,
            concat: ConcatStyle::Function("CONCAT"),
            type_names: TypeNames {
                text: "STRING",
                integer: "INT64",
                float: "FLOAT64",
                boolean: "BOOL",
                date: "DATE",
                datetime: "DATETIME",
                uuid: "STRING",
            },
            ..Default::default()
        }
    }

    fn register_overrides(&self, builder: &mut RegistryBuilder) {
        let bq = DialectCombo::BIGQUERY;
        builder
            .override_variant("arr_len", bq, call("ARRAY_LENGTH"))
            .override_variant("find", bq, call("STRPOS"))
            .override_variant(
                "has",
                bq,
                direct(|args, _| {
                    let [array, value] = expect_args::<2>(args)?;
                    Ok(SqlExpr::InList {
                        expr: Box::new(value.clone()),
                        list: vec![SqlExpr::func("UNNEST", vec![array.clone()])],
                        negated: false,
                    })
                }),
            );
    }
}
