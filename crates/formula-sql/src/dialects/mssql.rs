//! Microsoft SQL Server Dialect
//!
//! SQL Server has no boolean value type: `BIT` columns hold 0/1 and
//! predicates only appear in `WHERE`, `CASE WHEN` and the like. The
//! translator takes care of turning one into the other.

use super::DialectImpl;
use crate::definitions::{call, direct, expect_args, RegistryBuilder};
use crate::dialect::{DialectCombo, DialectFamily};
use crate::generator::{ConcatStyle, GeneratorConfig, TemporalLiteralStyle, TypeNames};
use crate::sql::{SqlExpr, SqlType};

/// SQL Server dialect
pub struct MsSqlDialect;

impl DialectImpl for MsSqlDialect {
    fn family(&self) -> DialectFamily {
        DialectFamily::MsSql
    }

    fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            identifier_quote: '[',
            identifier_quote_end: ']',
            concat: ConcatStyle::Function("CONCAT"),
            temporal_literals: TemporalLiteralStyle::Cast,
            supports_boolean: false,
            type_names: TypeNames {
                text: "NVARCHAR(MAX)",
                integer: "BIGINT",
                float: "FLOAT",
                boolean: "BIT",
                date: "DATE",
                datetime: "DATETIME2",
                uuid: "UNIQUEIDENTIFIER",
            },
            ..Default::default()
        }
    }

    fn register_overrides(&self, builder: &mut RegistryBuilder) {
        let mssql = DialectCombo::MSSQLSRV;
        builder
            .override_variant("len", mssql, call("LEN"))
            .override_variant("ln", mssql, call("LOG"))
            .override_variant(
                "find",
                mssql,
                direct(|args, _| {
                    let [text, needle] = expect_args::<2>(args)?;
                    Ok(SqlExpr::func("CHARINDEX", vec![needle.clone(), text.clone()]))
                }),
            )
            .override_variant("now", mssql, call("GETDATE"))
            .override_variant(
                "today",
                mssql,
                direct(|_, _| {
                    Ok(SqlExpr::cast(SqlExpr::func("GETDATE", vec![]), SqlType::Date))
                }),
            );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::datatype::DataType;
    use crate::nodes::FormulaItem;
    use crate::translation::compile;

    fn fields() -> HashMap<String, DataType> {
        HashMap::from([
            ("flag".to_string(), DataType::Boolean),
            ("n".to_string(), DataType::Integer),
        ])
    }

    #[test]
    fn test_boolean_field_becomes_condition() {
        let ast = FormulaItem::binary("and", FormulaItem::field("flag"), FormulaItem::field("flag"));
        let compiled = compile(&ast, DialectCombo::MSSQLSRV_14_0, &fields()).unwrap();
        assert_eq!(compiled.sql(), "[flag] = 1 AND [flag] = 1");
    }

    #[test]
    fn test_condition_argument_becomes_value() {
        let ast = FormulaItem::func(
            "sum",
            vec![FormulaItem::binary(">", FormulaItem::field("n"), FormulaItem::integer(0))],
        );
        let compiled = compile(&ast, DialectCombo::MSSQLSRV_14_0, &fields()).unwrap();
        assert_eq!(compiled.sql(), "SUM(CASE WHEN [n] > 0 THEN 1 ELSE 0 END)");
    }

    #[test]
    fn test_root_condition_is_kept() {
        let ast = FormulaItem::binary(">", FormulaItem::field("n"), FormulaItem::integer(0));
        let compiled = compile(&ast, DialectCombo::MSSQLSRV_14_0, &fields()).unwrap();
        assert_eq!(compiled.sql(), "[n] > 0");
    }
}
