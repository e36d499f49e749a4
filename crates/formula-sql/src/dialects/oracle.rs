//! Oracle Dialect
//!
//! Oracle has no boolean value type. Predicates are only valid where a
//! condition is expected; the translator rewrites the rest into `CASE`.

use super::DialectImpl;
use crate::definitions::{call, direct, RegistryBuilder};
use crate::dialect::{DialectCombo, DialectFamily};
use crate::generator::{GeneratorConfig, TypeNames};
use crate::sql::{SqlExpr, SqlType};

/// Oracle dialect
pub struct OracleDialect;

impl DialectImpl for OracleDialect {
    fn family(&self) -> DialectFamily {
        DialectFamily::Oracle
    }

    fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            supports_boolean: false,
            type_names: TypeNames {
                text: "VARCHAR2(4000)",
                integer: "NUMBER(19)",
                float: "BINARY_DOUBLE",
                boolean: "NUMBER(1)",
                date: "DATE",
                datetime: "TIMESTAMP",
                uuid: "VARCHAR2(36)",
            },
            ..Default::default()
        }
    }

    fn register_overrides(&self, builder: &mut RegistryBuilder) {
        let oracle = DialectCombo::ORACLE;
        builder
            .override_variant("find", oracle, call("INSTR"))
            .override_variant("substr", oracle, call("SUBSTR"))
            .override_variant("now", oracle, direct(|_, _| Ok(SqlExpr::raw("SYSTIMESTAMP"))))
            .override_variant(
                "today",
                oracle,
                direct(|_, _| Ok(SqlExpr::cast(SqlExpr::raw("SYSDATE"), SqlType::Date))),
            );
    }
}
