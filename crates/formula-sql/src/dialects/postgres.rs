//! PostgreSQL Dialect
//!
//! Also covers Greenplum, which renders the same way but versions separately.

use super::DialectImpl;
use crate::definitions::{percentile_median, RegistryBuilder};
use crate::dialect::{Dialect, DialectCombo, DialectFamily};
use crate::generator::{GeneratorConfig, TypeNames};

/// PostgreSQL dialect
pub struct PostgresDialect;

/// Greenplum dialect
pub struct GreenplumDialect;

fn postgres_config() -> GeneratorConfig {
    GeneratorConfig {
        type_names: TypeNames {
            text: "TEXT",
            ..TypeNames::default()
        },
        ..Default::default()
    }
}

impl DialectImpl for PostgresDialect {
    fn family(&self) -> DialectFamily {
        DialectFamily::PostgreSql
    }

    fn generator_config(&self) -> GeneratorConfig {
        postgres_config()
    }

    fn register_overrides(&self, builder: &mut RegistryBuilder) {
        // Ordered-set aggregates appeared in 9.4
        builder.override_variant(
            "median",
            Dialect::PostgreSql9_4.and_above() | DialectCombo::GREENPLUM,
            percentile_median(),
        );
    }
}

impl DialectImpl for GreenplumDialect {
    fn family(&self) -> DialectFamily {
        DialectFamily::Greenplum
    }

    fn generator_config(&self) -> GeneratorConfig {
        postgres_config()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::datatype::DataType;
    use crate::error::Error;
    use crate::nodes::FormulaItem;
    use crate::translation::compile;

    #[test]
    fn test_median_requires_9_4() {
        let fields = HashMap::from([("x".to_string(), DataType::Float)]);
        let ast = FormulaItem::func("median", vec![FormulaItem::field("x")]);

        let compiled = compile(&ast, DialectCombo::POSTGRESQL_9_4, &fields).unwrap();
        assert_eq!(
            compiled.sql(),
            "PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY \"x\")"
        );
        assert!(compile(&ast, DialectCombo::GREENPLUM_6, &fields).is_ok());

        let err = compile(&ast, DialectCombo::POSTGRESQL_9_3, &fields).unwrap_err();
        assert!(matches!(err, Error::NoMatchingVariant { .. }));
    }

    #[test]
    fn test_date_promotion_casts_to_timestamp() {
        let fields = HashMap::from([
            ("d".to_string(), DataType::Date),
            ("t".to_string(), DataType::Datetime),
        ]);
        let ast = FormulaItem::binary("==", FormulaItem::field("d"), FormulaItem::field("t"));
        let compiled = compile(&ast, DialectCombo::POSTGRESQL_9_3, &fields).unwrap();
        assert_eq!(compiled.sql(), "CAST(\"d\" AS TIMESTAMP) = \"t\"");
    }
}
