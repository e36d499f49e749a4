//! YDB Dialect

use super::DialectImpl;
use crate::definitions::{call, RegistryBuilder};
use crate::dialect::{DialectCombo, DialectFamily};
use crate::generator::{GeneratorConfig, TemporalLiteralStyle, TypeNames};

/// YDB (YQL) dialect
pub struct YdbDialect;

impl DialectImpl for YdbDialect {
    fn family(&self) -> DialectFamily {
        DialectFamily::Ydb
    }

    fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            identifier_quote: '`',
            identifier_quote_end: '`',
            backslash_escapes: true,
            temporal_literals: TemporalLiteralStyle::Ydb,
            type_names: TypeNames {
                text: "Utf8",
                integer: "Int64",
                float: "Double",
                boolean: "Bool",
                date: "Date",
                datetime: "Datetime",
                uuid: "Uuid",
            },
            ..Default::default()
        }
    }

    fn register_overrides(&self, builder: &mut RegistryBuilder) {
        let ydb = DialectCombo::YDB;
        builder
            .override_variant("len", ydb, call("Unicode::GetLength"))
            .override_variant("lower", ydb, call("Unicode::ToLower"))
            .override_variant("upper", ydb, call("Unicode::ToUpper"))
            .override_variant("arr_len", ydb, call("ListLength"))
            .override_variant("now", ydb, call("CurrentUtcDatetime"))
            .override_variant("today", ydb, call("CurrentUtcDate"));
    }
}
